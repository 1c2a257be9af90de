// src/app.rs
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use alloy_primitives::Address;
use poolrouter::application::{CommandExecutor, Commands, GlobalArgs, RouterService};
use poolrouter::infrastructure::{ConfirmationConfig, EvmLedger};
use poolrouter::shared::config::RouterConfig;
use poolrouter::shared::errors::AppError;
use poolrouter::shared::types::Token;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub rpc_url: String,
    pub account: Option<Address>,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_secs: Option<u64>,
    pub router: RouterConfig,
}

impl Default for AppCfg {
    fn default() -> Self {
        let rpc = crate::config::RpcCfg::default();
        Self {
            rpc_url: rpc.url,
            account: None,
            poll_interval_ms: rpc.poll_interval_ms,
            confirmation_timeout_secs: rpc.confirmation_timeout_secs,
            router: RouterConfig::default(),
        }
    }
}

impl AppCfg {
    pub fn from_config(cfg: Config) -> Result<Self> {
        let mut router = RouterConfig::default();
        if let Some(router_cfg) = &cfg.router {
            router.router = parse_address(&router_cfg.address)?;
            router.factory = router_cfg
                .factory
                .as_deref()
                .map(parse_address)
                .transpose()?;
        }
        if !cfg.tokens.is_empty() {
            router.tokens = cfg
                .tokens
                .iter()
                .map(|info| -> Result<Token> {
                    let mut token = Token::new(parse_address(&info.address)?, &info.symbol, info.decimals);
                    token.name = info.name.clone();
                    Ok(token)
                })
                .collect::<Result<Vec<_>>>()?;
        }
        router.deadline_secs = cfg.trade.deadline_secs;
        router.display_decimals = cfg.trade.display_decimals;

        let account = cfg
            .account
            .as_ref()
            .map(|a| parse_address(&a.address))
            .transpose()?;

        Ok(Self {
            rpc_url: cfg.rpc.url,
            account,
            poll_interval_ms: cfg.rpc.poll_interval_ms,
            confirmation_timeout_secs: cfg.rpc.confirmation_timeout_secs,
            router,
        })
    }

    /// CLI flags win over whatever the config file said
    pub fn apply_overrides(&mut self, args: &GlobalArgs) -> Result<()> {
        if let Some(rpc_url) = &args.rpc_url {
            self.rpc_url = rpc_url.clone();
        }
        if let Some(account) = &args.account {
            self.account = Some(parse_address(account)?);
        }
        if let Some(router) = &args.router {
            self.router.router = parse_address(router)?;
        }
        Ok(())
    }

    fn confirmation(&self) -> ConfirmationConfig {
        ConfirmationConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self.confirmation_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(raw.to_string()).into())
}

pub async fn run(app_cfg: AppCfg, command: Commands) -> Result<()> {
    let account = match (app_cfg.account, &command) {
        (Some(account), _) => account,
        // Listing tokens needs no account
        (None, Commands::Tokens) => Address::ZERO,
        (None, _) => {
            return Err(AppError::ConfigError(
                "--account is required when [account] is not set in the config".to_string(),
            )
            .into())
        }
    };

    info!("Using RPC {} as {}", app_cfg.rpc_url, account);
    info!(
        "Router {} ({} tokens configured)",
        app_cfg.router.router,
        app_cfg.router.tokens.len()
    );

    let ledger = Arc::new(EvmLedger::new(app_cfg.rpc_url.clone(), app_cfg.confirmation()));
    let service = RouterService::new(ledger, Arc::new(app_cfg.router), account);
    let executor = CommandExecutor::new(service);

    if let Err(e) = executor.execute(command).await {
        error!("❌ {}", e);
        return Err(e.into());
    }
    Ok(())
}
