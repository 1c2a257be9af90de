//! CLI commands and handlers
use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::application::services::{RemoveLiquidityOrder, RouterService};
use crate::domain::amount::to_base_units;
use crate::domain::operation::{OperationReceipt, WithdrawalFraction};
use crate::shared::errors::{AmountErrorKind, InvalidAmount, ServiceError};

#[derive(Parser, Debug)]
#[command(name = "poolrouter")]
#[command(version, about = "Approve-then-act client for a constant-product pool router")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags that override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// JSON-RPC endpoint of the node
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Account that owns the tokens and signs (through the node)
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Router contract address
    #[arg(long, global = true)]
    pub router: Option<String>,

    /// Log filter, e.g. "info" or "poolrouter=debug"; RUST_LOG wins when set
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List configured tokens
    Tokens,

    /// Token balance of the active account
    Balance {
        #[arg(short, long)]
        token: String,
    },

    /// Allowance the active account has granted the router
    Allowance {
        #[arg(short, long)]
        token: String,
    },

    /// Preview the router's output for an exact-input swap
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        amount: String,
        /// Show a minimum output with this much slippage tolerance
        #[arg(long, default_value_t = 50)]
        slippage_bps: u16,
    },

    /// Swap an exact amount of one token for another
    Swap {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        amount: String,
        /// Minimum acceptable output, in display units of the output token
        #[arg(long)]
        min_out: String,
    },

    /// Deposit both tokens of a pair
    AddLiquidity {
        #[arg(long)]
        token_a: String,
        #[arg(long)]
        token_b: String,
        #[arg(long)]
        amount_a: String,
        #[arg(long)]
        amount_b: String,
        #[arg(long, default_value = "0")]
        min_a: String,
        #[arg(long, default_value = "0")]
        min_b: String,
    },

    /// Withdraw a percentage of a liquidity position
    RemoveLiquidity {
        #[arg(long)]
        token_a: String,
        #[arg(long)]
        token_b: String,
        /// Position size the percentage applies to
        #[arg(long)]
        liquidity: String,
        /// Percentage to withdraw, 0.01 to 100
        #[arg(long, default_value = "100")]
        percent: String,
        #[arg(long, default_value = "0")]
        min_a: String,
        #[arg(long, default_value = "0")]
        min_b: String,
        /// Pair contract; resolved through the factory when omitted
        #[arg(long)]
        pair: Option<String>,
    },
}

/// Turn "25" or "12.5" into a withdrawal fraction
pub fn parse_percent(percent: &str) -> Result<WithdrawalFraction, InvalidAmount> {
    let bps = to_base_units(percent, 2)?;
    if bps.is_zero() || bps > U256::from(10_000u16) {
        return Err(InvalidAmount::new(percent, AmountErrorKind::FractionOutOfRange));
    }
    Ok(WithdrawalFraction::from_bps(bps.to::<u16>()))
}

pub struct CommandExecutor {
    service: RouterService,
}

impl CommandExecutor {
    pub fn new(service: RouterService) -> Self {
        Self { service }
    }

    /// Execute the selected command
    pub async fn execute(&self, command: Commands) -> Result<(), ServiceError> {
        match command {
            Commands::Tokens => {
                self.execute_tokens_command();
                Ok(())
            }
            Commands::Balance { token } => {
                let balance = self.service.token_balance(&token).await?;
                println!("{} {}", balance, token);
                Ok(())
            }
            Commands::Allowance { token } => {
                let allowance = self.service.allowance(&token).await?;
                println!(
                    "{} {} approved for router {}",
                    allowance,
                    token,
                    self.service.config().router
                );
                Ok(())
            }
            Commands::Quote {
                from,
                to,
                amount,
                slippage_bps,
            } => self.execute_quote_command(&from, &to, &amount, slippage_bps).await,
            Commands::Swap {
                from,
                to,
                amount,
                min_out,
            } => {
                info!("🔄 Swapping {} {} for at least {} {}", amount, from, min_out, to);
                let receipt = self.service.swap(&from, &to, &amount, &min_out).await?;
                Self::print_receipt(&receipt);
                Ok(())
            }
            Commands::AddLiquidity {
                token_a,
                token_b,
                amount_a,
                amount_b,
                min_a,
                min_b,
            } => {
                info!("💧 Adding {} {} + {} {}", amount_a, token_a, amount_b, token_b);
                let receipt = self
                    .service
                    .add_liquidity(&token_a, &token_b, &amount_a, &amount_b, &min_a, &min_b)
                    .await?;
                Self::print_receipt(&receipt);
                Ok(())
            }
            Commands::RemoveLiquidity {
                token_a,
                token_b,
                liquidity,
                percent,
                min_a,
                min_b,
                pair,
            } => {
                let fraction = parse_percent(&percent)?;
                let pair = match pair {
                    Some(raw) => Some(
                        raw.parse::<Address>()
                            .map_err(|_| ServiceError::InvalidAddress(raw.clone()))?,
                    ),
                    None => None,
                };
                info!("💧 Removing {} of {} {}-{} liquidity", fraction, liquidity, token_a, token_b);
                let receipt = self
                    .service
                    .remove_liquidity(RemoveLiquidityOrder {
                        token_a,
                        token_b,
                        liquidity,
                        fraction,
                        amount_a_min: min_a,
                        amount_b_min: min_b,
                        pair,
                    })
                    .await?;
                Self::print_receipt(&receipt);
                Ok(())
            }
        }
    }

    fn execute_tokens_command(&self) {
        println!("📊 Tokens known to router {}:", self.service.config().router);
        for token in self.service.tokens() {
            let name = token.name.as_deref().unwrap_or("-");
            println!(
                "   {:<8} {}  decimals={}  {}",
                token.symbol, token.address, token.decimals, name
            );
        }
    }

    async fn execute_quote_command(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        slippage_bps: u16,
    ) -> Result<(), ServiceError> {
        if slippage_bps > 10_000 {
            warn!("Slippage of {} bps leaves no minimum output", slippage_bps);
        }
        let quote = self.service.quote(from, to, amount).await?;
        let digits = self.service.config().display_decimals;
        println!(
            "{} {} -> {} {}",
            quote.amount_in,
            quote.token_in.symbol,
            quote.amount_out.to_display_rounded(digits),
            quote.token_out.symbol
        );
        println!(
            "   suggested --min-out at {} bps slippage: {}",
            slippage_bps,
            quote.min_out_with_slippage(slippage_bps).to_display()
        );
        Ok(())
    }

    fn print_receipt(receipt: &OperationReceipt) {
        println!("✅ {} confirmed (sequence {})", receipt.kind, receipt.sequence_id);
        for approval in &receipt.approvals {
            match &approval.approval_tx {
                Some(tx) => println!("   approved {}: {}", approval.token, tx.tx_hash),
                None => println!("   {} already approved", approval.token),
            }
        }
        println!("   tx: {}", receipt.action.tx_hash);
        if let Some(block) = receipt.action.block_number {
            println!("   block: {}", block);
        }
    }
}
