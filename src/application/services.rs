//! Application services and use cases

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

use crate::domain::amount::to_base_units;
use crate::domain::ledger::Ledger;
use crate::domain::operation::{
    AddLiquidityRequest, OperationReceipt, OperationRequest, OperationSequencer,
    RemoveLiquidityRequest, SwapRequest, WithdrawalFraction,
};
use crate::shared::config::RouterConfig;
use crate::shared::errors::{AmountErrorKind, InvalidAmount, ServiceError};
use crate::shared::types::{Amount, Token};

/// Decimals of the pair's liquidity-position token
pub const LP_TOKEN_DECIMALS: u8 = 18;

/// Router output preview for an exact-input swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: Amount,
    pub amount_out: Amount,
}

impl Quote {
    /// `amount_out` reduced by `slippage_bps`, rounded down. Only a suggestion:
    /// swaps always take an explicit minimum.
    pub fn min_out_with_slippage(&self, slippage_bps: u16) -> Amount {
        let keep = WithdrawalFraction::from_bps(10_000u16.saturating_sub(slippage_bps));
        Amount::new(keep.apply(self.amount_out.value), self.amount_out.decimals)
    }
}

/// Inputs for withdrawing part of a liquidity position
#[derive(Debug, Clone)]
pub struct RemoveLiquidityOrder {
    pub token_a: String,
    pub token_b: String,
    /// Position size, in position-token display units
    pub liquidity: String,
    pub fraction: WithdrawalFraction,
    pub amount_a_min: String,
    pub amount_b_min: String,
    /// Pair contract; looked up through the factory when absent
    pub pair: Option<Address>,
}

/// Entry point for everything the active account can do against the router
pub struct RouterService {
    config: Arc<RouterConfig>,
    ledger: Arc<dyn Ledger>,
    sequencer: OperationSequencer,
    account: Address,
}

impl RouterService {
    pub fn new(ledger: Arc<dyn Ledger>, config: Arc<RouterConfig>, account: Address) -> Self {
        let sequencer = OperationSequencer::new(ledger.clone(), config.clone());
        Self {
            config,
            ledger,
            sequencer,
            account,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &OperationSequencer {
        &self.sequencer
    }

    pub fn tokens(&self) -> &[Token] {
        &self.config.tokens
    }

    pub fn resolve_token(&self, key: &str) -> Result<Token, ServiceError> {
        self.config
            .resolve_token(key)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownToken(key.to_string()))
    }

    fn display(&self, amount: &Amount) -> String {
        amount.to_display_rounded(self.config.display_decimals)
    }

    pub async fn balance(&self, token: &str) -> Result<Amount, ServiceError> {
        let token = self.resolve_token(token)?;
        let value = self.ledger.balance_of(token.address, self.account).await?;
        Ok(Amount::new(value, token.decimals))
    }

    /// Balance of the active account, ready for display
    pub async fn token_balance(&self, token: &str) -> Result<String, ServiceError> {
        let balance = self.balance(token).await?;
        Ok(self.display(&balance))
    }

    /// Router allowance currently granted by the active account, ready for display
    pub async fn allowance(&self, token: &str) -> Result<String, ServiceError> {
        let token = self.resolve_token(token)?;
        let value = self
            .ledger
            .allowance(token.address, self.account, self.config.router)
            .await?;
        Ok(self.display(&Amount::new(value, token.decimals)))
    }

    pub async fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
    ) -> Result<Quote, ServiceError> {
        let token_in = self.resolve_token(token_in)?;
        let token_out = self.resolve_token(token_out)?;
        let amount_in = Amount::from_display(amount_in, &token_in)?;
        if amount_in.is_zero() {
            return Err(InvalidAmount::new(amount_in.to_display(), AmountErrorKind::Zero).into());
        }

        let out = self
            .ledger
            .get_amount_out(
                self.config.router,
                amount_in.value,
                token_in.address,
                token_out.address,
            )
            .await?;
        debug!("getAmountOut({} {}) = {}", amount_in, token_in.symbol, out);

        Ok(Quote {
            amount_out: Amount::new(out, token_out.decimals),
            token_in,
            token_out,
            amount_in,
        })
    }

    /// Expected swap output, ready for display
    pub async fn quote_amount_out(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
    ) -> Result<String, ServiceError> {
        let quote = self.quote(token_in, token_out, amount_in).await?;
        Ok(self.display(&quote.amount_out))
    }

    pub async fn swap(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
        amount_out_min: &str,
    ) -> Result<OperationReceipt, ServiceError> {
        let request = OperationRequest::Swap(SwapRequest {
            token_in: self.resolve_token(token_in)?,
            token_out: self.resolve_token(token_out)?,
            amount_in: amount_in.to_string(),
            amount_out_min: amount_out_min.to_string(),
        });
        self.run(request).await
    }

    pub async fn add_liquidity(
        &self,
        token_a: &str,
        token_b: &str,
        amount_a_desired: &str,
        amount_b_desired: &str,
        amount_a_min: &str,
        amount_b_min: &str,
    ) -> Result<OperationReceipt, ServiceError> {
        let request = OperationRequest::AddLiquidity(AddLiquidityRequest {
            token_a: self.resolve_token(token_a)?,
            token_b: self.resolve_token(token_b)?,
            amount_a_desired: amount_a_desired.to_string(),
            amount_b_desired: amount_b_desired.to_string(),
            amount_a_min: amount_a_min.to_string(),
            amount_b_min: amount_b_min.to_string(),
        });
        self.run(request).await
    }

    pub async fn remove_liquidity(
        &self,
        order: RemoveLiquidityOrder,
    ) -> Result<OperationReceipt, ServiceError> {
        let token_a = self.resolve_token(&order.token_a)?;
        let token_b = self.resolve_token(&order.token_b)?;
        // Reject bad input before the factory lookup touches the ledger
        if !order.fraction.is_valid() {
            return Err(InvalidAmount::new(
                format!("{} bps", order.fraction.bps()),
                AmountErrorKind::FractionOutOfRange,
            )
            .into());
        }
        to_base_units(&order.liquidity, LP_TOKEN_DECIMALS)?;

        let pair = match order.pair {
            Some(pair) => pair,
            None => self.find_pair(&token_a, &token_b).await?,
        };
        let position = Token::new(
            pair,
            format!("{}-{}-LP", token_a.symbol, token_b.symbol),
            LP_TOKEN_DECIMALS,
        );

        let request = OperationRequest::RemoveLiquidity(RemoveLiquidityRequest {
            token_a,
            token_b,
            position,
            position_amount: order.liquidity,
            fraction: order.fraction,
            amount_a_min: order.amount_a_min,
            amount_b_min: order.amount_b_min,
        });
        self.run(request).await
    }

    /// Pair contract for two tokens, via the configured factory
    pub async fn find_pair(&self, token_a: &Token, token_b: &Token) -> Result<Address, ServiceError> {
        let factory = self.config.factory.ok_or(ServiceError::FactoryNotConfigured)?;
        self.ledger
            .get_pair(factory, token_a.address, token_b.address)
            .await?
            .ok_or_else(|| {
                ServiceError::PairNotFound(token_a.symbol.clone(), token_b.symbol.clone())
            })
    }

    /// Liquidity-position balance of the active account
    pub async fn get_lp_balance(&self, _token_a: &str, _token_b: &str) -> Result<U256, ServiceError> {
        Err(ServiceError::NotYetAvailable("liquidity position balance"))
    }

    /// Token amounts a withdrawal would return
    pub async fn get_liquidity_preview(
        &self,
        _token_a: &str,
        _token_b: &str,
        _fraction: WithdrawalFraction,
    ) -> Result<(Amount, Amount), ServiceError> {
        Err(ServiceError::NotYetAvailable("liquidity withdrawal preview"))
    }

    async fn run(&self, request: OperationRequest) -> Result<OperationReceipt, ServiceError> {
        let kind = request.kind();
        let receipt = self.sequencer.execute(self.account, request).await?;
        info!(
            "🚀 {} finished: {} approval(s) sent, action {}",
            kind,
            receipt.approvals.iter().filter(|a| a.did_approve).count(),
            receipt.action.tx_hash
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use alloy_primitives::address;

    use crate::domain::operation::OperationKind;
    use crate::shared::errors::SequencerError;
    use crate::testing::{test_config, token_a, token_b, LedgerCall, ScriptedLedger, OWNER};

    fn service(ledger: &Arc<ScriptedLedger>) -> RouterService {
        RouterService::new(ledger.clone(), Arc::new(test_config()), OWNER)
    }

    fn u(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    fn remove_order(pair: Option<Address>) -> RemoveLiquidityOrder {
        RemoveLiquidityOrder {
            token_a: "TKNA".to_string(),
            token_b: "TKNB".to_string(),
            liquidity: "4".to_string(),
            fraction: WithdrawalFraction::from_percent(25),
            amount_a_min: "0".to_string(),
            amount_b_min: "0".to_string(),
            pair,
        }
    }

    #[tokio::test]
    async fn test_token_balance_is_rendered_for_display() {
        let ledger = Arc::new(
            ScriptedLedger::new().with_balance(token_a().address, u("1234567890000000000")),
        );
        let service = service(&ledger);

        assert_eq!(service.token_balance("tkna").await.unwrap(), "1.234568");
        assert_eq!(service.token_balance("TKNB").await.unwrap(), "0");
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let err = service.token_balance("USDC").await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownToken(ref s) if s == "USDC"));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_allowance_reads_router_spender() {
        let ledger = Arc::new(ScriptedLedger::new().with_allowance(token_b().address, U256::from(2_500_000u64)));
        let service = service(&ledger);

        assert_eq!(service.allowance("TKNB").await.unwrap(), "2.5");
        assert_eq!(
            ledger.calls(),
            vec![LedgerCall::Allowance {
                token: token_b().address,
                owner: OWNER,
                spender: test_config().router,
            }]
        );
    }

    #[tokio::test]
    async fn test_quote_scales_input_and_output() {
        let ledger = Arc::new(ScriptedLedger::new().with_amount_out(U256::from(1_980_000u64)));
        let service = service(&ledger);

        let quote = service.quote("TKNA", "TKNB", "2").await.unwrap();
        assert_eq!(quote.amount_in.value, u("2000000000000000000"));
        assert_eq!(quote.amount_out.to_display(), "1.98");
        assert_eq!(quote.min_out_with_slippage(50).value, U256::from(1_970_100u64));
        assert_eq!(service.quote_amount_out("TKNA", "TKNB", "2").await.unwrap(), "1.98");
    }

    #[tokio::test]
    async fn test_quote_failure_surfaces_ledger_error() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let err = service.quote("TKNA", "TKNB", "1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(_)));
    }

    #[tokio::test]
    async fn test_quote_rejects_zero_without_ledger_call() {
        let ledger = Arc::new(ScriptedLedger::new().with_amount_out(U256::from(1u64)));
        let service = service(&ledger);

        assert!(matches!(
            service.quote("TKNA", "TKNB", "0").await,
            Err(ServiceError::InvalidAmount(_))
        ));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_swap_runs_through_sequencer() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let receipt = service.swap("TKNA", "TKNB", "1", "0.95").await.unwrap();

        assert_eq!(receipt.kind, OperationKind::Swap);
        assert_eq!(ledger.approvals().len(), 1);
        assert_eq!(ledger.action_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_add_liquidity_validation_error_is_wrapped() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let err = service
            .add_liquidity("TKNA", "TKNB", "abc", "1", "0", "0")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Sequencer(SequencerError::InvalidAmount(_))
        ));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_liquidity_resolves_pair_through_factory() {
        let pair = address!("00000000000000000000000000000000000000cc");
        let ledger = Arc::new(ScriptedLedger::new().with_pair(token_a().address, token_b().address, pair));
        let service = service(&ledger);

        let receipt = service.remove_liquidity(remove_order(None)).await.unwrap();

        assert_eq!(receipt.kind, OperationKind::RemoveLiquidity);
        assert_eq!(
            ledger.approvals(),
            vec![(pair, test_config().router, u("1000000000000000000"))]
        );
    }

    #[tokio::test]
    async fn test_remove_liquidity_with_explicit_pair_skips_factory() {
        let pair = address!("00000000000000000000000000000000000000dd");
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        service.remove_liquidity(remove_order(Some(pair))).await.unwrap();

        assert!(!ledger
            .calls()
            .iter()
            .any(|call| matches!(call, LedgerCall::GetPair { .. })));
    }

    #[tokio::test]
    async fn test_remove_liquidity_bad_input_never_reaches_factory() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let mut zero = remove_order(None);
        zero.fraction = WithdrawalFraction::from_bps(0);
        match service.remove_liquidity(zero).await.unwrap_err() {
            ServiceError::InvalidAmount(err) => {
                assert_eq!(err.kind, AmountErrorKind::FractionOutOfRange)
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut malformed = remove_order(None);
        malformed.liquidity = "lots".to_string();
        assert!(matches!(
            service.remove_liquidity(malformed).await,
            Err(ServiceError::InvalidAmount(_))
        ));

        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_liquidity_missing_pair() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        let err = service.remove_liquidity(remove_order(None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::PairNotFound(_, _)));
        assert!(ledger.approvals().is_empty());
    }

    #[tokio::test]
    async fn test_remove_liquidity_without_factory() {
        let ledger = Arc::new(ScriptedLedger::new());
        let mut config = test_config();
        config.factory = None;
        let service = RouterService::new(ledger.clone(), Arc::new(config), OWNER);

        let err = service.remove_liquidity(remove_order(None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::FactoryNotConfigured));
    }

    #[tokio::test]
    async fn test_unavailable_lookups_say_so() {
        let ledger = Arc::new(ScriptedLedger::new());
        let service = service(&ledger);

        assert!(matches!(
            service.get_lp_balance("TKNA", "TKNB").await,
            Err(ServiceError::NotYetAvailable(_))
        ));
        assert!(matches!(
            service
                .get_liquidity_preview("TKNA", "TKNB", WithdrawalFraction::FULL)
                .await,
            Err(ServiceError::NotYetAvailable(_))
        ));
        assert!(ledger.calls().is_empty());
    }
}
