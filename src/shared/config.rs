use alloy_primitives::{address, Address};

use crate::shared::types::Token;

/// Reference deployment router
pub const DEFAULT_ROUTER: Address = address!("37c44edadc5A4296ab502DF231a938276c97d46C");
/// Reference deployment pair factory
pub const DEFAULT_FACTORY: Address = address!("bbeB32cA887288Fb8a1e0Ac5f547B598f8b14e10");

pub const DEFAULT_DEADLINE_SECS: u64 = 1200;
pub const DEFAULT_DISPLAY_DECIMALS: usize = 6;

/// Router configuration, built once at startup and read-only afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Router contract; also the spender every approval is granted to
    pub router: Address,
    /// Pair factory, needed only to resolve liquidity-position tokens
    pub factory: Option<Address>,
    pub tokens: Vec<Token>,
    /// Seconds a remove-liquidity call stays valid after submission
    pub deadline_secs: u64,
    /// Fractional digits shown when rendering amounts
    pub display_decimals: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            router: DEFAULT_ROUTER,
            factory: Some(DEFAULT_FACTORY),
            tokens: vec![
                Token::new(address!("1b534eD99500c2Cf49f6C2574B2ADAff497aef7c"), "TKNA", 18)
                    .with_name("Token A"),
                Token::new(address!("DB68629086f858E119e4e4d61745780d50Bc1368"), "TKNB", 18)
                    .with_name("Token B"),
            ],
            deadline_secs: DEFAULT_DEADLINE_SECS,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

impl RouterConfig {
    pub fn token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn token_by_address(&self, address: &Address) -> Option<&Token> {
        self.tokens.iter().find(|token| &token.address == address)
    }

    /// Look a token up by symbol, or by address when given one
    pub fn resolve_token(&self, key: &str) -> Option<&Token> {
        match key.parse::<Address>() {
            Ok(address) => self.token_by_address(&address),
            Err(_) => self.token_by_symbol(key),
        }
    }
}
