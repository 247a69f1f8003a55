//! Token Registry
//!
//! Static per-token metadata: decimals, mint address, and the fee table each
//! provider publishes for it. Amount scaling between display units and base
//! units happens here and nowhere else.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use solana_sdk::pubkey::Pubkey;

use crate::error::{ProviderError, Result};
use crate::types::ProviderId;

/// Provider-published terms for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTable {
    /// Fee as a fraction of the amount.
    pub fee_fraction: f64,
    /// Smallest accepted amount, display units.
    pub min_amount: f64,
    /// Largest accepted amount, if capped.
    pub max_amount: Option<f64>,
    /// Advertised anonymity-set size, for pool-style providers.
    pub anonymity_set: Option<u64>,
}

/// Metadata for one token symbol.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub decimals: u8,
    pub mint: Pubkey,
    pub fees: HashMap<ProviderId, FeeTable>,
}

/// Symbol-keyed token table.
pub struct TokenRegistry {
    tokens: HashMap<&'static str, TokenInfo>,
}

fn fee(fraction: f64, min: f64, max: Option<f64>, anonymity: Option<u64>) -> FeeTable {
    FeeTable {
        fee_fraction: fraction,
        min_amount: min,
        max_amount: max,
        anonymity_set: anonymity,
    }
}

static STANDARD: LazyLock<TokenRegistry> = LazyLock::new(|| {
    let mut tokens = HashMap::new();

    tokens.insert(
        "SOL",
        TokenInfo {
            symbol: "SOL",
            decimals: 9,
            mint: Pubkey::from_str("So11111111111111111111111111111111111111112")
                .expect("static mint"),
            fees: HashMap::from([
                (ProviderId::ShadowWire, fee(0.005, 0.01, None, None)),
                (ProviderId::Arcium, fee(0.002, 0.001, None, None)),
                (
                    ProviderId::PrivacyCash,
                    fee(0.003, 0.05, None, Some(10_000)),
                ),
                (ProviderId::Noir, fee(0.001, 0.000_001, None, Some(2_000))),
            ]),
        },
    );

    tokens.insert(
        "USDC",
        TokenInfo {
            symbol: "USDC",
            decimals: 6,
            mint: Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
                .expect("static mint"),
            fees: HashMap::from([
                (ProviderId::ShadowWire, fee(0.01, 1.0, None, None)),
                (
                    ProviderId::Arcium,
                    fee(0.002, 0.5, Some(1_000_000.0), None),
                ),
                (
                    ProviderId::PrivacyCash,
                    fee(0.003, 10.0, None, Some(5_000)),
                ),
                (ProviderId::Noir, fee(0.001, 0.01, None, Some(1_000))),
            ]),
        },
    );

    tokens.insert(
        "USDT",
        TokenInfo {
            symbol: "USDT",
            decimals: 6,
            mint: Pubkey::from_str("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB")
                .expect("static mint"),
            fees: HashMap::from([
                (ProviderId::ShadowWire, fee(0.01, 1.0, None, None)),
                (ProviderId::Arcium, fee(0.002, 0.5, Some(1_000_000.0), None)),
            ]),
        },
    );

    TokenRegistry { tokens }
});

impl TokenRegistry {
    /// The built-in table.
    pub fn standard() -> &'static TokenRegistry {
        &STANDARD
    }

    /// Look up a token by symbol (case-insensitive).
    pub fn token(&self, symbol: &str) -> Result<&TokenInfo> {
        let upper = symbol.to_ascii_uppercase();
        self.tokens
            .get(upper.as_str())
            .ok_or_else(|| ProviderError::UnsupportedToken {
                token: symbol.to_string(),
                provider: "registry".to_string(),
            })
    }

    /// Whether the symbol is known at all.
    pub fn contains(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol.to_ascii_uppercase().as_str())
    }

    /// A provider's terms for a token, if published.
    pub fn fee_table(&self, symbol: &str, provider: ProviderId) -> Option<&FeeTable> {
        let upper = symbol.to_ascii_uppercase();
        self.tokens.get(upper.as_str())?.fees.get(&provider)
    }

    /// Convert display units to base units: `round(amount * 10^decimals)`.
    pub fn to_base_units(&self, amount: f64, symbol: &str) -> Result<u64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ProviderError::InvalidFormat(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }
        let info = self.token(symbol)?;
        let scaled = (amount * 10f64.powi(info.decimals as i32)).round();
        if scaled > u64::MAX as f64 {
            return Err(ProviderError::InvalidFormat(format!(
                "amount {amount} {symbol} overflows base units"
            )));
        }
        Ok(scaled as u64)
    }

    /// Convert base units back to display units.
    pub fn from_base_units(&self, units: u64, symbol: &str) -> Result<f64> {
        let info = self.token(symbol)?;
        Ok(units as f64 / 10f64.powi(info.decimals as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens() {
        let registry = TokenRegistry::standard();
        assert_eq!(registry.token("SOL").unwrap().decimals, 9);
        assert_eq!(registry.token("usdc").unwrap().decimals, 6);
        assert!(registry.contains("USDT"));
    }

    #[test]
    fn test_unknown_token() {
        let registry = TokenRegistry::standard();
        assert!(matches!(
            registry.token("BONK"),
            Err(ProviderError::UnsupportedToken { .. })
        ));
    }

    #[test]
    fn test_base_unit_scaling() {
        let registry = TokenRegistry::standard();
        assert_eq!(registry.to_base_units(1.5, "SOL").unwrap(), 1_500_000_000);
        assert_eq!(registry.to_base_units(100.0, "USDC").unwrap(), 100_000_000);
        // Rounding, not truncation
        assert_eq!(registry.to_base_units(0.1234567891, "SOL").unwrap(), 123_456_789);

        assert_eq!(registry.from_base_units(1_500_000_000, "SOL").unwrap(), 1.5);
    }

    #[test]
    fn test_base_units_reject_bad_amounts() {
        let registry = TokenRegistry::standard();
        assert!(registry.to_base_units(-1.0, "SOL").is_err());
        assert!(registry.to_base_units(f64::NAN, "SOL").is_err());
        assert!(registry.to_base_units(1e30, "SOL").is_err());
    }

    #[test]
    fn test_fee_tables_present() {
        let registry = TokenRegistry::standard();
        let sw = registry.fee_table("USDC", ProviderId::ShadowWire).unwrap();
        assert_eq!(sw.fee_fraction, 0.01);
        let arc = registry.fee_table("USDC", ProviderId::Arcium).unwrap();
        assert_eq!(arc.fee_fraction, 0.002);
        assert!(registry.fee_table("USDT", ProviderId::PrivacyCash).is_none());
    }
}
