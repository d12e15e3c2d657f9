//! Currency collaborator
//!
//! Supplies the supported currency-code set and the platform-wide default
//! used by money-field validation. Default resolution (actor preference →
//! spec override → platform) lives with the derived operations. Conversion
//! never happens inside the framework.

/// Trait for the currency/price collaborator.
pub trait CurrencyProvider: Send + Sync {
    /// Currency codes accepted by money-field validation.
    fn supported(&self) -> &[String];

    /// Platform-wide default code.
    fn platform_default(&self) -> &str;

    fn is_supported(&self, code: &str) -> bool {
        self.supported().iter().any(|c| c == code)
    }
}

/// Static provider configured once at startup.
pub struct StaticCurrencyProvider {
    supported: Vec<String>,
    default: String,
}

impl StaticCurrencyProvider {
    pub fn new(supported: Vec<String>, default: impl Into<String>) -> Self {
        Self {
            supported,
            default: default.into(),
        }
    }
}

impl Default for StaticCurrencyProvider {
    fn default() -> Self {
        Self::new(
            vec![
                "USD".to_string(),
                "EUR".to_string(),
                "GBP".to_string(),
                "BTC".to_string(),
            ],
            "USD",
        )
    }
}

impl CurrencyProvider for StaticCurrencyProvider {
    fn supported(&self) -> &[String] {
        &self.supported
    }

    fn platform_default(&self) -> &str {
        &self.default
    }
}
