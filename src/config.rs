//! Shop configuration
//!
//! Options are read from YAML; anything left out falls back to its default.
//!
//! ```yaml
//! cache_calculations: true
//! cache_calculations_minutes: 15
//! tax: "0.2"
//! tax_policy: last_item
//! currency: GBP
//! order_status_placement: pending
//! ```

use std::{fs, path::Path};

use rust_decimal::Decimal;
use rusty_money::{Findable, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::TaxPolicy;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Negative tax rate
    #[error("Tax rate must not be negative, got {0}")]
    NegativeTax(Decimal),
}

/// Recognized shop options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Cache cart calculations between requests
    pub cache_calculations: bool,

    /// Minutes cached calculations stay valid
    pub cache_calculations_minutes: u32,

    /// Fractional tax rate, e.g. `0.2` for 20%
    pub tax: Decimal,

    /// How tax is aggregated over line items
    pub tax_policy: TaxPolicy,

    /// ISO 4217 code captured on line items and used for display
    pub currency: String,

    /// Status code orders are placed with when none is given
    pub order_status_placement: String,

    /// Table name carts live in, used for cache keys
    pub cart_table: String,

    /// Auth provider the identity resolver consults
    pub user_auth_provider: String,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            cache_calculations: true,
            cache_calculations_minutes: 15,
            tax: Decimal::ZERO,
            tax_policy: TaxPolicy::LastItem,
            currency: "USD".to_string(),
            order_status_placement: "pending".to_string(),
            cart_table: "cart".to_string(),
            user_auth_provider: "web".to_string(),
        }
    }
}

impl ShopConfig {
    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid, the currency is unknown or the
    /// tax rate is negative.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_norway::from_str(contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or for any reason
    /// [`ShopConfig::from_yaml_str`] fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Resolve the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] if the code is not an ISO currency.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        Currency::find(&self.currency)
            .ok_or_else(|| ConfigError::UnknownCurrency(self.currency.clone()))
    }

    /// Check the options that cannot be expressed in the type.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown currency or a negative tax rate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.currency()?;

        if self.tax.is_sign_negative() && !self.tax.is_zero() {
            return Err(ConfigError::NegativeTax(self.tax));
        }

        Ok(())
    }
}
