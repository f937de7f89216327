//! Search configuration for the journey-time engine.

use serde::{Deserialize, Serialize};

use crate::domain::Minutes;

/// Configuration parameters for journey-time search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minutes added each time a journey changes from one line to another.
    /// Boarding from, or alighting onto, a transfer walk is free.
    pub transfer_penalty_mins: f64,

    /// Maximum number of ranked candidates to return.
    pub top_k: usize,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(transfer_penalty_mins: f64, top_k: usize) -> Self {
        Self {
            transfer_penalty_mins,
            top_k,
        }
    }

    /// Returns the transfer penalty as [`Minutes`].
    ///
    /// A negative or non-finite penalty is treated as zero.
    pub fn transfer_penalty(&self) -> Minutes {
        Minutes::new(self.transfer_penalty_mins).unwrap_or(Minutes::ZERO)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            transfer_penalty_mins: 5.0,
            top_k: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SearchConfig::default();

        assert_eq!(config.transfer_penalty_mins, 5.0);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.transfer_penalty().get(), 5.0);
    }

    #[test]
    fn custom_config() {
        let config = SearchConfig::new(2.5, 3);

        assert_eq!(config.transfer_penalty().get(), 2.5);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn invalid_penalty_is_zero() {
        assert_eq!(SearchConfig::new(-1.0, 3).transfer_penalty(), Minutes::ZERO);
        assert_eq!(SearchConfig::new(f64::NAN, 3).transfer_penalty(), Minutes::ZERO);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"top_k": 4}"#).unwrap();

        assert_eq!(config.top_k, 4);
        assert_eq!(config.transfer_penalty_mins, 5.0);
    }
}
