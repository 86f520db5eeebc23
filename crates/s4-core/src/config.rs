//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Knobs for a [`Dispatcher`](crate::Dispatcher).
///
/// Deserializes from the `[dispatch]` table of a schema file; every field
/// has a default so the table may be omitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DispatchConfig {
    /// Memoize resolutions per concrete class tuple.
    pub cache: bool,
    /// Log and record ambiguity warnings as they are found.
    pub warn_ambiguous: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            cache: true,
            warn_ambiguous: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DispatchConfig::default();
        assert!(config.cache);
        assert!(config.warn_ambiguous);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"cache": false}"#).unwrap();
        assert!(!config.cache);
        assert!(config.warn_ambiguous);
    }

    #[test]
    fn unknown_field_rejected() {
        let result: Result<DispatchConfig, _> = serde_json::from_str(r#"{"cache-size": 10}"#);
        assert!(result.is_err());
    }
}
