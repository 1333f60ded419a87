use neo_eval::{Limits, DEFAULT_RECURSION_LIMIT};
use serde::{Deserialize, Serialize};

/// Resource limits for student code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum evaluation steps per call; unlimited when absent.
    pub step_limit: Option<u64>,
    /// Maximum call depth.
    pub recursion_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_limit: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl From<ExecutorConfig> for Limits {
    fn from(config: ExecutorConfig) -> Self {
        Limits {
            step_limit: config.step_limit,
            recursion_limit: config.recursion_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: ExecutorConfig = toml::from_str("").unwrap();
        assert_eq!(config, ExecutorConfig::default());
        let limits = Limits::from(config);
        assert_eq!(limits.step_limit, None);
        assert_eq!(limits.recursion_limit, 200);
    }

    #[test]
    fn test_step_limit_from_toml() {
        let config: ExecutorConfig = toml::from_str("step_limit = 5000").unwrap();
        assert_eq!(config.step_limit, Some(5000));
    }
}
