//! Secret lookup (API keys, relay tokens).

use std::collections::HashMap;

pub trait SecretSource: Send + Sync {
    /// The secret stored under `key`, or `None` when absent or blank.
    fn get(&self, key: &str) -> Option<String>;
}

/// Secrets read from process environment variables.
#[derive(Debug, Copy, Clone, Default)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed secrets for tests/dev.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secrets_count_as_missing() {
        let secrets = StaticSecrets::new().with("A", "  ").with("B", "key");
        assert_eq!(secrets.get("A"), None);
        assert_eq!(secrets.get("B").as_deref(), Some("key"));
        assert_eq!(secrets.get("C"), None);
    }
}
