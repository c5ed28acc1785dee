use std::fmt;

use super::ConfigurationError;

/// Environment variable holding the Telegram bot token.
pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the destination chat id.
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// The static credential pair of the notification sink.
///
/// Read from the process environment only, never from the config file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bot token identifying the sending endpoint.
    pub bot_token: String,
    /// Chat id identifying the destination.
    pub chat_id: String,
}

impl Credentials {
    /// Reads both credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads both credentials through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigurationError::MissingCredential(name))
        };
        Ok(Self { bot_token: read(BOT_TOKEN_VAR)?, chat_id: read(CHAT_ID_VAR)? })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_reads_both_credentials() {
        let credentials =
            Credentials::from_lookup(lookup_from(&[(BOT_TOKEN_VAR, "123:abc"), (CHAT_ID_VAR, "-42")]))
                .unwrap();
        assert_eq!(credentials.bot_token, "123:abc");
        assert_eq!(credentials.chat_id, "-42");
    }

    #[test]
    fn test_missing_token_is_reported_by_name() {
        let err = Credentials::from_lookup(lookup_from(&[(CHAT_ID_VAR, "-42")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredential(BOT_TOKEN_VAR)));
    }

    #[test]
    fn test_empty_chat_id_counts_as_missing() {
        let err = Credentials::from_lookup(lookup_from(&[(BOT_TOKEN_VAR, "t"), (CHAT_ID_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredential(CHAT_ID_VAR)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credentials = Credentials { bot_token: "secret-token".into(), chat_id: "1".into() };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
