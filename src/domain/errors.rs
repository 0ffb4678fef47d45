//! Error taxonomy for logger construction.
//!
//! Construction either yields a fully composed logger or one of these
//! errors; there is no partially built logger. Runtime write failures stay
//! inside the individual destinations and shutdown failures are swallowed.

use thiserror::Error;

/// Errors raised while building options or constructing the logger.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid mode `{0}`: should be develop/testing/product")]
    InvalidMode(String),

    #[error("undefined parameter `{key}`")]
    MissingParam { key: String },

    #[error("conflict topic provider: `{0}`")]
    ProviderConflict(String),

    #[error("undefined topic provider `{0}`")]
    UnknownProvider(String),

    #[error("conflict sink scheme: `{0}`")]
    SchemeConflict(String),

    #[error("cant generate sink address for topic (prefix: {prefix}, provider: {provider}): {source}")]
    Generate {
        prefix: String,
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("cant open sink for topic (prefix: {prefix}, provider: {provider}): {source}")]
    Open {
        prefix: String,
        provider: String,
        #[source]
        source: SinkError,
    },

    #[error("cant open console sink `{target}`: {source}")]
    Console {
        target: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("cant install global logger: {0}")]
    GlobalInstall(String),
}

/// Errors a provider returns while turning scoped parameters into an address.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The scoped key is reported, so operators see the exact variable name.
    #[error("`{key}` not optional")]
    MissingParam { key: String },

    #[error("invalid parameter `{key}`: {reason}")]
    InvalidParam { key: String, reason: String },

    #[error("provider `{provider}` is not configured: {reason}")]
    Unconfigured { provider: String, reason: String },
}

/// Errors raised while opening an address into destinations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cant parse sink address `{address}`: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no sink registered for scheme `{0}`")]
    UnknownScheme(String),

    #[error("undefined arg `{0}`")]
    MissingArg(String),

    #[error("cant parse arg `{arg}`: {reason}")]
    InvalidArg { arg: String, reason: String },

    #[error("hijacking destination must come first, found it at position {0}")]
    MixedDestinations(usize),

    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_carry_prefix_provider_and_key() {
        let err = LogError::Generate {
            prefix: "audit".to_string(),
            provider: "rolling-file".to_string(),
            source: ProviderError::MissingParam {
                key: "APP_LOG_audit_Path".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("audit"));
        assert!(text.contains("rolling-file"));
        assert!(text.contains("APP_LOG_audit_Path"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LogError::UnknownProvider("kafka".to_string()).to_string(),
            "undefined topic provider `kafka`"
        );
        assert_eq!(
            SinkError::MissingArg("base".to_string()).to_string(),
            "undefined arg `base`"
        );
    }
}
