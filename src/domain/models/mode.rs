use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::LogError;

/// Deployment mode, which decides console verbosity and colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Coloured console, debug records on stdout.
    #[default]
    Develop,
    /// Plain console, debug records on stdout.
    Testing,
    /// Plain (or JSON) console, info and above only.
    Product,
}

impl Mode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Develop => "develop",
            Self::Testing => "testing",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "develop" => Ok(Self::Develop),
            "testing" => Ok(Self::Testing),
            "product" => Ok(Self::Product),
            _ => Err(LogError::InvalidMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("develop".parse::<Mode>().unwrap(), Mode::Develop);
        assert_eq!("Testing".parse::<Mode>().unwrap(), Mode::Testing);
        assert_eq!(" PRODUCT ".parse::<Mode>().unwrap(), Mode::Product);
    }

    #[test]
    fn test_invalid_mode_names_input() {
        let err = "staging".parse::<Mode>().unwrap_err();
        assert!(matches!(err, LogError::InvalidMode(ref m) if m == "staging"));
        assert!(err.to_string().contains("develop/testing/product"));
    }
}
