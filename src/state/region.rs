use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A two-letter ISO 3166-1 region code (e.g. `US`, `IN`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region(String);

impl Region {
    /// Parses a region code, accepting exactly two ASCII uppercase letters
    pub fn parse(code: &str) -> Result<Self, ConfigError> {
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(ConfigError::InvalidRegion(code.to_string()))
        }
    }

    pub fn us() -> Self {
        Self("US".to_string())
    }

    pub fn india() -> Self {
        Self("IN".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Region {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
