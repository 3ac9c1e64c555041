use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A username that survived the null and empty filters of the login form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Text fields report `None` when cleared; both that and `""` are dropped.
    /// Whitespace is kept as typed.
    pub fn from_input(raw: Option<String>) -> Option<Self> {
        raw.filter(|value| !value.is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerEnvironment {
    #[default]
    Production,
    Staging,
}

impl PartnerEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "PRODUCTION",
            Self::Staging => "STAGING",
        }
    }
}

impl fmt::Display for PartnerEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown partner environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for PartnerEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("production") {
            Ok(Self::Production)
        } else if trimmed.eq_ignore_ascii_case("staging") {
            Ok(Self::Staging)
        } else {
            Err(UnknownEnvironment(trimmed.to_string()))
        }
    }
}
