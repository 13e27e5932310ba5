//! Patient-level COVID-19 status codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// COVID-19 status as stored in the `covid_status` columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CovidStatus {
    #[serde(rename = "P")]
    Positive,
    #[serde(rename = "N")]
    Negative,
    #[default]
    #[serde(rename = "U")]
    Unknown,
}

impl CovidStatus {
    /// Single-letter code written to the store.
    pub fn code(self) -> &'static str {
        match self {
            Self::Positive => "P",
            Self::Negative => "N",
            Self::Unknown => "U",
        }
    }
}

impl fmt::Display for CovidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CovidStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "P" => Ok(Self::Positive),
            "N" => Ok(Self::Negative),
            "U" => Ok(Self::Unknown),
            other => Err(ModelError::UnknownValue {
                kind: "covid status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_str() {
        for status in [
            CovidStatus::Positive,
            CovidStatus::Negative,
            CovidStatus::Unknown,
        ] {
            assert_eq!(status.code().parse::<CovidStatus>().unwrap(), status);
        }
        assert!("Positive".parse::<CovidStatus>().is_err());
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(CovidStatus::default(), CovidStatus::Unknown);
    }
}
