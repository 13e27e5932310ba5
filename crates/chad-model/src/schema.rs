//! Schema version selector.
//!
//! The database has two layouts that share one transform engine. The
//! current layout stores one ISO 8601 instant per timestamp; the legacy
//! layout splits each timestamp into a date column and a decimal-hours
//! time column and omits a handful of derived columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Current layout.
    #[default]
    Chad,
    /// Legacy layout with split date/time columns.
    Bevan,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::Chad, SchemaVersion::Bevan];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chad => "chad",
            Self::Bevan => "bevan",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chad" => Ok(Self::Chad),
            "bevan" => Ok(Self::Bevan),
            other => Err(ModelError::UnknownValue {
                kind: "schema version",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("CHAD".parse::<SchemaVersion>().unwrap(), SchemaVersion::Chad);
        assert_eq!(" bevan ".parse::<SchemaVersion>().unwrap(), SchemaVersion::Bevan);
        assert!("v3".parse::<SchemaVersion>().is_err());
    }
}
