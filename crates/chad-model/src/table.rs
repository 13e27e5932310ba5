//! Destination tables of the relational store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One of the nine destination tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKind {
    Patients,
    Comorbid,
    Events,
    Pathology,
    Microbiology,
    Radiology,
    CriticalCare,
    ComplexHaematology,
    Units,
}

impl TableKind {
    /// Fixed population order. Patients come first because their status
    /// columns are derived before the table is written.
    pub const POPULATION_ORDER: [TableKind; 9] = [
        TableKind::Patients,
        TableKind::Comorbid,
        TableKind::Events,
        TableKind::Pathology,
        TableKind::Microbiology,
        TableKind::Radiology,
        TableKind::CriticalCare,
        TableKind::ComplexHaematology,
        TableKind::Units,
    ];

    /// Table name in the store.
    pub fn name(self) -> &'static str {
        match self {
            Self::Patients => "Patients",
            Self::Comorbid => "Comorbid",
            Self::Events => "Events",
            Self::Pathology => "Pathology",
            Self::Microbiology => "Microbiology",
            Self::Radiology => "Radiology",
            Self::CriticalCare => "CriticalCare",
            Self::ComplexHaematology => "ComplexHaematology",
            Self::Units => "Units",
        }
    }

    /// Position in [`TableKind::POPULATION_ORDER`].
    pub fn population_rank(self) -> usize {
        Self::POPULATION_ORDER
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(Self::POPULATION_ORDER.len())
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::POPULATION_ORDER
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownValue {
                kind: "table",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_order_starts_with_patients_and_ends_with_units() {
        assert_eq!(TableKind::POPULATION_ORDER[0], TableKind::Patients);
        assert_eq!(TableKind::POPULATION_ORDER[8], TableKind::Units);
        assert!(TableKind::Events.population_rank() < TableKind::Pathology.population_rank());
    }

    #[test]
    fn names_parse_back() {
        for kind in TableKind::POPULATION_ORDER {
            assert_eq!(kind.name().parse::<TableKind>().unwrap(), kind);
        }
        assert_eq!("criticalcare".parse::<TableKind>().unwrap(), TableKind::CriticalCare);
    }
}
