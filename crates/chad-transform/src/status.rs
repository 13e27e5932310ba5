//! Patient-level status derivation.
//!
//! Two longitudinal facts are derived for every patient before the patient
//! table is written:
//!
//! - **COVID-19 status** from the serology/PCR result rows: `P` if any result
//!   is `Positive` (with the first positive's collection instant, else its
//!   report instant), otherwise `N` if any result is `Negative`, otherwise
//!   `U`. Rows are ordered by collection instant; rows without one sort after
//!   all dated rows and keep their source order.
//! - **Death** from the outcome destinations: true when any destination
//!   exactly matches an entry of the death-event vocabulary.
//!
//! Each fact is computed once per patient and then joined onto the roster.

use std::collections::{HashMap, HashSet};

use chad_model::CovidStatus;
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::datetime::{format_instant, normalize_values};
use crate::error::{Result, TransformError};
use crate::frame::{column_strings, flag_column, has_column, string_column};

/// Result literal of a positive test.
pub const POSITIVE: &str = "Positive";
/// Result literal of a negative test.
pub const NEGATIVE: &str = "Negative";

fn default_patient_source() -> String {
    "PATIENT_ID".to_string()
}

/// Where the COVID-19 result rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovidSource {
    pub category: String,
    #[serde(default = "default_patient_source")]
    pub patient_column: String,
    pub result_column: String,
    pub collection_column: String,
    pub report_column: String,
}

/// Where the outcome destinations come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutcomeSource {
    pub category: String,
    #[serde(default = "default_patient_source")]
    pub patient_column: String,
    pub destination_column: String,
}

/// Sources and patient-table columns for status derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRule {
    pub covid: CovidSource,
    pub outcomes: OutcomeSource,
    /// Patient identifier column of the shaped patient table.
    pub patient_column: String,
    pub covid_status_column: String,
    /// Unset when the schema has no first-positive column.
    #[serde(default)]
    pub first_positive_column: Option<String>,
    pub death_column: String,
}

impl StatusRule {
    /// Categories read by status derivation.
    pub fn categories(&self) -> [&str; 2] {
        [&self.covid.category, &self.outcomes.category]
    }
}

/// One COVID-19 result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovidObservation {
    pub result: Option<String>,
    pub collected: Option<NaiveDateTime>,
    pub reported: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CovidFinding {
    pub status: CovidStatus,
    pub first_positive: Option<NaiveDateTime>,
}

/// Derive COVID-19 status from all result rows of one patient.
pub fn derive_covid_status(observations: &[CovidObservation]) -> CovidFinding {
    let mut ordered: Vec<&CovidObservation> = observations.iter().collect();
    ordered.sort_by_key(|obs| (obs.collected.is_none(), obs.collected));

    if let Some(first) = ordered
        .iter()
        .find(|obs| obs.result.as_deref() == Some(POSITIVE))
    {
        return CovidFinding {
            status: CovidStatus::Positive,
            first_positive: first.collected.or(first.reported),
        };
    }
    let status = if ordered
        .iter()
        .any(|obs| obs.result.as_deref() == Some(NEGATIVE))
    {
        CovidStatus::Negative
    } else {
        CovidStatus::Unknown
    };
    CovidFinding {
        status,
        first_positive: None,
    }
}

/// True when any destination exactly matches a death event.
pub fn is_deceased<'a, I>(destinations: I, death_events: &HashSet<&str>) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    destinations
        .into_iter()
        .flatten()
        .any(|destination| death_events.contains(destination))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatientStatus {
    pub covid: CovidFinding,
    pub death: bool,
}

/// Derived status for every patient that appears in either source.
#[derive(Debug, Clone, Default)]
pub struct StatusIndex {
    patients: HashMap<String, PatientStatus>,
}

fn source_column(df: &DataFrame, category: &str, column: &str) -> Result<Vec<Option<String>>> {
    if !has_column(df, column) {
        return Err(TransformError::MissingColumn {
            category: category.to_string(),
            column: column.to_string(),
        });
    }
    column_strings(df, column).map_err(TransformError::frame(category))
}

impl StatusIndex {
    /// Group both sources by patient and derive each patient's status once.
    pub fn build(
        rule: &StatusRule,
        covid: &DataFrame,
        outcomes: &DataFrame,
        death_events: &[String],
    ) -> Result<Self> {
        let covid_category = rule.covid.category.as_str();
        let ids = source_column(covid, covid_category, &rule.covid.patient_column)?;
        let results = source_column(covid, covid_category, &rule.covid.result_column)?;
        let collected = normalize_values(&source_column(
            covid,
            covid_category,
            &rule.covid.collection_column,
        )?);
        let reported = normalize_values(&source_column(
            covid,
            covid_category,
            &rule.covid.report_column,
        )?);

        let mut observations: HashMap<String, Vec<CovidObservation>> = HashMap::new();
        for (((id, result), collected), reported) in
            ids.into_iter().zip(results).zip(collected).zip(reported)
        {
            let Some(id) = id else { continue };
            observations.entry(id).or_default().push(CovidObservation {
                result,
                collected,
                reported,
            });
        }

        let outcome_category = rule.outcomes.category.as_str();
        let outcome_ids = source_column(outcomes, outcome_category, &rule.outcomes.patient_column)?;
        let destinations =
            source_column(outcomes, outcome_category, &rule.outcomes.destination_column)?;
        let vocabulary: HashSet<&str> = death_events.iter().map(String::as_str).collect();
        let mut destinations_by_patient: HashMap<String, Vec<Option<String>>> = HashMap::new();
        for (id, destination) in outcome_ids.into_iter().zip(destinations) {
            if let Some(id) = id {
                destinations_by_patient.entry(id).or_default().push(destination);
            }
        }

        let mut patients: HashMap<String, PatientStatus> = observations
            .iter()
            .map(|(id, rows)| {
                let status = PatientStatus {
                    covid: derive_covid_status(rows),
                    death: false,
                };
                (id.clone(), status)
            })
            .collect();
        for (id, destinations) in &destinations_by_patient {
            let death = is_deceased(destinations.iter().map(Option::as_deref), &vocabulary);
            patients.entry(id.clone()).or_default().death = death;
        }

        tracing::debug!(
            patients = patients.len(),
            covid_rows = covid.height(),
            outcome_rows = outcomes.height(),
            "status index built"
        );
        Ok(Self { patients })
    }

    /// Status of one patient; patients absent from both sources are unknown
    /// and alive.
    pub fn get(&self, patient_id: &str) -> PatientStatus {
        self.patients.get(patient_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Add the status columns to the shaped patient table.
    pub fn apply(&self, rule: &StatusRule, mut patients: DataFrame) -> Result<DataFrame> {
        const CATEGORY: &str = "Patients";
        let ids = source_column(&patients, CATEGORY, &rule.patient_column)?;
        let statuses: Vec<PatientStatus> = ids
            .iter()
            .map(|id| id.as_deref().map(|id| self.get(id)).unwrap_or_default())
            .collect();

        let codes: Vec<Option<String>> = statuses
            .iter()
            .map(|s| Some(s.covid.status.code().to_string()))
            .collect();
        patients
            .with_column(string_column(&rule.covid_status_column, codes))
            .map_err(TransformError::frame(CATEGORY))?;

        if let Some(column) = &rule.first_positive_column {
            let first_positive: Vec<Option<String>> = statuses
                .iter()
                .map(|s| s.covid.first_positive.map(format_instant))
                .collect();
            patients
                .with_column(string_column(column, first_positive))
                .map_err(TransformError::frame(CATEGORY))?;
        }

        patients
            .with_column(flag_column(
                &rule.death_column,
                statuses.iter().map(|s| s.death),
            ))
            .map_err(TransformError::frame(CATEGORY))?;
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2020, 4, d).and_then(|date| date.and_hms_opt(9, 0, 0))
    }

    fn obs(result: &str, collected: Option<NaiveDateTime>) -> CovidObservation {
        CovidObservation {
            result: Some(result.to_string()),
            collected,
            reported: None,
        }
    }

    #[test]
    fn test_earliest_positive_wins_over_file_order() {
        let finding = derive_covid_status(&[
            obs("Negative", day(2)),
            obs("Positive", day(3)),
            obs("Positive", day(1)),
        ]);
        assert_eq!(finding.status, CovidStatus::Positive);
        assert_eq!(finding.first_positive, day(1));
    }

    #[test]
    fn test_no_rows_is_unknown() {
        let finding = derive_covid_status(&[]);
        assert_eq!(finding, CovidFinding::default());
        assert_eq!(finding.status, CovidStatus::Unknown);
    }

    #[test]
    fn test_in_progress_only_is_unknown() {
        let finding = derive_covid_status(&[obs("In Progress", day(1)), obs("In Progress", None)]);
        assert_eq!(finding.status, CovidStatus::Unknown);
    }

    #[test]
    fn test_negative() {
        let finding = derive_covid_status(&[obs("In Progress", day(1)), obs("Negative", day(2))]);
        assert_eq!(finding.status, CovidStatus::Negative);
        assert_eq!(finding.first_positive, None);
    }

    #[test]
    fn test_undated_rows_sort_last() {
        let undated = CovidObservation {
            result: Some(POSITIVE.to_string()),
            collected: None,
            reported: day(1),
        };
        let finding = derive_covid_status(&[undated.clone(), obs("Positive", day(5))]);
        assert_eq!(finding.first_positive, day(5));

        // only undated positives: fall back to the report instant
        let finding = derive_covid_status(&[undated]);
        assert_eq!(finding.first_positive, day(1));

        let neither = CovidObservation {
            result: Some(POSITIVE.to_string()),
            collected: None,
            reported: None,
        };
        let finding = derive_covid_status(&[neither]);
        assert_eq!(finding.status, CovidStatus::Positive);
        assert_eq!(finding.first_positive, None);
    }

    #[test]
    fn test_death_requires_exact_match() {
        let vocabulary: HashSet<&str> = ["Died In Dept."].into_iter().collect();
        assert!(is_deceased([None, Some("Died In Dept.")], &vocabulary));
        assert!(!is_deceased([Some("Died In Dept. (transfer)")], &vocabulary));
        assert!(!is_deceased(std::iter::empty(), &vocabulary));
    }
}
