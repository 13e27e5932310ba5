//! Pattern-based capture of fields from narrative report text.

use regex::Regex;

use crate::error::{Result, TransformError};
use crate::rules::ExtractionRule;

/// A compiled capture pattern.
///
/// `group` counts capture groups from zero, ignoring the whole match. A
/// pattern with exactly one capture group always yields that group.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    regex: Regex,
    group: usize,
}

impl FieldPattern {
    pub fn new(category: &str, pattern: &str, group: usize) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| TransformError::InvalidPattern {
            category: category.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        let groups = regex.captures_len() - 1;
        if groups > 1 && group >= groups {
            return Err(TransformError::GroupOutOfRange {
                category: category.to_string(),
                pattern: pattern.to_string(),
                group,
                groups,
            });
        }
        Ok(Self { regex, group })
    }

    /// First match of the pattern in `text`, or `None`.
    pub fn capture(&self, text: &str) -> Option<String> {
        let captures = self.regex.captures(text)?;
        let groups = self.regex.captures_len() - 1;
        let index = match groups {
            0 => 0,
            1 => 1,
            _ => self.group + 1,
        };
        captures.get(index).map(|m| m.as_str().to_string())
    }
}

/// The compiled extraction rule of one free-text category.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub test_name: Option<String>,
    sample: Option<FieldPattern>,
    result: Option<FieldPattern>,
    result_is_text: bool,
}

/// Fields recovered from one narrative text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub sample_type: Option<String>,
    pub test_result: Option<String>,
}

impl Extractor {
    pub fn compile(rule: &ExtractionRule) -> Result<Self> {
        let sample = rule
            .sample_pattern
            .as_deref()
            .map(|p| FieldPattern::new(&rule.category, p, rule.sample_group))
            .transpose()?;
        let result = rule
            .result_pattern
            .as_deref()
            .map(|p| FieldPattern::new(&rule.category, p, rule.result_group))
            .transpose()?;
        Ok(Self {
            test_name: rule.test_name.clone(),
            sample,
            result,
            result_is_text: rule.result_is_text,
        })
    }

    /// Apply both patterns to `text`. A miss leaves the field `None`.
    pub fn extract(&self, text: Option<&str>) -> Extracted {
        let Some(text) = text else {
            return Extracted::default();
        };
        let sample_type = self.sample.as_ref().and_then(|p| p.capture(text));
        let test_result = if self.result_is_text {
            Some(text.to_string())
        } else {
            self.result.as_ref().and_then(|p| p.capture(text))
        };
        Extracted {
            sample_type,
            test_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str, group: usize) -> FieldPattern {
        FieldPattern::new("test", p, group).unwrap()
    }

    #[test]
    fn test_single_group_ignores_index() {
        let p = pattern(r"PCR\s(DNA\s[Not]*\sDetected)", 1);
        assert_eq!(
            p.capture("Aspergillus PCR DNA Not Detected").as_deref(),
            Some("DNA Not Detected")
        );
    }

    #[test]
    fn test_group_index_with_many_groups() {
        let p = pattern(r"(Culture|Microscopy-)([\w\s\d]*)", 1);
        assert_eq!(
            p.capture("Specimen received: Blood Culture No growth").as_deref(),
            Some(" No growth")
        );
        let first = pattern(r"(Culture|Microscopy-)([\w\s\d]*)", 0);
        assert_eq!(
            first.capture("Blood Culture No growth").as_deref(),
            Some("Culture")
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let p = pattern(r"Specimen received: ([\w\s]+) Aspergillus ELISA", 0);
        assert_eq!(p.capture("Issue with result"), None);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = FieldPattern::new("BCult", "(unclosed", 0).unwrap_err();
        assert!(err.to_string().starts_with("BCult: invalid pattern"));
    }

    #[test]
    fn test_group_past_last_capture_is_rejected() {
        let err =
            FieldPattern::new("BCult", r"(Culture|Microscopy-)([\w\s\d]*)", 2).unwrap_err();
        assert!(matches!(
            err,
            TransformError::GroupOutOfRange {
                group: 2,
                groups: 2,
                ..
            }
        ));
        // one capture group ignores its index, so any value is accepted
        assert!(FieldPattern::new("AsperPCR", r"PCR\s(DNA\s[Not]*\sDetected)", 5).is_ok());
    }

    #[test]
    fn test_result_is_text() {
        let rule = ExtractionRule {
            category: "Covid19".to_string(),
            test_name: Some("Covid19-PCR".to_string()),
            sample_pattern: None,
            sample_group: 0,
            result_pattern: None,
            result_group: 1,
            result_is_text: true,
        };
        let extractor = Extractor::compile(&rule).unwrap();
        let extracted = extractor.extract(Some("Positive"));
        assert_eq!(extracted.test_result.as_deref(), Some("Positive"));
        assert_eq!(extracted.sample_type, None);
        assert_eq!(extractor.extract(None), Extracted::default());
    }
}
