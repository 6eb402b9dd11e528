//! Compare a replay's published values with a reference run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use midax_core::error::ValidationError;
use midax_data::RecordRow;

/// Outcome of a successful validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    /// Expected rows matched
    pub matched: usize,
    /// Published rows with no expected counterpart
    pub unexpected: usize,
}

/// Checks published rows against expected ones within a tolerance.
///
/// Trade rows carry broker confirmation times and are skipped unless asked
/// for.
#[derive(Debug, Clone)]
pub struct Validator {
    expected: Vec<RecordRow>,
    tolerance: Decimal,
    kinds: Vec<String>,
}

impl Validator {
    pub fn new(expected: Vec<RecordRow>, tolerance: Decimal) -> Self {
        Self {
            expected,
            tolerance,
            kinds: vec!["price".into(), "indicator".into(), "signal".into()],
        }
    }

    /// Replace the record kinds compared.
    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    fn compares(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }

    /// Fail on the first expected row that is missing or off by more than
    /// the tolerance.
    pub fn check(&self, actual: &[RecordRow]) -> Result<ValidationSummary, ValidationError> {
        let published: HashMap<(&str, &str, DateTime<Utc>), Decimal> = actual
            .iter()
            .filter(|row| self.compares(&row.kind))
            .map(|row| ((row.kind.as_str(), row.id.as_str(), row.timestamp), row.value))
            .collect();

        let mut summary = ValidationSummary::default();
        for row in self.expected.iter().filter(|row| self.compares(&row.kind)) {
            let time = row.timestamp.format("%H:%M").to_string();
            let Some(&value) = published.get(&(row.kind.as_str(), row.id.as_str(), row.timestamp)) else {
                return Err(ValidationError::Missing {
                    kind: row.kind.clone(),
                    id: row.id.clone(),
                    time,
                    expected: row.value,
                });
            };
            if (value - row.value).abs() > self.tolerance {
                return Err(ValidationError::Mismatch {
                    kind: row.kind.clone(),
                    id: row.id.clone(),
                    time,
                    expected: row.value,
                    actual: value,
                });
            }
            summary.matched += 1;
        }

        let expected_count = self.expected.iter().filter(|row| self.compares(&row.kind)).count();
        summary.unexpected = published.len().saturating_sub(expected_count);
        if summary.unexpected > 0 {
            debug!(unexpected = summary.unexpected, "Published values not in the reference run");
        }
        info!(matched = summary.matched, "Replay validated");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn row(kind: &str, id: &str, minute: u32, value: Decimal) -> RecordRow {
        RecordRow {
            kind: kind.into(),
            id: id.into(),
            timestamp: Utc.with_ymd_and_hms(2015, 8, 26, 8, minute, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_matches_within_tolerance() {
        let expected = vec![row("indicator", "WMA_1_DAX", 41, dec!(9975.133333))];
        let actual = vec![
            row("indicator", "WMA_1_DAX", 41, dec!(9975.1333331)),
            row("indicator", "WMA_1_DAX", 42, dec!(9976)),
            row("trade", "MacD_1_3_DAX", 41, dec!(1)),
        ];

        let summary = Validator::new(expected, dec!(0.000001)).check(&actual).unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unexpected, 1);
    }

    #[test]
    fn test_mismatch_reports_values() {
        let expected = vec![row("indicator", "WMA_1_DAX", 41, dec!(9975.133333))];
        let actual = vec![row("indicator", "WMA_1_DAX", 41, dec!(9975.356666))];

        let err = Validator::new(expected, dec!(0.000001)).check(&actual).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Test failed: indicator WMA_1_DAX time 08:41 expected value 9975.133333 != 9975.356666"
        );
    }

    #[test]
    fn test_missing_value() {
        let expected = vec![row("signal", "MacD_1_3_DAX", 5, dec!(101))];
        let err = Validator::new(expected, Decimal::ZERO).check(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::Missing { .. }));
    }

    #[test]
    fn test_trades_only_when_requested() {
        let expected = vec![row("trade", "MacD_1_3_DAX", 5, dec!(101))];
        assert!(Validator::new(expected.clone(), Decimal::ZERO).check(&[]).is_ok());
        assert!(Validator::new(expected, Decimal::ZERO)
            .with_kinds(["trade"])
            .check(&[])
            .is_err());
    }
}
