use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Session;

/// View state for the schedule screen. Kept locally, never synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParams {
    /// First month shown, `YYYY-MM`.
    pub start_month: String,
    /// Last month shown, `YYYY-MM`.
    pub end_month: String,
    /// Person whose sessions are shown; empty means nobody selected.
    pub selected_person_id: String,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        let month = Utc::now().format("%Y-%m").to_string();
        Self {
            start_month: month.clone(),
            end_month: month,
            selected_person_id: String::new(),
        }
    }
}

/// Partial update for [`ScheduleParams`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParamsPatch {
    pub start_month: Option<String>,
    pub end_month: Option<String>,
    pub selected_person_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Month is not in `YYYY-MM` form.
    InvalidMonth(String),
    /// Start month falls after end month.
    InvertedRange { start: String, end: String },
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::InvalidMonth(m) => {
                write!(f, "Invalid month '{}'. Expected format: YYYY-MM", m)
            }
            ScheduleError::InvertedRange { start, end } => {
                write!(f, "Start month {} is after end month {}", start, end)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

fn parse_month(month: &str) -> Result<NaiveDate, ScheduleError> {
    if month.len() != 7 {
        return Err(ScheduleError::InvalidMonth(month.to_string()));
    }
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidMonth(month.to_string()))
}

impl ScheduleParams {
    /// Returns the params with `patch` applied, or an error if the result is invalid.
    pub fn apply(&self, patch: ScheduleParamsPatch) -> Result<Self, ScheduleError> {
        let next = Self {
            start_month: patch.start_month.unwrap_or_else(|| self.start_month.clone()),
            end_month: patch.end_month.unwrap_or_else(|| self.end_month.clone()),
            selected_person_id: patch
                .selected_person_id
                .unwrap_or_else(|| self.selected_person_id.clone()),
        };

        let start = parse_month(&next.start_month)?;
        let end = parse_month(&next.end_month)?;
        if start > end {
            return Err(ScheduleError::InvertedRange {
                start: next.start_month,
                end: next.end_month,
            });
        }

        Ok(next)
    }

    /// True when the session is dated inside the month range and, if a person
    /// is selected, involves that person.
    pub fn includes(&self, session: &Session) -> bool {
        let Some(date) = session.date else {
            return false;
        };
        let month = date.format("%Y-%m").to_string();
        if month < self.start_month || month > self.end_month {
            return false;
        }
        self.selected_person_id.is_empty() || session.involves(&self.selected_person_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: &str, end: &str, person: &str) -> ScheduleParams {
        ScheduleParams {
            start_month: start.into(),
            end_month: end.into(),
            selected_person_id: person.into(),
        }
    }

    #[test]
    fn test_default_is_current_month() {
        let params = ScheduleParams::default();
        assert_eq!(params.start_month, params.end_month);
        assert!(parse_month(&params.start_month).is_ok());
        assert!(params.selected_person_id.is_empty());
    }

    #[test]
    fn test_apply_partial_patch() {
        let current = params("2025-01", "2025-03", "");
        let next = current
            .apply(ScheduleParamsPatch {
                end_month: Some("2025-06".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(next.start_month, "2025-01");
        assert_eq!(next.end_month, "2025-06");
    }

    #[test]
    fn test_apply_rejects_bad_month() {
        let current = params("2025-01", "2025-03", "");
        let result = current.apply(ScheduleParamsPatch {
            start_month: Some("2025-13".into()),
            ..Default::default()
        });
        assert_eq!(result, Err(ScheduleError::InvalidMonth("2025-13".into())));

        let result = current.apply(ScheduleParamsPatch {
            start_month: Some("2025-1".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_rejects_inverted_range() {
        let current = params("2025-01", "2025-03", "");
        let result = current.apply(ScheduleParamsPatch {
            start_month: Some("2025-05".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(ScheduleError::InvertedRange { .. })));
    }

    #[test]
    fn test_includes_filters_by_month_and_person() {
        let march = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let session = Session::new("c1", 1.0)
            .with_date(march)
            .with_teachers(vec!["t1".into()]);
        let late = Session::new("c1", 1.0).with_date(july);
        let undated = Session::new("c1", 1.0);

        let all = params("2025-01", "2025-06", "");
        assert!(all.includes(&session));
        assert!(!all.includes(&late));
        assert!(!all.includes(&undated));

        assert!(params("2025-03", "2025-03", "t1").includes(&session));
        assert!(!params("2025-03", "2025-03", "t2").includes(&session));
    }
}
