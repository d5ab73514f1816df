use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::datetime::{hhmm_serde, parse_time_of_day};
use crate::error::ValidationError;

pub type ActivityId = Uuid;

/// What sort of activity a record is; each kind owns its completion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActivityKind {
    /// Happens once, at a time-of-day on the record's date.
    Timed {
        #[serde(with = "hhmm_serde")]
        time: NaiveTime,
    },
}

/// One scheduled activity.
///
/// `date`, `name` and the kind are fixed at construction; only the
/// completion flag moves, and only from pending to completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    id: ActivityId,
    date: NaiveDate,
    name: String,
    #[serde(flatten)]
    kind: ActivityKind,
    completed: bool,
}

impl Activity {
    /// Validates raw front-end input and builds a pending timed activity.
    ///
    /// Checks run in field order (date, name, time) and the first failure
    /// is returned. The name is kept exactly as typed once it is known to
    /// contain something besides whitespace.
    pub fn create(
        date: Option<NaiveDate>,
        name: &str,
        time: &str,
    ) -> Result<Self, ValidationError> {
        let date = date.ok_or(ValidationError::MissingDate)?;
        if name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        let time = parse_time_of_day(time)?;

        Ok(Self {
            id: Uuid::new_v4(),
            date,
            name: name.to_string(),
            kind: ActivityKind::Timed { time },
            completed: false,
        })
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn time(&self) -> NaiveTime {
        match self.kind {
            ActivityKind::Timed { time } => time,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Marks the activity done. Calling it again changes nothing.
    pub fn complete(&mut self) {
        match self.kind {
            ActivityKind::Timed { .. } => self.completed = true,
        }
    }

    /// Single-line label used by list views, e.g. `09:00 Meeting [done]`.
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}", self.time().format("%H:%M"), self.name);
        if self.completed {
            out.push_str(" [done]");
        }
        out
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Activity, ActivityKind};
    use crate::error::ValidationError;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date")
    }

    #[test]
    fn create_starts_pending_and_keeps_name_verbatim() {
        let activity = Activity::create(Some(may_first()), " Meeting ", "09:00")
            .expect("valid activity");
        assert!(!activity.is_completed());
        assert_eq!(activity.name(), " Meeting ");
        assert_eq!(activity.time().format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn create_reports_first_failing_field() {
        assert_eq!(
            Activity::create(None, "", "").unwrap_err(),
            ValidationError::MissingDate
        );
        assert_eq!(
            Activity::create(Some(may_first()), "   ", "bad").unwrap_err(),
            ValidationError::MissingName
        );
        assert_eq!(
            Activity::create(Some(may_first()), "Gym", "  ").unwrap_err(),
            ValidationError::MissingTime
        );
    }

    #[test]
    fn complete_is_idempotent() {
        let mut activity =
            Activity::create(Some(may_first()), "Gym", "18:30").expect("valid activity");
        activity.complete();
        let once = activity.clone();
        activity.complete();
        assert_eq!(activity, once);
        assert!(activity.is_completed());
    }

    #[test]
    fn describe_marks_completion() {
        let mut activity =
            Activity::create(Some(may_first()), "Meeting", "09:00").expect("valid activity");
        assert_eq!(activity.describe(), "09:00 Meeting");
        activity.complete();
        assert_eq!(activity.to_string(), "09:00 Meeting [done]");
    }

    #[test]
    fn serializes_time_as_hour_minute() {
        let activity =
            Activity::create(Some(may_first()), "Meeting", "09:00").expect("valid activity");
        assert!(matches!(
            activity.kind(),
            ActivityKind::Timed { time } if time.format("%H:%M").to_string() == "09:00"
        ));
        let json = serde_json::to_value(&activity).expect("serialize");
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["kind"], "timed");
        assert_eq!(json["time"], "09:00");
        assert_eq!(json["completed"], false);
    }
}
