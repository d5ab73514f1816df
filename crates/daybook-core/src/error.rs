use thiserror::Error;

/// Rejection raised while turning raw input into an [`Activity`](crate::activity::Activity).
///
/// Validation happens before anything reaches the store, so returning one of
/// these always means the store was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("activity date is required")]
    MissingDate,

    #[error("activity name is required")]
    MissingName,

    #[error("activity time is required")]
    MissingTime,

    #[error("invalid time `{input}`: use HH:mm format, e.g. 15:30")]
    InvalidTimeFormat { input: String },
}

impl ValidationError {
    /// Input field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingDate => "date",
            Self::MissingName => "name",
            Self::MissingTime | Self::InvalidTimeFormat { .. } => "time",
        }
    }

    /// True for the "field left blank" family, as opposed to a malformed value.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::MissingDate | Self::MissingName | Self::MissingTime
        )
    }
}
