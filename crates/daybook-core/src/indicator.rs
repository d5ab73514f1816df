use chrono::NaiveDate;

use crate::datetime::month_days;
use crate::store::ActivityStore;

/// Per-date decoration signal for calendar cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// At least one activity on the date is not completed.
    Pending,
    Clear,
}

impl Indicator {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

/// Recomputed from the store on every call; nothing is cached.
pub fn indicator_for(date: NaiveDate, store: &ActivityStore) -> Indicator {
    if store.count_incomplete(date) > 0 {
        Indicator::Pending
    } else {
        Indicator::Clear
    }
}

/// Indicators for every day of a month, in day order.
pub fn month_indicators(
    year: i32,
    month: u32,
    store: &ActivityStore,
) -> anyhow::Result<Vec<(NaiveDate, Indicator)>> {
    Ok(month_days(year, month)?
        .into_iter()
        .map(|date| (date, indicator_for(date, store)))
        .collect())
}
