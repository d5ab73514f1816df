use chrono::NaiveDate;
use tracing::{debug, info};

use crate::activity::{Activity, ActivityId};

/// Which calendar dates a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affected {
    Date(NaiveDate),
    AllDates,
}

impl Affected {
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self {
            Self::Date(affected) => *affected == date,
            Self::AllDates => true,
        }
    }
}

/// Notification returned by every store mutation so the caller can decide
/// what to redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added { id: ActivityId, date: NaiveDate },
    Completed { id: ActivityId, date: NaiveDate },
    Removed { activity: Activity },
    Cleared { count: usize },
}

impl Change {
    pub fn affected(&self) -> Affected {
        match self {
            Self::Added { date, .. } | Self::Completed { date, .. } => Affected::Date(*date),
            Self::Removed { activity } => Affected::Date(activity.date()),
            Self::Cleared { .. } => Affected::AllDates,
        }
    }
}

/// In-memory, insertion-ordered owner of every activity in a session.
///
/// Duplicates are allowed; records are told apart by their id.
#[derive(Debug, Default)]
pub struct ActivityStore {
    activities: Vec<Activity>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    pub fn get(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id() == id)
    }

    /// Appends an already validated activity and hands back the stored copy.
    #[tracing::instrument(skip(self, activity), fields(id = %activity.id(), date = %activity.date()))]
    pub fn add(&mut self, activity: Activity) -> (&Activity, Change) {
        let change = Change::Added {
            id: activity.id(),
            date: activity.date(),
        };
        self.activities.push(activity);
        debug!(count = self.activities.len(), "activity added");

        let stored = &self.activities[self.activities.len() - 1];
        (stored, change)
    }

    /// Removes the activity with `id`. `None` means it was not here and
    /// nothing changed.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: ActivityId) -> Option<Change> {
        let Some(idx) = self.activities.iter().position(|a| a.id() == id) else {
            debug!("remove skipped; activity not in store");
            return None;
        };
        let activity = self.activities.remove(idx);
        debug!(count = self.activities.len(), "activity removed");
        Some(Change::Removed { activity })
    }

    /// Completes the activity with `id`. Completing an already completed
    /// activity still reports the change; an unknown id is a no-op.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn mark_completed(&mut self, id: ActivityId) -> Option<Change> {
        let Some(activity) = self.activities.iter_mut().find(|a| a.id() == id) else {
            debug!("mark_completed skipped; activity not in store");
            return None;
        };
        activity.complete();
        debug!(date = %activity.date(), "activity completed");
        Some(Change::Completed {
            id,
            date: activity.date(),
        })
    }

    /// Activities scheduled on exactly `date`, in insertion order.
    pub fn query_by_date(&self, date: NaiveDate) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.date() == date)
            .collect()
    }

    pub fn count_incomplete(&self, date: NaiveDate) -> usize {
        self.activities
            .iter()
            .filter(|a| a.date() == date && !a.is_completed())
            .count()
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&mut self) -> Change {
        let count = self.activities.len();
        self.activities.clear();
        info!(count, "cleared all activities");
        Change::Cleared { count }
    }
}
