//! Rental date range value object.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fleetrent_core::{DomainError, DomainResult, ValueObject};

/// Inclusive `[start, end]` date range with `end >= start`.
///
/// The invariant holds for every value of this type, including ones built by
/// deserialization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct RentalPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawPeriod> for RentalPeriod {
    type Error = DomainError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        RentalPeriod::new(raw.start, raw.end)
    }
}

impl ValueObject for RentalPeriod {}

/// Where a rental sits relative to a given day.
///
/// Rentals have no stored status; the phase is derived from the dates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalPhase {
    Upcoming,
    Ongoing,
    Ended,
}

impl RentalPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::invalid_date_range(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn phase(&self, today: NaiveDate) -> RentalPhase {
        if today < self.start {
            RentalPhase::Upcoming
        } else if today > self.end {
            RentalPhase::Ended
        } else {
            RentalPhase::Ongoing
        }
    }

    /// Replace either bound, re-checking the invariant on the result.
    pub fn with_bounds(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DomainResult<Self> {
        Self::new(start.unwrap_or(self.start), end.unwrap_or(self.end))
    }
}
