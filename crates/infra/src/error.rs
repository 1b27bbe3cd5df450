//! Application-level error model.
//!
//! Every ledger, coordinator and directory operation resolves to a success
//! value or one [`ServiceError`]. Each variant maps onto exactly one
//! [`ErrorKind`], which is what callers (and the HTTP layer) branch on.
//!
//! ## Layering
//!
//! ```text
//! DomainError (fleetrent-core)  ─┐
//!                                ├─> ServiceError ─> ErrorKind
//! StoreError  (record store)    ─┘
//! ```
//!
//! Store failures are never retried here. A `Timeout` means the call did not
//! answer in time; whether the store applied it is unknown.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use fleetrent_core::{DomainError, RentalId, VehicleId};

use crate::store::{RecordKind, StoreError};

/// The named failure kinds surfaced to callers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    OutOfStock,
    InvalidDateRange,
    Validation,
    Conflict,
    StoreUnavailable,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::OutOfStock => "out_of_stock",
            ErrorKind::InvalidDateRange => "invalid_date_range",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    #[error("vehicle {0} is out of stock")]
    OutOfStock(VehicleId),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// The record is still referenced by another record.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A step failed and undoing the reservation failed as well.
    ///
    /// The vehicle may now be short one unit.
    #[error("{original}; compensating release also failed: {compensation}")]
    CompensationFailed {
        original: Box<ServiceError>,
        compensation: Box<ServiceError>,
    },

    /// The rental record is gone but its unit was not given back.
    #[error("rental {rental_id} deleted but releasing vehicle {vehicle_id} failed: {source}")]
    ReleaseFailed {
        rental_id: RentalId,
        vehicle_id: VehicleId,
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    pub fn not_found(kind: RecordKind, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::OutOfStock(_) => ErrorKind::OutOfStock,
            ServiceError::InvalidDateRange(_) => ErrorKind::InvalidDateRange,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            ServiceError::Timeout { .. } => ErrorKind::Timeout,
            ServiceError::CompensationFailed { original, .. } => original.kind(),
            ServiceError::ReleaseFailed { source, .. } => source.kind(),
        }
    }

    /// Whether this error says the record (or one it references) is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            StoreError::OutOfStock(id) => ServiceError::OutOfStock(id),
            StoreError::ForeignKey(msg) => ServiceError::Conflict(msg),
            StoreError::Constraint(msg) => ServiceError::Validation(msg),
            StoreError::Decode(msg) | StoreError::Unavailable(msg) => {
                ServiceError::StoreUnavailable(msg)
            }
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidDateRange(msg) => ServiceError::InvalidDateRange(msg),
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => ServiceError::Validation(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_fold_into_named_kinds() {
        let id = VehicleId::new();
        let cases = [
            (StoreError::not_found(RecordKind::Vehicle, id), ErrorKind::NotFound),
            (StoreError::OutOfStock(id), ErrorKind::OutOfStock),
            (StoreError::ForeignKey("x".into()), ErrorKind::Conflict),
            (StoreError::Constraint("x".into()), ErrorKind::Validation),
            (StoreError::Decode("x".into()), ErrorKind::StoreUnavailable),
            (StoreError::Unavailable("x".into()), ErrorKind::StoreUnavailable),
        ];
        for (store_err, kind) in cases {
            assert_eq!(ServiceError::from(store_err).kind(), kind);
        }
    }

    #[test]
    fn domain_date_range_stays_distinct_from_validation() {
        let err = ServiceError::from(DomainError::invalid_date_range("end before start"));
        assert_eq!(err.kind(), ErrorKind::InvalidDateRange);

        let err = ServiceError::from(DomainError::validation("make is required"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn compensation_failure_reports_both_and_keeps_original_kind() {
        let err = ServiceError::CompensationFailed {
            original: Box::new(ServiceError::StoreUnavailable("insert failed".into())),
            compensation: Box::new(ServiceError::Timeout {
                operation: "release",
                after: Duration::from_millis(10),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        let text = err.to_string();
        assert!(text.contains("insert failed"));
        assert!(text.contains("release timed out"));
    }

    #[test]
    fn release_failure_names_both_ids() {
        let rental_id = RentalId::new();
        let vehicle_id = VehicleId::new();
        let err = ServiceError::ReleaseFailed {
            rental_id,
            vehicle_id,
            source: Box::new(ServiceError::StoreUnavailable("down".into())),
        };
        let text = err.to_string();
        assert!(text.contains(&rental_id.to_string()));
        assert!(text.contains(&vehicle_id.to_string()));
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
