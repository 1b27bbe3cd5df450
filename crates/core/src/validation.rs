//! Field-level validation accumulator.

use crate::error::{DomainError, DomainResult};

/// Collects every failing field of a form before reporting, so a caller sees
/// all problems at once instead of fixing them one round trip at a time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<(&'static str, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push((field, message.into()));
    }

    /// Record an error when `value` is blank after trimming.
    pub fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.iter().map(|(f, _)| *f)
    }

    /// `Ok(())` when nothing failed, otherwise one `Validation` error listing
    /// each field in the order it was checked.
    pub fn into_result(self) -> DomainResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let msg = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field} {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(DomainError::validation(msg))
    }
}
