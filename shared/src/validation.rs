//! Validation utilities for ledger inputs
//!
//! Each check returns a static message; the ledger wraps it in
//! `LedgerError::InvalidInput` together with the offending field.

use chrono::NaiveDate;
use uuid::Uuid;

/// Longest accepted rejection/alteration reason
pub const MAX_REASON_LENGTH: usize = 500;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a quantity that must move at least one piece
pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a quantity that may be zero
pub fn validate_non_negative_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Fork Validations
// ============================================================================

/// Validate the reason given for a rejection or alteration
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Reason is required");
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err("Reason is too long");
    }
    Ok(())
}

// ============================================================================
// Route & Sub-batch Validations
// ============================================================================

/// Validate an ordered department list for a route
pub fn validate_department_route(department_ids: &[Uuid]) -> Result<(), &'static str> {
    if department_ids.is_empty() {
        return Err("Route must contain at least one department");
    }
    if department_ids.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err("Route cannot visit the same department twice in a row");
    }
    Ok(())
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    if name.len() > 255 {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

/// Validate that a due date does not precede the start date
pub fn validate_schedule(
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
) -> Result<(), &'static str> {
    match (start_date, due_date) {
        (Some(start), Some(due)) if due < start => Err("Due date cannot be before start date"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(1).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_positive_quantity(-5).is_err());
    }

    #[test]
    fn test_non_negative_quantity() {
        assert!(validate_non_negative_quantity(0).is_ok());
        assert!(validate_non_negative_quantity(-1).is_err());
    }

    #[test]
    fn test_reason() {
        assert!(validate_reason("open seam").is_ok());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_department_route() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_department_route(&[a, b, a]).is_ok());
        assert!(validate_department_route(&[]).is_err());
        assert!(validate_department_route(&[a, a]).is_err());
    }

    #[test]
    fn test_schedule() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(validate_schedule(Some(start), Some(due)).is_ok());
        assert!(validate_schedule(Some(due), Some(start)).is_err());
        assert!(validate_schedule(None, Some(start)).is_ok());
    }
}
