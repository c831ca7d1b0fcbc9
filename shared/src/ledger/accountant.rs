//! Quantity accountant
//!
//! The only code allowed to change a card's quantity columns. Every function
//! validates the candidate values first and only then writes them, so a
//! failed call leaves the card untouched. None of these open a transaction;
//! they run inside whatever transaction the caller holds.

use chrono::Utc;

use super::error::{LedgerError, LedgerResult};
use crate::models::ProductionCard;
use crate::validation::validate_non_negative_quantity;

/// Move `quantity` from remaining to assigned
pub fn reserve(card: &mut ProductionCard, quantity: i32) -> LedgerResult<()> {
    ensure_active(card)?;
    ensure_quantity(quantity)?;

    if quantity > card.quantity_remaining {
        return Err(LedgerError::InsufficientQuantity {
            card_id: Some(card.id),
            requested: quantity,
            available: card.quantity_remaining,
        });
    }

    apply(
        card,
        card.quantity_assigned + quantity,
        card.quantity_remaining - quantity,
        card.quantity_forked,
    )
}

/// Give `quantity` back from assigned to remaining.
///
/// Assigned is clamped at zero; releasing more than was ever assigned trips
/// the conservation check.
pub fn release(card: &mut ProductionCard, quantity: i32) -> LedgerResult<()> {
    ensure_active(card)?;
    ensure_quantity(quantity)?;

    apply(
        card,
        (card.quantity_assigned - quantity).max(0),
        card.quantity_remaining + quantity,
        card.quantity_forked,
    )
}

/// Take `quantity` out of remaining for a fork
pub fn decrement_remaining(card: &mut ProductionCard, quantity: i32) -> LedgerResult<()> {
    ensure_active(card)?;
    ensure_quantity(quantity)?;

    if quantity > card.quantity_remaining {
        return Err(LedgerError::InsufficientQuantity {
            card_id: Some(card.id),
            requested: quantity,
            available: card.quantity_remaining,
        });
    }

    apply(
        card,
        card.quantity_assigned,
        card.quantity_remaining - quantity,
        card.quantity_forked + quantity,
    )
}

/// Return forked pieces to the exact card they were taken from.
///
/// Used by worker-log undo. The source card may have been advanced in the
/// meantime, so this does not require it to be current.
pub fn restore_forked(card: &mut ProductionCard, quantity: i32) -> LedgerResult<()> {
    ensure_quantity(quantity)?;

    if quantity > card.quantity_forked {
        return Err(LedgerError::ConservationViolation {
            card_id: card.id,
            detail: format!(
                "restoring {} pieces but only {} were forked out",
                quantity, card.quantity_forked
            ),
        });
    }

    apply(
        card,
        card.quantity_assigned,
        card.quantity_remaining + quantity,
        card.quantity_forked - quantity,
    )
}

/// Zero the working balance of a card that is being advanced
pub fn drain(card: &mut ProductionCard) -> LedgerResult<i32> {
    ensure_active(card)?;
    let drained = card.quantity_remaining;
    apply(card, card.quantity_assigned, 0, card.quantity_forked)?;
    Ok(drained)
}

/// Check the conservation invariant on a card as it stands
pub fn check_conservation(card: &ProductionCard) -> LedgerResult<()> {
    check_values(
        card,
        card.quantity_assigned,
        card.quantity_remaining,
        card.quantity_forked,
    )
}

/// Whether every received piece is accounted for exactly
pub fn is_balanced(card: &ProductionCard) -> bool {
    card.accounted_quantity() == card.quantity_received
}

pub fn ensure_active(card: &ProductionCard) -> LedgerResult<()> {
    if !card.is_current {
        return Err(LedgerError::CardNotActive { card_id: card.id });
    }
    Ok(())
}

fn ensure_quantity(quantity: i32) -> LedgerResult<()> {
    validate_non_negative_quantity(quantity).map_err(|m| LedgerError::invalid("quantity", m))
}

fn apply(
    card: &mut ProductionCard,
    assigned: i32,
    remaining: i32,
    forked: i32,
) -> LedgerResult<()> {
    check_values(card, assigned, remaining, forked)?;
    card.quantity_assigned = assigned;
    card.quantity_remaining = remaining;
    card.quantity_forked = forked;
    card.updated_at = Utc::now();
    Ok(())
}

fn check_values(
    card: &ProductionCard,
    assigned: i32,
    remaining: i32,
    forked: i32,
) -> LedgerResult<()> {
    if assigned < 0 || remaining < 0 || forked < 0 {
        return Err(LedgerError::ConservationViolation {
            card_id: card.id,
            detail: format!(
                "negative quantity (assigned {}, remaining {}, forked {})",
                assigned, remaining, forked
            ),
        });
    }

    let accounted = assigned as i64 + remaining as i64 + forked as i64;
    if accounted > card.quantity_received as i64 {
        return Err(LedgerError::ConservationViolation {
            card_id: card.id,
            detail: format!(
                "{} pieces accounted for but only {} received",
                accounted, card.quantity_received
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn card(quantity: i32) -> ProductionCard {
        ProductionCard::new_root(Uuid::new_v4(), Uuid::new_v4(), quantity)
    }

    #[test]
    fn test_reserve_moves_remaining_to_assigned() {
        let mut c = card(100);
        reserve(&mut c, 40).unwrap();
        assert_eq!(c.quantity_remaining, 60);
        assert_eq!(c.quantity_assigned, 40);
        assert!(is_balanced(&c));
    }

    #[test]
    fn test_reserve_over_remaining_fails_without_mutation() {
        let mut c = card(10);
        let before = c.clone();
        let err = reserve(&mut c, 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientQuantity {
                card_id: Some(c.id),
                requested: 11,
                available: 10
            }
        );
        assert_eq!(c, before);
    }

    #[test]
    fn test_operations_require_current_card() {
        let mut c = card(10);
        c.is_current = false;
        assert!(matches!(reserve(&mut c, 1), Err(LedgerError::CardNotActive { .. })));
        assert!(matches!(release(&mut c, 1), Err(LedgerError::CardNotActive { .. })));
        assert!(matches!(
            decrement_remaining(&mut c, 1),
            Err(LedgerError::CardNotActive { .. })
        ));
    }

    #[test]
    fn test_release_clamps_assigned() {
        let mut c = card(50);
        reserve(&mut c, 20).unwrap();
        release(&mut c, 20).unwrap();
        assert_eq!(c.quantity_assigned, 0);
        assert_eq!(c.quantity_remaining, 50);
    }

    #[test]
    fn test_release_beyond_assigned_is_a_violation() {
        let mut c = card(50);
        reserve(&mut c, 10).unwrap();
        let err = release(&mut c, 30).unwrap_err();
        assert!(matches!(err, LedgerError::ConservationViolation { .. }));
        assert_eq!(c.quantity_assigned, 10);
        assert_eq!(c.quantity_remaining, 40);
    }

    #[test]
    fn test_decrement_tracks_forked() {
        let mut c = card(100);
        reserve(&mut c, 40).unwrap();
        decrement_remaining(&mut c, 10).unwrap();
        assert_eq!(c.quantity_remaining, 50);
        assert_eq!(c.quantity_assigned, 40);
        assert_eq!(c.quantity_forked, 10);
        assert!(is_balanced(&c));
    }

    #[test]
    fn test_restore_forked_works_on_inactive_card() {
        let mut c = card(30);
        decrement_remaining(&mut c, 5).unwrap();
        c.is_current = false;
        restore_forked(&mut c, 5).unwrap();
        assert_eq!(c.quantity_remaining, 30);
        assert_eq!(c.quantity_forked, 0);
    }

    #[test]
    fn test_restore_more_than_forked_fails() {
        let mut c = card(30);
        decrement_remaining(&mut c, 5).unwrap();
        assert!(restore_forked(&mut c, 6).is_err());
        assert_eq!(c.quantity_forked, 5);
    }

    #[test]
    fn test_negative_quantities_are_rejected() {
        let mut c = card(30);
        assert!(matches!(reserve(&mut c, -1), Err(LedgerError::InvalidInput { .. })));
        assert!(matches!(release(&mut c, -1), Err(LedgerError::InvalidInput { .. })));
    }

    #[test]
    fn test_drain_zeroes_remaining() {
        let mut c = card(30);
        reserve(&mut c, 12).unwrap();
        assert_eq!(drain(&mut c).unwrap(), 18);
        assert_eq!(c.quantity_remaining, 0);
        assert_eq!(c.quantity_assigned, 12);
        assert!(check_conservation(&c).is_ok());
    }
}
