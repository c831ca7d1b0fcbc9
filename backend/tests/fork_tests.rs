//! Fork engine tests
//!
//! Tests for splitting rejected and altered pieces off a card including:
//! - Provenance recorded on the fork record and the created card
//! - Scrapping without creating a card
//! - Forks from inactive cards and invalid destinations

mod common;

use common::Fixture;
use proptest::prelude::*;
use shared::ledger::{advance, fork, scrap_rejection, AdvanceRequest, ForkRequest};
use shared::{CardStage, CardTag, ForkDestination, ForkKind, HistoryEvent, LedgerError};

fn request(
    source: uuid::Uuid,
    quantity: i32,
    kind: ForkKind,
    destination: ForkDestination,
) -> ForkRequest {
    ForkRequest {
        source_card_id: source,
        quantity,
        kind,
        destination,
        reason: "Broken stitch".to_string(),
        worker_log_id: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_rejection_creates_tagged_card() {
        let mut fx = Fixture::planned(80).await;
        let root = fx.root_card;
        let to_stitching = request(
            root,
            12,
            ForkKind::Rejected,
            ForkDestination::Department(fx.stitching),
        );

        let mut tx = fx.store.begin();
        let outcome = fork(&mut tx, to_stitching).await.unwrap();
        tx.commit();

        let created = outcome.created_card.expect("card created");
        assert_eq!(created.department_id, fx.stitching);
        assert_eq!(created.quantity_received, 12);
        assert_eq!(created.stage, CardStage::NewArrival);
        assert_eq!(created.sent_from_department, Some(fx.cutting));
        assert_eq!(created.reject_reason(), Some("Broken stitch"));
        assert_ne!(created.lineage_id, outcome.source.lineage_id);

        assert_eq!(outcome.record.source_department_sub_batch_id, root);
        assert_eq!(outcome.record.created_department_sub_batch_id, Some(created.id));
        assert_eq!(outcome.record.destination_department_id, Some(fx.stitching));
        assert_eq!(outcome.record.sub_batch_id, fx.sub_batch_id);

        let source = fx.card(root);
        assert!(source.is_current);
        assert_eq!(source.quantity_remaining, 68);
        assert_eq!(source.quantity_forked, 12);

        let snapshot = fx.store.snapshot();
        assert_eq!(snapshot.index().current(created.lineage_id), Some(created.id));
        assert_eq!(snapshot.index().current(source.lineage_id), Some(root));
        let history = snapshot.history_of(created.id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event, HistoryEvent::Forked);
    }

    #[tokio::test]
    async fn test_alteration_uses_alter_reason() {
        let mut fx = Fixture::planned(30).await;
        let alter = request(
            fx.root_card,
            3,
            ForkKind::Altered,
            ForkDestination::Department(fx.finishing),
        );

        let mut tx = fx.store.begin();
        let outcome = fork(&mut tx, alter).await.unwrap();
        let created = outcome.created_card.unwrap();

        assert_eq!(created.alter_reason(), Some("Broken stitch"));
        assert_eq!(created.reject_reason(), None);
        assert!(created.tag.is_rework());
        assert_eq!(created.tag.label(), "Altered");
    }

    #[tokio::test]
    async fn test_scrap_creates_no_card() {
        let mut fx = Fixture::planned(30).await;
        let root = fx.root_card;

        let mut tx = fx.store.begin();
        let outcome = scrap_rejection(&mut tx, root, 7, "Torn fabric".to_string())
            .await
            .unwrap();
        tx.commit();

        assert!(outcome.created_card.is_none());
        assert_eq!(outcome.record.kind, ForkKind::Rejected);
        assert_eq!(outcome.record.created_department_sub_batch_id, None);
        assert_eq!(outcome.record.destination_department_id, None);
        assert_eq!(outcome.record.worker_log_id, None);

        let snapshot = fx.store.snapshot();
        assert_eq!(snapshot.card_count(), 1);
        assert!(snapshot
            .history_of(root)
            .iter()
            .any(|h| h.event == HistoryEvent::Scrapped));
        assert_eq!(fx.card(root).quantity_forked, 7);
    }

    #[tokio::test]
    async fn test_altered_to_scrap_is_invalid() {
        let mut fx = Fixture::planned(30).await;
        let scrap = request(fx.root_card, 3, ForkKind::Altered, ForkDestination::Scrap);

        let mut tx = fx.store.begin();
        let err = fork(&mut tx, scrap).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidInput {
                field: "destination",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fork_from_advanced_card_fails() {
        let mut fx = Fixture::planned(30).await;
        let root = fx.root_card;
        let late = request(root, 1, ForkKind::Rejected, ForkDestination::Scrap);

        let mut tx = fx.store.begin();
        advance(
            &mut tx,
            AdvanceRequest {
                card_id: root,
                target_department_id: None,
                quantity: 30,
            },
        )
        .await
        .unwrap();

        let err = fork(&mut tx, late).await.unwrap_err();
        assert_eq!(err, LedgerError::CardNotActive { card_id: root });
    }

    #[tokio::test]
    async fn test_fork_to_unknown_department_fails() {
        let mut fx = Fixture::planned(30).await;
        let nowhere = request(
            fx.root_card,
            3,
            ForkKind::Rejected,
            ForkDestination::Department(uuid::Uuid::new_v4()),
        );

        let mut tx = fx.store.begin();
        let err = fork(&mut tx, nowhere).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::EntityNotFound {
                entity: "Department",
                ..
            }
        ));
        drop(tx);

        assert_eq!(fx.card(fx.root_card).quantity_remaining, 30);
    }

    #[tokio::test]
    async fn test_fork_needs_reason_and_positive_quantity() {
        let mut fx = Fixture::planned(30).await;
        let mut blank = request(fx.root_card, 3, ForkKind::Rejected, ForkDestination::Scrap);
        blank.reason = "   ".to_string();
        let zero = request(fx.root_card, 0, ForkKind::Rejected, ForkDestination::Scrap);

        let mut tx = fx.store.begin();
        let err = fork(&mut tx, blank).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { field: "reason", .. }));
        let err = fork(&mut tx, zero).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { field: "quantity", .. }));
    }

    #[tokio::test]
    async fn test_rework_tag_survives_assignment() {
        let mut fx = Fixture::planned(30).await;
        let reject = request(
            fx.root_card,
            5,
            ForkKind::Rejected,
            ForkDestination::Department(fx.stitching),
        );

        let mut tx = fx.store.begin();
        let created = fork(&mut tx, reject).await.unwrap().created_card.unwrap();
        assert_ne!(created.tag, CardTag::Main);
        // Assigning work never clears a rework tag
        assert_eq!(created.tag.on_assignment(), created.tag);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The source shrinks by exactly what the created card received
        #[test]
        fn prop_fork_moves_exact_quantity(
            pieces in 1i32..1000,
            quantity in 1i32..1000,
            scrap in any::<bool>(),
        ) {
            tokio_test::block_on(async {
                let mut fx = Fixture::planned(pieces).await;
                let destination = if scrap {
                    ForkDestination::Scrap
                } else {
                    ForkDestination::Department(fx.stitching)
                };
                let split = request(fx.root_card, quantity, ForkKind::Rejected, destination);

                let mut tx = fx.store.begin();
                let result = fork(&mut tx, split).await;
                if quantity > pieces {
                    prop_assert!(
                        matches!(result, Err(LedgerError::InsufficientQuantity { .. })),
                        "over-fork must fail"
                    );
                    return Ok(());
                }

                let outcome = result.unwrap();
                prop_assert_eq!(outcome.source.quantity_remaining, pieces - quantity);
                prop_assert_eq!(outcome.source.quantity_forked, quantity);
                prop_assert_eq!(
                    outcome.created_card.map(|c| c.quantity_received),
                    (!scrap).then_some(quantity)
                );
                Ok(())
            })?;
        }
    }
}
