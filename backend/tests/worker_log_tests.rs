//! Worker log tests
//!
//! Tests for the worker assignment tracker including:
//! - Assigning work against the department's current card
//! - Rejections and alterations reported with a log
//! - Undo restoring every card the log touched
//! - All-or-nothing behaviour when a fork fails

mod common;

use common::{fork_item, new_sub_batch, Fixture};
use proptest::prelude::*;
use shared::ledger::{
    accountant, advance, create_route, create_sub_batch, create_worker_log, delete_worker_log,
    fork, get_worker_log, update_worker_log, AdvanceRequest, ForkRequest, WorkerLogChanges,
};
use shared::{
    ActivityType, CardStage, CardTag, ForkDestination, ForkKind, LedgerError, LedgerStore,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_reject_then_undo() {
        let mut fx = Fixture::planned(100).await;
        let root = fx.root_card;

        let mut input = fx.log(40);
        input.rejected = vec![fork_item(root, 10, ForkDestination::Department(fx.stitching))];

        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();
        tx.commit();

        let card = fx.card(root);
        assert_eq!(card.quantity_assigned, 40);
        assert_eq!(card.quantity_remaining, 50);
        assert_eq!(card.quantity_forked, 10);
        assert_eq!(card.stage, CardStage::InProgress);

        assert_eq!(detail.rejected.len(), 1);
        let created_id = detail.rejected[0]
            .created_department_sub_batch_id
            .expect("rejection went to a department");
        let created = fx.card(created_id);
        assert_eq!(created.department_id, fx.stitching);
        assert_eq!(created.quantity_received, 10);
        assert_eq!(created.quantity_remaining, 10);

        let mut tx = fx.store.begin();
        delete_worker_log(&mut tx, detail.log.id).await.unwrap();
        tx.commit();

        let card = fx.card(root);
        assert_eq!(card.quantity_remaining, 100);
        assert_eq!(card.quantity_assigned, 0);
        assert_eq!(card.quantity_forked, 0);
        // Undo does not move the stage back
        assert_eq!(card.stage, CardStage::InProgress);

        let snapshot = fx.store.snapshot();
        assert!(snapshot.card(created_id).is_none());
        assert!(snapshot.fork_records().is_empty());
        assert!(snapshot.worker_log(detail.log.id).is_none());
    }

    #[tokio::test]
    async fn test_first_assignment_tags_card_and_moves_stage() {
        let mut fx = Fixture::planned(60).await;

        let input = fx.log(5);
        let mut tx = fx.store.begin();
        create_worker_log(&mut tx, input).await.unwrap();
        tx.commit();

        let card = fx.card(fx.root_card);
        assert_eq!(card.tag, CardTag::Assigned);
        assert_eq!(card.stage, CardStage::InProgress);

        let history = fx.store.snapshot().history_of(fx.root_card);
        let stage_rows = history
            .iter()
            .filter(|h| h.to_stage == CardStage::InProgress)
            .count();
        assert_eq!(stage_rows, 1);

        let input = fx.log(5);
        let mut tx = fx.store.begin();
        create_worker_log(&mut tx, input).await.unwrap();
        tx.commit();

        let history = fx.store.snapshot().history_of(fx.root_card);
        let stage_rows = history
            .iter()
            .filter(|h| h.to_stage == CardStage::InProgress)
            .count();
        assert_eq!(stage_rows, 1);
    }

    #[tokio::test]
    async fn test_over_assignment_is_refused() {
        let mut fx = Fixture::planned(30).await;

        let input = fx.log(31);
        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        drop(tx);

        assert_eq!(
            err,
            LedgerError::InsufficientQuantity {
                card_id: None,
                requested: 31,
                available: 30,
            }
        );
        assert_eq!(fx.card(fx.root_card).quantity_remaining, 30);
    }

    #[tokio::test]
    async fn test_failed_fork_rolls_back_whole_log() {
        let mut fx = Fixture::planned(50).await;
        let root = fx.root_card;

        let mut input = fx.log(20);
        input.rejected = vec![fork_item(root, 5, ForkDestination::Department(fx.stitching))];
        // Only 25 left after the work and the first rejection
        input.altered = vec![fork_item(root, 26, ForkDestination::Department(fx.finishing))];

        let before = fx.card(root);
        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        drop(tx);

        assert!(matches!(err, LedgerError::InsufficientQuantity { .. }));
        assert_eq!(fx.card(root), before);
        assert!(fx.store.snapshot().fork_records().is_empty());
        assert_eq!(fx.store.snapshot().card_count(), 1);
    }

    #[tokio::test]
    async fn test_altered_pieces_cannot_be_scrapped() {
        let mut fx = Fixture::planned(50).await;

        let mut input = fx.log(10);
        input.altered = vec![fork_item(fx.root_card, 5, ForkDestination::Scrap)];

        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidInput {
                field: "destination",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_log_requires_sub_batch_in_production() {
        let mut fx = Fixture::planned(50).await;

        let input = fx.log(10);
        let mut tx = fx.store.begin();
        shared::ledger::complete_sub_batch(&mut tx, fx.sub_batch_id)
            .await
            .unwrap();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn test_empty_log_is_invalid() {
        let mut fx = Fixture::planned(50).await;

        let input = fx.log(0);
        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_unknown_worker_is_not_found() {
        let mut fx = Fixture::planned(50).await;
        let mut input = fx.log(10);
        input.worker_id = uuid::Uuid::new_v4();

        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::EntityNotFound {
                entity: "Worker",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_activity_type_follows_forks() {
        let mut fx = Fixture::planned(50).await;
        let root = fx.root_card;

        let mut rejected = fx.log(5);
        rejected.rejected = vec![fork_item(root, 2, ForkDestination::Scrap)];
        let mut altered = fx.log(5);
        altered.altered = vec![fork_item(root, 2, ForkDestination::Department(fx.stitching))];

        let plain = fx.log(5);
        let mut tx = fx.store.begin();
        let plain = create_worker_log(&mut tx, plain).await.unwrap();
        let rejected = create_worker_log(&mut tx, rejected).await.unwrap();
        let altered = create_worker_log(&mut tx, altered).await.unwrap();

        assert_eq!(plain.log.activity_type, ActivityType::Normal);
        assert_eq!(rejected.log.activity_type, ActivityType::Rejected);
        assert_eq!(altered.log.activity_type, ActivityType::Altered);
    }

    #[tokio::test]
    async fn test_undo_scrap_restores_source() {
        let mut fx = Fixture::planned(40).await;
        let root = fx.root_card;

        let mut input = fx.log(10);
        input.rejected = vec![fork_item(root, 4, ForkDestination::Scrap)];

        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();
        assert_eq!(detail.rejected[0].created_department_sub_batch_id, None);
        delete_worker_log(&mut tx, detail.log.id).await.unwrap();
        tx.commit();

        let card = fx.card(root);
        assert_eq!(card.quantity_remaining, 40);
        assert_eq!(card.quantity_forked, 0);
    }

    #[tokio::test]
    async fn test_undo_refused_once_forked_card_is_worked() {
        let mut fx = Fixture::planned(40).await;
        let root = fx.root_card;

        let mut input = fx.log(10);
        input.rejected = vec![fork_item(root, 5, ForkDestination::Department(fx.stitching))];

        let rework = fx.log_in(fx.stitching, 2);
        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();
        create_worker_log(&mut tx, rework).await.unwrap();
        tx.commit();

        let created_id = detail.rejected[0].created_department_sub_batch_id.unwrap();
        let mut tx = fx.store.begin();
        let err = delete_worker_log(&mut tx, detail.log.id).await.unwrap_err();
        assert_eq!(err, LedgerError::ForkInUse { card_id: created_id });
        drop(tx);

        assert!(fx.store.snapshot().worker_log(detail.log.id).is_some());
    }

    #[tokio::test]
    async fn test_fork_from_another_sub_batch_is_refused() {
        let mut fx = Fixture::planned(50).await;
        let departments = [fx.cutting, fx.stitching];

        let mut tx = fx.store.begin();
        let other = create_sub_batch(&mut tx, new_sub_batch(Some(fx.batch_id), 50))
            .await
            .unwrap();
        let other_root = create_route(&mut tx, other.id, &departments)
            .await
            .unwrap()
            .first_card
            .id;
        tx.commit();

        let mut input = fx.log(10);
        input.rejected = vec![fork_item(other_root, 20, ForkDestination::Scrap)];

        let mut tx = fx.store.begin();
        let err = create_worker_log(&mut tx, input).await.unwrap_err();
        drop(tx);

        assert!(matches!(
            err,
            LedgerError::InvalidInput {
                field: "source_department_sub_batch_id",
                ..
            }
        ));
        assert_eq!(fx.card(other_root).quantity_remaining, 50);
        assert_eq!(fx.card(fx.root_card).quantity_remaining, 50);
        assert!(fx.store.snapshot().fork_records().is_empty());
    }

    #[tokio::test]
    async fn test_undo_continues_when_fork_source_is_gone() {
        let mut fx = Fixture::planned(20).await;
        let root = fx.root_card;

        let mut first = fx.log(5);
        first.rejected = vec![fork_item(root, 5, ForkDestination::Department(fx.stitching))];
        let mut tx = fx.store.begin();
        let first = create_worker_log(&mut tx, first).await.unwrap();
        tx.commit();
        let rework_card = first.rejected[0].created_department_sub_batch_id.unwrap();

        // Logged in cutting, scrapping pieces from the rework card in stitching
        let mut second = fx.log(1);
        second.rejected = vec![fork_item(rework_card, 2, ForkDestination::Scrap)];
        let mut tx = fx.store.begin();
        let second = create_worker_log(&mut tx, second).await.unwrap();
        tx.commit();
        assert_eq!(fx.card(root).quantity_remaining, 9);

        let mut tx = fx.store.begin();
        tx.delete_card(rework_card).await.unwrap();
        delete_worker_log(&mut tx, second.log.id).await.unwrap();
        tx.commit();

        let snapshot = fx.store.snapshot();
        assert!(snapshot.worker_log(second.log.id).is_none());
        assert_eq!(snapshot.fork_records().len(), 1);
        assert_eq!(snapshot.fork_records()[0].worker_log_id, Some(first.log.id));
        assert_eq!(fx.card(root).quantity_remaining, 10);
    }

    #[tokio::test]
    async fn test_undo_restores_into_advanced_source() {
        let mut fx = Fixture::planned(20).await;
        let root = fx.root_card;

        let to_stitching = ForkRequest {
            source_card_id: root,
            quantity: 2,
            kind: ForkKind::Rejected,
            destination: ForkDestination::Department(fx.stitching),
            reason: "Misaligned pocket".to_string(),
            worker_log_id: None,
        };
        let mut tx = fx.store.begin();
        fork(&mut tx, to_stitching).await.unwrap();
        tx.commit();

        // Logged on the stitching card, scrapping pieces from the cutting card
        let mut input = fx.log_in(fx.stitching, 1);
        input.rejected = vec![fork_item(root, 10, ForkDestination::Scrap)];
        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();
        advance(
            &mut tx,
            AdvanceRequest {
                card_id: root,
                target_department_id: None,
                quantity: 8,
            },
        )
        .await
        .unwrap();
        tx.commit();

        let source = fx.card(root);
        assert!(!source.is_current);
        assert_eq!(source.quantity_remaining, 0);
        assert_eq!(source.quantity_forked, 12);

        let mut tx = fx.store.begin();
        delete_worker_log(&mut tx, detail.log.id).await.unwrap();
        tx.commit();

        let source = fx.card(root);
        assert!(!source.is_current);
        assert_eq!(source.quantity_remaining, 10);
        assert_eq!(source.quantity_forked, 2);
        assert!(accountant::check_conservation(&source).is_ok());
    }

    #[tokio::test]
    async fn test_update_applies_delta() {
        let mut fx = Fixture::planned(50).await;

        let input = fx.log(10);
        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();

        let raised = WorkerLogChanges {
            quantity_worked: Some(25),
            ..Default::default()
        };
        update_worker_log(&mut tx, detail.log.id, raised).await.unwrap();

        let lowered = WorkerLogChanges {
            quantity_worked: Some(5),
            is_billable: Some(false),
            remarks: Some("Half day".to_string()),
        };
        let updated = update_worker_log(&mut tx, detail.log.id, lowered)
            .await
            .unwrap();
        tx.commit();

        assert_eq!(updated.log.quantity_worked, 5);
        assert!(!updated.log.is_billable);
        assert_eq!(updated.log.remarks.as_deref(), Some("Half day"));

        let card = fx.card(fx.root_card);
        assert_eq!(card.quantity_assigned, 5);
        assert_eq!(card.quantity_remaining, 45);
    }

    #[tokio::test]
    async fn test_update_cannot_exceed_remaining() {
        let mut fx = Fixture::planned(20).await;

        let input = fx.log(10);
        let mut tx = fx.store.begin();
        let detail = create_worker_log(&mut tx, input).await.unwrap();
        tx.commit();

        let mut tx = fx.store.begin();
        let changes = WorkerLogChanges {
            quantity_worked: Some(21),
            ..Default::default()
        };
        let err = update_worker_log(&mut tx, detail.log.id, changes)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientQuantity { .. }));
    }

    #[tokio::test]
    async fn test_get_returns_forks_by_kind() {
        let mut fx = Fixture::planned(50).await;
        let root = fx.root_card;

        let mut input = fx.log(10);
        input.rejected = vec![fork_item(root, 3, ForkDestination::Scrap)];
        input.altered = vec![fork_item(root, 2, ForkDestination::Department(fx.finishing))];

        let mut tx = fx.store.begin();
        let created = create_worker_log(&mut tx, input).await.unwrap();
        let loaded = get_worker_log(&mut tx, created.log.id).await.unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.altered.len(), 1);
        assert!(loaded.altered[0].created_department_sub_batch_id.is_some());
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

        /// Creating a log and deleting it again leaves every card as it was
        #[test]
        fn prop_undo_restores_cards(
            pieces in 1i32..500,
            worked_pct in 0u8..=100,
            rejected_pct in 0u8..=100,
            scrap in any::<bool>(),
        ) {
            tokio_test::block_on(async {
                let mut fx = Fixture::planned(pieces).await;
                let root = fx.root_card;

                let worked = pieces * i32::from(worked_pct) / 100;
                let rejected = (pieces - worked) * i32::from(rejected_pct) / 100;
                prop_assume!(worked > 0 || rejected > 0);

                let mut input = fx.log(worked);
                if rejected > 0 {
                    let destination = if scrap {
                        ForkDestination::Scrap
                    } else {
                        ForkDestination::Department(fx.stitching)
                    };
                    input.rejected = vec![fork_item(root, rejected, destination)];
                }

                let before = fx.card(root);
                let mut tx = fx.store.begin();
                let detail = create_worker_log(&mut tx, input).await.unwrap();
                delete_worker_log(&mut tx, detail.log.id).await.unwrap();
                tx.commit();

                let after = fx.card(root);
                prop_assert_eq!(after.quantity_remaining, before.quantity_remaining);
                prop_assert_eq!(after.quantity_assigned, before.quantity_assigned);
                prop_assert_eq!(after.quantity_forked, before.quantity_forked);
                prop_assert_eq!(fx.store.snapshot().card_count(), 1);
                prop_assert!(fx.store.snapshot().fork_records().is_empty());
                Ok(())
            })?;
        }

        /// A log asking for more than the card holds never changes it
        #[test]
        fn prop_over_assignment_never_mutates(
            pieces in 1i32..500,
            excess in 1i32..100,
        ) {
            tokio_test::block_on(async {
                let mut fx = Fixture::planned(pieces).await;
                let before = fx.card(fx.root_card);

                let input = fx.log(pieces + excess);
                let mut tx = fx.store.begin();
                let result = create_worker_log(&mut tx, input).await;
                prop_assert!(result.is_err());
                drop(tx);

                prop_assert_eq!(fx.card(fx.root_card), before);
                Ok(())
            })?;
        }
    }
}
