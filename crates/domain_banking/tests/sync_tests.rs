//! Tests for the relationship synchronizer over the in-memory store

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{CreditProgramId, CurrencyId, DepositId};
use domain_banking::{
    AggregateRecord, AggregateUpdate, BankError, DesiredRelations, EntityKind, MockBankStore,
    RelationKind, RelationPair, RelationshipSynchronizer, StoreOperation,
};
use test_utils::{
    assert_relation_set, BankFixture, ClientBuilder, CreditProgramBuilder, CurrencyBuilder,
    DepositBuilder,
};

fn synchronizer(store: &MockBankStore) -> RelationshipSynchronizer {
    RelationshipSynchronizer::new(Arc::new(store.clone()))
}

async fn reread(store: &MockBankStore, kind: EntityKind, id: impl Into<Uuid>) -> AggregateRecord {
    use domain_banking::AggregateStorePort;
    store.get_aggregate(kind, id.into(), None).await.unwrap()
}

async fn relation_writes(store: &MockBankStore) -> Vec<StoreOperation> {
    store
        .operations()
        .await
        .into_iter()
        .filter(StoreOperation::is_relation_write)
        .collect()
}

// ============================================================================
// Diff Application
// ============================================================================

mod diff_application {
    use super::*;

    #[tokio::test]
    async fn test_only_changed_pairs_are_written() {
        let fixture = BankFixture::new();
        let extra = CreditProgramBuilder::new().with_name("Student").build();
        let mut state = fixture.state();
        state.credit_programs.push(extra.clone());
        let store = MockBankStore::with_state(state);

        // ivanov holds {mortgage}; desired {mortgage, student}, and his deposit
        // moves from savings to accumulative
        let update = AggregateUpdate::scalars(fixture.ivanov.clone()).with_relations(
            DesiredRelations::new()
                .set(RelationKind::ClientCreditProgram, [fixture.mortgage.id, extra.id])
                .set(RelationKind::DepositClient, [fixture.accumulative.id]),
        );
        let outcome = synchronizer(&store).update_element(update).await.unwrap();

        assert_eq!(outcome.inserted_count(), 2);
        assert_eq!(outcome.deleted_count(), 1);

        let client_id: Uuid = fixture.ivanov.id.into();
        let writes = relation_writes(&store).await;
        assert_eq!(writes.len(), 3);
        assert!(writes.contains(&StoreOperation::DeleteRelation {
            kind: RelationKind::DepositClient,
            pair: RelationPair::new(client_id, fixture.savings.id),
        }));
        assert!(writes.contains(&StoreOperation::InsertRelation {
            kind: RelationKind::ClientCreditProgram,
            pair: RelationPair::new(client_id, extra.id),
        }));
        assert!(!writes.iter().any(|op| matches!(
            op,
            StoreOperation::InsertRelation { pair, .. } | StoreOperation::DeleteRelation { pair, .. }
                if pair.target_id == Uuid::from(fixture.mortgage.id)
        )));

        let stored = reread(&store, EntityKind::Client, fixture.ivanov.id).await;
        assert_relation_set(&stored, RelationKind::ClientCreditProgram, [fixture.mortgage.id, extra.id]);
        assert_relation_set(&stored, RelationKind::DepositClient, [fixture.accumulative.id]);
    }

    #[tokio::test]
    async fn test_second_identical_update_is_noop() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let synchronizer = synchronizer(&store);
        let update = AggregateUpdate::scalars(fixture.savings.clone()).with_relations(
            DesiredRelations::new().set(RelationKind::DepositCurrency, [fixture.rub.id, fixture.usd.id]),
        );

        let first = synchronizer.update_element(update.clone()).await.unwrap();
        assert_eq!(first.inserted_count(), 1);

        store.clear_operations().await;
        let second = synchronizer.update_element(update).await.unwrap();

        assert!(second.is_noop());
        assert!(relation_writes(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_full_resync_from_record() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let mut program = fixture.auto.clone();
        program.currencies.clear();
        program.currencies.insert(fixture.rub.id);

        let outcome = synchronizer(&store)
            .update_element(AggregateUpdate::from_record(program))
            .await
            .unwrap();

        assert_eq!(outcome.diffs.len(), 1);
        assert_eq!(outcome.diffs[0].to_delete, vec![Uuid::from(fixture.usd.id)]);
        assert_eq!(outcome.diffs[0].to_insert, vec![Uuid::from(fixture.rub.id)]);
    }
}

// ============================================================================
// Null vs Empty
// ============================================================================

mod keep_and_clear {
    use super::*;

    #[tokio::test]
    async fn test_keep_leaves_set_and_clear_empties_it() {
        let fixture = BankFixture::new();
        let store = fixture.store();

        let update = AggregateUpdate::scalars(fixture.petrova.clone()).with_relations(
            DesiredRelations::new()
                .keep(RelationKind::DepositClient)
                .clear(RelationKind::ClientCreditProgram),
        );
        synchronizer(&store).update_element(update).await.unwrap();

        let stored = reread(&store, EntityKind::Client, fixture.petrova.id).await;
        assert_relation_set(
            &stored,
            RelationKind::DepositClient,
            [fixture.accumulative.id, fixture.demand.id],
        );
        assert_relation_set(&stored, RelationKind::ClientCreditProgram, Vec::<Uuid>::new());
    }

    #[tokio::test]
    async fn test_scalar_update_does_not_read_relation_sets() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let mut renamed = fixture.sidorov.clone();
        renamed.surname = "Sidorenko".to_string();
        renamed.credit_programs.clear();

        let outcome = synchronizer(&store)
            .update_element(AggregateUpdate::scalars(renamed))
            .await
            .unwrap();

        assert!(outcome.diffs.is_empty());
        let stored = reread(&store, EntityKind::Client, fixture.sidorov.id).await;
        match &stored {
            AggregateRecord::Client(client) => assert_eq!(client.surname, "Sidorenko"),
            other => panic!("unexpected record {:?}", other),
        }
        assert_relation_set(&stored, RelationKind::ClientCreditProgram, [fixture.auto.id]);
    }
}

// ============================================================================
// Relation-Only Updates
// ============================================================================

mod relation_only {
    use super::*;

    #[tokio::test]
    async fn test_relation_update_keeps_newer_scalar_values() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let synchronizer = synchronizer(&store);

        // a caller read ivanov before someone else renamed him
        let _stale = synchronizer
            .get_element(EntityKind::Client, fixture.ivanov.id.into())
            .await
            .unwrap();
        let mut renamed = fixture.ivanov.clone();
        renamed.surname = "Ivanova".to_string();
        synchronizer
            .update_element(AggregateUpdate::scalars(renamed))
            .await
            .unwrap();

        let outcome = synchronizer
            .update_relations(
                EntityKind::Client,
                fixture.ivanov.id.into(),
                DesiredRelations::new().clear(RelationKind::DepositClient),
            )
            .await
            .unwrap();

        assert_eq!(outcome.deleted_count(), 1);
        let stored = reread(&store, EntityKind::Client, fixture.ivanov.id).await;
        match &stored {
            AggregateRecord::Client(client) => assert_eq!(client.surname, "Ivanova"),
            other => panic!("unexpected record {:?}", other),
        }
        assert_relation_set(&stored, RelationKind::DepositClient, Vec::<Uuid>::new());
    }

    #[tokio::test]
    async fn test_relation_update_never_writes_the_aggregate_row() {
        let fixture = BankFixture::new();
        let store = fixture.store();

        synchronizer(&store)
            .update_relations(
                EntityKind::Deposit,
                fixture.demand.id.into(),
                DesiredRelations::new().set(RelationKind::DepositCurrency, [fixture.usd.id]),
            )
            .await
            .unwrap();

        let operations = store.operations().await;
        assert!(!operations
            .iter()
            .any(|op| matches!(op, StoreOperation::UpdateAggregate { .. })));
        assert_eq!(operations.last(), Some(&StoreOperation::Commit));
    }

    #[tokio::test]
    async fn test_relation_update_of_missing_aggregate_is_not_found() {
        let fixture = BankFixture::new();
        let store = fixture.store();

        let err = synchronizer(&store)
            .update_relations(
                EntityKind::Client,
                Uuid::new_v4(),
                DesiredRelations::new().set(RelationKind::DepositClient, [fixture.savings.id]),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.operations().await, vec![StoreOperation::Rollback]);
    }
}

// ============================================================================
// Failure Atomicity
// ============================================================================

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn test_failed_second_insert_rolls_everything_back() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let before = reread(&store, EntityKind::Deposit, fixture.demand.id).await;

        // Inserts run in ascending target order, so the missing max id is second
        let missing = CurrencyId::from_uuid(Uuid::from_u128(u128::MAX));
        let mut changed = fixture.demand.clone();
        changed.cost = dec!(777);
        let update = AggregateUpdate::scalars(changed).with_relations(
            DesiredRelations::new().set(RelationKind::DepositCurrency, [fixture.rub.id, missing]),
        );

        let err = synchronizer(&store).update_element(update).await.unwrap_err();

        assert!(matches!(err, BankError::Conflict(_)));
        let inserts = relation_writes(&store).await;
        assert_eq!(inserts.len(), 2);
        assert_eq!(reread(&store, EntityKind::Deposit, fixture.demand.id).await, before);
        assert_eq!(store.operations().await.last(), Some(&StoreOperation::Rollback));
    }

    #[tokio::test]
    async fn test_missing_aggregate_is_not_found_and_writes_nothing() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let stranger = ClientBuilder::new().with_deposit(fixture.savings.id).build();

        let err = synchronizer(&store)
            .update_element(AggregateUpdate::from_record(stranger))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.operations().await, vec![StoreOperation::Rollback]);
    }

    #[tokio::test]
    async fn test_commit_failure_is_storage_and_state_unchanged() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        store.fail_commits(true);

        let update = AggregateUpdate::scalars(fixture.ivanov.clone())
            .with_relations(DesiredRelations::new().clear(RelationKind::DepositClient));
        let err = synchronizer(&store).update_element(update).await.unwrap_err();

        assert!(matches!(err, BankError::Storage { .. }));
        let stored = reread(&store, EntityKind::Client, fixture.ivanov.id).await;
        assert_relation_set(&stored, RelationKind::DepositClient, [fixture.savings.id]);
    }

    #[tokio::test]
    async fn test_validation_happens_before_transaction() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let update = AggregateUpdate::scalars(fixture.ivanov.clone()).with_relations(
            DesiredRelations::new().set(RelationKind::DepositClient, [fixture.savings.id, fixture.savings.id]),
        );

        let err = synchronizer(&store).update_element(update).await.unwrap_err();

        assert!(matches!(err, BankError::Validation(_)));
        assert!(store.operations().await.is_empty());
    }
}

// ============================================================================
// Inserts
// ============================================================================

mod add_element {
    use super::*;

    #[tokio::test]
    async fn test_insert_with_initial_relations() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let deposit = DepositBuilder::new()
            .with_currency(fixture.rub.id)
            .with_currency(fixture.usd.id)
            .build();

        let outcome = synchronizer(&store)
            .add_element(deposit.clone().into())
            .await
            .unwrap();

        assert_eq!(outcome.inserted_count(), 2);
        let stored = reread(&store, EntityKind::Deposit, deposit.id).await;
        assert_eq!(stored, AggregateRecord::Deposit(deposit));
    }

    #[tokio::test]
    async fn test_insert_existing_is_conflict() {
        let fixture = BankFixture::new();
        let store = fixture.store();

        let err = synchronizer(&store)
            .add_element(fixture.usd.clone().into())
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_insert_with_missing_target_leaves_no_row() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let client = ClientBuilder::new().with_credit_program(CreditProgramId::new()).build();

        let err = synchronizer(&store)
            .add_element(client.clone().into())
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::Conflict(_)));
        assert_eq!(store.snapshot().await.clients.len(), 3);
    }

    #[tokio::test]
    async fn test_currency_without_relations() {
        let store = MockBankStore::new();
        let currency = CurrencyBuilder::new().named("Euro", "EUR").build();

        let outcome = synchronizer(&store).add_element(currency.into()).await.unwrap();

        assert!(outcome.is_noop());
        assert_eq!(store.snapshot().await.currencies.len(), 1);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod serialization {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_of_one_aggregate_both_apply_cleanly() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let synchronizer = Arc::new(synchronizer(&store));

        let to_savings = AggregateUpdate::scalars(fixture.sidorov.clone())
            .with_relations(DesiredRelations::new().set(RelationKind::DepositClient, [fixture.savings.id]));
        let to_demand = AggregateUpdate::scalars(fixture.sidorov.clone())
            .with_relations(DesiredRelations::new().set(RelationKind::DepositClient, [fixture.demand.id]));

        let (a, b) = tokio::join!(
            tokio::spawn({
                let synchronizer = synchronizer.clone();
                async move { synchronizer.update_element(to_savings).await }
            }),
            tokio::spawn({
                let synchronizer = synchronizer.clone();
                async move { synchronizer.update_element(to_demand).await }
            }),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let stored = reread(&store, EntityKind::Client, fixture.sidorov.id).await;
        let deposits = stored.relation_targets(RelationKind::DepositClient).unwrap();
        assert_eq!(deposits.len(), 1);
        let only = DepositId::from_uuid(*deposits.iter().next().unwrap());
        assert!(only == fixture.savings.id || only == fixture.demand.id);
    }
}

mod outcome {
    use super::*;

    #[tokio::test]
    async fn test_outcome_serializes() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let update = AggregateUpdate::scalars(fixture.auto.clone())
            .with_relations(DesiredRelations::new().set(RelationKind::CreditProgramCurrency, [fixture.rub.id]));

        let outcome = synchronizer(&store).update_element(update).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["entity"], "credit_program");
        assert_eq!(json["diffs"][0]["kind"], "credit_program_currency");
    }
}
