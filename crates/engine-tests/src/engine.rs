#[cfg(test)]
mod tests {
    use crate::{
        Harness, forum, reply, settings_for, thread, user,
        utils::{assert_no_duplicates, recorded_watermark},
    };
    use engine_config::settings::SyncSettings;
    use engine_core::state::{
        CheckpointStore,
        models::{CheckpointStatus, Operation},
    };
    use engine_runtime::error::MigrationError;
    use model::{core::watermark::Watermark, entity::EntityKind};
    use tracing_test::traced_test;

    const CORE: [EntityKind; 4] = [
        EntityKind::Users,
        EntityKind::Forums,
        EntityKind::Threads,
        EntityKind::Replies,
    ];

    fn seed_core(h: &Harness) {
        h.source
            .insert("users", (1..=4).map(|id| user(id, id * 100)).collect());
        h.source.insert("forums", vec![forum(1, "/forums/a.1/"), forum(2, "/forums/b.2/")]);
        h.source
            .insert("threads", (1..=3).map(|id| thread(id, 1, id * 100)).collect());
        h.source.insert(
            "replies",
            (1..=12).map(|id| reply(id, "<i>hi</i>", id * 100)).collect(),
        );
    }

    // Scenario: the same sync runs twice with no new source rows.
    // Expected Outcome: the second run writes nothing and the target is unchanged.
    #[traced_test]
    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let h = Harness::new();
        seed_core(&h);

        let first = h.run(settings_for(&CORE)).await.unwrap();
        assert_eq!(first.totals.migrated, 4 + 2 + 3 + 12);
        let statements = h.target.insert_statements();

        let second = h.run(settings_for(&CORE)).await.unwrap();
        assert_eq!(second.totals.migrated, 0);
        assert_eq!(second.totals.failed, 0);
        // Forums are re-read in full and filtered out by id.
        assert_eq!(second.report_for(EntityKind::Forums).unwrap().skipped_existing, 2);
        assert_eq!(h.target.insert_statements(), statements);

        for entity in CORE {
            assert_no_duplicates(&h.target, entity.table());
        }
    }

    // Scenario: new rows arrive between runs.
    // Expected Outcome: only the new rows are read and the recorded
    // watermark never decreases.
    #[traced_test]
    #[tokio::test]
    async fn watermark_only_moves_forward() {
        let h = Harness::new();
        h.source
            .insert("users", vec![user(1, 100), user(2, 200), user(3, 300)]);

        h.run(settings_for(&[EntityKind::Users])).await.unwrap();
        let first = h.store.load().await.unwrap();
        let first_mark = recorded_watermark(&first.metadata, "users").unwrap();
        assert_eq!(first_mark, Watermark::from_epoch_secs(300));

        h.source.insert("users", vec![user(4, 400), user(5, 500)]);
        let summary = h.run(settings_for(&[EntityKind::Users])).await.unwrap();
        let report = summary.report_for(EntityKind::Users).unwrap();
        assert_eq!(report.read, 2);
        assert_eq!(report.migrated, 2);

        let second = h.store.load().await.unwrap();
        let second_mark = recorded_watermark(&second.metadata, "users").unwrap();
        assert!(second_mark >= first_mark);
        assert_eq!(second_mark, Watermark::from_epoch_secs(500));
        assert_eq!(
            second.last_processed_date,
            Some(Watermark::from_epoch_secs(500).to_datetime())
        );
    }

    // Scenario: a run dies on threads, the failure is fixed, and the run is
    // resumed.
    // Expected Outcome: users and forums are not revisited, the rest is
    // migrated, and the final target matches an uninterrupted run.
    #[traced_test]
    #[tokio::test]
    async fn resume_continues_after_failed_entity() {
        let h = Harness::new();
        seed_core(&h);
        h.source.break_table("threads");

        let result = h.run(settings_for(&CORE)).await;
        assert!(matches!(result, Err(MigrationError::Migrator(_))));

        let interrupted = h.store.load().await.unwrap();
        assert_eq!(interrupted.status, CheckpointStatus::InProgress);
        assert_eq!(interrupted.total_processed, 6);
        assert_eq!(interrupted.errors.len(), 1);
        assert_eq!(interrupted.errors[0].context["entity"], "threads");
        assert_eq!(
            interrupted.metadata["completedEntities"],
            serde_json::json!(["users", "forums"])
        );

        h.source.repair_table("threads");
        let fetches_before = h.source.fetch_count();
        let settings = SyncSettings {
            resume: true,
            ..settings_for(&CORE)
        };
        let summary = h.run(settings).await.unwrap();

        assert!(summary.report_for(EntityKind::Users).is_none());
        assert!(summary.report_for(EntityKind::Forums).is_none());
        assert_eq!(h.source.fetch_count() - fetches_before, 2);
        assert_eq!(h.target.ids("threads"), vec![1, 2, 3]);
        assert_eq!(h.target.ids("replies").len(), 12);

        let done = h.store.load().await.unwrap();
        assert_eq!(done.status, CheckpointStatus::Completed);
        assert_eq!(done.total_processed, 4 + 2 + 3 + 12);
        assert_eq!(done.errors.len(), 1);
        assert!(h.store.resume(Operation::Migrate).await.is_none());
    }

    // Scenario: the checkpoint file is corrupted before a resumed run.
    // Expected Outcome: the checkpoint reads as absent and the run starts
    // from the beginning without duplicating anything.
    #[traced_test]
    #[tokio::test]
    async fn corrupted_checkpoint_starts_fresh() {
        let h = Harness::new();
        seed_core(&h);
        h.target.seed("users", vec![user(1, 100)]);
        std::fs::write(h.checkpoint_path(), "{\"timestamp\": \"2024-01-01T00:").unwrap();

        assert!(h.store.load().await.is_none());
        assert!(h.store.resume(Operation::Migrate).await.is_none());

        let settings = SyncSettings {
            resume: true,
            ..settings_for(&CORE)
        };
        let summary = h.run(settings).await.unwrap();

        assert_eq!(summary.entities.len(), 4);
        assert_eq!(h.target.ids("users"), vec![1, 2, 3, 4]);
        assert_no_duplicates(&h.target, "users");
        assert_eq!(
            h.store.load().await.unwrap().status,
            CheckpointStatus::Completed
        );
    }

    // Scenario: runs that succeed and runs that fail fatally.
    // Expected Outcome: each run releases both pools exactly once.
    #[traced_test]
    #[tokio::test]
    async fn pools_released_once_per_run() {
        let h = Harness::new();
        seed_core(&h);

        h.run(settings_for(&CORE)).await.unwrap();
        assert_eq!(h.source.close_count(), 1);
        assert_eq!(h.target.close_count(), 1);

        h.source.fail_next_fetches(1);
        assert!(h.run(settings_for(&CORE)).await.is_err());
        assert_eq!(h.source.close_count(), 2);
        assert_eq!(h.target.close_count(), 2);
    }

    // Scenario: the run is restricted to replies, and a clear is requested.
    // Expected Outcome: only replies are touched and the old checkpoint is
    // replaced.
    #[traced_test]
    #[tokio::test]
    async fn entity_subset_with_cleared_checkpoint() {
        let h = Harness::new();
        seed_core(&h);
        h.run(settings_for(&[EntityKind::Users])).await.unwrap();

        let settings = SyncSettings {
            clear_checkpoint: true,
            ..settings_for(&[EntityKind::Replies])
        };
        let summary = h.run(settings).await.unwrap();

        assert_eq!(summary.entities.len(), 1);
        assert!(h.target.ids("forums").is_empty());
        assert_eq!(h.target.ids("replies").len(), 12);

        let checkpoint = h.store.load().await.unwrap();
        assert_eq!(checkpoint.total_processed, 12);
        assert_eq!(
            checkpoint.metadata["completedEntities"],
            serde_json::json!(["replies"])
        );
        assert!(recorded_watermark(&checkpoint.metadata, "users").is_none());
    }

    // Scenario: a run fails on threads and the next run starts over without
    // --resume, then finishes.
    // Expected Outcome: the fresh run does not inherit the old failure, and a
    // run after it starts clean as well.
    #[traced_test]
    #[tokio::test]
    async fn fresh_run_does_not_inherit_old_errors() {
        let h = Harness::new();
        seed_core(&h);
        h.source.break_table("threads");
        assert!(h.run(settings_for(&CORE)).await.is_err());
        assert_eq!(h.store.load().await.unwrap().errors.len(), 1);

        h.source.repair_table("threads");
        h.run(settings_for(&CORE)).await.unwrap();
        let done = h.store.load().await.unwrap();
        assert_eq!(done.status, CheckpointStatus::Completed);
        assert!(done.errors.is_empty());

        h.run(settings_for(&CORE)).await.unwrap();
        assert!(h.store.load().await.unwrap().errors.is_empty());
    }
}
