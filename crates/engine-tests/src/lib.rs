#![allow(dead_code)]

//! End-to-end sync runs over in-memory stores.

use chrono::{TimeZone, Utc};
use connectors::memory::{MemorySource, MemoryTarget};
use engine_config::{report::summary::RunSummary, settings::SyncSettings};
use engine_core::{retry::RetryPolicy, state::file_store::FileCheckpointStore};
use engine_processing::transform::{cleanse::ForbiddenDomain, pipeline::RowTransformer};
use engine_runtime::{
    error::MigrationError,
    execution::{executor, factory::Stores},
};
use model::{
    core::value::{FieldValue, Value},
    entity::EntityKind,
    records::row::RowData,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tempfile::TempDir;

pub mod engine;
pub mod utils;

pub const FORBIDDEN_DOMAIN: &str = "offshorecorptalk.com";

/// Source, target and checkpoint file shared by consecutive runs.
pub struct Harness {
    pub source: Arc<MemorySource>,
    pub target: Arc<MemoryTarget>,
    pub store: Arc<FileCheckpointStore>,
    dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(FileCheckpointStore::new(
            dir.path().join("migration-checkpoint.json"),
            dir.path().join("checkpoints"),
            5,
        ));
        Harness {
            source: Arc::new(MemorySource::new()),
            target: Arc::new(MemoryTarget::new()),
            store,
            dir,
        }
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.path().join("migration-checkpoint.json")
    }

    pub async fn run(&self, settings: SyncSettings) -> Result<RunSummary, MigrationError> {
        executor::run(
            Arc::new(Stores::new(self.source.clone(), self.target.clone())),
            self.store.clone(),
            RowTransformer::new(ForbiddenDomain::new(FORBIDDEN_DOMAIN).expect("valid domain")),
            RetryPolicy::fixed(3, Duration::ZERO),
            settings,
        )
        .await
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for a live run restricted to `entities`.
pub fn settings_for(entities: &[EntityKind]) -> SyncSettings {
    SyncSettings {
        entities: entities.to_vec(),
        ..SyncSettings::default(false)
    }
}

pub fn at(secs: i64) -> Value {
    Value::Timestamp(Utc.timestamp_opt(secs, 0).unwrap())
}

pub fn user(id: i64, created_secs: i64) -> RowData {
    RowData::new(
        "users",
        vec![
            FieldValue::new("id", Value::Int(id)),
            FieldValue::new("username", Value::String(format!("member{id}"))),
            FieldValue::new("link", Value::String(format!("/members/member.{id}/"))),
            FieldValue::new("created_at", at(created_secs)),
        ],
    )
}

pub fn forum(id: i64, link: &str) -> RowData {
    RowData::new(
        "forums",
        vec![
            FieldValue::new("id", Value::Int(id)),
            FieldValue::new("name", Value::String(format!("Forum {id}"))),
            FieldValue::new("link", Value::String(link.to_string())),
        ],
    )
}

pub fn thread(id: i64, forum_id: i64, created_secs: i64) -> RowData {
    RowData::new(
        "threads",
        vec![
            FieldValue::new("id", Value::Int(id)),
            FieldValue::new("name", Value::String(format!("Thread {id}"))),
            FieldValue::new("link", Value::String(format!("/threads/{id}/"))),
            FieldValue::new("forum_id", Value::Int(forum_id)),
            FieldValue::new("created_at", at(created_secs)),
        ],
    )
}

pub fn reply(id: i64, content: &str, created_secs: i64) -> RowData {
    RowData::new(
        "replies",
        vec![
            FieldValue::new("id", Value::Int(id)),
            FieldValue::new("user_id", Value::Int(1)),
            FieldValue::new("thread_id", Value::Int(1)),
            FieldValue::new("content", Value::String(content.to_string())),
            FieldValue::new("created_at", at(created_secs)),
            FieldValue::new("link", Value::String(format!("/threads/1/post-{id}"))),
        ],
    )
}
