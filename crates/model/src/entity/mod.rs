use crate::{entity::schema::EntitySchema, error::ModelError};
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

pub mod schema;

/// Tables kept in sync between the scraper database and the forum database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Users,
    Forums,
    Threads,
    Replies,
    Entities,
    Addresses,
    MissingUsers,
    TimeWindows,
    DrizzleMigrations,
}

impl EntityKind {
    /// Every entity in dependency order: parents before the rows that
    /// reference them.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Users,
        EntityKind::Forums,
        EntityKind::Threads,
        EntityKind::Replies,
        EntityKind::Entities,
        EntityKind::Addresses,
        EntityKind::MissingUsers,
        EntityKind::TimeWindows,
        EntityKind::DrizzleMigrations,
    ];

    pub fn schema(&self) -> &'static EntitySchema {
        match self {
            EntityKind::Users => &schema::USERS,
            EntityKind::Forums => &schema::FORUMS,
            EntityKind::Threads => &schema::THREADS,
            EntityKind::Replies => &schema::REPLIES,
            EntityKind::Entities => &schema::ENTITIES,
            EntityKind::Addresses => &schema::ADDRESSES,
            EntityKind::MissingUsers => &schema::MISSING_USERS,
            EntityKind::TimeWindows => &schema::TIME_WINDOWS,
            EntityKind::DrizzleMigrations => &schema::DRIZZLE_MIGRATIONS,
        }
    }

    pub fn table(&self) -> &'static str {
        self.schema().table
    }

    /// Position in [`EntityKind::ALL`].
    pub fn order(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.table())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "users" => Ok(EntityKind::Users),
            "forums" => Ok(EntityKind::Forums),
            "threads" => Ok(EntityKind::Threads),
            "replies" => Ok(EntityKind::Replies),
            "entities" => Ok(EntityKind::Entities),
            "addresses" => Ok(EntityKind::Addresses),
            "missing_users" => Ok(EntityKind::MissingUsers),
            "johnny_time_windows" | "time_windows" => Ok(EntityKind::TimeWindows),
            "__drizzle_migrations" | "drizzle_migrations" => Ok(EntityKind::DrizzleMigrations),
            other => Err(ModelError::UnknownEntity(other.to_string())),
        }
    }
}
