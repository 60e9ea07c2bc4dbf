//! Versioned column lists and content rules for each migrated table.

use crate::{
    core::{value::Value, watermark::WatermarkKind},
    entity::EntityKind,
    records::row::RowData,
};

/// Bumped whenever a column list below changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkColumn {
    pub column: &'static str,
    pub kind: WatermarkKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: &'static str,
    pub id_column: &'static str,
    /// `None` means the table is read in full on every run.
    pub watermark: Option<WatermarkColumn>,
    pub columns: &'static [&'static str],
    pub required: &'static [&'static str],
    /// Rows are excluded when any of these fields mention the forbidden domain.
    pub exclude_if_contains: &'static [&'static str],
    /// Fields stripped of forbidden-domain URLs before writing.
    pub cleanse: &'static [&'static str],
    /// Fields converted from HTML to forum markup before writing.
    pub markup: &'static [&'static str],
}

/// Reason a source row cannot be written as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    MissingField(&'static str),
    InvalidId,
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRejection::MissingField(field) => write!(f, "missing required field '{field}'"),
            RowRejection::InvalidId => f.write_str("id is not an integer"),
        }
    }
}

impl EntitySchema {
    pub fn row_id(&self, row: &RowData) -> Option<i64> {
        row.get_value(self.id_column).as_i64()
    }

    pub fn validate(&self, row: &RowData) -> Result<i64, RowRejection> {
        for field in self.required {
            if row.get(field).is_none_or(|f| f.value.is_null()) {
                return Err(RowRejection::MissingField(field));
            }
        }
        self.row_id(row).ok_or(RowRejection::InvalidId)
    }

    pub fn project(&self, row: &RowData) -> Vec<Value> {
        row.project(self.columns)
    }
}

const fn timestamp(column: &'static str) -> Option<WatermarkColumn> {
    Some(WatermarkColumn {
        column,
        kind: WatermarkKind::Timestamp,
    })
}

pub static USERS: EntitySchema = EntitySchema {
    kind: EntityKind::Users,
    table: "users",
    id_column: "id",
    watermark: timestamp("created_at"),
    columns: &[
        "id",
        "username",
        "link",
        "title",
        "avatar",
        "created_at",
        "updated_at",
        "joined_at",
        "badges",
        "last_seen_at",
        "link_is_accessible",
        "location",
        "age",
    ],
    required: &["id", "username"],
    exclude_if_contains: &["link", "title"],
    cleanse: &["link", "avatar", "title", "location"],
    markup: &[],
};

pub static FORUMS: EntitySchema = EntitySchema {
    kind: EntityKind::Forums,
    table: "forums",
    id_column: "id",
    watermark: None,
    columns: &["id", "name", "link", "threads_pages_count", "parent_forum_id"],
    required: &["id"],
    exclude_if_contains: &["link"],
    cleanse: &["link", "name"],
    markup: &[],
};

pub static THREADS: EntitySchema = EntitySchema {
    kind: EntityKind::Threads,
    table: "threads",
    id_column: "id",
    watermark: timestamp("created_at"),
    columns: &[
        "id",
        "name",
        "link",
        "replies",
        "views",
        "created_by_user_id",
        "created_at",
        "forum_id",
        "forum_page_number",
        "replies_pages_count",
        "tags",
    ],
    required: &["id"],
    exclude_if_contains: &["link", "name"],
    cleanse: &["link", "name", "tags"],
    markup: &[],
};

pub static REPLIES: EntitySchema = EntitySchema {
    kind: EntityKind::Replies,
    table: "replies",
    id_column: "id",
    watermark: timestamp("created_at"),
    columns: &[
        "id",
        "user_id",
        "thread_id",
        "content",
        "created_at",
        "thread_page_number",
        "link",
    ],
    required: &["id"],
    exclude_if_contains: &["content", "link"],
    cleanse: &["content", "link"],
    markup: &["content"],
};

pub static ENTITIES: EntitySchema = EntitySchema {
    kind: EntityKind::Entities,
    table: "entities",
    id_column: "id",
    watermark: timestamp("created_at"),
    columns: &[
        "id",
        "name",
        "type",
        "jurisdiction",
        "registration_number",
        "incorporation_date",
        "status",
        "source_url",
        "created_at",
        "updated_at",
    ],
    required: &["id", "name"],
    exclude_if_contains: &[],
    cleanse: &[],
    markup: &[],
};

pub static ADDRESSES: EntitySchema = EntitySchema {
    kind: EntityKind::Addresses,
    table: "addresses",
    id_column: "id",
    watermark: timestamp("created_at"),
    columns: &[
        "id",
        "entity_id",
        "address",
        "city",
        "state",
        "country",
        "postal_code",
        "created_at",
        "updated_at",
    ],
    required: &["id"],
    exclude_if_contains: &[],
    cleanse: &[],
    markup: &[],
};

pub static MISSING_USERS: EntitySchema = EntitySchema {
    kind: EntityKind::MissingUsers,
    table: "missing_users",
    id_column: "id",
    watermark: None,
    columns: &["id", "user_real_id", "was_parsed"],
    required: &["id"],
    exclude_if_contains: &[],
    cleanse: &[],
    markup: &[],
};

pub static TIME_WINDOWS: EntitySchema = EntitySchema {
    kind: EntityKind::TimeWindows,
    table: "johnny_time_windows",
    id_column: "id",
    watermark: timestamp("older_than_date"),
    columns: &["id", "link", "older_than_date"],
    required: &["id"],
    exclude_if_contains: &[],
    cleanse: &[],
    markup: &[],
};

pub static DRIZZLE_MIGRATIONS: EntitySchema = EntitySchema {
    kind: EntityKind::DrizzleMigrations,
    table: "__drizzle_migrations",
    id_column: "id",
    watermark: Some(WatermarkColumn {
        column: "created_at",
        kind: WatermarkKind::EpochMillis,
    }),
    columns: &["id", "hash", "created_at"],
    required: &["id", "hash"],
    exclude_if_contains: &[],
    cleanse: &[],
    markup: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::FieldValue;

    #[test]
    fn test_every_rule_field_is_a_column() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            assert_eq!(schema.kind, kind);
            assert!(schema.columns.contains(&schema.id_column));
            for field in schema
                .required
                .iter()
                .chain(schema.exclude_if_contains)
                .chain(schema.cleanse)
                .chain(schema.markup)
            {
                assert!(
                    schema.columns.contains(field),
                    "{field} not in {}",
                    schema.table
                );
            }
            if let Some(wm) = schema.watermark {
                assert!(schema.columns.contains(&wm.column));
            }
        }
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let row = RowData::new("users", vec![FieldValue::new("id", Value::Int(5))]);
        assert_eq!(
            USERS.validate(&row),
            Err(RowRejection::MissingField("username"))
        );

        let row = RowData::new(
            "users",
            vec![
                FieldValue::new("id", Value::Int(5)),
                FieldValue::new("username", Value::String("x".into())),
            ],
        );
        assert_eq!(USERS.validate(&row), Ok(5));
    }

    #[test]
    fn test_validate_rejects_non_integer_id() {
        let row = RowData::new(
            "forums",
            vec![FieldValue::new("id", Value::String("abc".into()))],
        );
        assert_eq!(FORUMS.validate(&row), Err(RowRejection::InvalidId));
    }
}
