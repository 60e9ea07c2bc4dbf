use model::entity::EntityKind;

const CREATE_ENTITIES_SQL: &str = include_str!("sql/create_entities.sql");
const CREATE_ADDRESSES_SQL: &str = include_str!("sql/create_addresses.sql");
const CREATE_MISSING_USERS_SQL: &str = include_str!("sql/create_missing_users.sql");
const CREATE_TIME_WINDOWS_SQL: &str = include_str!("sql/create_time_windows.sql");
const CREATE_DRIZZLE_MIGRATIONS_SQL: &str = include_str!("sql/create_drizzle_migrations.sql");

/// `CREATE TABLE IF NOT EXISTS` for the auxiliary tables this tool owns.
/// Forum tables (users, forums, threads, replies) belong to the forum
/// software and have no DDL here.
pub fn create_table_sql(entity: EntityKind) -> Option<&'static str> {
    match entity {
        EntityKind::Entities => Some(CREATE_ENTITIES_SQL),
        EntityKind::Addresses => Some(CREATE_ADDRESSES_SQL),
        EntityKind::MissingUsers => Some(CREATE_MISSING_USERS_SQL),
        EntityKind::TimeWindows => Some(CREATE_TIME_WINDOWS_SQL),
        EntityKind::DrizzleMigrations => Some(CREATE_DRIZZLE_MIGRATIONS_SQL),
        EntityKind::Users | EntityKind::Forums | EntityKind::Threads | EntityKind::Replies => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auxiliary_tables_have_ddl() {
        for entity in EntityKind::ALL {
            match create_table_sql(entity) {
                Some(sql) => {
                    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS"));
                    assert!(sql.contains(&format!("`{}`", entity.table())));
                }
                None => assert!(entity.order() < EntityKind::Entities.order()),
            }
        }
    }
}
