use crate::settings::error::SettingsError;
use connectors::sql::base::endpoint::{Endpoint, TlsMode};
use std::{collections::HashMap, str::FromStr};

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_PG_MAX_CONNECTIONS: usize = 10;
pub const DEFAULT_MYSQL_MAX_CONNECTIONS: usize = 20;

/// Where to read from and where to write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub source: Endpoint,
    pub target: Endpoint,
}

impl ConnectionSettings {
    /// Builds both endpoints from `PG_*` and `MYSQL_*` variables.
    ///
    /// Every missing or malformed variable is collected so the operator
    /// sees all problems at once.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut errors = Vec::new();
        let source = endpoint(vars, "PG", DEFAULT_PG_PORT, DEFAULT_PG_MAX_CONNECTIONS, &mut errors);
        let target = endpoint(
            vars,
            "MYSQL",
            DEFAULT_MYSQL_PORT,
            DEFAULT_MYSQL_MAX_CONNECTIONS,
            &mut errors,
        );

        match (source, target) {
            (Some(source), Some(target)) if errors.is_empty() => {
                Ok(ConnectionSettings { source, target })
            }
            _ => Err(SettingsError::ValidationFailed(errors)),
        }
    }
}

fn endpoint(
    vars: &HashMap<String, String>,
    prefix: &str,
    default_port: u16,
    default_max_connections: usize,
    errors: &mut Vec<String>,
) -> Option<Endpoint> {
    let mut required = |name: &str| -> String {
        let key = format!("{prefix}_{name}");
        match lookup(vars, &key) {
            Some(value) => value.to_string(),
            None => {
                errors.push(SettingsError::Missing(key).to_string());
                String::new()
            }
        }
    };

    let host = required("HOST");
    let user = required("USER");
    let database = required("DATABASE");
    // An empty password is allowed for local development databases.
    let password = vars
        .get(&format!("{prefix}_PASSWORD"))
        .cloned()
        .unwrap_or_default();

    let port = parse_or(vars, &format!("{prefix}_PORT"), default_port, errors);
    let max_connections = parse_or(
        vars,
        &format!("{prefix}_MAX_CONNECTIONS"),
        default_max_connections,
        errors,
    );
    if max_connections == 0 {
        errors.push(format!("{prefix}_MAX_CONNECTIONS must be at least 1"));
    }
    let tls = parse_or(vars, &format!("{prefix}_SSLMODE"), TlsMode::Disable, errors);

    if host.is_empty() || user.is_empty() || database.is_empty() {
        return None;
    }

    Some(Endpoint {
        host,
        port,
        user,
        password,
        database,
        max_connections,
        tls,
    })
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T, errors: &mut Vec<String>) -> T
where
    T: FromStr,
    T::Err: ToString,
{
    match lookup(vars, key) {
        None => default,
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                errors.push(SettingsError::invalid(key, raw, err.to_string()).to_string());
                default
            }
        },
    }
}
