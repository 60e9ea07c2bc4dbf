use connectors::sql::base::error::{ConnectorError, DbError};
use deadpool_postgres::PoolError;
use engine_core::retry::RetryDisposition;
use mysql_async::Error as MySqlError;
use tokio_postgres::{Error as PgError, error::SqlState};

pub fn classify_db_error(err: &DbError) -> RetryDisposition {
    match err {
        DbError::Postgres(pg_err) => classify_pg_error(pg_err),
        DbError::MySql(mysql_err) => classify_mysql_error(mysql_err),
        DbError::Pool(pool_err) => classify_pool_error(pool_err),
        DbError::Decode { .. } => RetryDisposition::Stop,
        DbError::Write(_) => RetryDisposition::Stop,
        DbError::UnknownTable(_) => RetryDisposition::Stop,
        DbError::Unknown(_) => RetryDisposition::Stop,
    }
}

pub fn classify_connector_error(err: &ConnectorError) -> RetryDisposition {
    match err {
        ConnectorError::Postgres(pg_err) => classify_pg_error(pg_err),
        ConnectorError::MySql(mysql_err) => classify_mysql_error(mysql_err),
        ConnectorError::Pool(pool_err) => classify_pool_error(pool_err),
        ConnectorError::InvalidUrl(_) => RetryDisposition::Stop,
        ConnectorError::Tls(_) => RetryDisposition::Stop,
        ConnectorError::PoolBuild(_) => RetryDisposition::Stop,
        ConnectorError::InvalidPoolSize(_) => RetryDisposition::Stop,
    }
}

fn classify_pool_error(err: &PoolError) -> RetryDisposition {
    match err {
        PoolError::Timeout(_) => RetryDisposition::Retry,
        PoolError::Backend(pg_err) => classify_pg_error(pg_err),
        _ => RetryDisposition::Stop,
    }
}

fn classify_pg_error(err: &PgError) -> RetryDisposition {
    if err.is_closed() {
        return RetryDisposition::Retry;
    }

    if let Some(code) = err.code()
        && is_retryable_pg_code(code)
    {
        return RetryDisposition::Retry;
    }

    RetryDisposition::Stop
}

fn is_retryable_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::LOCK_NOT_AVAILABLE
            | SqlState::TOO_MANY_CONNECTIONS
            | SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_FAILURE
            | SqlState::CONNECTION_DOES_NOT_EXIST
            | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
            | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::QUERY_CANCELED
    )
}

fn classify_mysql_error(err: &MySqlError) -> RetryDisposition {
    match err {
        MySqlError::Io(_) => RetryDisposition::Retry,
        MySqlError::Driver(_) => RetryDisposition::Retry,
        MySqlError::Server(server_err) => {
            if is_retryable_mysql_server_error(server_err.code, server_err.state.as_str()) {
                RetryDisposition::Retry
            } else {
                RetryDisposition::Stop
            }
        }
        _ => RetryDisposition::Stop,
    }
}

fn is_retryable_mysql_server_error(code: u16, state: &str) -> bool {
    // Lock waits, deadlocks, lost connections and connection limits.
    const RETRYABLE_CODES: [u16; 8] = [1205, 1213, 2002, 2003, 2006, 2013, 1040, 1042];
    if RETRYABLE_CODES.contains(&code) {
        return true;
    }

    matches!(state, "40001" | "HYT00" | "08S01")
}
