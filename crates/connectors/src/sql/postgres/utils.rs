use crate::sql::base::{
    endpoint::{Endpoint, TlsMode},
    error::ConnectorError,
};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Config, NoTls, config::SslMode};
use tracing::warn;

pub(crate) fn config_from_endpoint(endpoint: &Endpoint) -> Config {
    let mut config = Config::new();
    config
        .host(&endpoint.host)
        .port(endpoint.port)
        .user(&endpoint.user)
        .password(&endpoint.password)
        .dbname(&endpoint.database)
        .ssl_mode(match endpoint.tls {
            TlsMode::Disable => SslMode::Disable,
            TlsMode::Prefer => SslMode::Prefer,
            TlsMode::Require => SslMode::Require,
        });
    config
}

pub(crate) fn config_from_url(url: &str) -> Result<Config, ConnectorError> {
    url.parse::<Config>()
        .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))
}

/// Builds a bounded pool. Connections are opened lazily, on first use.
pub(crate) fn build_pool(config: Config, max_connections: usize) -> Result<Pool, ConnectorError> {
    if max_connections == 0 {
        return Err(ConnectorError::InvalidPoolSize(max_connections));
    }

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let manager = match config.get_ssl_mode() {
        SslMode::Disable => Manager::from_config(config, NoTls, manager_config),
        _ => {
            let connector = TlsConnector::builder().build()?;
            let tls = MakeTlsConnector::new(connector);
            Manager::from_config(config, tls, manager_config)
        }
    };

    Ok(Pool::builder(manager).max_size(max_connections).build()?)
}

pub(crate) fn warn_if_plaintext(config: &Config) {
    if config.get_ssl_mode() == SslMode::Disable {
        warn!("PostgreSQL TLS is disabled; credentials are sent in plaintext");
    }
}
