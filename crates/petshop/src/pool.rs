//! Connection pool construction.
//!
//! The pool is built once by the composition root and handed to every
//! repository by reference.

use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

use crate::config::{DbConfig, SslMode};
use crate::error::{StoreError, StoreResult};

/// Create a pool for `config`, picking TLS from its SSL mode.
///
/// `require` uses the platform TLS stack through `native-tls`.
pub fn create_pool(config: &DbConfig) -> StoreResult<Pool> {
    match config.ssl_mode() {
        SslMode::Disable => create_pool_with_tls(config, NoTls),
        SslMode::Require => {
            let connector = native_tls::TlsConnector::builder()
                .build()
                .map_err(|e| StoreError::Connection(format!("TLS setup failed: {e}")))?;
            create_pool_with_tls(
                config,
                postgres_native_tls::MakeTlsConnector::new(connector),
            )
        }
    }
}

/// Create a pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(config: &DbConfig, tls: T) -> StoreResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let max_size = config.pool_max_size;
    create_pool_with_manager_config(config, tls, default_manager_config(), |builder| {
        builder.max_size(max_size)
    })
}

/// Create a pool with an injected `ManagerConfig` and `PoolBuilder` tuning.
pub fn create_pool_with_manager_config<T>(
    config: &DbConfig,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> StoreResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let mgr = Manager::from_config(config.pg_config(), tls, manager_config);
    configure_pool(Pool::builder(mgr))
        .build()
        .map_err(|e| StoreError::Pool(e.to_string()))
}

/// Check out one connection and run a trivial query.
///
/// Called once at startup so a bad configuration fails fast.
pub async fn ping(pool: &Pool) -> StoreResult<()> {
    let client = pool.get().await?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;
    Ok(())
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}
