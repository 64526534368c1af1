//! §4.10/§4.13: the connection pool facade. `Pool` wraps the lock-free
//! [`bag::Bag`] plus the circuit breaker, maintenance tasks, and
//! acquisition hooks behind a cheap-to-clone handle; `DataSource` is the
//! public entry point a caller constructs once and shares.

use std::sync::Arc;
use std::time::Duration;

use crate::options::DataSourceOptions;

mod bag;
mod hooks;
mod inner;
mod leak;
mod maintenance;
mod pooled;
mod slot;
mod state;

pub use hooks::Hooks;
pub use pooled::PooledConnection;

use inner::SharedPool;

/// A connection pool handle. Cheap to clone (an `Arc` underneath); every
/// clone shares the same slot array, wait queue, and circuit breaker.
#[derive(Clone)]
pub struct Pool(Arc<SharedPool>);

impl Pool {
    fn from_options(options: DataSourceOptions, hooks: Hooks) -> Self {
        Pool(SharedPool::new(options, hooks))
    }

    /// §4.10 + §4.12: acquires a connection, running it through the circuit
    /// breaker and the `before` hook. Waits at most `connectionTimeout`.
    pub async fn acquire(&self) -> crate::Result<PooledConnection> {
        self.0.acquire().await
    }

    /// Non-blocking acquisition: `None` if no connection is idle right now
    /// and growing the pool would require an await point.
    pub fn try_acquire(&self) -> Option<PooledConnection> {
        self.0.try_acquire()
    }

    /// §4.10 pool-ceiling invariant: current slot count, always `<=
    /// max_connections`.
    pub fn size(&self) -> u32 {
        self.0.bag.size()
    }

    /// Number of slots currently `InUse`. Always `<= size()`.
    pub fn in_use(&self) -> u32 {
        self.0.bag.in_use()
    }

    pub fn num_idle(&self) -> usize {
        self.0.bag.num_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Stops the maintenance tasks, drains the wait queue, and closes every
    /// connection still held by the pool. Resolves once every close has
    /// been awaited; connections checked out at the time of the call are
    /// evicted as they're returned rather than force-closed.
    pub async fn close(&self) {
        self.0.close().await;
    }
}

/// §6.2/§4.13: the facade a caller constructs from [`DataSourceOptions`]
/// and optional acquisition hooks, and from which every [`Pool`] clone and
/// connection ultimately descends.
pub struct DataSource {
    pool: Pool,
}

impl DataSource {
    pub fn new(options: DataSourceOptions) -> Self {
        Self::with_hooks(options, Hooks::default())
    }

    pub fn with_hooks(options: DataSourceOptions, hooks: Hooks) -> Self {
        let min_connections = options.min_connections;
        let pool = Pool::from_options(options, hooks);
        prewarm(pool.clone(), min_connections);
        DataSource { pool }
    }

    /// Returns the underlying [`Pool`] handle. `DataSource` itself holds no
    /// state beyond this; callers that only need pool operations can clone
    /// and discard the `DataSource`.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    pub async fn acquire(&self) -> crate::Result<PooledConnection> {
        self.pool.acquire().await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Establishes `min_connections` idle connections in the background right
/// after construction, so the pool starts warm instead of lazily building
/// up to its floor one acquisition at a time. Best-effort: a failure here
/// just leaves the pool below `minConnections` until the house-keeper or a
/// later acquisition fills it back in.
fn prewarm(pool: Pool, min_connections: u32) {
    if min_connections == 0 {
        return;
    }
    tokio::spawn(async move {
        for _ in 0..min_connections {
            if pool.is_closed() {
                return;
            }
            match pool.0.bag.grow_idle().await {
                Ok(true) => {}
                Ok(false) => return,
                Err(err) => {
                    tracing::warn!(error = %err, "pool prewarm: connection failed");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }
    });
}
