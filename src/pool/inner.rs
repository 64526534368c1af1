//! The shared pool state a [`super::Pool`] handle clones an `Arc` of:
//! the Bag, the circuit breaker guarding acquisition, the optional
//! `before`/`after` hooks, and the background maintenance tasks' handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::circuit_breaker::CircuitBreaker;
use crate::options::DataSourceOptions;

use super::bag::{deadline_from, Bag};
use super::hooks::Hooks;
use super::leak;
use super::pooled::PooledConnection;
use super::slot::Tenant;
use super::state::ConnectionState;

pub(super) struct SharedPool {
    pub(super) options: Arc<DataSourceOptions>,
    pub(super) bag: Bag,
    pub(super) breaker: CircuitBreaker,
    pub(super) hooks: Hooks,
    pub(super) closed: AtomicBool,
    maintenance: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SharedPool {
    pub(super) fn new(options: DataSourceOptions, hooks: Hooks) -> Arc<Self> {
        let options = Arc::new(options);
        let breaker = CircuitBreaker::new(options.circuit_breaker);
        let pool = Arc::new(SharedPool {
            bag: Bag::new(Arc::clone(&options)),
            breaker,
            hooks,
            closed: AtomicBool::new(false),
            maintenance: std::sync::Mutex::new(Vec::new()),
            options,
        });

        let tasks = super::maintenance::spawn_all(&pool);
        *pool.maintenance.lock().unwrap() = tasks;

        pool
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// §4.10 + §4.12: acquires a slot through the circuit breaker, runs the
    /// `before` hook if configured, and hands back a checked-out connection.
    pub(super) async fn acquire(self: &Arc<Self>) -> crate::Result<PooledConnection> {
        if self.is_closed() {
            return Err(crate::Error::transient_connection("pool is closed"));
        }

        let deadline = deadline_from(self.options.connection_timeout);

        // A connection that fails its pre-checkout validation is evicted
        // and another is tried, within the same original deadline — this
        // loops at most `size()` times since each failed attempt shrinks
        // the pool by one until `reserve` must create fresh or time out.
        let (slot, mut tenant) = loop {
            let (slot, mut tenant) = self.breaker.protect(|| self.bag.reserve(deadline)).await?;

            slot.state.store(ConnectionState::InUse);
            slot.touch_used();

            // Validation bypass (§4.11): skip the liveness probe for a
            // connection that was in active use moments ago.
            let needs_validation = slot.idle_for() > self.options.alive_bypass_window;
            if needs_validation && !tenant.conn.is_valid(self.options.validation_timeout).await {
                self.bag.evict(&slot);
                continue;
            }
            slot.touch_validated();
            break (slot, tenant);
        };

        let leak_task = self
            .options
            .leak_detection_threshold
            .map(|threshold| leak::spawn(Arc::clone(&slot), threshold));

        let hook_ctx = if let Some(before) = self.hooks.before.clone() {
            match before(&mut tenant.conn).await {
                Ok(ctx) => Some(ctx),
                Err(err) => {
                    if let Some(task) = leak_task {
                        task.abort();
                    }
                    self.bag.evict(&slot);
                    return Err(err);
                }
            }
        } else {
            None
        };

        Ok(PooledConnection::new(Arc::clone(self), slot, tenant, hook_ctx, leak_task))
    }

    pub(super) fn try_acquire(self: &Arc<Self>) -> Option<PooledConnection> {
        if self.is_closed() {
            return None;
        }
        let (slot, tenant) = self.bag.try_reserve()?;
        slot.state.store(ConnectionState::InUse);
        slot.touch_used();
        let leak_task = self
            .options
            .leak_detection_threshold
            .map(|threshold| leak::spawn(Arc::clone(&slot), threshold));
        Some(PooledConnection::new(Arc::clone(self), slot, tenant, None, leak_task))
    }

    /// Called by [`PooledConnection`]'s release path once the connection has
    /// been rolled back (if needed) and the `after` hook has run.
    /// Removes a slot the caller is detaching explicitly (`PooledConnection::close`)
    /// rather than returning.
    pub(super) fn evict(&self, slot: &Arc<super::slot::Slot>) {
        self.bag.evict(slot);
    }

    pub(super) fn release(&self, slot: Arc<super::slot::Slot>, tenant: Tenant, poisoned: bool) {
        if poisoned || self.is_closed() {
            self.bag.evict(&slot);
        } else {
            self.bag.release(slot, tenant);
        }
    }

    pub(super) async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        for task in self.maintenance.lock().unwrap().drain(..) {
            task.abort();
        }
        for slot in self.bag.close() {
            let tenant = slot.take();
            let _ = tenant.conn.close().await;
        }
    }
}
