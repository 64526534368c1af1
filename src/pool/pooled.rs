//! §3 `PooledConnection` + §9 "effectful `Resource`-style scopes": the RAII
//! handle returned by [`super::Pool::acquire`]. `release()` is the
//! structured-concurrency exit path (rollback, `after` hook, session reset,
//! then handed back to the bag); `Drop` is the fallback for every other
//! exit — early return, `?`, panic, or task cancellation — and reaches for
//! it the same way the teacher driver's `pool::conn::PoolConnection` does:
//! take the live connection out of an `Option` and give it back to the
//! pool. Because that handoff here needs `async` work (a possible
//! rollback, the `after` hook, `COM_RESET_CONNECTION`), `Drop` spawns a
//! detached task to run the same release routine rather than skip it.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::warn;

use crate::connection::MySqlConnection;

use super::hooks::HookContext;
use super::inner::SharedPool;
use super::slot::{Slot, Tenant};

/// A connection checked out from a [`super::Pool`]. Derefs to
/// [`MySqlConnection`]; returns itself to the pool when dropped or when
/// [`PooledConnection::release`] is called explicitly.
pub struct PooledConnection {
    pool: Arc<SharedPool>,
    slot: Option<Arc<Slot>>,
    tenant: Option<Tenant>,
    hook_ctx: Option<HookContext>,
    leak_task: Option<tokio::task::JoinHandle<()>>,
}

impl PooledConnection {
    pub(super) fn new(
        pool: Arc<SharedPool>,
        slot: Arc<Slot>,
        tenant: Tenant,
        hook_ctx: Option<HookContext>,
        leak_task: Option<tokio::task::JoinHandle<()>>,
    ) -> Self {
        PooledConnection {
            pool,
            slot: Some(slot),
            tenant: Some(tenant),
            hook_ctx,
            leak_task,
        }
    }

    /// How many times this underlying connection has been checked out,
    /// including the current reservation.
    pub fn use_count(&self) -> u64 {
        self.tenant.as_ref().map(|t| t.use_count).unwrap_or(0)
    }

    pub fn slot_id(&self) -> u64 {
        self.slot.as_ref().map(|s| s.id).unwrap_or(0)
    }

    /// Explicitly ends this reservation: rolls back any open transaction if
    /// auto-commit was disabled (§4.8 scope-exit rule), runs the `after`
    /// hook (§4.13), resets session state for reuse, and returns the
    /// connection to the pool. Prefer this over relying on `Drop` when the
    /// outcome of those steps matters to the caller.
    pub async fn release(mut self) -> crate::Result<()> {
        let (slot, tenant) = match (self.slot.take(), self.tenant.take()) {
            (Some(slot), Some(tenant)) => (slot, tenant),
            _ => return Ok(()),
        };
        if let Some(task) = self.leak_task.take() {
            task.abort();
        }
        let hook_ctx = self.hook_ctx.take();
        finish_release(Arc::clone(&self.pool), slot, tenant, hook_ctx).await;
        Ok(())
    }

    /// Detaches the connection from the pool and closes it gracefully
    /// (`COM_QUIT`) instead of returning it — the pool's `size()` drops by
    /// one and a replacement is created lazily on the next reservation.
    pub async fn close(mut self) -> crate::Result<()> {
        let (slot, tenant) = match (self.slot.take(), self.tenant.take()) {
            (Some(slot), Some(tenant)) => (slot, tenant),
            _ => return Ok(()),
        };
        if let Some(task) = self.leak_task.take() {
            task.abort();
        }
        self.pool.evict(&slot);
        tenant.conn.close().await
    }
}

/// Runs the release sequence and hands the tenant back to the bag
/// (healthy) or evicts it (poisoned). Shared between the explicit
/// `release()` path and the `Drop`-spawned fallback.
async fn finish_release(
    pool: Arc<SharedPool>,
    slot: Arc<Slot>,
    mut tenant: Tenant,
    hook_ctx: Option<HookContext>,
) {
    let mut poisoned = false;

    if !tenant.conn.auto_commit() {
        if let Err(err) = tenant.conn.rollback().await {
            warn!(slot_id = slot.id, error = %err, "rollback on release failed; evicting connection");
            poisoned = true;
        }
    }

    if !poisoned {
        if let Some(after) = pool.hooks.after.clone() {
            if let Err(err) = after(hook_ctx.unwrap_or_else(|| Box::new(())), &mut tenant.conn).await {
                warn!(slot_id = slot.id, error = %err, "after-acquire hook failed; evicting connection");
                poisoned = true;
            }
        }
    }

    if !poisoned {
        if let Err(err) = tenant.conn.reset_server_state().await {
            warn!(slot_id = slot.id, error = %err, "session reset on release failed; evicting connection");
            poisoned = true;
        }
    }

    tenant.use_count += 1;
    pool.release(slot, tenant, poisoned);
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(task) = self.leak_task.take() {
            task.abort();
        }
        if let (Some(slot), Some(tenant)) = (self.slot.take(), self.tenant.take()) {
            let pool = Arc::clone(&self.pool);
            let hook_ctx = self.hook_ctx.take();
            tokio::spawn(finish_release(pool, slot, tenant, hook_ctx));
        }
    }
}

impl Deref for PooledConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &self.tenant.as_ref().expect("(bug) connection already released").conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tenant.as_mut().expect("(bug) connection already released").conn
    }
}
