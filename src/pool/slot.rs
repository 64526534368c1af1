//! §3 `PooledConnection`: one pool-owned slot. The state cell is the single
//! source of truth for who may touch `cell`'s contents; `cell` itself is a
//! plain [`std::sync::Mutex`] rather than `unsafe` interior mutability
//! (`#![forbid(unsafe_code)]`, crate-wide) — in steady state it is only ever
//! locked by whichever task just won the CAS on `state`, so the lock is
//! uncontended and never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::connection::MySqlConnection;

use super::state::{ConnectionState, StateCell};

/// A live connection plus the bookkeeping the pool needs to decide when to
/// validate, recycle, or evict it. Held inside a [`Slot`]'s `cell` while
/// `Idle`, and inside a [`super::pooled::PooledConnection`] while reserved.
pub struct Tenant {
    pub conn: MySqlConnection,
    pub use_count: u64,
}

/// One array element of the [`super::bag::Bag`]. `id` is stable for the
/// slot's lifetime (it is never reused across a `Removed` slot being
/// replaced); it is what leak-detection log lines and metrics key on.
pub struct Slot {
    pub id: u64,
    pub state: StateCell,
    pub cell: Mutex<Option<Tenant>>,
    pub created_at: Instant,
    epoch: Instant,
    last_used_at_millis: AtomicU64,
    last_validated_at_millis: AtomicU64,
}

impl Slot {
    pub fn new(id: u64, epoch: Instant, conn: MySqlConnection) -> Self {
        let now = epoch.elapsed().as_millis() as u64;
        Slot {
            id,
            state: StateCell::new(ConnectionState::Reserved),
            cell: Mutex::new(Some(Tenant { conn, use_count: 0 })),
            created_at: Instant::now(),
            epoch,
            last_used_at_millis: AtomicU64::new(now),
            last_validated_at_millis: AtomicU64::new(now),
        }
    }

    pub fn touch_used(&self) {
        self.last_used_at_millis
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Release);
    }

    pub fn touch_validated(&self) {
        self.last_validated_at_millis
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Release);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_used_at_millis.load(Ordering::Acquire);
        Duration::from_millis((self.epoch.elapsed().as_millis() as u64).saturating_sub(last))
    }

    pub fn since_validated(&self) -> Duration {
        let last = self.last_validated_at_millis.load(Ordering::Acquire);
        Duration::from_millis((self.epoch.elapsed().as_millis() as u64).saturating_sub(last))
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Takes the tenant out of an `Idle` slot's cell. Panics if called on a
    /// slot whose cell is unexpectedly empty, which would mean two owners
    /// believed they held the same `Reserved` transition — a logic bug, not
    /// a recoverable condition.
    pub fn take(&self) -> Tenant {
        self.cell
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .expect("(bug) reserved slot had no tenant")
    }

    pub fn put(&self, tenant: Tenant) {
        *self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tenant);
    }
}
