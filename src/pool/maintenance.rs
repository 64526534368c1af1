//! §4.11: the pool's three periodic background tasks. Each is its own
//! scheduling loop, spawned once from [`super::inner::SharedPool::new`] and
//! aborted on [`super::inner::SharedPool::close`].

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::inner::SharedPool;
use super::slot::Slot;
use super::state::ConnectionState;

/// Spawns the house-keeper, keepalive, and (if enabled) adaptive-sizer
/// loops, returning their join handles so the caller can abort them on
/// close. Tasks hold only a [`Weak`] reference to the pool so a dropped
/// pool's maintenance loops exit instead of keeping it alive forever.
pub(super) fn spawn_all(pool: &Arc<SharedPool>) -> Vec<tokio::task::JoinHandle<()>> {
    let mut tasks = vec![
        tokio::spawn(house_keeper(Arc::downgrade(pool))),
        tokio::spawn(keepalive(Arc::downgrade(pool))),
    ];

    if pool.options.adaptive_sizing {
        tasks.push(tokio::spawn(adaptive_sizer(Arc::downgrade(pool))));
    }

    tasks
}

/// §4.11 house-keeper: evicts `Idle` connections whose `lastUsedAt` is
/// older than `idleTimeout` (down to `minConnections`), and unconditionally
/// evicts any connection older than `maxLifetime` regardless of state.
async fn house_keeper(pool: Weak<SharedPool>) {
    loop {
        let Some(pool) = pool.upgrade() else { return };
        tokio::time::sleep(pool.options.maintenance_interval).await;
        if pool.is_closed() {
            return;
        }

        let mut idle_evictable: Vec<Arc<Slot>> = pool
            .bag
            .snapshot()
            .into_iter()
            .filter(|slot| slot.state.load() == ConnectionState::Idle)
            .collect();

        // Oldest-idle-first, so the eviction order is deterministic and
        // favors keeping recently-warmed connections around.
        idle_evictable.sort_by_key(|slot| std::cmp::Reverse(slot.idle_for()));

        let min = pool.options.min_connections;
        if let Some(idle_timeout) = pool.options.idle_timeout {
            let mut size = pool.bag.size();
            for slot in &idle_evictable {
                if size <= min {
                    break;
                }
                if slot.idle_for() < idle_timeout {
                    continue;
                }
                if let Some(tenant) = pool.bag.reserve_specific(slot) {
                    pool.bag.remove_idle(slot);
                    size = pool.bag.size();
                    debug!(slot_id = slot.id, "house-keeper: evicting idle connection past idleTimeout");
                    let _ = tenant.conn.close().await;
                }
            }
        }

        if let Some(max_lifetime) = pool.options.max_lifetime {
            for slot in pool.bag.snapshot() {
                if slot.state.load() != ConnectionState::Idle || slot.age() < max_lifetime {
                    continue;
                }
                if let Some(tenant) = pool.bag.reserve_specific(&slot) {
                    pool.bag.remove_idle(&slot);
                    debug!(slot_id = slot.id, "house-keeper: evicting connection past maxLifetime");
                    let _ = tenant.conn.close().await;
                }
            }
        }
    }
}

/// §4.11 keepalive: periodically validates `Idle` connections that have
/// gone too long without a liveness check, so a silently-dropped server
/// side connection is caught before a caller's acquisition trips over it.
async fn keepalive(pool: Weak<SharedPool>) {
    loop {
        let Some(pool) = pool.upgrade() else { return };
        tokio::time::sleep(pool.options.keepalive_time).await;
        if pool.is_closed() {
            return;
        }

        for slot in pool.bag.snapshot() {
            if slot.state.load() != ConnectionState::Idle {
                continue;
            }
            if slot.since_validated() <= pool.options.keepalive_time {
                continue;
            }

            let Some(mut tenant) = pool.bag.reserve_specific(&slot) else {
                continue;
            };

            if tenant
                .conn
                .is_valid(pool.options.validation_timeout)
                .await
            {
                slot.touch_validated();
                pool.bag.release(slot, tenant);
            } else {
                warn!(slot_id = slot.id, "keepalive probe failed; removing connection");
                pool.bag.remove_idle(&slot);
                let _ = tenant.conn.close().await;
            }
        }
    }
}

/// §4.11 adaptive sizer: watches the instantaneous `inUse/total` ratio and
/// nudges the pool toward `maxConnections` under sustained pressure or back
/// toward `minConnections` once it subsides, with a cooldown between
/// adjustments so a single burst doesn't cause oscillation.
async fn adaptive_sizer(pool: Weak<SharedPool>) {
    const HIGH_WATER: f64 = 0.8;
    const LOW_WATER: f64 = 0.3;

    loop {
        let Some(pool) = pool.upgrade() else { return };
        tokio::time::sleep(pool.options.adaptive_interval).await;
        if pool.is_closed() {
            return;
        }

        let size = pool.bag.size();
        if size == 0 {
            continue;
        }
        let ratio = f64::from(pool.bag.in_use()) / f64::from(size);

        if ratio >= HIGH_WATER && size < pool.options.max_connections {
            match pool.bag.grow_idle().await {
                Ok(true) => debug!(ratio, size, "adaptive sizer: scaling up"),
                Ok(false) => {}
                Err(err) => warn!(error = %err, "adaptive sizer: scale-up connection failed"),
            }
        } else if ratio <= LOW_WATER && size > pool.options.min_connections {
            if let Some(tenant) = pool.bag.try_shrink_idle() {
                debug!(ratio, size, "adaptive sizer: scaling down");
                let _ = tenant.conn.close().await;
            }
        }
    }
}
