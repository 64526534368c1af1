//! §4.11 leak detection: a delayed task started on every reservation that,
//! if the threshold elapses while the slot is still checked out, logs a
//! warning naming the slot. Cancelled on release via `JoinHandle::abort`.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::slot::Slot;
use super::state::ConnectionState;

pub fn spawn(slot: Arc<Slot>, threshold: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(threshold).await;

        // `Idle`/`Removed` mean the connection was released or evicted
        // before the threshold elapsed; only a still-outstanding
        // reservation is a leak.
        let state = slot.state.load();
        if state == ConnectionState::InUse || state == ConnectionState::Reserved {
            warn!(
                slot_id = slot.id,
                held_for = ?threshold,
                "possible connection leak: reservation still outstanding past leakDetectionThreshold"
            );
        }
    })
}
