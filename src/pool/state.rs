//! §3 `ConnectionState`: `Idle -> Reserved -> InUse -> Idle` on release, or
//! `Idle -> Removed` on eviction. `Removed` is terminal. Every transition in
//! this module is a single CAS; nothing here ever blocks.

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RESERVED: u8 = 1;
const IN_USE: u8 = 2;
const REMOVED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Reserved,
    InUse,
    Removed,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => IDLE,
            ConnectionState::Reserved => RESERVED,
            ConnectionState::InUse => IN_USE,
            ConnectionState::Removed => REMOVED,
        }
    }

    fn from_u8(raw: u8) -> ConnectionState {
        match raw {
            IDLE => ConnectionState::Idle,
            RESERVED => ConnectionState::Reserved,
            IN_USE => ConnectionState::InUse,
            _ => ConnectionState::Removed,
        }
    }
}

/// The atomic cell backing one slot's state. `Slot` wraps this rather than
/// a bare `AtomicU8` so every transition goes through a named, checked CAS.
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(initial: ConnectionState) -> Self {
        StateCell(AtomicU8::new(initial.to_u8()))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Attempts `from -> to`. Returns `true` on success; a losing CAS means
    /// some other task won the race for this slot, which the caller treats
    /// as "try the next slot", never as an error.
    pub fn try_transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditional transition, used only where the caller already holds
    /// exclusive access to the slot (its own reservation).
    pub fn store(&self, to: ConnectionState) {
        self.0.store(to.to_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_transitions() {
        let cell = StateCell::new(ConnectionState::Idle);
        assert!(cell.try_transition(ConnectionState::Idle, ConnectionState::Reserved));
        assert_eq!(cell.load(), ConnectionState::Reserved);
        assert!(!cell.try_transition(ConnectionState::Idle, ConnectionState::Reserved));
    }

    #[test]
    fn removed_is_sticky_under_store() {
        let cell = StateCell::new(ConnectionState::InUse);
        cell.store(ConnectionState::Removed);
        assert_eq!(cell.load(), ConnectionState::Removed);
    }
}
