//! Engine lifecycle state and the refresh guard
//!
//! The state lives in a single `AtomicU8`. A refresh may only start by
//! swapping `Idle` for `Refreshing`; the returned guard puts `Idle` back
//! when dropped, whether the refresh finished, failed or was cancelled.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a configuration provider
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Initial load has not finished
    NotReady = 0,
    Idle = 1,
    Refreshing = 2,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotReady,
            1 => Self::Idle,
            _ => Self::Refreshing,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(EngineState::NotReady as u8),
        }
    }

    pub(crate) fn load(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Leave `NotReady`; later calls are no-ops
    pub(crate) fn mark_ready(&self) {
        let _ = self.state.compare_exchange(
            EngineState::NotReady as u8,
            EngineState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Try to move `Idle -> Refreshing`
    ///
    /// On failure returns the state that blocked the transition.
    pub(crate) fn try_acquire(&self) -> Result<RefreshGuard<'_>, EngineState> {
        self.state
            .compare_exchange(
                EngineState::Idle as u8,
                EngineState::Refreshing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| RefreshGuard { state: &self.state })
            .map_err(EngineState::from_u8)
    }
}

/// Exclusive right to run a refresh (RAII)
pub(crate) struct RefreshGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.state.store(EngineState::Idle as u8, Ordering::Release);
    }
}
