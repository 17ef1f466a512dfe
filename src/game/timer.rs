use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::{CancellationToken, DropGuard};

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Ownership of the one discussion timer a session may have. Dropping the
/// handle cancels the task.
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
    _guard: DropGuard,
}

impl TimerHandle {
    /// The token goes to the spawned task; the handle stays on the session.
    pub fn new() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let handle = Self {
            id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
            _guard: token.clone().drop_guard(),
        };
        (handle, token)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
