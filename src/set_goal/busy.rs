// src/set_goal/busy.rs
use tokio::sync::watch;

/// Count of in-flight requests; the screen is busy while it is non-zero.
#[derive(Debug)]
pub struct PendingRequests {
    count: watch::Sender<usize>,
}

impl Default for PendingRequests {
    fn default() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }
}

impl PendingRequests {
    /// Increments the counter until the returned guard is dropped.
    #[must_use = "the request is only counted while the guard is alive"]
    pub fn acquire(&self) -> BusyGuard<'_> {
        self.count.send_modify(|count| *count += 1);
        BusyGuard { pending: self }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

pub struct BusyGuard<'a> {
    pending: &'a PendingRequests,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .count
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
