/// Cancel handle for a scheduled timer, never reused within a queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Clone, Debug)]
struct Scheduled<K> {
    handle: TimerHandle,
    due_ms: u64,
    kind: K,
}

/// One-shot timers owned by a session. Dropping the queue drops every timer with it, so nothing
/// can fire against a session that was replaced.
#[derive(Clone, Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    pending: Vec<Scheduled<K>>,
}

impl<K: Copy> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn schedule(&mut self, due_ms: u64, kind: K) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            handle,
            due_ms,
            kind,
        });
        handle
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        self.pending.len() != before
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|timer| timer.due_ms).min()
    }

    /// Removes the earliest timer due at or before `now_ms`. Timers due at the same instant
    /// come out in scheduling order.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerHandle, u64, K)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_ms <= now_ms)
            .min_by_key(|(_, timer)| (timer.due_ms, timer.handle.0))
            .map(|(index, _)| index)?;
        let timer = self.pending.swap_remove(index);
        Some((timer.handle, timer.due_ms, timer.kind))
    }
}

impl<K: Copy> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(300, 'c');
        queue.schedule(100, 'a');
        queue.schedule(200, 'b');

        assert_eq!(queue.next_due(), Some(100));
        assert_eq!(queue.pop_due(50), None);

        let fired: Vec<_> = std::iter::from_fn(|| queue.pop_due(250))
            .map(|(_, due, kind)| (due, kind))
            .collect();
        assert_eq!(fired, [(100, 'a'), (200, 'b')]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn ties_keep_scheduling_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(10, 1);
        queue.schedule(10, 2);
        queue.schedule(10, 3);

        let kinds: Vec<_> = std::iter::from_fn(|| queue.pop_due(10))
            .map(|(_, _, kind)| kind)
            .collect();
        assert_eq!(kinds, [1, 2, 3]);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(10, "reveal");
        queue.schedule(20, "tick");

        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert_eq!(queue.pop_due(100).map(|(_, _, kind)| kind), Some("tick"));
        assert!(queue.is_empty());
    }
}
