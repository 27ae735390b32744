use std::time::{Duration, Instant};

/// Handle returned by [`Timers::schedule`], used to cancel a single entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerId(u64);

struct Entry<E>
{
    id: TimerId,
    due: Instant,
    event: E,
}

/// Deadline-ordered queue of delayed events.
///
/// Nothing fires by itself: the owner polls [`Timers::pop_due`] from its tick.
/// Entries with the same deadline fire in the order they were scheduled.
pub struct Timers<E>
{
    next_id: u64,
    entries: Vec<Entry<E>>,
}

impl<E> Timers<E>
{
    pub fn new() -> Self
    {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, event: E) -> TimerId
    {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due: now + delay,
            event,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool
    {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub fn clear(&mut self)
    {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant>
    {
        self.entries.iter().map(|entry| entry.due).min()
    }

    /// Removes the earliest entry whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, E)>
    {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= now)
            .min_by_key(|(_, entry)| (entry.due, entry.id.0))
            .map(|(index, _)| index)?;
        let entry = self.entries.remove(index);
        Some((entry.due, entry.event))
    }
}

impl<E> Default for Timers<E>
{
    fn default() -> Self
    {
        Self::new()
    }
}
