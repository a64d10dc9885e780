use std::collections::BTreeMap;
use std::fmt::Display;

use types::Offset;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OffsetState {
    Pending,
    InProgress,
    /// Terminal; holds the number of records the page returned.
    Completed(usize),
    /// Holds the failed attempts so far. Terminal once it reaches the
    /// tracker's `max_retries`.
    Failed(u32),
}

impl Display for OffsetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetState::Pending => write!(f, "pending"),
            OffsetState::InProgress => write!(f, "in progress"),
            OffsetState::Completed(count) => write!(f, "completed ({count})"),
            OffsetState::Failed(retries) => write!(f, "failed ({retries})"),
        }
    }
}

/// Per-offset state for one provider run. Offsets that were never touched
/// are `Pending` and are not stored.
#[derive(Debug, Clone)]
pub struct OffsetTracker {
    page_size: u64,
    max_retries: u32,
    states: BTreeMap<Offset, OffsetState>,
    retries: BTreeMap<Offset, u32>,
}

impl OffsetTracker {
    pub fn new(page_size: u64, max_retries: u32) -> Self {
        Self {
            page_size,
            max_retries,
            states: BTreeMap::new(),
            retries: BTreeMap::new(),
        }
    }

    pub fn state(&self, offset: Offset) -> OffsetState {
        self.states
            .get(&offset)
            .copied()
            .unwrap_or(OffsetState::Pending)
    }

    fn is_retryable(&self, state: OffsetState) -> bool {
        matches!(state, OffsetState::Failed(retries) if retries < self.max_retries)
    }

    /// Up to `max_batch` offsets to fetch next, all below `target`.
    ///
    /// Retryable failures come first, then pending offsets scanned upwards
    /// from zero, each group in ascending order. Nothing is returned once
    /// `already_fetched` reaches `target`.
    pub fn next_batch(&self, already_fetched: u64, target: u64, max_batch: usize) -> Vec<Offset> {
        if max_batch == 0 || self.page_size == 0 || already_fetched >= target {
            return Vec::new();
        }

        let mut batch: Vec<Offset> = self
            .states
            .iter()
            .filter(|(offset, state)| **offset < target && self.is_retryable(**state))
            .map(|(offset, _)| *offset)
            .take(max_batch)
            .collect();

        let mut offset: Offset = 0;
        while batch.len() < max_batch && offset < target {
            if self.state(offset) == OffsetState::Pending {
                batch.push(offset);
            }
            match offset.checked_add(self.page_size) {
                Some(next) => offset = next,
                None => break,
            }
        }
        batch
    }

    /// Returns false, leaving the state alone, for an offset that is already
    /// completed or in flight.
    pub fn mark_in_progress(&mut self, offset: Offset) -> bool {
        match self.state(offset) {
            OffsetState::Completed(_) | OffsetState::InProgress => false,
            _ => {
                self.states.insert(offset, OffsetState::InProgress);
                true
            }
        }
    }

    pub fn mark_completed(&mut self, offset: Offset, record_count: usize) {
        self.states
            .insert(offset, OffsetState::Completed(record_count));
        self.retries.remove(&offset);
    }

    /// Records a failed attempt and returns whether the offset may be tried
    /// again.
    pub fn mark_failed(&mut self, offset: Offset) -> bool {
        let retries = self.retries.entry(offset).or_insert(0);
        *retries += 1;
        let state = OffsetState::Failed(*retries);
        self.states.insert(offset, state);
        self.is_retryable(state)
    }

    /// Seeds the tracker from a checkpoint. Failed offsets without a stored
    /// count are treated as exhausted.
    pub fn restore(
        &mut self,
        completed: impl IntoIterator<Item = (Offset, usize)>,
        failed: impl IntoIterator<Item = Offset>,
        retry_counts: impl IntoIterator<Item = (Offset, u32)>,
    ) {
        let retry_counts: BTreeMap<Offset, u32> = retry_counts.into_iter().collect();
        for offset in failed {
            let retries = retry_counts
                .get(&offset)
                .copied()
                .unwrap_or(self.max_retries);
            self.retries.insert(offset, retries);
            self.states.insert(offset, OffsetState::Failed(retries));
        }
        for (offset, count) in completed {
            self.mark_completed(offset, count);
        }
    }

    /// Gives every exhausted offset a fresh retry budget. Returns how many
    /// offsets were reset.
    pub fn reset_exhausted(&mut self) -> usize {
        let exhausted = self.permanently_failed();
        for offset in &exhausted {
            self.states.remove(offset);
            self.retries.remove(offset);
        }
        exhausted.len()
    }

    pub fn completed(&self) -> Vec<(Offset, usize)> {
        self.states
            .iter()
            .filter_map(|(offset, state)| match state {
                OffsetState::Completed(count) => Some((*offset, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<Offset> {
        self.states
            .iter()
            .filter(|(_, state)| matches!(state, OffsetState::Failed(_)))
            .map(|(offset, _)| *offset)
            .collect()
    }

    pub fn permanently_failed(&self) -> Vec<Offset> {
        self.states
            .iter()
            .filter(|(_, state)| {
                matches!(state, OffsetState::Failed(_)) && !self.is_retryable(**state)
            })
            .map(|(offset, _)| *offset)
            .collect()
    }

    pub fn retry_counts(&self) -> BTreeMap<Offset, u32> {
        self.retries.clone()
    }

    pub fn in_progress(&self) -> usize {
        self.states
            .values()
            .filter(|state| **state == OffsetState::InProgress)
            .count()
    }
}
