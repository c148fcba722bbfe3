//! Linear undo/redo history over an arbitrary state value.

/// Undo/redo container holding past, present and future values.
///
/// New edits always discard the redo chain (linear history, not a tree).
/// Both stacks keep their most recent entry at the end, so `undo` and
/// `redo` are plain pops.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: Vec<T>,
    present: T,
    future: Vec<T>,
    /// Value present before the first uncommitted amendment.
    amended_from: Option<T>,
    limit: Option<usize>,
}

impl<T: Clone> History<T> {
    /// Create a history with `initial` as the present and no past.
    pub fn new(initial: T) -> Self {
        Self {
            past: Vec::new(),
            present: initial,
            future: Vec::new(),
            amended_from: None,
            limit: None,
        }
    }

    /// Cap the number of undo entries; the oldest entries are dropped first.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self.enforce_limit();
        self
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Install `next` as the present, recording the current value for undo.
    pub fn set(&mut self, next: T) {
        let current = std::mem::replace(&mut self.present, next);
        let previous = self.amended_from.take().unwrap_or(current);
        self.past.push(previous);
        self.future.clear();
        self.enforce_limit();
    }

    /// Compute the next value from the present and install it.
    pub fn set_with(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.present);
        self.set(next);
    }

    /// Replace the present without creating an undo entry.
    ///
    /// Consecutive amendments coalesce: the next [`set`](Self::set) records
    /// the value from before the first amendment as a single undo step.
    pub fn amend(&mut self, next: T) {
        let before = std::mem::replace(&mut self.present, next);
        if self.amended_from.is_none() {
            self.amended_from = Some(before);
        }
    }

    /// Check if amendments are waiting to be committed.
    pub fn has_pending_amend(&self) -> bool {
        self.amended_from.is_some()
    }

    /// Record pending amendments as one undo entry.
    pub fn commit(&mut self) {
        if let Some(before) = self.amended_from.take() {
            self.past.push(before);
            self.future.clear();
            self.enforce_limit();
        }
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.commit();
        match self.past.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.present, previous);
                self.future.push(current);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    ///
    /// Pending amendments are a new edit: they are committed first, which
    /// discards the redo chain.
    pub fn redo(&mut self) -> bool {
        self.commit();
        match self.future.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.present, next);
                self.past.push(current);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.amended_from.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty() && self.amended_from.is_none()
    }

    /// Drop all past and future entries, keeping the present.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.amended_from = None;
    }

    /// Replace the present and forget all history.
    pub fn reset(&mut self, present: T) {
        self.present = present;
        self.clear();
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            if self.past.len() > limit {
                let excess = self.past.len() - limit;
                self.past.drain(..excess);
            }
        }
    }
}

impl<T: Clone + Default> Default for History<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
