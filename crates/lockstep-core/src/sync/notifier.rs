//! Deduplicating offset change notifications

use std::rc::Rc;

/// Callback invoked with the group's new offset
pub type OffsetListener = Rc<dyn Fn(f64)>;

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Caches the last reported offset and only releases listeners on a strict change
pub struct OffsetNotifier {
    last_offset: f64,
    listeners: Vec<(ListenerId, OffsetListener)>,
    next_id: u64,
}

impl OffsetNotifier {
    pub fn new(initial_offset: f64) -> Self {
        Self {
            last_offset: initial_offset,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn add(&mut self, listener: OffsetListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn last_offset(&self) -> f64 {
        self.last_offset
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Record `offset` and return the listeners to call if it changed
    ///
    /// Listeners are handed back rather than invoked so the caller can release
    /// any borrow of the group before running them.
    pub fn observe(&mut self, offset: f64) -> Option<Vec<OffsetListener>> {
        if same_offset(offset, self.last_offset) {
            return None;
        }
        self.last_offset = offset;
        Some(self.listeners.iter().map(|(_, listener)| Rc::clone(listener)).collect())
    }
}

/// Numeric equality, except that NaN matches NaN so it is not reported twice
fn same_offset(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}
