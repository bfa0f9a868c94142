use crate::grouping::group::{Group, GroupError, GroupProcessor};

/// Group that completes after a fixed number of events, in arrival order.
pub struct SizeGroup<E> {
    key: String,
    timestamp: u64,
    size: usize,
    events: Vec<E>,
}

impl<E> SizeGroup<E> {
    pub fn new(key: impl Into<String>, timestamp: u64, size: usize) -> Self {
        Self {
            key: key.into(),
            timestamp,
            size,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn into_events(self) -> Vec<E> {
        self.events
    }
}

impl<E> Group<E> for SizeGroup<E> {
    fn key(&self) -> &str {
        &self.key
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn complete(&self) -> bool {
        self.events.len() == self.size
    }

    fn add(&mut self, event: E) -> Result<(), GroupError> {
        self.events.push(event);
        Ok(())
    }
}

/// Finalizes size-based groups through a callback.
pub struct SizeGroupProcessor<E> {
    size: usize,
    sink: Box<dyn FnMut(Vec<E>) + Send>,
}

impl<E> SizeGroupProcessor<E> {
    pub fn new(size: usize, sink: impl FnMut(Vec<E>) + Send + 'static) -> Self {
        Self {
            size,
            sink: Box::new(sink),
        }
    }
}

impl<E> GroupProcessor<E> for SizeGroupProcessor<E> {
    type Grouped = SizeGroup<E>;

    fn new_group(&mut self, key: &str, timestamp: u64) -> SizeGroup<E> {
        SizeGroup::new(key, timestamp, self.size)
    }

    fn process_group(&mut self, group: SizeGroup<E>) {
        (self.sink)(group.into_events());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_at_exact_size() {
        let mut group = SizeGroup::new("k", 0, 2);
        assert!(!group.complete());
        group.add("a").unwrap();
        assert!(!group.complete());
        group.add("b").unwrap();
        assert!(group.complete());
        assert_eq!(group.events(), &["a", "b"]);
    }

    #[test]
    fn test_events_keep_arrival_order() {
        let mut group = SizeGroup::new("k", 0, 3);
        for event in ["x", "y", "z"] {
            group.add(event).unwrap();
        }
        assert_eq!(group.into_events(), vec!["x", "y", "z"]);
    }
}
