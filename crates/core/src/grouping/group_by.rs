use std::collections::{HashMap, VecDeque};

use crate::grouping::group::{Group, GroupError, GroupProcessor};
use crate::grouping::key_buffer::KeyBuffer;
use crate::shared::constants::{DEFAULT_BUFFER_FACTOR, DEFAULT_GROUP_TIMEOUT_MS};
use crate::shared::time::timestamp_now;

/// Capacity and eviction policy of a [`GroupByProcessor`].
#[derive(Clone, Debug)]
pub struct GroupByConfig {
    /// Maximum number of concurrently active groups.
    pub max_size: usize,
    /// Age in milliseconds after which an incomplete group is evicted.
    pub timeout_ms: u64,
    /// Completed/dropped buffers hold `buffer_factor * max_size` keys.
    pub buffer_factor: usize,
}

impl Default for GroupByConfig {
    fn default() -> Self {
        Self {
            max_size: 1,
            timeout_ms: DEFAULT_GROUP_TIMEOUT_MS,
            buffer_factor: DEFAULT_BUFFER_FACTOR,
        }
    }
}

type KeyFn<E> = Box<dyn Fn(&E) -> Result<String, GroupError> + Send>;
type ClockFn = Box<dyn Fn() -> u64 + Send>;

/// Routes keyed events into their correlation group.
///
/// Active groups are bounded by `max_size`; a key first seen while the
/// active set is full is dropped and remembered, so the rest of its events
/// are dropped consistently. Completed keys are remembered so late
/// stragglers are discarded instead of opening a fresh group. Incomplete
/// groups older than the timeout are evicted oldest-first without
/// finalization; their keys are forgotten, allowing a fresh group to form
/// under the same key later.
pub struct GroupByProcessor<E, P: GroupProcessor<E>> {
    processor: P,
    key_fn: KeyFn<E>,
    groups: HashMap<String, P::Grouped>,
    order: VecDeque<String>,
    completed: KeyBuffer,
    dropped: KeyBuffer,
    config: GroupByConfig,
    clock: ClockFn,
}

impl<E, P: GroupProcessor<E>> GroupByProcessor<E, P> {
    pub fn new(
        processor: P,
        key_fn: impl Fn(&E) -> Result<String, GroupError> + Send + 'static,
    ) -> Self {
        Self::with_config(processor, key_fn, GroupByConfig::default())
    }

    pub fn with_config(
        processor: P,
        key_fn: impl Fn(&E) -> Result<String, GroupError> + Send + 'static,
        config: GroupByConfig,
    ) -> Self {
        let buffer = config.buffer_factor * config.max_size;
        Self {
            processor,
            key_fn: Box::new(key_fn),
            groups: HashMap::new(),
            order: VecDeque::new(),
            completed: KeyBuffer::new(buffer),
            dropped: KeyBuffer::new(buffer),
            config,
            clock: Box::new(timestamp_now),
        }
    }

    /// Replace the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The correlation key of an event.
    pub fn key(&self, event: &E) -> Result<String, GroupError> {
        (self.key_fn)(event)
    }

    /// The underlying group processor, e.g. to drain its output.
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Number of currently active groups.
    pub fn active(&self) -> usize {
        self.groups.len()
    }

    /// Route one event: evict aged groups, then create, feed, and finalize.
    pub fn process(&mut self, event: E) -> Result<(), GroupError> {
        let key = (self.key_fn)(&event)?;
        self.evict_expired();

        if self.completed.contains(&key) {
            log::debug!("Discarding event for completed group {key}");
            return Ok(());
        }
        if self.dropped.contains(&key) {
            return Ok(());
        }

        if !self.groups.contains_key(&key) {
            if self.groups.len() >= self.config.max_size {
                log::debug!("Dropping group {key}: active set is full");
                self.dropped.insert(&key);
                return Ok(());
            }
            let group = self.processor.new_group(&key, (self.clock)());
            self.groups.insert(key.clone(), group);
            self.order.push_back(key.clone());
        }

        if let Some(group) = self.groups.get_mut(&key) {
            group.add(event)?;
            if !group.complete() {
                return Ok(());
            }
        }

        if let Some(group) = self.groups.remove(&key) {
            self.processor.process_group(group);
            self.order.retain(|k| k != &key);
            self.completed.insert(&key);
        }
        Ok(())
    }

    fn evict_expired(&mut self) {
        let now = (self.clock)();
        while let Some(oldest) = self.order.front() {
            let expired = self
                .groups
                .get(oldest)
                .map(|g| now.saturating_sub(g.timestamp()) > self.config.timeout_ms)
                .unwrap_or(true);
            if !expired {
                break;
            }
            if let Some(key) = self.order.pop_front() {
                if self.groups.remove(&key).is_some() {
                    log::debug!("Group {key} timed out");
                }
            }
        }
    }
}
