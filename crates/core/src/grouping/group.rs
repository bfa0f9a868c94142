use thiserror::Error;

/// Errors raised while correlating partial annotation events.
///
/// All of these indicate a violated upstream data contract for a single
/// event; the event is dropped, correlation continues.
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("mention without segment")]
    MissingSegment,
    #[error("mention without annotation")]
    MissingAnnotation,
    #[error("expected a {expected} annotation, got {found}")]
    UnexpectedAnnotation {
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected exactly one container id, found {0}")]
    AmbiguousContainer(usize),
    #[error("group {0} has not received all annotations")]
    Incomplete(String),
}

/// Accumulator for partial events sharing a correlation key.
pub trait Group<E> {
    /// Correlation key, stable for the group's lifetime.
    fn key(&self) -> &str;

    /// Creation timestamp in epoch millis, used for timeout eviction.
    fn timestamp(&self) -> u64;

    /// True once all required partial inputs are present. Side-effect free.
    fn complete(&self) -> bool;

    /// Feed one partial event into the group.
    fn add(&mut self, event: E) -> Result<(), GroupError>;
}

/// Factory and finalizer for a concrete group type.
pub trait GroupProcessor<E> {
    type Grouped: Group<E>;

    /// Create the group for a first-seen key. `timestamp` is the routing
    /// processor's clock reading at creation time.
    fn new_group(&mut self, key: &str, timestamp: u64) -> Self::Grouped;

    /// Finalize a complete group. Called exactly once per group.
    fn process_group(&mut self, group: Self::Grouped);
}
