/// Gaze samples collected from a stranger before asking their name.
pub const DEFAULT_GAZE_SAMPLES: usize = 5;

/// Consecutive empty detection cycles tolerated before a conversation falls
/// back to the start state.
pub const DEFAULT_EMPTY_PATIENCE: u32 = 10;

/// Consecutive foreign identities tolerated once a speaker is known.
pub const DEFAULT_CHURN_PATIENCE: u32 = 2;

/// Re-entry interval of the "one at a time" notice when several people are
/// in view.
pub const DEFAULT_CROWD_NOTICE_INTERVAL: u32 = 3;

/// Age in milliseconds after which an incomplete correlation group is
/// evicted.
pub const DEFAULT_GROUP_TIMEOUT_MS: u64 = 10_000;

/// The completed/dropped key buffers hold this multiple of the active-group
/// capacity.
pub const DEFAULT_BUFFER_FACTOR: usize = 10;
