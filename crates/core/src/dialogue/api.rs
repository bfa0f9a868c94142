use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_CHURN_PATIENCE, DEFAULT_CROWD_NOTICE_INTERVAL, DEFAULT_EMPTY_PATIENCE,
    DEFAULT_GAZE_SAMPLES,
};
use crate::shared::face::Face;

/// The resolved current speaker, available once a name is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Speaker {
    pub id: String,
    pub name: String,
}

/// Thresholds steering the conversation policies.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gaze samples collected from a stranger before asking their name.
    pub gaze_samples: usize,
    /// Consecutive empty detection cycles before falling back to START.
    pub empty_patience: u32,
    /// Consecutive foreign identities tolerated once a speaker is known.
    pub churn_patience: u32,
    /// Re-entry interval of the "one at a time" notice.
    pub crowd_notice_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gaze_samples: DEFAULT_GAZE_SAMPLES,
            empty_patience: DEFAULT_EMPTY_PATIENCE,
            churn_patience: DEFAULT_CHURN_PATIENCE,
            crowd_notice_interval: DEFAULT_CROWD_NOTICE_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Clamp degenerate values so interval and threshold logic stays
    /// well-defined.
    pub fn normalized(self) -> Self {
        Self {
            gaze_samples: self.gaze_samples.max(1),
            empty_patience: self.empty_patience.max(1),
            churn_patience: self.churn_patience,
            crowd_notice_interval: self.crowd_notice_interval.max(1),
        }
    }
}

/// Contract of the get-to-know-you dialogue component.
///
/// All methods are called from a single serialized dispatch loop; the
/// engines keep mutable state without internal locking on that assumption.
pub trait GetToKnowYou: Send {
    /// A transcribed utterance of the current speaker.
    fn utterance_detected(&mut self, utterance: &str) -> Option<String>;

    /// The persons observed in one detection cycle.
    fn persons_detected(&mut self, persons: &[(String, Face)]) -> Option<String>;

    /// Idle tick with no new event; may emit a proactive greeting.
    fn response(&mut self) -> Option<String>;

    /// The confirmed speaker, if any.
    fn speaker(&self) -> Option<Speaker>;

    /// Force-reset the conversation to START. The friends roster persists.
    fn clear(&mut self);
}
