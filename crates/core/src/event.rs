//! Records exchanged over the event bus.
//!
//! Payload shapes are opaque structured records: the engine never interprets
//! more than the field-level contracts (segments, annotation values, text).

use serde::{Deserialize, Serialize};

use crate::shared::face::Face;
use crate::shared::segment::Segment;
use crate::shared::time::timestamp_now;

/// A single annotated value, attributed to its producing capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub value: AnnotationValue,
    pub source: String,
    pub timestamp: u64,
}

impl Annotation {
    pub fn new(value: AnnotationValue, source: impl Into<String>) -> Self {
        Self {
            value,
            source: source.into(),
            timestamp: timestamp_now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnnotationValue {
    /// A face observation (feature annotation stream).
    Face(Face),
    /// A resolved identity label (identity annotation stream).
    Identity(String),
}

impl AnnotationValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AnnotationValue::Face(_) => "face",
            AnnotationValue::Identity(_) => "identity",
        }
    }
}

/// One or more segments of a container signal plus the annotations that
/// apply to them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub segments: Vec<Segment>,
    pub annotations: Vec<Annotation>,
}

impl Mention {
    pub fn new(segments: Vec<Segment>, annotations: Vec<Annotation>) -> Self {
        Self {
            segments,
            annotations,
        }
    }
}

/// A record on the event bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub timestamp: u64,
    pub payload: Payload,
}

impl Event {
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            timestamp: timestamp_now(),
            payload,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// A transcribed utterance of the current speaker.
    Utterance { text: String },
    /// A new image signal was captured.
    ImageAnnounced { image_id: String },
    /// Face feature annotations for one image.
    FaceMentions { mentions: Vec<Mention> },
    /// Resolved identity annotations for one image.
    IdentityMentions { mentions: Vec<Mention> },
    /// A natural-language response produced by the engine.
    Response { text: String },
    /// The confirmed identity and name of the current speaker.
    Speaker { id: String, name: String },
}
