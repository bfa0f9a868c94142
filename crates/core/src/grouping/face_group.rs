use std::collections::{HashMap, VecDeque};

use crate::event::{AnnotationValue, Mention};
use crate::grouping::group::{Group, GroupError, GroupProcessor};
use crate::shared::face::Face;
use crate::shared::segment::SegmentKey;

/// The per-image event streams correlated into one [`FaceGroup`].
#[derive(Clone, Debug)]
pub enum ImageEvent {
    /// A new image signal was captured.
    Announced { image_id: String },
    /// Face feature annotations for the image.
    Faces { mentions: Vec<Mention> },
    /// Resolved identity annotations for the image.
    Identities { mentions: Vec<Mention> },
}

impl ImageEvent {
    /// Correlation key: the container id shared by every segment.
    pub fn image_id(&self) -> Result<String, GroupError> {
        match self {
            ImageEvent::Announced { image_id } => Ok(image_id.clone()),
            ImageEvent::Faces { mentions } | ImageEvent::Identities { mentions } => {
                container_id(mentions)
            }
        }
    }
}

fn container_id(mentions: &[Mention]) -> Result<String, GroupError> {
    let mut ids: Vec<&str> = mentions
        .iter()
        .flat_map(|m| m.segments.iter())
        .map(|s| s.container_id.as_str())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    match ids[..] {
        [id] => Ok(id.to_string()),
        _ => Err(GroupError::AmbiguousContainer(ids.len())),
    }
}

/// Correlates the face-feature and identity annotation streams for a single
/// image into `(identity, face)` pairs.
///
/// Complete once both per-segment maps are present. A single face mention
/// without any annotation is the "no faces in this image" signal and
/// completes the group immediately with an empty persons list, so an image
/// of an empty room never waits for an identity event that cannot arrive.
pub struct FaceGroup {
    key: String,
    timestamp: u64,
    faces: Option<HashMap<SegmentKey, Face>>,
    ids: Option<HashMap<SegmentKey, String>>,
}

impl FaceGroup {
    pub fn new(key: impl Into<String>, timestamp: u64) -> Self {
        Self {
            key: key.into(),
            timestamp,
            faces: None,
            ids: None,
        }
    }

    /// The joined `(identity, face)` pairs.
    ///
    /// Fails until the group is complete. A face whose segment has no
    /// resolved identity is a data inconsistency and is skipped with a
    /// warning.
    pub fn persons(&self) -> Result<Vec<(String, Face)>, GroupError> {
        let (faces, ids) = match (&self.faces, &self.ids) {
            (Some(faces), Some(ids)) => (faces, ids),
            _ => return Err(GroupError::Incomplete(self.key.clone())),
        };

        let mut persons = Vec::with_capacity(faces.len());
        for (segment, face) in faces {
            match ids.get(segment) {
                Some(id) => persons.push((id.clone(), face.clone())),
                None => log::warn!(
                    "No identity for face segment {segment:?} in image {}",
                    self.key
                ),
            }
        }
        Ok(persons)
    }

    fn set_faces(&mut self, mentions: &[Mention]) -> Result<(), GroupError> {
        if mentions.len() == 1 && mentions[0].annotations.is_empty() {
            // whole-image mention with no annotation value: no faces present
            self.faces = Some(HashMap::new());
            if self.ids.is_none() {
                self.ids = Some(HashMap::new());
            }
            return Ok(());
        }

        let mut faces = HashMap::new();
        for mention in mentions {
            let key = segment_key(mention)?;
            match annotation_value(mention)? {
                AnnotationValue::Face(face) => {
                    faces.insert(key, face.clone());
                }
                other => {
                    return Err(GroupError::UnexpectedAnnotation {
                        expected: "face",
                        found: other.kind(),
                    })
                }
            }
        }
        self.faces = Some(faces);
        Ok(())
    }

    fn set_ids(&mut self, mentions: &[Mention]) -> Result<(), GroupError> {
        let mut ids = HashMap::new();
        for mention in mentions {
            let key = segment_key(mention)?;
            match annotation_value(mention)? {
                AnnotationValue::Identity(id) => {
                    ids.insert(key, id.clone());
                }
                other => {
                    return Err(GroupError::UnexpectedAnnotation {
                        expected: "identity",
                        found: other.kind(),
                    })
                }
            }
        }
        self.ids = Some(ids);
        Ok(())
    }
}

impl Group<ImageEvent> for FaceGroup {
    fn key(&self) -> &str {
        &self.key
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn complete(&self) -> bool {
        self.faces.is_some() && self.ids.is_some()
    }

    fn add(&mut self, event: ImageEvent) -> Result<(), GroupError> {
        match event {
            ImageEvent::Announced { .. } => Ok(()),
            ImageEvent::Faces { mentions } => self.set_faces(&mentions),
            ImageEvent::Identities { mentions } => self.set_ids(&mentions),
        }
    }
}

fn segment_key(mention: &Mention) -> Result<SegmentKey, GroupError> {
    let Some(first) = mention.segments.first() else {
        return Err(GroupError::MissingSegment);
    };
    if mention.segments.len() > 1 {
        log::warn!(
            "Mention with {} segments, using the first",
            mention.segments.len()
        );
    }
    Ok(first.key())
}

fn annotation_value(mention: &Mention) -> Result<&AnnotationValue, GroupError> {
    let Some(first) = mention.annotations.first() else {
        return Err(GroupError::MissingAnnotation);
    };
    if mention.annotations.len() > 1 {
        log::warn!(
            "Mention with {} annotations, using the first",
            mention.annotations.len()
        );
    }
    Ok(&first.value)
}

/// Queues each finished image's persons for the dialogue engine.
///
/// The routing processor calls [`GroupProcessor::process_group`] from inside
/// `process`; queueing decouples that from the engine dispatch, which the
/// service performs after every call.
#[derive(Default)]
pub struct FaceGroupProcessor {
    finished: VecDeque<Vec<(String, Face)>>,
}

impl FaceGroupProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next finished persons list, oldest first.
    pub fn take_persons(&mut self) -> Option<Vec<(String, Face)>> {
        self.finished.pop_front()
    }
}

impl GroupProcessor<ImageEvent> for FaceGroupProcessor {
    type Grouped = FaceGroup;

    fn new_group(&mut self, key: &str, timestamp: u64) -> FaceGroup {
        FaceGroup::new(key, timestamp)
    }

    fn process_group(&mut self, group: FaceGroup) {
        match group.persons() {
            Ok(persons) => self.finished.push_back(persons),
            Err(e) => log::error!("Discarding finished group: {e}"),
        }
    }
}
