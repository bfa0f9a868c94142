use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::dialogue::api::GetToKnowYou;
use crate::event::{Event, Payload};
use crate::grouping::face_group::{FaceGroupProcessor, ImageEvent};
use crate::grouping::group_by::{GroupByConfig, GroupByProcessor};

/// Topic names the service subscribes to and publishes on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceTopics {
    pub utterance: String,
    pub image: String,
    pub face: String,
    pub id: String,
    pub response: String,
    pub speaker: String,
}

impl Default for ServiceTopics {
    fn default() -> Self {
        Self {
            utterance: "acquaint.utterance".into(),
            image: "acquaint.image".into(),
            face: "acquaint.face".into(),
            id: "acquaint.id".into(),
            response: "acquaint.response".into(),
            speaker: "acquaint.speaker".into(),
        }
    }
}

type FaceGroupBy = GroupByProcessor<ImageEvent, FaceGroupProcessor>;

/// Wires the dialogue engine into the event bus.
///
/// Routes utterances straight into the engine; routes the three per-image
/// annotation streams through the group-by processor and dispatches each
/// completed image's persons. Responses and resolved-speaker facts are
/// republished on the outbound channel.
pub struct GetToKnowYouService {
    engine: Box<dyn GetToKnowYou>,
    group_by: FaceGroupBy,
    topics: ServiceTopics,
    out: Sender<Event>,
}

impl GetToKnowYouService {
    pub fn new(
        engine: Box<dyn GetToKnowYou>,
        group_config: GroupByConfig,
        topics: ServiceTopics,
        out: Sender<Event>,
    ) -> Self {
        let group_by = GroupByProcessor::with_config(
            FaceGroupProcessor::new(),
            |event: &ImageEvent| event.image_id(),
            group_config,
        );
        Self {
            engine,
            group_by,
            topics,
            out,
        }
    }

    /// Dispatch one bus event, or an idle tick when `event` is `None`.
    pub fn process(&mut self, event: Option<Event>) {
        let Some(event) = event else {
            let response = self.engine.response();
            self.publish_response(response);
            return;
        };

        if event.topic == self.topics.utterance {
            self.on_utterance(event);
        } else if event.topic == self.topics.image
            || event.topic == self.topics.face
            || event.topic == self.topics.id
        {
            self.on_image_event(event);
        } else {
            log::warn!("Event on unexpected topic {}", event.topic);
        }
    }

    fn on_utterance(&mut self, event: Event) {
        let Payload::Utterance { text } = event.payload else {
            log::warn!("Non-utterance payload on topic {}", event.topic);
            return;
        };
        let response = self.engine.utterance_detected(&text);
        if let Some(speaker) = self.engine.speaker() {
            self.publish(Event::new(
                self.topics.speaker.as_str(),
                Payload::Speaker {
                    id: speaker.id,
                    name: speaker.name,
                },
            ));
        }
        self.publish_response(response);
    }

    fn on_image_event(&mut self, event: Event) {
        let Event { topic, payload, .. } = event;
        let image_event = match payload {
            Payload::ImageAnnounced { image_id } if topic == self.topics.image => {
                ImageEvent::Announced { image_id }
            }
            Payload::FaceMentions { mentions } if topic == self.topics.face => {
                ImageEvent::Faces { mentions }
            }
            Payload::IdentityMentions { mentions } if topic == self.topics.id => {
                ImageEvent::Identities { mentions }
            }
            other => {
                log::warn!("Payload {other:?} does not match topic {topic}");
                return;
            }
        };

        if let Err(e) = self.group_by.process(image_event) {
            log::error!("Malformed annotation event: {e}");
            return;
        }

        while let Some(persons) = self.group_by.processor_mut().take_persons() {
            let response = self.engine.persons_detected(&persons);
            self.publish_response(response);
        }
    }

    fn publish_response(&self, response: Option<String>) {
        if let Some(text) = response {
            self.publish(Event::new(
                self.topics.response.as_str(),
                Payload::Response { text },
            ));
        }
    }

    fn publish(&self, event: Event) {
        if self.out.send(event).is_err() {
            log::warn!("Outbound channel disconnected, dropping event");
        }
    }
}
