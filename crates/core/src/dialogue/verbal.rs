use uuid::Uuid;

use crate::dialogue::api::{GetToKnowYou, Speaker};
use crate::dialogue::roster::FriendStore;
use crate::dialogue::state::{ConvState, State, VERBAL_TRANSITIONS};
use crate::dialogue::text::{is_affirmative, normalize_name};
use crate::shared::face::Face;

const NAME_PROMPT: &str = "Hi, nice to meet you! What is your name?";

/// Camera-less dialogue engine.
///
/// There is no gaze phase: the engine asks for a name right away and mints a
/// fresh identifier for each previously unseen name, so the roster is
/// effectively keyed by name. Detections are ignored.
pub struct VerbalGetToKnowYou {
    friends: Box<dyn FriendStore>,
    state: State,
}

impl VerbalGetToKnowYou {
    pub fn new(friends: Box<dyn FriendStore>) -> Self {
        Self {
            friends,
            state: State::start(VERBAL_TRANSITIONS),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn conv_state(&self) -> ConvState {
        self.state.conv_state
    }

    pub fn friends(&self) -> &dyn FriendStore {
        self.friends.as_ref()
    }
}

impl GetToKnowYou for VerbalGetToKnowYou {
    fn utterance_detected(&mut self, utterance: &str) -> Option<String> {
        log::debug!(
            "Received utterance {utterance:?} in state {:?}",
            self.state.conv_state
        );

        let state = self.state.take();
        let (next, response) = match state.conv_state {
            ConvState::Start => (
                state.transition(ConvState::Query),
                Some(NAME_PROMPT.to_string()),
            ),
            ConvState::Query => {
                let name = normalize_name(utterance);
                let id = self
                    .friends
                    .id_of(&name)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let response = format!("So your name is {name}?");
                (
                    state
                        .transition(ConvState::Confirm)
                        .with_face_id(id)
                        .with_name(name),
                    Some(response),
                )
            }
            ConvState::Confirm => {
                if is_affirmative(utterance) {
                    if let (Some(id), Some(name)) = (&state.face_id, &state.name) {
                        self.friends.add(id, name);
                    }
                    let response = state
                        .name
                        .as_deref()
                        .map(|name| format!("Nice to meet you, {name}!"));
                    (state.transition(ConvState::Known), response)
                } else {
                    (
                        state.transition(ConvState::Query),
                        Some("Can you please repeat and only say your name!".to_string()),
                    )
                }
            }
            ConvState::Gaze | ConvState::Known => (state, None),
        };
        self.state = next;
        response
    }

    fn persons_detected(&mut self, _persons: &[(String, Face)]) -> Option<String> {
        None
    }

    fn response(&mut self) -> Option<String> {
        if self.state.conv_state == ConvState::Start {
            self.state = self.state.take().transition(ConvState::Query);
            return Some(NAME_PROMPT.to_string());
        }
        None
    }

    fn speaker(&self) -> Option<Speaker> {
        if self.state.conv_state != ConvState::Known {
            return None;
        }
        match (&self.state.face_id, &self.state.name) {
            (Some(id), Some(name)) => Some(Speaker {
                id: id.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }

    fn clear(&mut self) {
        self.state = self.state.take().reset();
    }
}
