use std::collections::HashMap;

use crate::dialogue::api::{EngineConfig, GetToKnowYou, Speaker};
use crate::dialogue::roster::FriendStore;
use crate::dialogue::state::{ConvState, State, GAZE_TRANSITIONS};
use crate::dialogue::text::{is_affirmative, normalize_name};
use crate::shared::face::Face;

/// Face-driven dialogue engine.
///
/// Gazes at a stranger to collect face samples, resolves the majority
/// identity over the samples, asks for and confirms the name, and remembers
/// the friend in the injected roster.
pub struct MemoryGetToKnowYou {
    config: EngineConfig,
    friends: Box<dyn FriendStore>,
    state: State,
    mismatches: u32,
}

impl MemoryGetToKnowYou {
    pub fn new(config: EngineConfig, friends: Box<dyn FriendStore>) -> Self {
        Self {
            config: config.normalized(),
            friends,
            state: State::start(GAZE_TRANSITIONS),
            mismatches: 0,
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

    fn on_empty(&mut self) -> Option<String> {
        let state = self.state.take();
        let (next, response) = if state.conv_state == ConvState::Start {
            let response = (state.state_count % self.config.empty_patience == 0)
                .then(|| "Hi, anyone there? I can't see anyone..".to_string());
            (state.stay(), response)
        } else if state.can_transition(ConvState::Start)
            && state.state_count >= self.config.empty_patience
        {
            (state.transition(ConvState::Start), None)
        } else {
            (state.stay(), None)
        };
        self.state = next;
        response
    }

    fn on_crowd(&mut self) -> Option<String> {
        let state = self.state.take();
        let interval = self.config.crowd_notice_interval;
        let response = (state.state_count % interval == interval - 1).then(|| {
            "Hi there! Apologies, but I will only talk to one of you at a time..".to_string()
        });
        self.state = state.stay();
        response
    }

    fn on_person(
        &mut self,
        identifier: &str,
        face: &Face,
        persons: &[(String, Face)],
    ) -> Option<String> {
        match self.state.conv_state {
            ConvState::Known => self.on_person_known(identifier, persons),
            ConvState::Start => self.on_person_start(identifier, face),
            ConvState::Gaze => self.on_person_gaze(identifier, face),
            ConvState::Query | ConvState::Confirm => None,
        }
    }

    fn on_person_known(&mut self, identifier: &str, persons: &[(String, Face)]) -> Option<String> {
        if self.state.face_id.as_deref() == Some(identifier) {
            self.mismatches = 0;
            self.state = self.state.take().stay();
            return None;
        }

        self.mismatches += 1;
        if self.mismatches > self.config.churn_patience {
            log::debug!("Speaker changed after {} foreign frames", self.mismatches);
            self.mismatches = 0;
            self.state = self.state.take().transition(ConvState::Start);
            // re-dispatch so the new person is greeted immediately
            return self.persons_detected(persons);
        }
        self.state = self.state.take().stay();
        None
    }

    fn on_person_start(&mut self, identifier: &str, face: &Face) -> Option<String> {
        self.mismatches = 0;
        match self.friends.name_of(identifier) {
            Some(name) => {
                let response = format!("Nice to meet you again {name}!");
                self.state = self
                    .state
                    .take()
                    .transition(ConvState::Known)
                    .with_face_id(identifier)
                    .with_name(name);
                Some(response)
            }
            None => {
                let mut next = self.state.take().transition(ConvState::Gaze);
                // the observation that started the gaze is the first sample
                next.faces.push((identifier.to_string(), face.clone()));
                self.state = next;
                Some("Hi Stranger! We haven't met, let me look at your face!".to_string())
            }
        }
    }

    fn on_person_gaze(&mut self, identifier: &str, face: &Face) -> Option<String> {
        self.state
            .faces
            .push((identifier.to_string(), face.clone()));
        if self.state.faces.len() < self.config.gaze_samples {
            return None;
        }

        let mut state = self.state.take();
        let majority = majority_identity(&state.faces);
        if state.faces.iter().any(|(id, _)| id != &majority) {
            log::debug!("Filtering gaze samples to majority identity {majority}");
            state.faces.retain(|(id, _)| id == &majority);
        }
        log::debug!("Memorized face for id {majority}");
        self.state = state
            .transition(ConvState::Query)
            .with_face_id(majority);
        Some("What is your name, stranger?".to_string())
    }
}

impl GetToKnowYou for MemoryGetToKnowYou {
    fn utterance_detected(&mut self, utterance: &str) -> Option<String> {
        log::debug!(
            "Received utterance {utterance:?} in state {:?}",
            self.state.conv_state
        );

        let state = self.state.take();
        let (next, response) = match state.conv_state {
            ConvState::Start => {
                let response = if state.state_count == 0 {
                    "Hi, I can't see you.."
                } else {
                    "Sorry, I still can't see you.."
                };
                (state.stay(), Some(response.to_string()))
            }
            ConvState::Gaze => (
                state.stay(),
                Some("One more second, stranger, I'm memorizing your face.".to_string()),
            ),
            ConvState::Query => {
                let name = normalize_name(utterance);
                let response = format!("So your name is {name}?");
                (
                    state.transition(ConvState::Confirm).with_name(name),
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
            ConvState::Known => (state, None),
        };
        self.state = next;
        response
    }

    fn persons_detected(&mut self, persons: &[(String, Face)]) -> Option<String> {
        log::debug!(
            "Received {} persons in state {:?}",
            persons.len(),
            self.state.conv_state
        );

        match persons {
            [] => self.on_empty(),
            [(identifier, face)] => self.on_person(identifier, face, persons),
            _ => self.on_crowd(),
        }
    }

    fn response(&mut self) -> Option<String> {
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
        self.mismatches = 0;
        self.state = self.state.take().reset();
    }
}

/// Most frequent identity in the gaze buffer; the earliest-observed identity
/// wins ties.
fn majority_identity(faces: &[(String, Face)]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (id, _) in faces {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (id, _) in faces {
        let count = counts[id.as_str()];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((id.as_str(), count));
        }
    }
    best.map(|(id, _)| id.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use ndarray::Array1;

    use super::*;
    use crate::dialogue::roster::InMemoryFriendStore;
    use crate::shared::face::Bounds;

    fn engine() -> MemoryGetToKnowYou {
        MemoryGetToKnowYou::new(
            EngineConfig::default(),
            Box::new(InMemoryFriendStore::new()),
        )
    }

    fn face() -> Face {
        Face::new(Bounds::new(0, 0, 1, 1), Array1::zeros(0), 1.0)
    }

    fn person(id: &str) -> Vec<(String, Face)> {
        vec![(id.to_string(), face())]
    }

    fn gaze_until_query(engine: &mut MemoryGetToKnowYou, id: &str) {
        let response = engine.persons_detected(&person(id));
        assert_eq!(
            response.as_deref(),
            Some("Hi Stranger! We haven't met, let me look at your face!")
        );
        for _ in 0..3 {
            assert!(engine.persons_detected(&person(id)).is_none());
        }
        let response = engine.persons_detected(&person(id));
        assert_eq!(response.as_deref(), Some("What is your name, stranger?"));
        assert_eq!(engine.conv_state(), ConvState::Query);
    }

    #[test]
    fn test_regular_flow() {
        let mut engine = engine();
        assert_eq!(engine.conv_state(), ConvState::Start);

        gaze_until_query(&mut engine, "id1");

        // further detections while waiting for the name are silent
        assert!(engine.persons_detected(&person("id1")).is_none());
        assert_eq!(engine.conv_state(), ConvState::Query);

        let response = engine.utterance_detected("Thomas");
        assert_eq!(response.as_deref(), Some("So your name is Thomas?"));
        assert_eq!(engine.conv_state(), ConvState::Confirm);

        let response = engine.utterance_detected("Yes, it is!");
        assert_eq!(response.as_deref(), Some("Nice to meet you, Thomas!"));
        assert_eq!(engine.conv_state(), ConvState::Known);
        assert_eq!(engine.friends().name_of("id1").as_deref(), Some("Thomas"));

        // utterances and matching detections in KNOWN are silent
        assert!(engine.utterance_detected("Bla").is_none());
        assert!(engine.persons_detected(&person("id1")).is_none());
        assert_eq!(engine.conv_state(), ConvState::Known);
    }

    #[test]
    fn test_gaze_asks_name_on_fifth_observation() {
        let mut engine = engine();
        // observation 1 greets the stranger, observations 2-4 are silent,
        // observation 5 reaches the gaze target and asks for the name
        gaze_until_query(&mut engine, "id1");
    }

    #[test]
    fn test_name_is_title_cased() {
        let mut engine = engine();
        gaze_until_query(&mut engine, "id1");

        let response = engine.utterance_detected("thomas rivera");
        assert_eq!(response.as_deref(), Some("So your name is Thomas Rivera?"));
        assert_eq!(engine.state().name.as_deref(), Some("Thomas Rivera"));
    }

    #[test]
    fn test_rejected_name_returns_to_query_without_commit() {
        let mut engine = engine();
        gaze_until_query(&mut engine, "id1");

        engine.utterance_detected("Thomass");
        let response = engine.utterance_detected("No, it is Thomas!");
        assert_eq!(
            response.as_deref(),
            Some("Can you please repeat and only say your name!")
        );
        assert_eq!(engine.conv_state(), ConvState::Query);
        assert!(engine.friends().name_of("id1").is_none());

        let response = engine.utterance_detected("Thomas");
        assert_eq!(response.as_deref(), Some("So your name is Thomas?"));
        let response = engine.utterance_detected("Yes");
        assert_eq!(response.as_deref(), Some("Nice to meet you, Thomas!"));
        assert_eq!(engine.friends().name_of("id1").as_deref(), Some("Thomas"));
    }

    #[test]
    fn test_known_friend_is_greeted_by_name() {
        let mut engine = MemoryGetToKnowYou::new(
            EngineConfig::default(),
            Box::new(InMemoryFriendStore::from_entries([(
                "id1".to_string(),
                "Thomas".to_string(),
            )])),
        );

        let response = engine.persons_detected(&person("id1"));
        assert_eq!(response.as_deref(), Some("Nice to meet you again Thomas!"));
        assert_eq!(engine.conv_state(), ConvState::Known);
        assert_eq!(
            engine.speaker(),
            Some(Speaker {
                id: "id1".to_string(),
                name: "Thomas".to_string(),
            })
        );
    }

    #[test]
    fn test_committed_friend_bypasses_gaze_after_reset() {
        let mut engine = engine();
        gaze_until_query(&mut engine, "id1");
        engine.utterance_detected("Thomas");
        engine.utterance_detected("Yes");
        assert_eq!(engine.conv_state(), ConvState::Known);

        engine.clear();
        assert_eq!(engine.conv_state(), ConvState::Start);

        let response = engine.persons_detected(&person("id1"));
        assert_eq!(response.as_deref(), Some("Nice to meet you again Thomas!"));
        assert_eq!(engine.conv_state(), ConvState::Known);
    }

    #[test]
    fn test_new_face_in_known_reengages_after_patience() {
        let mut engine = MemoryGetToKnowYou::new(
            EngineConfig::default(),
            Box::new(InMemoryFriendStore::from_entries([(
                "id1".to_string(),
                "Thomas".to_string(),
            )])),
        );
        engine.persons_detected(&person("id1"));
        assert_eq!(engine.conv_state(), ConvState::Known);

        // two foreign frames are tolerated
        assert!(engine.persons_detected(&person("id2")).is_none());
        assert!(engine.persons_detected(&person("id2")).is_none());
        assert_eq!(engine.conv_state(), ConvState::Known);

        // the third resets and greets the stranger immediately
        let response = engine.persons_detected(&person("id2"));
        assert_eq!(
            response.as_deref(),
            Some("Hi Stranger! We haven't met, let me look at your face!")
        );
        assert_eq!(engine.conv_state(), ConvState::Gaze);
    }

    #[test]
    fn test_matching_frames_reset_churn_tolerance() {
        let mut engine = MemoryGetToKnowYou::new(
            EngineConfig::default(),
            Box::new(InMemoryFriendStore::from_entries([(
                "id1".to_string(),
                "Thomas".to_string(),
            )])),
        );
        engine.persons_detected(&person("id1"));

        for _ in 0..3 {
            assert!(engine.persons_detected(&person("id2")).is_none());
            assert!(engine.persons_detected(&person("id2")).is_none());
            // a matching frame clears the mismatch streak
            assert!(engine.persons_detected(&person("id1")).is_none());
            assert_eq!(engine.conv_state(), ConvState::Known);
        }
    }

    #[test]
    fn test_majority_identity_resolution() {
        let mut engine = engine();
        engine.persons_detected(&person("id1"));
        engine.persons_detected(&person("id1"));
        engine.persons_detected(&person("id2"));
        engine.persons_detected(&person("id1"));
        let response = engine.persons_detected(&person("id2"));

        assert_eq!(response.as_deref(), Some("What is your name, stranger?"));
        assert_eq!(engine.state().face_id.as_deref(), Some("id1"));
        // the foreign samples were filtered out of the gaze buffer
        assert!(engine.state().faces.iter().all(|(id, _)| id == "id1"));
        assert_eq!(engine.state().faces.len(), 3);
    }

    #[test]
    fn test_majority_tie_prefers_earliest_identity() {
        let faces: Vec<(String, Face)> = [
            "id2", "id1", "id2", "id1",
        ]
        .iter()
        .map(|id| (id.to_string(), face()))
        .collect();
        assert_eq!(majority_identity(&faces), "id2");
    }

    #[test]
    fn test_crowd_notice_every_third_cycle() {
        let mut engine = engine();
        let crowd = vec![
            ("id1".to_string(), face()),
            ("id2".to_string(), face()),
        ];

        assert!(engine.persons_detected(&crowd).is_none());
        assert!(engine.persons_detected(&crowd).is_none());
        let response = engine.persons_detected(&crowd);
        assert_eq!(
            response.as_deref(),
            Some("Hi there! Apologies, but I will only talk to one of you at a time..")
        );
        // crowds never advance the conversation
        assert_eq!(engine.conv_state(), ConvState::Start);
    }

    #[test]
    fn test_empty_detections_prompt_periodically_in_start() {
        let mut engine = engine();
        let response = engine.persons_detected(&[]);
        assert_eq!(
            response.as_deref(),
            Some("Hi, anyone there? I can't see anyone..")
        );
        for _ in 0..9 {
            assert!(engine.persons_detected(&[]).is_none());
        }
        let response = engine.persons_detected(&[]);
        assert_eq!(
            response.as_deref(),
            Some("Hi, anyone there? I can't see anyone..")
        );
    }

    #[test]
    fn test_sustained_empty_detections_reset_gaze() {
        let mut engine = engine();
        engine.persons_detected(&person("id1"));
        assert_eq!(engine.conv_state(), ConvState::Gaze);

        for _ in 0..10 {
            assert!(engine.persons_detected(&[]).is_none());
            assert_eq!(engine.conv_state(), ConvState::Gaze);
        }
        assert!(engine.persons_detected(&[]).is_none());
        assert_eq!(engine.conv_state(), ConvState::Start);
    }

    #[test]
    fn test_empty_detections_never_reset_query() {
        let mut engine = engine();
        gaze_until_query(&mut engine, "id1");

        for _ in 0..20 {
            assert!(engine.persons_detected(&[]).is_none());
        }
        assert_eq!(engine.conv_state(), ConvState::Query);
    }

    #[test]
    fn test_utterance_before_seen() {
        let mut engine = engine();
        let response = engine.utterance_detected("Hallo!");
        assert_eq!(response.as_deref(), Some("Hi, I can't see you.."));
        assert_eq!(engine.conv_state(), ConvState::Start);

        let response = engine.utterance_detected("Hallo!");
        assert_eq!(response.as_deref(), Some("Sorry, I still can't see you.."));
        assert_eq!(engine.conv_state(), ConvState::Start);
    }

    #[test]
    fn test_utterance_while_gazing() {
        let mut engine = engine();
        engine.persons_detected(&person("id1"));

        let response = engine.utterance_detected("Hallo!");
        assert_eq!(
            response.as_deref(),
            Some("One more second, stranger, I'm memorizing your face.")
        );
        assert_eq!(engine.conv_state(), ConvState::Gaze);
    }

    #[test]
    fn test_response_tick_is_inert() {
        let mut engine = engine();
        assert!(engine.response().is_none());
        assert_eq!(engine.conv_state(), ConvState::Start);

        engine.persons_detected(&person("id1"));
        let before = engine.state().state_count;
        assert!(engine.response().is_none());
        assert_eq!(engine.conv_state(), ConvState::Gaze);
        assert_eq!(engine.state().state_count, before);
    }

    #[test]
    fn test_speaker_unavailable_before_confirmation() {
        let mut engine = engine();
        assert!(engine.speaker().is_none());
        gaze_until_query(&mut engine, "id1");
        engine.utterance_detected("Thomas");
        assert!(engine.speaker().is_none());
        engine.utterance_detected("Yes");
        assert!(engine.speaker().is_some());
    }
}
