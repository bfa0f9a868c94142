use crate::shared::face::Face;

/// Phase of engagement with the (possibly unknown) current speaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvState {
    Start,
    Gaze,
    Query,
    Confirm,
    Known,
}

/// Legal transitions per state. Any move not listed is a caller bug.
pub type TransitionTable = &'static [(ConvState, &'static [ConvState])];

/// Transition table of the face-driven engine.
pub const GAZE_TRANSITIONS: TransitionTable = &[
    (ConvState::Start, &[ConvState::Gaze, ConvState::Known]),
    (ConvState::Gaze, &[ConvState::Query, ConvState::Start]),
    (ConvState::Query, &[ConvState::Confirm]),
    (ConvState::Confirm, &[ConvState::Known, ConvState::Query]),
    (ConvState::Known, &[ConvState::Start]),
];

/// Transition table of the camera-less engine: no gaze phase, a name is
/// asked for right away.
pub const VERBAL_TRANSITIONS: TransitionTable = &[
    (ConvState::Start, &[ConvState::Query]),
    (ConvState::Query, &[ConvState::Confirm]),
    (ConvState::Confirm, &[ConvState::Known, ConvState::Query]),
    (ConvState::Known, &[ConvState::Start]),
];

/// Per-conversation memory of a dialogue engine.
///
/// Transitions consume the state and return the successor. The friends
/// roster lives outside this struct and survives resets.
#[derive(Clone, Debug)]
pub struct State {
    pub face_id: Option<String>,
    pub name: Option<String>,
    pub conv_state: ConvState,
    pub faces: Vec<(String, Face)>,
    pub state_count: u32,
    table: TransitionTable,
}

impl State {
    pub fn start(table: TransitionTable) -> Self {
        Self {
            face_id: None,
            name: None,
            conv_state: ConvState::Start,
            faces: Vec::new(),
            state_count: 0,
            table,
        }
    }

    /// Targets reachable from the current phase.
    pub fn allowed(&self) -> &'static [ConvState] {
        self.table
            .iter()
            .find(|(from, _)| *from == self.conv_state)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn can_transition(&self, to: ConvState) -> bool {
        self.allowed().contains(&to)
    }

    /// Move to `to`, resetting the re-entry counter. A transition to START
    /// clears all per-conversation memory.
    ///
    /// # Panics
    ///
    /// Panics when the transition is not in the table. That is a programming
    /// error in the caller, never user input.
    pub fn transition(self, to: ConvState) -> State {
        if !self.can_transition(to) {
            panic!(
                "illegal conversation state transition {:?} -> {:?}",
                self.conv_state, to
            );
        }
        log::debug!("Transition from {:?} to {:?}", self.conv_state, to);

        let mut next = if to == ConvState::Start {
            State::start(self.table)
        } else {
            self
        };
        next.conv_state = to;
        next.state_count = 0;
        next
    }

    /// Re-enter the current phase, keeping all fields and bumping the
    /// counter.
    pub fn stay(mut self) -> State {
        self.state_count += 1;
        log::debug!(
            "Re-entered {:?} ({} times)",
            self.conv_state,
            self.state_count
        );
        self
    }

    /// Forced reset to START, bypassing the transition table. Used when a
    /// conversation is terminated externally.
    pub fn reset(self) -> State {
        State::start(self.table)
    }

    pub fn with_face_id(mut self, face_id: impl Into<String>) -> State {
        self.face_id = Some(face_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> State {
        self.name = Some(name.into());
        self
    }

    /// Take ownership of the state, leaving a fresh START behind. The
    /// caller must assign a successor immediately.
    pub(crate) fn take(&mut self) -> State {
        let table = self.table;
        std::mem::replace(self, State::start(table))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn in_state(conv_state: ConvState) -> State {
        State {
            face_id: None,
            name: None,
            conv_state,
            faces: Vec::new(),
            state_count: 0,
            table: GAZE_TRANSITIONS,
        }
    }

    #[rstest]
    #[case(ConvState::Start, ConvState::Gaze)]
    #[case(ConvState::Start, ConvState::Known)]
    #[case(ConvState::Gaze, ConvState::Query)]
    #[case(ConvState::Gaze, ConvState::Start)]
    #[case(ConvState::Query, ConvState::Confirm)]
    #[case(ConvState::Confirm, ConvState::Known)]
    #[case(ConvState::Confirm, ConvState::Query)]
    #[case(ConvState::Known, ConvState::Start)]
    fn transition_is_legal(#[case] from: ConvState, #[case] to: ConvState) {
        let next = in_state(from).transition(to);
        assert_eq!(next.conv_state, to);
        assert_eq!(next.state_count, 0);
    }

    #[rstest]
    #[case(ConvState::Start, ConvState::Query)]
    #[case(ConvState::Start, ConvState::Confirm)]
    #[case(ConvState::Gaze, ConvState::Known)]
    #[case(ConvState::Query, ConvState::Start)]
    #[case(ConvState::Query, ConvState::Known)]
    #[case(ConvState::Confirm, ConvState::Start)]
    #[case(ConvState::Known, ConvState::Gaze)]
    #[should_panic(expected = "illegal conversation state transition")]
    fn transition_is_illegal(#[case] from: ConvState, #[case] to: ConvState) {
        in_state(from).transition(to);
    }

    #[test]
    fn test_verbal_table_skips_gaze() {
        let state = State::start(VERBAL_TRANSITIONS);
        assert!(state.can_transition(ConvState::Query));
        assert!(!state.can_transition(ConvState::Gaze));
    }

    #[test]
    fn test_stay_preserves_fields_and_counts() {
        let state = in_state(ConvState::Gaze)
            .with_face_id("id1")
            .with_name("Ada");
        let state = state.stay().stay();
        assert_eq!(state.conv_state, ConvState::Gaze);
        assert_eq!(state.state_count, 2);
        assert_eq!(state.face_id.as_deref(), Some("id1"));
        assert_eq!(state.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_transition_to_start_clears_conversation_memory() {
        let state = in_state(ConvState::Known)
            .with_face_id("id1")
            .with_name("Ada")
            .stay();
        let state = state.transition(ConvState::Start);
        assert_eq!(state.conv_state, ConvState::Start);
        assert!(state.face_id.is_none());
        assert!(state.name.is_none());
        assert!(state.faces.is_empty());
        assert_eq!(state.state_count, 0);
    }

    #[test]
    fn test_non_start_transition_keeps_conversation_memory() {
        let state = in_state(ConvState::Query).with_face_id("id1");
        let state = state.transition(ConvState::Confirm).with_name("Ada");
        assert_eq!(state.face_id.as_deref(), Some("id1"));
        assert_eq!(state.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_reset_bypasses_the_table() {
        // CONFIRM has no legal path to START; reset is forced
        let state = in_state(ConvState::Confirm).with_name("Ada");
        let state = state.reset();
        assert_eq!(state.conv_state, ConvState::Start);
        assert!(state.name.is_none());
    }
}
