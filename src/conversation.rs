//! Client-side conversation state machine.
//!
//! `ConversationState` is an immutable snapshot. Every transition
//! (`submit`, `on_reply_success`, `on_reply_failure`) returns a new snapshot
//! and leaves the receiver untouched, so any renderer can diff or replay
//! states without a framework in between.

use crate::constants::{FALLBACK_REPLY, GREETING};
use crate::sanitize::sanitize_reply;
use crate::scroll::{ScrollPolicy, ViewportMetrics};
use crate::types::{ConversationMessage, RelayRequest, Role, TurnResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Settled,
}

/// Why `submit` declined to start a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    TurnInFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Ignored(IgnoreReason),
    Accepted {
        state: ConversationState,
        request: RelayRequest,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightTurn {
    auto_scroll: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    messages: Vec<ConversationMessage>,
    persona: String,
    input: String,
    in_flight: Option<InFlightTurn>,
    phase: TurnPhase,
    scroll: ScrollPolicy,
    scroll_to_bottom: bool,
}

impl ConversationState {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            persona: persona.into(),
            input: String::new(),
            in_flight: None,
            phase: TurnPhase::Idle,
            scroll: ScrollPolicy::new(),
            scroll_to_bottom: false,
        }
    }

    /// A fresh conversation opened by the assistant greeting.
    pub fn with_greeting(persona: impl Into<String>) -> Self {
        let mut state = Self::new(persona);
        state.messages.push(ConversationMessage::assistant(GREETING));
        state
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Whether the most recent settlement asked the view to follow the thread.
    pub fn should_scroll_to_bottom(&self) -> bool {
        self.scroll_to_bottom
    }

    pub fn with_input(&self, input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..self.clone()
        }
    }

    /// Edits the persona used by the next turn. A turn already in flight
    /// carries its own copy and is unaffected.
    pub fn with_persona(&self, persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            ..self.clone()
        }
    }

    /// Starts a turn: the user message is appended optimistically and the
    /// outbound request is built from the prior history plus that message.
    pub fn submit(&self, text: &str, viewport: Option<ViewportMetrics>) -> Submission {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Submission::Ignored(IgnoreReason::EmptyInput);
        }
        if self.is_pending() {
            return Submission::Ignored(IgnoreReason::TurnInFlight);
        }

        let (scroll, auto_scroll) = self.scroll.decide(viewport);

        let mut messages = self.messages.clone();
        messages.push(ConversationMessage::user(trimmed));

        let request = RelayRequest {
            system_prompt: Some(self.persona.clone()),
            messages: messages.clone(),
        };

        let state = Self {
            messages,
            persona: self.persona.clone(),
            input: String::new(),
            in_flight: Some(InFlightTurn { auto_scroll }),
            phase: TurnPhase::Sending,
            scroll,
            scroll_to_bottom: false,
        };

        Submission::Accepted { state, request }
    }

    /// Settles the in-flight turn with the model's reply.
    pub fn on_reply_success(&self, raw_reply: &str) -> Self {
        let text = sanitize_reply(raw_reply);
        if text.is_empty() {
            tracing::warn!("Reply was empty after sanitization, showing fallback");
            return self.settle(FALLBACK_REPLY.to_string());
        }
        self.settle(text)
    }

    /// Settles the in-flight turn with the fixed fallback message. The user
    /// message that started the turn stays in the thread.
    pub fn on_reply_failure(&self) -> Self {
        self.settle(FALLBACK_REPLY.to_string())
    }

    pub fn apply(&self, result: &TurnResult) -> Self {
        match result {
            TurnResult::Reply(text) => self.on_reply_success(text),
            TurnResult::Failure { .. } => self.on_reply_failure(),
        }
    }

    fn settle(&self, assistant_text: String) -> Self {
        let Some(turn) = self.in_flight else {
            tracing::warn!("Ignoring reply with no turn in flight");
            return self.clone();
        };

        let mut messages = self.messages.clone();
        messages.push(ConversationMessage::assistant(assistant_text));

        Self {
            messages,
            in_flight: None,
            phase: TurnPhase::Settled,
            scroll_to_bottom: turn.auto_scroll,
            ..self.clone()
        }
    }

    /// Messages by role, mainly for renderers that style the two sides differently.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(state: &ConversationState, text: &str) -> (ConversationState, RelayRequest) {
        match state.submit(text, None) {
            Submission::Accepted { state, request } => (state, request),
            Submission::Ignored(reason) => panic!("Expected accepted submit, got {:?}", reason),
        }
    }

    #[test]
    fn test_submit_builds_history_plus_new_turn() {
        let state = ConversationState::new("Be brief");
        let (sending, request) = accept(&state, "  hi  ");

        assert!(sending.is_pending());
        assert_eq!(sending.phase(), TurnPhase::Sending);
        assert_eq!(sending.messages(), &[ConversationMessage::user("hi")]);
        assert_eq!(request.system_prompt.as_deref(), Some("Be brief"));
        assert_eq!(request.messages, vec![ConversationMessage::user("hi")]);

        // the original snapshot is untouched
        assert!(state.messages().is_empty());
        assert!(!state.is_pending());
    }

    #[test]
    fn test_submit_clears_input() {
        let state = ConversationState::new("p").with_input("draft");
        let (sending, _) = accept(&state, "draft");
        assert_eq!(sending.input(), "");
    }

    #[test]
    fn test_empty_and_in_flight_submits_ignored() {
        let state = ConversationState::new("p");
        assert_eq!(
            state.submit("   \n", None),
            Submission::Ignored(IgnoreReason::EmptyInput)
        );

        let (sending, _) = accept(&state, "first");
        assert_eq!(
            sending.submit("second", None),
            Submission::Ignored(IgnoreReason::TurnInFlight)
        );
    }

    #[test]
    fn test_success_sanitizes_and_releases() {
        let (sending, _) = accept(&ConversationState::new("p"), "hi");
        let settled = sending.on_reply_success("  Hello there!  ");

        assert!(!settled.is_pending());
        assert_eq!(settled.phase(), TurnPhase::Settled);
        assert_eq!(
            settled.messages(),
            &[
                ConversationMessage::user("hi"),
                ConversationMessage::assistant("Hello there!"),
            ]
        );
    }

    #[test]
    fn test_failure_appends_one_fallback_and_keeps_user_turn() {
        let (sending, _) = accept(&ConversationState::with_greeting("p"), "price of BTC?");
        let settled = sending.on_reply_failure();

        assert!(!settled.is_pending());
        assert_eq!(settled.messages().len(), 3);
        assert_eq!(settled.messages()[1], ConversationMessage::user("price of BTC?"));
        assert_eq!(settled.messages()[2], ConversationMessage::assistant(FALLBACK_REPLY));
        assert_eq!(settled.count_role(Role::Assistant), 2);
    }

    #[test]
    fn test_markup_only_reply_falls_back() {
        let (sending, _) = accept(&ConversationState::new("p"), "hi");
        let settled = sending.on_reply_success("***");
        assert_eq!(settled.messages()[1].content, FALLBACK_REPLY);
    }

    #[test]
    fn test_settle_without_turn_is_noop() {
        let state = ConversationState::new("p");
        assert_eq!(state.on_reply_failure(), state);
    }

    #[test]
    fn test_history_carries_greeting_and_prior_turns() {
        let state = ConversationState::with_greeting("p");
        let (sending, _) = accept(&state, "one");
        let settled = sending.on_reply_success("reply one");
        let (_, request) = accept(&settled, "two");

        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert!(request.messages.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn test_persona_edit_applies_to_next_turn_only() {
        let (sending, in_flight) = accept(&ConversationState::new("old"), "hi");
        let edited = sending.with_persona("new");
        assert_eq!(in_flight.system_prompt.as_deref(), Some("old"));

        let settled = edited.on_reply_success("ok");
        let (_, next) = accept(&settled, "again");
        assert_eq!(next.system_prompt.as_deref(), Some("new"));
    }

    #[test]
    fn test_auto_scroll_captured_at_send_time() {
        let state = ConversationState::new("p");
        let far_up = ViewportMetrics::new(4000.0, 0.0, 500.0);

        // first scroll since mount
        let Submission::Accepted { state: sending, .. } = state.submit("a", Some(far_up)) else {
            panic!("Expected accepted submit");
        };
        let settled = sending.on_reply_success("b");
        assert!(settled.should_scroll_to_bottom());

        // scrolled up at send time
        let Submission::Accepted { state: sending, .. } = settled.submit("c", Some(far_up)) else {
            panic!("Expected accepted submit");
        };
        let settled = sending.on_reply_failure();
        assert!(!settled.should_scroll_to_bottom());

        let near = ViewportMetrics::new(4000.0, 3450.0, 500.0);
        let Submission::Accepted { state: sending, .. } = settled.submit("d", Some(near)) else {
            panic!("Expected accepted submit");
        };
        assert!(sending.on_reply_success("e").should_scroll_to_bottom());
    }
}
