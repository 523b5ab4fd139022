use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of one tool invocation inside a turn. The two output states
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    /// Arguments still streaming from the model
    Pending,
    /// Arguments complete, execution starting
    InputAvailable,
    OutputAvailable,
    OutputError,
}

impl ToolCallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallState::Pending => "pending",
            ToolCallState::InputAvailable => "input-available",
            ToolCallState::OutputAvailable => "output-available",
            ToolCallState::OutputError => "output-error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolCallState::OutputAvailable | ToolCallState::OutputError)
    }

    /// Legal transitions: pending -> input-available -> (output-available
    /// | output-error). Everything else is a bug in the driver.
    pub fn can_transition_to(&self, next: ToolCallState) -> bool {
        match (self, next) {
            (ToolCallState::Pending, ToolCallState::InputAvailable) => true,
            (ToolCallState::InputAvailable, ToolCallState::OutputAvailable) => true,
            (ToolCallState::InputAvailable, ToolCallState::OutputError) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ToolCallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event types for turn progress broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    TurnStarted,
    TextDelta,
    ToolCallPending,
    ToolCallInputAvailable,
    ToolCallOutputAvailable,
    ToolCallOutputError,
    TurnCompleted,
    TurnError,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TurnStarted => "turn.started",
            Self::TextDelta => "text.delta",
            Self::ToolCallPending => "tool_call.pending",
            Self::ToolCallInputAvailable => "tool_call.input_available",
            Self::ToolCallOutputAvailable => "tool_call.output_available",
            Self::ToolCallOutputError => "tool_call.output_error",
            Self::TurnCompleted => "turn.completed",
            Self::TurnError => "turn.error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Server-push event streamed to subscribers while a turn runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub event: String,
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            type_: "event".to_string(),
            event: event.into(),
            data,
        }
    }

    pub fn turn_started(turn_id: &str) -> Self {
        Self::new(
            EventType::TurnStarted.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        )
    }

    /// Partial assistant text as it becomes available
    pub fn text_delta(turn_id: &str, text: &str) -> Self {
        Self::new(
            EventType::TextDelta.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "text": text
            }),
        )
    }

    pub fn tool_call_pending(turn_id: &str, call_id: &str, tool_name: &str) -> Self {
        Self::new(
            EventType::ToolCallPending.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "call_id": call_id,
                "tool_name": tool_name,
                "state": ToolCallState::Pending.as_str()
            }),
        )
    }

    pub fn tool_call_input_available(
        turn_id: &str,
        call_id: &str,
        tool_name: &str,
        arguments: &Value,
    ) -> Self {
        Self::new(
            EventType::ToolCallInputAvailable.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "call_id": call_id,
                "tool_name": tool_name,
                "state": ToolCallState::InputAvailable.as_str(),
                "arguments": arguments
            }),
        )
    }

    pub fn tool_call_output_available(
        turn_id: &str,
        call_id: &str,
        tool_name: &str,
        duration_ms: i64,
    ) -> Self {
        Self::new(
            EventType::ToolCallOutputAvailable.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "call_id": call_id,
                "tool_name": tool_name,
                "state": ToolCallState::OutputAvailable.as_str(),
                "duration_ms": duration_ms
            }),
        )
    }

    pub fn tool_call_output_error(
        turn_id: &str,
        call_id: &str,
        tool_name: &str,
        error: &str,
        duration_ms: i64,
    ) -> Self {
        Self::new(
            EventType::ToolCallOutputError.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "call_id": call_id,
                "tool_name": tool_name,
                "state": ToolCallState::OutputError.as_str(),
                "error": error,
                "duration_ms": duration_ms
            }),
        )
    }

    pub fn turn_completed(turn_id: &str, rounds_used: usize) -> Self {
        Self::new(
            EventType::TurnCompleted.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "rounds_used": rounds_used,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        )
    }

    pub fn turn_error(turn_id: &str, error: &str) -> Self {
        Self::new(
            EventType::TurnError.as_str(),
            serde_json::json!({
                "turn_id": turn_id,
                "error": error,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use ToolCallState::*;
        assert!(Pending.can_transition_to(InputAvailable));
        assert!(InputAvailable.can_transition_to(OutputAvailable));
        assert!(InputAvailable.can_transition_to(OutputError));
    }

    #[test]
    fn test_terminal_states_cannot_transition() {
        use ToolCallState::*;
        for terminal in [OutputAvailable, OutputError] {
            assert!(terminal.is_terminal());
            for next in [Pending, InputAvailable, OutputAvailable, OutputError] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_pending_cannot_skip_to_output() {
        use ToolCallState::*;
        assert!(!Pending.can_transition_to(OutputAvailable));
        assert!(!Pending.can_transition_to(OutputError));
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = GatewayEvent::text_delta("t1", "hello");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "text.delta");
        assert_eq!(json["data"]["text"], "hello");
    }
}
