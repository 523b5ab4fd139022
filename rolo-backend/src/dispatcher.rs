//! Tool-calling conversation controller
//!
//! Drives one user turn: the model is called with the agent tools attached;
//! any tool calls it makes run concurrently as tracked tasks; results feed
//! back and the loop continues until the model answers in plain text or a
//! budget runs out. Two budgets bound every turn: a round cap on model-
//! orchestrated tool rounds and a wall-clock cap with best-effort
//! abandonment of in-flight calls.

use crate::ai::{ChatModel, Message, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::error::AgentError;
use crate::gateway::events::EventBroadcaster;
use crate::gateway::protocol::{GatewayEvent, ToolCallState};
use crate::tools::ToolRegistry;
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Maximum model-orchestrated tool-call rounds per turn
const MAX_TOOL_ROUNDS: usize = 5;
/// Wall-clock budget per turn
const TURN_BUDGET_SECS: u64 = 60;

/// Everything known about one tool invocation once the turn is over.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub state: ToolCallState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
}

/// The assembled turn: final text plus every tool call's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub turn_id: String,
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub rounds_used: usize,
    /// True when a budget (rounds or wall clock) ended the turn early
    pub budget_exhausted: bool,
}

struct TurnOutcome {
    rounds: usize,
    rounds_exhausted: bool,
}

/// Per-turn accumulator. Tool tasks update it concurrently; the dispatcher
/// assembles the result from it even when the wall clock cuts the turn off.
struct TurnTracker {
    turn_id: String,
    text: Mutex<String>,
    calls: DashMap<String, ToolCallRecord>,
    order: Mutex<Vec<String>>,
    rounds: AtomicUsize,
}

impl TurnTracker {
    fn new(turn_id: String) -> Self {
        Self {
            turn_id,
            text: Mutex::new(String::new()),
            calls: DashMap::new(),
            order: Mutex::new(Vec::new()),
            rounds: AtomicUsize::new(0),
        }
    }

    fn append_text(&self, text: &str) {
        let mut buffer = self.text.lock().unwrap();
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(text);
    }

    /// Guarded state transition. Returns false (and logs) on an illegal
    /// transition instead of corrupting a terminal state.
    fn transition(&self, call_id: &str, next: ToolCallState) -> bool {
        if let Some(mut record) = self.calls.get_mut(call_id) {
            if record.state.can_transition_to(next) {
                record.state = next;
                return true;
            }
            log::error!(
                "[DISPATCH] Illegal tool call transition {} -> {} for {}",
                record.state,
                next,
                call_id
            );
        }
        false
    }

    fn begin_call(&self, broadcaster: &EventBroadcaster, call: &ToolCall) {
        self.calls.insert(
            call.id.clone(),
            ToolCallRecord {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                state: ToolCallState::Pending,
                output: None,
                error: None,
                duration_ms: 0,
            },
        );
        self.order.lock().unwrap().push(call.id.clone());
        broadcaster.broadcast(GatewayEvent::tool_call_pending(
            &self.turn_id,
            &call.id,
            &call.name,
        ));

        // The non-streaming gateway hands us complete arguments, so the
        // pending window closes immediately.
        self.transition(&call.id, ToolCallState::InputAvailable);
        broadcaster.broadcast(GatewayEvent::tool_call_input_available(
            &self.turn_id,
            &call.id,
            &call.name,
            &call.arguments,
        ));
    }

    fn finish_call(
        &self,
        broadcaster: &EventBroadcaster,
        call: &ToolCall,
        outcome: Result<&str, &str>,
        duration_ms: i64,
    ) {
        match outcome {
            Ok(output) => {
                if self.transition(&call.id, ToolCallState::OutputAvailable) {
                    if let Some(mut record) = self.calls.get_mut(&call.id) {
                        record.output = Some(output.to_string());
                        record.duration_ms = duration_ms;
                    }
                    broadcaster.broadcast(GatewayEvent::tool_call_output_available(
                        &self.turn_id,
                        &call.id,
                        &call.name,
                        duration_ms,
                    ));
                }
            }
            Err(error) => {
                if self.transition(&call.id, ToolCallState::OutputError) {
                    if let Some(mut record) = self.calls.get_mut(&call.id) {
                        record.error = Some(error.to_string());
                        record.duration_ms = duration_ms;
                    }
                    broadcaster.broadcast(GatewayEvent::tool_call_output_error(
                        &self.turn_id,
                        &call.id,
                        &call.name,
                        error,
                        duration_ms,
                    ));
                }
            }
        }
    }

    fn assemble(&self, budget_exhausted: bool) -> TurnResult {
        let order = self.order.lock().unwrap();
        let tool_calls = order
            .iter()
            .filter_map(|id| self.calls.get(id).map(|r| r.value().clone()))
            .collect();
        TurnResult {
            turn_id: self.turn_id.clone(),
            text: self.text.lock().unwrap().clone(),
            tool_calls,
            rounds_used: self.rounds.load(Ordering::SeqCst),
            budget_exhausted,
        }
    }
}

/// Dispatcher routes one message turn through the model and the tools.
pub struct MessageDispatcher {
    model: Arc<dyn ChatModel>,
    tool_registry: Arc<ToolRegistry>,
    broadcaster: Arc<EventBroadcaster>,
    max_tool_rounds: usize,
    turn_budget: Duration,
}

impl MessageDispatcher {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tool_registry: Arc<ToolRegistry>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            model,
            tool_registry,
            broadcaster,
            max_tool_rounds: MAX_TOOL_ROUNDS,
            turn_budget: Duration::from_secs(TURN_BUDGET_SECS),
        }
    }

    pub fn with_limits(mut self, max_tool_rounds: usize, turn_budget: Duration) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self.turn_budget = turn_budget;
        self
    }

    /// Run one turn to completion or budget exhaustion. On wall-clock
    /// expiry, in-flight tool calls are abandoned best-effort and the turn
    /// returns with whatever completed.
    pub async fn dispatch(&self, messages: Vec<Message>) -> Result<TurnResult, AgentError> {
        let turn_id = Uuid::new_v4().to_string();
        let tracker = Arc::new(TurnTracker::new(turn_id.clone()));
        let cancel = CancellationToken::new();

        log::info!("[DISPATCH] Turn {} starting ({} messages)", turn_id, messages.len());
        self.broadcaster.broadcast(GatewayEvent::turn_started(&turn_id));

        let outcome = tokio::time::timeout(
            self.turn_budget,
            self.run_turn(&tracker, messages, &cancel),
        )
        .await;

        match outcome {
            Ok(Ok(turn)) => {
                self.broadcaster
                    .broadcast(GatewayEvent::turn_completed(&turn_id, turn.rounds));
                if turn.rounds_exhausted {
                    log::warn!(
                        "[DISPATCH] Turn {} hit its {}-round tool budget",
                        turn_id,
                        self.max_tool_rounds
                    );
                }
                Ok(tracker.assemble(turn.rounds_exhausted))
            }
            Ok(Err(e)) => {
                log::error!("[DISPATCH] Turn {} failed: {}", turn_id, e);
                self.broadcaster.broadcast(GatewayEvent::turn_error(&turn_id, &e));
                Err(AgentError::Provider(e))
            }
            Err(_) => {
                cancel.cancel();
                log::warn!(
                    "[DISPATCH] Turn {} exceeded its {:?} wall-clock budget, abandoning in-flight calls",
                    turn_id,
                    self.turn_budget
                );
                self.broadcaster
                    .broadcast(GatewayEvent::turn_error(&turn_id, "turn budget exceeded"));
                Ok(tracker.assemble(true))
            }
        }
    }

    async fn run_turn(
        &self,
        tracker: &Arc<TurnTracker>,
        messages: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, String> {
        let tools = self.tool_registry.get_tool_definitions();
        let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();

        for round in 1..=self.max_tool_rounds {
            tracker.rounds.store(round, Ordering::SeqCst);
            log::debug!("[DISPATCH] Turn {} round {}", tracker.turn_id, round);

            let response = self
                .model
                .generate_with_tools(messages.clone(), tool_history.clone(), tools.clone())
                .await?;

            if !response.content.is_empty() {
                tracker.append_text(&response.content);
                self.broadcaster
                    .broadcast(GatewayEvent::text_delta(&tracker.turn_id, &response.content));
            }

            if response.tool_calls.is_empty() {
                return Ok(TurnOutcome { rounds: round, rounds_exhausted: false });
            }

            let responses = self
                .execute_tool_calls(tracker, &response.tool_calls, cancel)
                .await;
            tool_history.push(ToolHistoryEntry::new(response.tool_calls, responses));
        }

        Ok(TurnOutcome {
            rounds: self.max_tool_rounds,
            rounds_exhausted: true,
        })
    }

    /// Execute one round's tool calls as concurrent tasks. Each call runs
    /// exactly once, transitions through its lifecycle independently, and
    /// a failure in one never touches its siblings.
    async fn execute_tool_calls(
        &self,
        tracker: &Arc<TurnTracker>,
        tool_calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Vec<ToolResponse> {
        let handles: Vec<_> = tool_calls
            .iter()
            .cloned()
            .map(|call| {
                let registry = self.tool_registry.clone();
                let broadcaster = self.broadcaster.clone();
                let tracker = tracker.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    let start = std::time::Instant::now();
                    tracker.begin_call(&broadcaster, &call);

                    let result = tokio::select! {
                        _ = cancel.cancelled() => {
                            crate::tools::ToolResult::error("abandoned: turn budget exceeded")
                        }
                        result = registry.execute(&call.name, call.arguments.clone()) => result,
                    };

                    let duration_ms = start.elapsed().as_millis() as i64;
                    let outcome = if result.success {
                        Ok(result.content.as_str())
                    } else {
                        Err(result.content.as_str())
                    };
                    tracker.finish_call(&broadcaster, &call, outcome, duration_ms);

                    ToolResponse {
                        tool_call_id: call.id.clone(),
                        content: result.content.clone(),
                        is_error: !result.success,
                    }
                })
            })
            .collect();

        let mut responses = Vec::with_capacity(tool_calls.len());
        for (call, joined) in tool_calls.iter().zip(join_all(handles).await) {
            match joined {
                Ok(response) => responses.push(response),
                Err(e) => {
                    // A panicking tool is captured per-call, like any other
                    // tool failure
                    let message = format!("tool task failed: {}", e);
                    tracker.finish_call(
                        &self.broadcaster,
                        call,
                        Err(message.as_str()),
                        0,
                    );
                    responses.push(ToolResponse {
                        tool_call_id: call.id.clone(),
                        content: message,
                        is_error: true,
                    });
                }
            }
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiResponse;
    use crate::ai::testing::ScriptedToolModel;
    use crate::schema::ObjectSchema;
    use crate::tools::registry::Tool;
    use crate::tools::types::{ToolDefinition, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticTool {
        name: &'static str,
        result: ToolResult,
        delay: Duration,
    }

    impl StaticTool {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                result: ToolResult::success("done"),
                delay: Duration::ZERO,
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                result: ToolResult::error("tool blew up"),
                delay: Duration::ZERO,
            }
        }

        fn slow(name: &'static str, delay: Duration) -> Self {
            Self {
                name,
                result: ToolResult::success("done"),
                delay,
            }
        }
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: "test tool".to_string(),
                input_schema: ObjectSchema::new(),
            }
        }

        async fn execute(&self, _params: Value) -> ToolResult {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }
    }

    fn text_response(text: &str) -> AiResponse {
        AiResponse {
            content: text.to_string(),
            tool_calls: vec![],
            stop_reason: Some("end_turn".to_string()),
        }
    }

    fn tool_response(calls: Vec<(&str, &str)>) -> AiResponse {
        AiResponse {
            content: String::new(),
            tool_calls: calls
                .into_iter()
                .map(|(id, name)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: json!({}),
                })
                .collect(),
            stop_reason: Some("tool_use".to_string()),
        }
    }

    fn dispatcher(
        responses: Vec<AiResponse>,
        tools: Vec<StaticTool>,
    ) -> (MessageDispatcher, Arc<EventBroadcaster>) {
        let model = Arc::new(ScriptedToolModel::new(responses));
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(Arc::new(tool));
        }
        let broadcaster = Arc::new(EventBroadcaster::new());
        (
            MessageDispatcher::new(model, Arc::new(registry), broadcaster.clone()),
            broadcaster,
        )
    }

    #[tokio::test]
    async fn test_plain_text_turn_completes_in_one_round() {
        let (dispatcher, broadcaster) = dispatcher(vec![text_response("hello")], vec![]);
        let mut rx = broadcaster.subscribe();

        let result = dispatcher.dispatch(vec![Message::user("hi")]).await.unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.rounds_used, 1);
        assert!(result.tool_calls.is_empty());
        assert!(!result.budget_exhausted);

        assert_eq!(rx.recv().await.unwrap().event, "turn.started");
        assert_eq!(rx.recv().await.unwrap().event, "text.delta");
        assert_eq!(rx.recv().await.unwrap().event, "turn.completed");
    }

    #[tokio::test]
    async fn test_failing_tool_does_not_abort_its_sibling() {
        // Scenario: one call errors, the sibling in the same turn still
        // reaches output-available, and the turn finishes normally.
        let (dispatcher, broadcaster) = dispatcher(
            vec![
                tool_response(vec![("call_ok", "good_tool"), ("call_bad", "bad_tool")]),
                text_response("done"),
            ],
            vec![StaticTool::ok("good_tool"), StaticTool::failing("bad_tool")],
        );
        let mut rx = broadcaster.subscribe();

        let result = dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();

        assert_eq!(result.text, "done");
        assert_eq!(result.tool_calls.len(), 2);

        let ok = result.tool_calls.iter().find(|c| c.id == "call_ok").unwrap();
        assert_eq!(ok.state, ToolCallState::OutputAvailable);
        assert_eq!(ok.output.as_deref(), Some("done"));
        assert!(ok.error.is_none());

        let bad = result.tool_calls.iter().find(|c| c.id == "call_bad").unwrap();
        assert_eq!(bad.state, ToolCallState::OutputError);
        assert_eq!(bad.error.as_deref(), Some("tool blew up"));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event.event);
        }
        assert!(events.contains(&"tool_call.output_available".to_string()));
        assert!(events.contains(&"tool_call.output_error".to_string()));
        assert!(events.contains(&"turn.completed".to_string()));
    }

    #[tokio::test]
    async fn test_tool_lifecycle_events_stream_in_order() {
        let (dispatcher, broadcaster) = dispatcher(
            vec![
                tool_response(vec![("call_1", "good_tool")]),
                text_response("done"),
            ],
            vec![StaticTool::ok("good_tool")],
        );
        let mut rx = broadcaster.subscribe();

        dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();

        let mut lifecycle = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.event.starts_with("tool_call.") {
                lifecycle.push(event.event);
            }
        }
        assert_eq!(
            lifecycle,
            vec![
                "tool_call.pending",
                "tool_call.input_available",
                "tool_call.output_available"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_tool_calls_do_not_block_each_other() {
        let delay = Duration::from_millis(100);
        let (dispatcher, _) = dispatcher(
            vec![
                tool_response(vec![("c1", "slow_a"), ("c2", "slow_b")]),
                text_response("done"),
            ],
            vec![
                StaticTool::slow("slow_a", delay),
                StaticTool::slow("slow_b", delay),
            ],
        );

        let start = tokio::time::Instant::now();
        let result = dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.tool_calls.len(), 2);
        // Two 100ms tools joined concurrently: well under the 200ms a
        // sequential run would take
        assert!(elapsed < Duration::from_millis(150), "elapsed: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_round_budget_caps_tool_rounds() {
        let endless = || tool_response(vec![("c", "good_tool")]);
        let (dispatcher, _) = dispatcher(
            vec![endless(), endless(), endless()],
            vec![StaticTool::ok("good_tool")],
        );
        let dispatcher = dispatcher.with_limits(2, Duration::from_secs(60));

        let result = dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();

        assert!(result.budget_exhausted);
        assert_eq!(result.rounds_used, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_budget_returns_with_whatever_completed() {
        let (dispatcher, _) = dispatcher(
            vec![
                tool_response(vec![("c_slow", "very_slow")]),
                text_response("never reached"),
            ],
            vec![StaticTool::slow("very_slow", Duration::from_secs(300))],
        );
        let dispatcher = dispatcher.with_limits(5, Duration::from_millis(50));

        let result = dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();

        assert!(result.budget_exhausted);
        assert!(result.text.is_empty());
        // The in-flight call was abandoned, never reaching output-available
        let record = &result.tool_calls[0];
        assert_ne!(record.state, ToolCallState::OutputAvailable);
    }

    #[tokio::test]
    async fn test_model_failure_is_a_turn_error() {
        let (dispatcher, _) = dispatcher(vec![], vec![]);
        let err = dispatcher.dispatch(vec![Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_name_becomes_output_error() {
        let (dispatcher, _) = dispatcher(
            vec![
                tool_response(vec![("c1", "invented_tool")]),
                text_response("ok"),
            ],
            vec![],
        );

        let result = dispatcher.dispatch(vec![Message::user("go")]).await.unwrap();
        let record = &result.tool_calls[0];
        assert_eq!(record.state, ToolCallState::OutputError);
        assert!(record.error.as_deref().unwrap().contains("Unknown tool"));
    }
}
