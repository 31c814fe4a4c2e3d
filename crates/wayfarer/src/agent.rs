use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, ToolCall, ToolKind, ToolResult, INVALID_TOOL_CALL};
use crate::prompt_template::system_prompt;
use crate::providers::base::Provider;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_ITERATIONS: usize = 6;
pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 40;

/// Reply used when the language model cannot be reached or answers with garbage
pub const DEGRADED_REPLY: &str =
    "I couldn't complete that request right now. Please try again in a moment.";
/// Reply used when the model keeps asking for tools past the iteration bound
pub const LOOP_BOUND_REPLY: &str = "I gathered some information but couldn't finish that request. \
     Try asking about one part of the trip at a time.";
const EMPTY_REPLY: &str = "I don't have an answer for that yet. Could you rephrase the question?";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on model calls for a single user message
    pub max_iterations: usize,
    pub max_history_messages: usize,
    /// Replaces the built-in system prompt template
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_history_messages: DEFAULT_MAX_HISTORY_MESSAGES,
            system_prompt_path: None,
        }
    }
}

/// Where a single `handle_message` run currently is.
///
/// Every run starts in `AwaitingModel` and ends in `Done` or `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    AwaitingModel,
    DispatchingTools,
    Done,
    Aborted,
}

/// Structured data the front end can render next to the reply (maps, weather cards)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub data: Value,
}

impl Attachment {
    fn from_result(result: &ToolResult) -> Option<Self> {
        if !result.success {
            return None;
        }
        let kind = ToolKind::from_str(&result.name).ok()?;
        match kind {
            ToolKind::Weather | ToolKind::Directions | ToolKind::Places => Some(Self {
                kind,
                data: result.payload.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// Every tool result produced while answering, in dispatch order
    pub tool_results: Vec<ToolResult>,
    pub state: AgentState,
    /// Why the run was aborted, if it was
    pub error: Option<AgentError>,
    pub model_calls: usize,
}

/// Agent drives the exchange between the language model and the travel tools
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry.tools()
    }

    /// Answer one user message, calling tools as the model requests them.
    ///
    /// The conversation is updated in place with the user turn, every assistant and tool
    /// turn, and the final reply. This never fails: model errors and runaway tool loops
    /// come back as a degraded reply with state `Aborted`.
    pub async fn handle_message(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        location: Option<&str>,
    ) -> AgentReply {
        conversation.push(Message::user().with_text(user_text));

        let tools = self.registry.tools();
        let mut reply = AgentReply {
            text: String::new(),
            attachments: Vec::new(),
            tool_results: Vec::new(),
            state: AgentState::AwaitingModel,
            error: None,
            model_calls: 0,
        };

        let system = match system_prompt(
            &tools,
            location,
            self.config.system_prompt_path.as_deref(),
        ) {
            Ok(system) => system,
            Err(e) => {
                warn!(session_id = %conversation.session_id, error = %e, "failed to render system prompt");
                self.abort(
                    conversation,
                    &mut reply,
                    DEGRADED_REPLY,
                    AgentError::Internal(e.to_string()),
                );
                return reply;
            }
        };

        let mut pending: Vec<ToolRequest> = Vec::new();
        loop {
            match reply.state {
                AgentState::AwaitingModel => {
                    if reply.model_calls >= self.config.max_iterations {
                        warn!(
                            session_id = %conversation.session_id,
                            max_iterations = self.config.max_iterations,
                            "model kept requesting tools"
                        );
                        let err = AgentError::LoopBoundExceeded(self.config.max_iterations);
                        self.abort(conversation, &mut reply, LOOP_BOUND_REPLY, err);
                        continue;
                    }

                    reply.model_calls += 1;
                    match self
                        .provider
                        .complete(&system, conversation.messages(), &tools)
                        .await
                    {
                        Ok((response, usage)) => {
                            debug!(
                                session_id = %conversation.session_id,
                                total_tokens = ?usage.total_tokens,
                                tool_requests = response.tool_requests().len(),
                                "model responded"
                            );
                            if response.has_tool_requests() {
                                pending = response.tool_requests().into_iter().cloned().collect();
                                reply.state = AgentState::DispatchingTools;
                            } else {
                                let text = response.text();
                                reply.text = if text.trim().is_empty() {
                                    EMPTY_REPLY.to_string()
                                } else {
                                    text
                                };
                                reply.state = AgentState::Done;
                            }
                            conversation.push(response);
                        }
                        Err(e) => {
                            warn!(session_id = %conversation.session_id, error = %e, "model call failed");
                            let err = AgentError::Dependency(e.to_string());
                            self.abort(conversation, &mut reply, DEGRADED_REPLY, err);
                        }
                    }
                }
                AgentState::DispatchingTools => {
                    let results = self.dispatch_all(&conversation.session_id, &pending).await;

                    let mut tool_message = Message::tool();
                    for (request, result) in pending.drain(..).zip(results) {
                        reply.attachments.extend(Attachment::from_result(&result));
                        reply.tool_results.push(result.clone());
                        tool_message = tool_message.with_tool_response(request.id, result);
                    }
                    conversation.push(tool_message);
                    reply.state = AgentState::AwaitingModel;
                }
                AgentState::Done | AgentState::Aborted => break,
            }
        }

        info!(
            session_id = %conversation.session_id,
            state = ?reply.state,
            model_calls = reply.model_calls,
            tool_calls = reply.tool_results.len(),
            "finished handling message"
        );
        conversation.truncate_to(self.config.max_history_messages);
        reply
    }

    /// Run every requested tool concurrently; results come back in request order.
    async fn dispatch_all(&self, session_id: &str, requests: &[ToolRequest]) -> Vec<ToolResult> {
        let futures: Vec<_> = requests
            .iter()
            .map(|request| async move {
                match &request.tool_call {
                    Ok(call) if call.name == ToolKind::Sos.as_ref() => {
                        self.registry.dispatch(&scoped_to_user(call, session_id)).await
                    }
                    Ok(call) => self.registry.dispatch(call).await,
                    Err(e) => {
                        warn!(error = %e, "model produced an invalid tool request");
                        ToolResult::failure(INVALID_TOOL_CALL, e)
                    }
                }
            })
            .collect();

        futures::future::join_all(futures).await
    }

    fn abort(
        &self,
        conversation: &mut Conversation,
        reply: &mut AgentReply,
        text: &str,
        error: AgentError,
    ) {
        conversation.push(Message::assistant().with_text(text));
        reply.text = text.to_string();
        reply.error = Some(error);
        reply.state = AgentState::Aborted;
    }
}

/// The session owns the alert: whatever `user_id` the model wrote is replaced
fn scoped_to_user(call: &ToolCall, session_id: &str) -> ToolCall {
    let mut call = call.clone();
    if let Some(arguments) = call.arguments.as_object_mut() {
        arguments.insert("user_id".to_string(), Value::String(session_id.to_string()));
    }
    call
}
