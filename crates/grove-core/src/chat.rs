//! Chat backend boundary and the exchange driver.
//!
//! The backend trait is the only seam between the engagement core and
//! whatever model service the host wires in. The driver owns the dispatch
//! choreography for one user exchange: stage the query, open the response,
//! forward chunks, finalize, then roll the entropy signal forward. Callbacks
//! are synchronous; streaming transports buffer behind the trait.

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::engagement::{EngagementEvent, EngagementMachine};
use crate::engine::entropy::{
    EntropyState, TopicHub, calculate_entropy, should_inject, update_entropy_state,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A plain transcript message, as the backend sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default)]
    pub is_streaming: bool,
}

/// Backend metadata reported once a streamed response completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Topic hub the response touched, when the backend can tell
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

/// The model-service seam.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Establishes a session with the given system prompt.
    async fn init_chat_session(&self, system_prompt: &str) -> Result<()>;

    /// Streams a response, invoking `on_chunk` for each text fragment in
    /// arrival order. Zero chunks is a valid (empty) response.
    async fn send_message_stream(
        &self,
        prompt: &str,
        on_chunk: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<ChatResponse>;
}

/// Outcome of one driven exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOutcome {
    /// Normalized entropy in [0, 1] dispatched to the machine
    pub entropy: f32,
    /// Whether a journey offer should be surfaced now
    pub inject: bool,
    /// Cluster the offer should route to, when injecting
    pub dominant_cluster: Option<String>,
}

/// Drives the machine through a full user exchange against a backend.
pub struct ExchangeDriver {
    machine: Arc<Mutex<EngagementMachine>>,
    backend: Arc<dyn ChatBackend>,
    sink: Arc<dyn AnalyticsSink>,
    hubs: Vec<TopicHub>,
    entropy_state: Mutex<EntropyState>,
}

impl ExchangeDriver {
    pub fn new(
        machine: Arc<Mutex<EngagementMachine>>,
        backend: Arc<dyn ChatBackend>,
        sink: Arc<dyn AnalyticsSink>,
        hubs: Vec<TopicHub>,
    ) -> Self {
        Self {
            machine,
            backend,
            sink,
            hubs,
            entropy_state: Mutex::new(EntropyState::default()),
        }
    }

    fn machine(&self) -> MutexGuard<'_, EngagementMachine> {
        // Poisoning only means a panic elsewhere; the machine itself stays
        // consistent because every event runs to completion.
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current entropy bookkeeping.
    pub fn entropy_state(&self) -> EntropyState {
        self.entropy_state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Runs one exchange: stage the query, stream the response into the
    /// machine, finalize, then score entropy over the updated history.
    ///
    /// Backend failure degrades to an `Error: {message}` response finalized
    /// into the stream; the machine never sees a half-open exchange.
    pub async fn submit(&self, prompt: &str) -> ExchangeOutcome {
        {
            let mut machine = self.machine();
            machine.send(EngagementEvent::StartQuery {
                prompt: prompt.to_string(),
            });
            machine.send(EngagementEvent::StartResponse);
        }

        let machine_for_chunks = Arc::clone(&self.machine);
        let on_chunk = move |chunk: &str| {
            let mut machine = machine_for_chunks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            machine.send(EngagementEvent::StreamChunk {
                chunk: chunk.to_string(),
            });
        };

        let result = self.backend.send_message_stream(prompt, &on_chunk).await;

        let mut machine = self.machine();
        match result {
            Ok(response) => {
                machine.send(EngagementEvent::FinalizeResponse);
                if let Some(hub_id) = response.hub_id {
                    machine.send(EngagementEvent::HubVisited { hub_id });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat backend failed mid-exchange");
                self.sink.track(AnalyticsEvent::ExchangeFailed {
                    message: e.to_string(),
                });
                machine.send(EngagementEvent::StreamChunk {
                    chunk: format!("Error: {e}"),
                });
                machine.send(EngagementEvent::FinalizeResponse);
            }
        }

        let exchange_count = machine.context().exchange_count() as u32;
        let history: Vec<ChatMessage> = machine
            .context()
            .stream_history
            .iter()
            .filter_map(|item| {
                let role = if item.is_query() {
                    ChatRole::User
                } else if item.is_response() {
                    ChatRole::Assistant
                } else {
                    return None;
                };
                Some(ChatMessage {
                    id: item.id().to_string(),
                    role,
                    text: item.content().unwrap_or_default().to_string(),
                    is_streaming: false,
                })
            })
            .collect();

        let entropy = calculate_entropy(prompt, &history, &self.hubs, exchange_count);
        let normalized = (entropy.score as f32 / 100.0).clamp(0.0, 1.0);
        machine.send(EngagementEvent::UpdateEntropy { value: normalized });
        drop(machine);

        let inject = {
            let mut state = self
                .entropy_state
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let inject = should_inject(&entropy, &state);
            *state = update_entropy_state(&state, &entropy, inject, exchange_count);
            inject
        };

        if inject {
            if let Some(cluster) = &entropy.dominant_cluster {
                self.sink.track(AnalyticsEvent::EntropyInjection {
                    cluster: cluster.clone(),
                    score: entropy.score,
                });
            }
        }
        self.sink
            .track(AnalyticsEvent::ExchangeSent { exchange_count });

        ExchangeOutcome {
            entropy: normalized,
            inject,
            dominant_cluster: entropy.dominant_cluster,
        }
    }
}
