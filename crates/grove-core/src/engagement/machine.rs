//! The engagement state machine.
//!
//! A parallel finite-state machine with two orthogonal regions, `session`
//! and `terminal`, plus a flat extended context. Event processing is fully
//! synchronous: each dispatched event runs guard evaluation and actions to
//! completion before the next one is accepted, and all context mutation goes
//! through named actions here. Guarded illegal transitions are silent no-ops,
//! never errors.

use super::context::{EngagementContext, Journey, LensSource};
use super::event::EngagementEvent;
use crate::stream::{PivotContext, QueryItem, ResponseItem, StreamItem};
use crate::transformers::{parse, parse_navigation};

/// States of the `session` region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    LensActive,
    JourneyActive,
    JourneyComplete,
}

/// States of the `terminal` region. Fully independent of `session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Closed,
    Open,
}

/// The engagement machine instance. One per browser session; it exclusively
/// owns its [`EngagementContext`].
#[derive(Debug, Clone)]
pub struct EngagementMachine {
    session: SessionState,
    terminal: TerminalState,
    context: EngagementContext,
}

impl Default for EngagementMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngagementMachine {
    /// Creates a machine in `session.anonymous` / `terminal.closed`.
    pub fn new() -> Self {
        Self {
            session: SessionState::Anonymous,
            terminal: TerminalState::Closed,
            context: EngagementContext::default(),
        }
    }

    /// Read access to the extended state.
    pub fn context(&self) -> &EngagementContext {
        &self.context
    }

    /// Current state of the `session` region.
    pub fn session(&self) -> SessionState {
        self.session
    }

    /// Current state of the `terminal` region.
    pub fn terminal(&self) -> TerminalState {
        self.terminal
    }

    /// Dotted-path state query, e.g. `"session.lens_active"` or
    /// `"terminal.open"`. Unknown ids are simply `false`.
    pub fn matches(&self, state_id: &str) -> bool {
        match state_id {
            "session.anonymous" => self.session == SessionState::Anonymous,
            "session.lens_active" => self.session == SessionState::LensActive,
            "session.journey_active" => self.session == SessionState::JourneyActive,
            "session.journey_complete" => self.session == SessionState::JourneyComplete,
            "terminal.closed" => self.terminal == TerminalState::Closed,
            "terminal.open" => self.terminal == TerminalState::Open,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    fn has_lens(&self) -> bool {
        self.context.lens.is_some()
    }

    fn not_at_end(&self) -> bool {
        self.context.journey_progress + 1 < self.context.journey_total
    }

    /// Logical complement of the advance guard. Not wired to any transition
    /// here; consumers poll it to decide when to offer completion.
    pub fn at_end(&self) -> bool {
        self.context.journey_total > 0 && !self.not_at_end()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Processes one event to completion.
    pub fn send(&mut self, event: EngagementEvent) {
        match event {
            EngagementEvent::SelectLens { lens, source } => {
                if self.session == SessionState::Anonymous {
                    self.assign_lens(lens, source);
                    self.session = SessionState::LensActive;
                }
            }
            EngagementEvent::ChangeLens { lens } => {
                if self.session != SessionState::Anonymous {
                    self.assign_lens(lens, LensSource::Selection);
                }
            }
            EngagementEvent::StartJourney { journey } => match self.session {
                SessionState::LensActive | SessionState::JourneyComplete
                    if self.has_lens() =>
                {
                    self.init_journey(journey);
                    self.session = SessionState::JourneyActive;
                }
                // Journey-switching mid-flight re-initializes progress.
                SessionState::JourneyActive => self.init_journey(journey),
                _ => {}
            },
            EngagementEvent::AdvanceStep => {
                if self.session == SessionState::JourneyActive && self.not_at_end() {
                    self.context.journey_progress += 1;
                }
            }
            EngagementEvent::CompleteJourney => {
                if self.session == SessionState::JourneyActive {
                    self.session = SessionState::JourneyComplete;
                    tracing::debug!(
                        journey = self.context.journey.as_ref().map(|j| j.id.as_str()),
                        "journey complete"
                    );
                }
            }
            EngagementEvent::ExitJourney => {
                if matches!(
                    self.session,
                    SessionState::JourneyActive | SessionState::JourneyComplete
                ) {
                    self.clear_journey();
                    self.session = SessionState::LensActive;
                }
            }

            EngagementEvent::OpenTerminal => self.terminal = TerminalState::Open,
            EngagementEvent::CloseTerminal => self.terminal = TerminalState::Closed,

            EngagementEvent::UpdateEntropy { value } => self.context.entropy = value,

            EngagementEvent::StartQuery { prompt } => {
                // Staged, not yet durable: commits when the response begins.
                self.context.current_stream_item =
                    Some(StreamItem::Query(QueryItem::new(prompt)));
            }
            EngagementEvent::StartResponse => {
                self.commit_pending_query();
                self.context.current_stream_item =
                    Some(StreamItem::Response(ResponseItem::streaming()));
            }
            EngagementEvent::StreamChunk { chunk } => {
                if let Some(StreamItem::Response(response)) =
                    self.context.current_stream_item.as_mut()
                {
                    response.content.push_str(&chunk);
                }
            }
            EngagementEvent::FinalizeResponse => self.finalize_response(),

            EngagementEvent::ClickPivot { span, response_id } => {
                let mut query = QueryItem::new(format!("Tell me more about {}", span.text));
                query.pivot = Some(PivotContext {
                    source_response_id: response_id,
                    source_text: span.text,
                    source_context: None,
                    target_concept_id: span.concept_id,
                });
                self.context.pivot_count += 1;
                self.append_durable_query(query);
            }
            EngagementEvent::SelectFork {
                fork,
                response_id: _,
            } => {
                let mut query = QueryItem::new(fork.effective_query().to_string());
                query.intent = Some(fork.kind);
                self.append_durable_query(query);
            }

            EngagementEvent::HubVisited { hub_id } => self.record_hub_visit(hub_id),

            EngagementEvent::SetFlag { key, value } => {
                self.context.flags.insert(key, value);
            }
            EngagementEvent::SetCooldown {
                moment_id,
                timestamp,
            } => {
                self.context.moment_cooldowns.insert(moment_id, timestamp);
            }
            EngagementEvent::ClearFlags => self.context.flags.clear(),
            EngagementEvent::ClearCooldowns => self.context.moment_cooldowns.clear(),
        }
    }

    // ------------------------------------------------------------------
    // Named actions
    // ------------------------------------------------------------------

    fn assign_lens(&mut self, lens: String, source: LensSource) {
        self.context.lens = Some(lens);
        self.context.lens_source = Some(source);
    }

    fn init_journey(&mut self, journey: Journey) {
        self.context.journey_progress = 0;
        self.context.journey_total = journey.waypoints.len();
        self.context.journey = Some(journey);
    }

    fn clear_journey(&mut self) {
        self.context.journey = None;
        self.context.journey_progress = 0;
        self.context.journey_total = 0;
    }

    /// Two-phase commit for query durability: a staged query enters the
    /// permanent log only when its response begins.
    fn commit_pending_query(&mut self) {
        if let Some(item @ StreamItem::Query(_)) = self.context.current_stream_item.take() {
            self.context.stream_history.push(item);
        }
    }

    /// Pivot/fork queries are durable on creation, unlike staged ones.
    fn append_durable_query(&mut self, query: QueryItem) {
        let item = StreamItem::Query(query);
        self.context.current_stream_item = Some(item.clone());
        self.context.stream_history.push(item);
    }

    /// Seals the in-flight response: navigation parse first (the block may
    /// contain text resembling spans), then the rhetorical parse over the
    /// stripped content.
    fn finalize_response(&mut self) {
        let Some(StreamItem::Response(response)) = self.context.current_stream_item.as_mut()
        else {
            return;
        };

        let navigation = parse_navigation(&response.content);
        let rhetoric = parse(&navigation.clean_content);

        response.content = navigation.clean_content;
        response.is_generating = false;
        response.parsed_spans = (!rhetoric.spans.is_empty()).then_some(rhetoric.spans);
        response.navigation = (!navigation.forks.is_empty()).then_some(navigation.forks);

        let finalized = StreamItem::Response(response.clone());
        self.context.stream_history.push(finalized);
    }

    fn record_hub_visit(&mut self, hub_id: String) {
        if self.context.last_hub_id.as_deref() == Some(hub_id.as_str()) {
            self.context.consecutive_hub_repeats += 1;
        } else {
            self.context.consecutive_hub_repeats = 0;
        }
        if !self.context.hubs_visited.contains(&hub_id) {
            self.context.hubs_visited.push(hub_id.clone());
        }
        self.context.last_hub_id = Some(hub_id);
    }
}
