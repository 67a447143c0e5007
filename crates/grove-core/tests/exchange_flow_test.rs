//! End-to-end exchange flow: driver, machine, and transformers together.

use async_trait::async_trait;
use grove_core::analytics::{AnalyticsEvent, AnalyticsSink, BatchingSink};
use grove_core::chat::{ChatBackend, ChatResponse, ExchangeDriver};
use grove_core::engagement::{EngagementEvent, EngagementMachine, Journey, LensSource, Waypoint};
use grove_core::engine::entropy::TopicHub;
use grove_core::error::Result;
use grove_core::stream::{ForkKind, StreamItem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replays one scripted chunk list per call, in order.
struct ReplayBackend {
    scripts: Vec<Vec<&'static str>>,
    call: AtomicUsize,
    hub_id: Option<&'static str>,
}

impl ReplayBackend {
    fn new(scripts: Vec<Vec<&'static str>>) -> Self {
        Self {
            scripts,
            call: AtomicUsize::new(0),
            hub_id: None,
        }
    }
}

#[async_trait]
impl ChatBackend for ReplayBackend {
    async fn init_chat_session(&self, _system_prompt: &str) -> Result<()> {
        Ok(())
    }

    async fn send_message_stream(
        &self,
        _prompt: &str,
        on_chunk: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<ChatResponse> {
        let index = self.call.fetch_add(1, Ordering::SeqCst);
        if let Some(chunks) = self.scripts.get(index) {
            for chunk in chunks {
                on_chunk(chunk);
            }
        }
        Ok(ChatResponse {
            hub_id: self.hub_id.map(str::to_string),
        })
    }
}

fn ratchet_hub() -> TopicHub {
    TopicHub {
        id: "ratchet-effect".to_string(),
        tags: ["doubling", "frontier", "capability", "metr"]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        enabled: true,
    }
}

#[tokio::test]
async fn streamed_response_is_parsed_and_logged() {
    let machine = Arc::new(Mutex::new(EngagementMachine::new()));
    let backend = ReplayBackend::new(vec![vec![
        "The **Ratchet Effect** compounds.\n",
        "\n<navigation>\n",
        "[{\"id\": \"f1\", \"label\": \"See the data\", \"type\": \"deep_dive\", \"queryPayload\": \"Show me the METR data\"}]\n",
        "</navigation>",
    ]]);
    let driver = ExchangeDriver::new(
        Arc::clone(&machine),
        Arc::new(backend),
        Arc::new(BatchingSink::default()),
        vec![ratchet_hub()],
    );

    driver.submit("What is the ratchet effect?").await;

    let machine = machine.lock().unwrap();
    let history = &machine.context().stream_history;
    assert_eq!(history.len(), 2);

    let response = history[1].as_response().unwrap();
    assert_eq!(response.content, "The **Ratchet Effect** compounds.");

    let spans = response.parsed_spans.as_ref().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].text, "Ratchet Effect");

    let forks = response.navigation.as_ref().unwrap();
    assert_eq!(forks.len(), 1);
    assert_eq!(forks[0].kind, ForkKind::DeepDive);
    assert_eq!(
        forks[0].query_payload.as_deref(),
        Some("Show me the METR data")
    );
}

#[tokio::test]
async fn entropy_injection_fires_on_a_deep_on_topic_conversation() {
    let machine = Arc::new(Mutex::new(EngagementMachine::new()));
    let backend = ReplayBackend::new(vec![
        vec!["The doubling rate holds."],
        vec!["Frontier capability keeps compounding."],
        vec!["The metr measurements agree."],
        vec!["Edge models lag the frontier."],
    ]);
    let driver = ExchangeDriver::new(
        Arc::clone(&machine),
        Arc::new(backend),
        Arc::new(BatchingSink::default()),
        vec![ratchet_hub()],
    );

    let first = driver.submit("Tell me about the doubling rate").await;
    assert!(!first.inject); // one vocabulary hit, still shallow

    let second = driver
        .submit("How does frontier capability compound exactly?")
        .await;
    assert!(second.inject);
    assert_eq!(second.dominant_cluster.as_deref(), Some("ratchet"));

    // Follow-ups stay quiet while the cooldown runs down.
    let third = driver.submit("What does metr say about this?").await;
    assert!(!third.inject);
    let fourth = driver
        .submit("Building on the doubling you mentioned, why does the frontier lag?")
        .await;
    assert!(!fourth.inject);

    let state = driver.entropy_state();
    assert_eq!(state.injection_count, 1);
    assert!(state.cooldown_remaining > 0);
    assert_eq!(state.last_injection_exchange, 2);
}

#[tokio::test]
async fn fork_selection_feeds_the_next_exchange() {
    let machine = Arc::new(Mutex::new(EngagementMachine::new()));
    let backend = ReplayBackend::new(vec![
        vec![
            "Overview.\n<navigation>\n[{\"id\": \"f1\", \"label\": \"Go deeper\", \"type\": \"deep_dive\", \"queryPayload\": \"Go much deeper\"}]\n</navigation>",
        ],
        vec!["Deeper answer."],
    ]);
    let sink = Arc::new(BatchingSink::default());
    let driver = ExchangeDriver::new(
        Arc::clone(&machine),
        Arc::new(backend),
        Arc::clone(&sink) as Arc<dyn AnalyticsSink>,
        vec![],
    );

    driver.submit("Overview please").await;

    // The UI relays the user's fork click as an event, then resubmits.
    let (fork, response_id) = {
        let machine = machine.lock().unwrap();
        let response = machine.context().stream_history[1].as_response().unwrap();
        (
            response.navigation.as_ref().unwrap()[0].clone(),
            response.id.clone(),
        )
    };
    let follow_up = fork.effective_query().to_string();
    machine
        .lock()
        .unwrap()
        .send(EngagementEvent::SelectFork { fork, response_id });

    driver.submit(&follow_up).await;

    let machine = machine.lock().unwrap();
    let contents: Vec<&str> = machine
        .context()
        .stream_history
        .iter()
        .filter_map(StreamItem::content)
        .collect();
    assert_eq!(
        contents,
        vec![
            "Overview please",
            "Overview.",
            "Go much deeper",
            "Go much deeper",
            "Deeper answer.",
        ]
    );

    let events = sink.drain();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AnalyticsEvent::ExchangeSent { exchange_count: 3 }))
    );
}

#[tokio::test]
async fn journey_lifecycle_survives_a_conversation() {
    let machine = Arc::new(Mutex::new(EngagementMachine::new()));
    let backend = ReplayBackend::new(vec![vec!["Step context."]]);
    let driver = ExchangeDriver::new(
        Arc::clone(&machine),
        Arc::new(backend),
        Arc::new(BatchingSink::default()),
        vec![],
    );

    {
        let mut m = machine.lock().unwrap();
        m.send(EngagementEvent::SelectLens {
            lens: "engineer".to_string(),
            source: LensSource::Url,
        });
        m.send(EngagementEvent::StartJourney {
            journey: Journey {
                id: "ratchet".to_string(),
                name: "The Ratchet".to_string(),
                hub_id: Some("ratchet-effect".to_string()),
                waypoints: vec![
                    Waypoint {
                        id: "w1".to_string(),
                        title: "One".to_string(),
                        content: "First".to_string(),
                    },
                    Waypoint {
                        id: "w2".to_string(),
                        title: "Two".to_string(),
                        content: "Second".to_string(),
                    },
                ],
            },
        });
        m.send(EngagementEvent::OpenTerminal);
    }

    driver.submit("Explain this step").await;

    let mut m = machine.lock().unwrap();
    assert!(m.matches("session.journey_active"));
    assert!(m.matches("terminal.open"));
    assert_eq!(m.context().stream_history.len(), 2);

    m.send(EngagementEvent::AdvanceStep);
    m.send(EngagementEvent::CompleteJourney);
    assert!(m.matches("session.journey_complete"));
    // The conversation log is untouched by journey transitions.
    assert_eq!(m.context().stream_history.len(), 2);
}
