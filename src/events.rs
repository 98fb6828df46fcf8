//! Background AI requests and the events they report back to the UI loop.
//!
//! Requests run as tasks on the tokio runtime owned by `main`. Each finished
//! request sends exactly one [`AiEvent`] over a std mpsc channel, which the
//! draw loop drains without blocking.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::suggest::{Completion, Example, Suggestion, SuggestionService};
use crate::template::Template;

/// A finished AI request.
///
/// `generation` names the editing session the request was made from. It
/// changes whenever another template is loaded into the editor.
#[derive(Debug)]
pub enum AiEvent {
    /// Improvement suggestions for the template at `revision`.
    Suggestions {
        generation: u64,
        revision: u64,
        result: Result<Vec<Suggestion>>,
    },
    Examples {
        generation: u64,
        result: Result<Vec<Example>>,
    },
    /// Completions for the text typed into block `block_id`.
    ///
    /// `seq` identifies the request; only the latest one is still wanted.
    Autocomplete {
        seq: u64,
        block_id: String,
        result: Result<Vec<Completion>>,
    },
}

/// Spawns AI requests and routes their results to a channel.
#[derive(Clone)]
pub struct AiTasks {
    runtime: Handle,
    service: Arc<SuggestionService>,
    sender: Sender<AiEvent>,
}

impl AiTasks {
    pub fn new(runtime: Handle, service: Arc<SuggestionService>, sender: Sender<AiEvent>) -> Self {
        Self {
            runtime,
            service,
            sender,
        }
    }

    pub fn service(&self) -> &SuggestionService {
        &self.service
    }

    fn send(sender: &Sender<AiEvent>, event: AiEvent) {
        // The receiver only goes away while the app is shutting down
        if sender.send(event).is_err() {
            debug!("ai_event_dropped");
        }
    }

    pub fn request_suggestions(&self, template: Template, generation: u64, revision: u64) {
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        debug!(generation, revision, "suggestions_task_spawned");
        self.runtime.spawn(async move {
            let result = service.suggestions(&template).await;
            if let Err(e) = &result {
                warn!(error = %e, "suggestions_failed");
            }
            Self::send(
                &sender,
                AiEvent::Suggestions {
                    generation,
                    revision,
                    result,
                },
            );
        });
    }

    pub fn request_examples(&self, template: Template, generation: u64) {
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = service.related_examples(&template).await;
            if let Err(e) = &result {
                warn!(error = %e, "examples_failed");
            }
            Self::send(&sender, AiEvent::Examples { generation, result });
        });
    }

    pub fn request_autocomplete(&self, input: String, block_id: String, seq: u64) {
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        debug!(seq, block_id = %block_id, "autocomplete_task_spawned");
        self.runtime.spawn(async move {
            let result = service.autocomplete(&input).await;
            if let Err(e) = &result {
                warn!(error = %e, "autocomplete_failed");
            }
            Self::send(
                &sender,
                AiEvent::Autocomplete {
                    seq,
                    block_id,
                    result,
                },
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::clock::FixedClock;
    use crate::error::PromptError;
    use crate::quota::{MemoryUsageStore, QuotaTracker};
    use crate::suggest::{ChatBackend, ChatRequest};
    use async_trait::async_trait;
    use chrono::{Local, TimeDelta, TimeZone};
    use std::sync::mpsc;
    use std::time::Duration;

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            if request.user.contains("Complete this prompt") {
                Ok(r#"{"suggestions":[{"text":"in three bullets","explanation":"shorter"}]}"#
                    .to_string())
            } else {
                Ok("1. Clarity: Name the audience | Sets the tone".to_string())
            }
        }
    }

    fn tasks(runtime: &tokio::runtime::Runtime, limit: u32) -> (AiTasks, mpsc::Receiver<AiEvent>) {
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let quota = QuotaTracker::new(Box::new(MemoryUsageStore::new()), clock.clone(), limit);
        let service = SuggestionService::new(
            Arc::new(EchoBackend),
            quota,
            clock,
            TimeDelta::seconds(60),
        );
        let (tx, rx) = mpsc::channel();
        (AiTasks::new(runtime.handle().clone(), Arc::new(service), tx), rx)
    }

    #[test]
    fn test_suggestions_event_carries_generation_and_revision() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tasks, rx) = tasks(&runtime, 5);
        let mut template = Template::new();
        template.blocks.push(Block::text("Summarize"));

        tasks.request_suggestions(template, 2, 7);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            AiEvent::Suggestions {
                generation,
                revision,
                result,
            } => {
                assert_eq!(generation, 2);
                assert_eq!(revision, 7);
                assert_eq!(result.unwrap()[0].text, "Name the audience");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_autocomplete_event_echoes_seq_and_block() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tasks, rx) = tasks(&runtime, 5);

        tasks.request_autocomplete("Summarize the".to_string(), "b1".to_string(), 3);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            AiEvent::Autocomplete {
                seq,
                block_id,
                result,
            } => {
                assert_eq!(seq, 3);
                assert_eq!(block_id, "b1");
                assert_eq!(result.unwrap()[0].text, "in three bullets");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_quota_failure_is_reported_as_event() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tasks, rx) = tasks(&runtime, 0);

        tasks.request_examples(Template::new(), 0);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            AiEvent::Examples { result, .. } => {
                assert!(matches!(result, Err(PromptError::QuotaExceeded { limit: 0 })));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
