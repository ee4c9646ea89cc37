//! Scripted [`AgentRuntime`] for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};

use super::error::AgentError;
use super::runtime::{AgentEvent, AgentEventStream, AgentRequest, AgentRuntime};

#[derive(Debug, Clone)]
enum Scripted {
    Events(Vec<AgentEvent>),
    /// Emit the events, then never finish
    Stall(Vec<AgentEvent>),
    Error(AgentError),
}

/// Answers each invocation with the next scripted outcome. When the script
/// runs dry it answers with an empty stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRuntime {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<AgentRequest>>>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a run that streams the completion as one chunk
    pub fn push_completion(&self, completion: &str) {
        self.push_events(vec![AgentEvent::Chunk(completion.as_bytes().to_vec())]);
    }

    pub fn push_events(&self, events: Vec<AgentEvent>) {
        self.script.lock().unwrap().push_back(Scripted::Events(events));
    }

    pub fn push_stall(&self, events: Vec<AgentEvent>) {
        self.script.lock().unwrap().push_back(Scripted::Stall(events));
    }

    pub fn push_error(&self, error: AgentError) {
        self.script.lock().unwrap().push_back(Scripted::Error(error));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl AgentRuntime for ScriptedRuntime {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentEventStream, AgentError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            None => Ok(stream::empty().boxed()),
            Some(Scripted::Error(error)) => Err(error),
            Some(Scripted::Events(events)) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            Some(Scripted::Stall(events)) => Ok(stream::iter(events.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}
