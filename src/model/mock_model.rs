//! # Mock Models for Testing
//!
//! - `MockTextModel` implements [`TextModel`] with a queue of scripted
//!   responses and errors, and records every prompt and option set it sees.
//! - `MockCompletionModel` implements the `rig` `CompletionModel` trait so the
//!   [`RigTextModel`](super::RigTextModel) adapter can be tested without API
//!   calls.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use super::{InvokeOptions, ModelError, TextModel};

/// Scripted [`TextModel`]. When the queue runs dry it answers with an empty string.
#[derive(Debug, Clone, Default)]
pub struct MockTextModel {
    script: Arc<StdMutex<VecDeque<Result<String, ModelError>>>>,
    calls: Arc<StdMutex<Vec<(String, InvokeOptions)>>>,
}

impl MockTextModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for response in responses {
            model.push_response(response);
        }
        model
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: ModelError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    pub fn options(&self) -> Vec<InvokeOptions> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, options)| *options)
            .collect()
    }
}

impl TextModel for MockTextModel {
    async fn invoke(&self, prompt: &str, options: InvokeOptions) -> Result<String, ModelError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), options));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(String::new()))
    }
}

/// A mock `rig` completion model that returns a predefined response
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    response: Arc<Mutex<Option<OneOrMany<AssistantContent>>>>,
}

impl MockCompletionModel {
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        let mut guard = self.response.lock().await;
        *guard = Some(response);
    }

    pub async fn set_text_response(&self, text: &str) {
        let response = OneOrMany::one(AssistantContent::text(text));
        self.set_response(response).await;
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        let response = {
            let guard = self.response.lock().await;
            guard.clone()
        };
        Ok(CompletionResponse {
            choice: response.unwrap_or_else(|| OneOrMany::one(AssistantContent::text(""))),
            raw_response: String::new(),
        })
    }
}
