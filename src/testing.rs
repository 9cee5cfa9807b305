//! Test doubles for the network seams.
//!
//! - `StaticFetcher` (`FetchText`): URL -> body map, unknown URLs answer 404
//! - `StubGenerator` (`GenerateText`): scripted answers, records every prompt
//!
//! Both are cheap to clone and share their state, so a test can hand one
//! copy to the pipeline and keep another for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::GenerateText;
use crate::error::{FetchError, ProviderError};
use crate::fetch::{FetchText, FetchedPage, inspect_body};
use crate::models::PromptRequest;

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), body.to_string());
        self
    }

    /// Every URL asked for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl FetchText for StaticFetcher {
    async fn fetch_text(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let body = self.pages.lock().unwrap().get(url).cloned();
        match body {
            Some(body) => inspect_body(url, body),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// StubGenerator
// ---------------------------------------------------------------------------

/// Answers from a queue; once it runs dry every call is `EmptyResponse`.
#[derive(Debug, Clone, Default)]
pub struct StubGenerator {
    answers: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    prompts: Arc<Mutex<Vec<PromptRequest>>>,
}

impl StubGenerator {
    pub fn new(answers: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
            prompts: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.prompts.lock().unwrap().clone()
    }
}

impl GenerateText for StubGenerator {
    async fn generate_text(&self, prompt: &PromptRequest) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyResponse))
    }
}
