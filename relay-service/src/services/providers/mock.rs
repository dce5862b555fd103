//! Mock provider for testing.
//!
//! Returns canned results and records every call so tests can assert on
//! whether, and with what, the provider was reached.

use super::{ModelListing, ProviderError, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What `generate` answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Echo the prompt back.
    Echo,
    Fail(ProviderError),
}

/// What `list_models` answers with.
#[derive(Debug, Clone)]
pub enum MockListing {
    Unsupported,
    Models(Vec<String>),
    Fail(ProviderError),
}

/// A recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub system_instruction: Option<String>,
}

pub struct MockTextProvider {
    model: String,
    reply: MockReply,
    listing: MockListing,
    generate_calls: AtomicUsize,
    list_calls: AtomicUsize,
    last_call: Mutex<Option<RecordedCall>>,
}

impl MockTextProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            model: "mock-model".to_string(),
            reply,
            listing: MockListing::Unsupported,
            generate_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockReply::Fail(error))
    }

    pub fn with_listing(mut self, listing: MockListing) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of `generate` invocations so far.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_models` invocations so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(RecordedCall {
            prompt: prompt.to_string(),
            system_instruction: system_instruction.map(str::to_string),
        });

        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Echo => Ok(format!("Mock response for: {}", prompt)),
            MockReply::Fail(error) => Err(error.clone()),
        }
    }

    async fn list_models(&self) -> Result<ModelListing, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        match &self.listing {
            MockListing::Unsupported => Ok(ModelListing::Unsupported),
            MockListing::Models(models) => Ok(ModelListing::Available(models.clone())),
            MockListing::Fail(error) => Err(error.clone()),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
