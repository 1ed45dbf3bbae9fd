//! Scripted provider for tests.
//!
//! Available under `cfg(test)` and the `testing` feature so downstream crates
//! can drive the reasoning loop deterministically.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider, ModelInfo};

/// One scripted provider response
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// Return this text
    Reply(String),
    /// Fail with `ProviderUnavailable`
    Unavailable(String),
    /// Fail with `Auth`
    AuthFailure(String),
    /// Never complete
    Hang,
}

/// Returns scripted responses in order, then repeats `fallback` if set.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<ScriptStep>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Script made only of text replies
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| ScriptStep::Reply(r.into())).collect())
    }

    /// Always answer with the same text
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self::new(Vec::new()).with_fallback(reply)
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Number of `complete` calls received
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Last message content of every call, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next_step(&self) -> Option<ScriptStep> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .or_else(|| self.fallback.clone().map(ScriptStep::Reply))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt);

        match self.next_step() {
            Some(ScriptStep::Reply(text)) => Ok(Completion::text(text, options.model.clone())),
            Some(ScriptStep::Unavailable(msg)) => Err(AgentError::ProviderUnavailable(msg)),
            Some(ScriptStep::AuthFailure(msg)) => Err(AgentError::Auth(msg)),
            Some(ScriptStep::Hang) => {
                std::future::pending::<()>().await;
                Err(AgentError::Other("unreachable".into()))
            }
            None => Err(AgentError::Provider("script exhausted".into())),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            context_length: None,
        }])
    }
}
