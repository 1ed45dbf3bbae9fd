//! Retrieval QA
//!
//! Answers a question from retrieved invoices: fetch evidence, stuff it
//! into a single prompt, and let the model answer from that context only.

use std::sync::Arc;

use agent_core::message::Message;
use agent_core::provider::{GenerationOptions, LlmProvider};

use crate::error::{Result, RetrievalError};
use crate::model::QaAnswer;
use crate::store::DocumentStore;

/// Answer returned when the search yields nothing
pub const NO_RESULTS_ANSWER: &str = "no relevant information found";

const QA_PROMPT: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:";

/// Question answering over the document store
pub struct RetrievalQa {
    store: DocumentStore,
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl RetrievalQa {
    pub fn new(store: DocumentStore, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            store,
            provider,
            options: GenerationOptions {
                temperature: 0.0,
                ..Default::default()
            },
        }
    }

    /// Generation options for the synthesis call
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Answer `question` with the documents it was derived from
    pub async fn answer(&self, question: &str) -> Result<QaAnswer> {
        let sources = self.store.retrieve(question).await?;

        if sources.is_empty() {
            tracing::info!(question, "No documents matched");
            return Ok(QaAnswer {
                answer: NO_RESULTS_ANSWER.into(),
                sources,
            });
        }

        let context = sources
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = QA_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question);

        let completion = self
            .provider
            .complete(&[Message::user(prompt)], &self.options)
            .await
            .map_err(|e| RetrievalError::Synthesis(e.to_string()))?;

        let answer = completion.content.trim().to_string();
        if answer.is_empty() {
            return Err(RetrievalError::Synthesis("model returned an empty answer".into()));
        }

        tracing::debug!(question, sources = sources.len(), "Synthesized answer");

        Ok(QaAnswer { answer, sources })
    }
}
