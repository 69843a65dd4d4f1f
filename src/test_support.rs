//! Scripted model client for unit tests.

use crate::error::FillError;
use crate::pipeline::llm::{Completion, CompletionClient, CompletionRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Script = Box<dyn Fn(&CompletionRequest) -> Result<String, FillError> + Send + Sync>;

/// Answers every request by calling a closure, recording the prompts it saw.
pub(crate) struct ScriptedClient {
    script: Script,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, FillError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(f),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fails like an unreachable endpoint.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(FillError::LlmFailed {
                retries: 0,
                detail: "connection refused".into(),
            })
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, FillError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let text = (self.script)(&request)?;
        Ok(Completion {
            text,
            ..Default::default()
        })
    }
}
