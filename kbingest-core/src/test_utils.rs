#![allow(clippy::missing_panics_doc)]
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{SimplePrompt, errors::LanguageModelError, prompt::Prompt};
use anyhow::Result;
use pretty_assertions::assert_eq;

type Expectations = Arc<Mutex<Vec<(Option<String>, Result<String, String>)>>>;

/// A `SimplePrompt` that replays scripted replies in order.
///
/// Each expectation optionally asserts the rendered prompt. `Err` replies are returned as
/// transient errors carrying the given message, which allows scripting rate limit messages.
/// When the last clone is dropped it panics if not all expectations were consumed.
#[derive(Clone, Debug)]
pub struct ScriptedPrompt {
    expectations: Expectations,
    received: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a reply for any prompt.
    #[must_use]
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(None, Ok(reply.into()));
        self
    }

    /// Queues an error reply for any prompt.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(None, Err(message.into()));
        self
    }

    /// Queues a reply for an exact rendered prompt.
    #[must_use]
    pub fn expect_prompt(self, prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push(Some(prompt.into()), Ok(reply.into()));
        self
    }

    /// Rendered prompts received so far, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn push(&self, prompt: Option<String>, reply: Result<String, String>) {
        self.expectations.lock().unwrap().insert(0, (prompt, reply));
    }
}

#[async_trait]
impl SimplePrompt for ScriptedPrompt {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        let rendered = prompt.render()?;

        let (expected, reply) = self.expectations.lock().unwrap().pop().unwrap_or_else(|| {
            panic!("Received prompt, but no replies are scripted\n {rendered}")
        });

        if let Some(expected) = expected {
            assert_eq!(expected, rendered, "Unexpected prompt");
        }

        self.received.lock().unwrap().push(rendered);

        reply.map_err(LanguageModelError::transient)
    }

    fn name(&self) -> &'static str {
        "ScriptedPrompt"
    }
}

impl Drop for ScriptedPrompt {
    fn drop(&mut self) {
        // Still cloned, do not check yet
        if Arc::strong_count(&self.expectations) > 1 {
            return;
        }
        if std::thread::panicking() {
            return;
        }
        let Ok(expectations) = self.expectations.lock() else {
            return;
        };

        if expectations.is_empty() {
            tracing::debug!("[ScriptedPrompt] All replies were consumed");
        } else {
            let pending = expectations
                .iter()
                .rev()
                .map(|(prompt, reply)| format!("{prompt:?} => {reply:?}"))
                .collect::<Vec<_>>()
                .join("\n");

            panic!("[ScriptedPrompt] Not all scripted replies were consumed\n{pending}");
        }
    }
}
