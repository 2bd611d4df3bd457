//! Test doubles for the generative backend.
//!
//! `ScriptedBackend` replays queued responses in order, which keeps pipeline
//! tests deterministic: fixed selection list + fixed responses = fixed output.

use crate::backend::{BackendError, GenerateRequest, GenerativeBackend};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Script {
    Responses(Mutex<VecDeque<String>>),
    Failure(BackendError),
}

/// Backend double with pre-scripted behavior.
pub struct ScriptedBackend {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    /// A backend that must never be reached; any call fails loudly.
    pub fn empty() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Replay the given responses in order; further calls fail.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            script: Script::Responses(Mutex::new(responses.into())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            script: Script::Failure(BackendError::Transport(message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a timeout.
    pub fn timing_out(waited_ms: u64) -> Self {
        Self {
            script: Script::Failure(BackendError::Timeout { waited_ms }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerativeBackend for ScriptedBackend {
    fn generate<'a>(
        &'a self,
        _request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.script {
            Script::Responses(queue) => {
                let mut queue = queue.lock().expect("script queue poisoned");
                queue.pop_front().ok_or_else(|| {
                    BackendError::Transport("scripted backend exhausted".to_string())
                })
            }
            Script::Failure(err) => Err(err.clone()),
        };
        Box::pin(async move { result })
    }
}
