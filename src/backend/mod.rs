//! The generative-model transport boundary.
//!
//! Every call into a model goes through [`GenerativeBackend`]. Failures come
//! back as typed [`BackendError`] values so the pipeline's degrade-and-continue
//! behavior is checked by the compiler instead of relying on broad catches.

pub mod openrouter;

use std::future::Future;
use std::pin::Pin;

pub use openrouter::OpenRouterBackend;

/// One generation request. Temperature is clamped at this boundary.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub temperature: f32,
    pub timeout_ms: u64,
}

/// Failure classes a backend is allowed to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network or process failure reaching the model.
    Transport(String),
    /// The deadline elapsed before a response arrived.
    Timeout { waited_ms: u64 },
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Transport(message) => write!(f, "transport error: {}", message),
            BackendError::Timeout { waited_ms } => {
                write!(f, "timed out after {}ms", waited_ms)
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Capability contract for a generative model backend.
pub trait GenerativeBackend: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;
}

/// Clamp a requested temperature into the supported [0, 1] range.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return 0.0;
    }
    temperature.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_temperature_bounds() {
        assert_eq!(clamp_temperature(-0.5), 0.0);
        assert_eq!(clamp_temperature(0.4), 0.4);
        assert_eq!(clamp_temperature(3.0), 1.0);
        assert_eq!(clamp_temperature(f32::NAN), 0.0);
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Timeout { waited_ms: 1500 };
        assert_eq!(err.to_string(), "timed out after 1500ms");
        let err = BackendError::Transport("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
