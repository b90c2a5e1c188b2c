//! Generator port
//!
//! Defines the interface to the non-deterministic producer being sampled
//! (an LLM call, a synthetic function, ...). A generator returns raw JSON;
//! the step validates it against its output schema.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors a generator may report for one attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Generator failed: {0}")]
    Failed(String),

    #[error("Generator output could not be serialized: {0}")]
    Output(String),

    #[error("Timeout")]
    Timeout,
}

impl GeneratorError {
    pub fn failed(message: impl Into<String>) -> Self {
        GeneratorError::Failed(message.into())
    }
}

/// Producer of candidate outputs
///
/// Implementations live wherever the actual model call lives. Every call is
/// one independent attempt; the step never calls a generator concurrently
/// with itself within one `execute`.
#[async_trait]
pub trait Generator<I>: Send + Sync {
    /// Produce one raw candidate for `input`.
    async fn generate(&self, input: &I) -> Result<Value, GeneratorError>;
}

fn to_raw<R: Serialize>(output: R) -> Result<Value, GeneratorError> {
    serde_json::to_value(output).map_err(|e| GeneratorError::Output(e.to_string()))
}

/// Adapter for synchronous handler closures
///
/// # Example
///
/// ```
/// use forge_application::ports::generator::{FnGenerator, GeneratorError};
///
/// let double: FnGenerator<_, i64> = FnGenerator::new(|n: &i64| Ok::<_, GeneratorError>(n * 2));
/// # let _ = double;
/// ```
pub struct FnGenerator<F, R> {
    handler: F,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> FnGenerator<F, R> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _output: PhantomData,
        }
    }
}

#[async_trait]
impl<I, F, R> Generator<I> for FnGenerator<F, R>
where
    I: Send + Sync,
    F: Fn(&I) -> Result<R, GeneratorError> + Send + Sync,
    R: Serialize,
{
    async fn generate(&self, input: &I) -> Result<Value, GeneratorError> {
        to_raw((self.handler)(input)?)
    }
}

/// Adapter for asynchronous handler closures
///
/// The handler receives an owned copy of the input so the returned future
/// does not borrow from the step.
pub struct AsyncFnGenerator<F, R> {
    handler: F,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> AsyncFnGenerator<F, R> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _output: PhantomData,
        }
    }
}

#[async_trait]
impl<I, F, Fut, R> Generator<I> for AsyncFnGenerator<F, R>
where
    I: Clone + Send + Sync,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, GeneratorError>> + Send,
    R: Serialize,
{
    async fn generate(&self, input: &I) -> Result<Value, GeneratorError> {
        let output = (self.handler)(input.clone()).await?;
        to_raw(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_generator_serializes_output() {
        let generator = FnGenerator::new(|text: &String| {
            Ok::<_, GeneratorError>(json!({ "text": text.to_uppercase() }))
        });
        let raw = generator.generate(&"hi".to_string()).await.unwrap();
        assert_eq!(raw, json!({"text": "HI"}));
    }

    #[tokio::test]
    async fn test_fn_generator_propagates_error() {
        let generator =
            FnGenerator::new(|_: &u8| Err::<Value, _>(GeneratorError::failed("rate limited")));
        let err = generator.generate(&0).await.unwrap_err();
        assert_eq!(err.to_string(), "Generator failed: rate limited");
    }

    #[tokio::test]
    async fn test_async_fn_generator() {
        let generator = AsyncFnGenerator::new(|n: u32| async move {
            tokio::task::yield_now().await;
            Ok::<_, GeneratorError>(n + 1)
        });
        assert_eq!(generator.generate(&1).await.unwrap(), json!(2));
    }
}
