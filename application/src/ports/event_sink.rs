//! Event sink port
//!
//! Steps and pipelines report every internal decision through an
//! [`EventSink`]. Delivery is synchronous and in emission order; the core
//! never buffers or replays events.

use forge_domain::StepEvent;
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::warn;

/// Receiver for step or pipeline events
///
/// Implemented for any `Fn(E) + Send + Sync` closure, so a sink can be as
/// small as `&|event: StepEvent<_>| println!("{}", event.kind())`.
pub trait EventSink<E>: Send + Sync {
    fn emit(&self, event: E);
}

impl<E, F> EventSink<E> for F
where
    F: Fn(E) + Send + Sync,
{
    fn emit(&self, event: E) {
        self(event)
    }
}

/// Sink that drops every event, used when no observer is attached
pub struct NoEvents;

impl<E> EventSink<E> for NoEvents {
    fn emit(&self, _event: E) {}
}

/// Forwards every event to two sinks, in order
pub struct Tee<'a, E> {
    first: &'a dyn EventSink<E>,
    second: &'a dyn EventSink<E>,
}

impl<'a, E> Tee<'a, E> {
    pub fn new(first: &'a dyn EventSink<E>, second: &'a dyn EventSink<E>) -> Self {
        Self { first, second }
    }
}

impl<E: Clone> EventSink<E> for Tee<'_, E> {
    fn emit(&self, event: E) {
        self.first.emit(event.clone());
        self.second.emit(event);
    }
}

/// Forwards step events to a sink of JSON step events
///
/// A payload that fails to serialize is logged and forwarded as `null`, so
/// the event sequence seen downstream stays complete.
pub struct Erased<'a> {
    step: &'a str,
    inner: &'a dyn EventSink<StepEvent<Value>>,
}

impl<'a> Erased<'a> {
    pub fn new(step: &'a str, inner: &'a dyn EventSink<StepEvent<Value>>) -> Self {
        Self { step, inner }
    }
}

impl<O: Serialize> EventSink<StepEvent<O>> for Erased<'_> {
    fn emit(&self, event: StepEvent<O>) {
        let erased = event.erase().unwrap_or_else(|e| {
            warn!(
                "Step {} emitted {} with an unserializable payload: {}",
                self.step,
                event.kind(),
                e
            );
            event.map(|_| Value::Null)
        });
        self.inner.emit(erased);
    }
}

/// Sink that records every event in memory
pub struct EventLog<E> {
    events: Mutex<Vec<E>>,
}

impl<E> EventLog<E> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Take the recorded events, leaving the log empty.
    pub fn take(&self) -> Vec<E> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send> EventSink<E> for EventLog<E> {
    fn emit(&self, event: E) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
