use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::Value;
use ecovoyage::dag::Work;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String),
}

#[derive(Debug, Default)]
struct RecorderState {
    events: Vec<Event>,
    running: usize,
    peak: usize,
}

/// Shared log of work invocations.
///
/// Work created through a recorder:
/// - logs when it starts and finishes, in one global order
/// - tracks how many invocations overlap (peak concurrency)
/// - sleeps for the configured delay so independent tasks can overlap.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<RecorderState>>,
    delay: Duration,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(5))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: Arc::default(),
            delay,
        }
    }

    /// Work that succeeds with `value`.
    pub fn work(&self, name: &str, value: impl Into<Value>) -> Work {
        let value = value.into();
        self.make(name, move || Ok(value.clone()))
    }

    /// Work that fails with `message`.
    pub fn failing(&self, name: &str, message: &str) -> Work {
        let message = message.to_string();
        self.make(name, move || Err(anyhow!(message.clone())))
    }

    fn make<F>(&self, name: &str, body: F) -> Work
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let recorder = self.clone();
        let name = name.to_string();
        Work::new(move |_params| {
            recorder.enter(&name);
            if !recorder.delay.is_zero() {
                std::thread::sleep(recorder.delay);
            }
            let outcome = body();
            recorder.exit(&name);
            outcome
        })
    }

    fn enter(&self, name: &str) {
        let mut state = self.inner.lock().unwrap();
        state.events.push(Event::Started(name.to_string()));
        state.running += 1;
        state.peak = state.peak.max(state.running);
    }

    fn exit(&self, name: &str) {
        let mut state = self.inner.lock().unwrap();
        state.events.push(Event::Finished(name.to_string()));
        state.running -= 1;
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Task names in start order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(name) => Some(name),
                Event::Finished(_) => None,
            })
            .collect()
    }

    pub fn was_started(&self, name: &str) -> bool {
        self.call_count(name) > 0
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Started(n) if n == name))
            .count()
    }

    /// Highest number of overlapping invocations seen.
    pub fn peak(&self) -> usize {
        self.inner.lock().unwrap().peak
    }

    /// Position of `event` in the global log, if it happened.
    pub fn index_of(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// `true` if `task` started only after `dep` finished.
    pub fn started_after(&self, task: &str, dep: &str) -> bool {
        let started = self.index_of(&Event::Started(task.to_string()));
        let finished = self.index_of(&Event::Finished(dep.to_string()));
        matches!((started, finished), (Some(s), Some(f)) if f < s)
    }
}
