// In-memory audio backend for host-side engine tests.
// Gains and sources are plain indices into vectors so tests can inspect the
// graph after each engine call.

#![allow(dead_code)]

use ambient_mixer::core::backend::{
    AudioBackend, BackendError, BackendResult, ContextState, EndedCallback,
};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

pub struct MockSource {
    pub gain: usize,
    pub started: bool,
    pub stopped: bool,
    on_ended: Option<EndedCallback>,
}

pub struct MockBackend {
    context: Cell<ContextState>,
    resume_fails: Cell<bool>,
    start_fails: Cell<bool>,
    resume_calls: Cell<usize>,
    // While held, `resume` stays pending until `release_resume`.
    resume_held: Cell<bool>,
    resume_waiters: RefCell<Vec<Waker>>,
    master_gain: Cell<f32>,
    failing_locations: RefCell<HashSet<String>>,
    gains: RefCell<Vec<f32>>,
    released_gains: RefCell<Vec<usize>>,
    sources: RefCell<Vec<MockSource>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_context(ContextState::Running)
    }

    pub fn with_context(context: ContextState) -> Self {
        Self {
            context: Cell::new(context),
            resume_fails: Cell::new(false),
            start_fails: Cell::new(false),
            resume_calls: Cell::new(0),
            resume_held: Cell::new(false),
            resume_waiters: RefCell::new(Vec::new()),
            master_gain: Cell::new(1.0),
            failing_locations: RefCell::new(HashSet::new()),
            gains: RefCell::new(Vec::new()),
            released_gains: RefCell::new(Vec::new()),
            sources: RefCell::new(Vec::new()),
        }
    }

    pub fn fail_location(&self, location: &str) {
        self.failing_locations
            .borrow_mut()
            .insert(location.to_string());
    }

    pub fn set_context(&self, state: ContextState) {
        self.context.set(state);
    }

    pub fn set_resume_fails(&self, fails: bool) {
        self.resume_fails.set(fails);
    }

    pub fn set_start_fails(&self, fails: bool) {
        self.start_fails.set(fails);
    }

    /// Keep every `resume` pending until `release_resume` is called.
    pub fn hold_resume(&self) {
        self.resume_held.set(true);
    }

    pub fn release_resume(&self) {
        self.resume_held.set(false);
        for waker in self.resume_waiters.borrow_mut().drain(..) {
            waker.wake();
        }
    }

    pub fn released_gains(&self) -> Vec<usize> {
        self.released_gains.borrow().clone()
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.get()
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.get()
    }

    pub fn gain_value(&self, gain: usize) -> f32 {
        self.gains.borrow()[gain]
    }

    pub fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }

    /// Indices of sources that were started and not stopped since.
    pub fn running_sources(&self) -> Vec<usize> {
        self.sources
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.started && !s.stopped)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn running_on_gain(&self, gain: usize) -> usize {
        self.sources
            .borrow()
            .iter()
            .filter(|s| s.gain == gain && s.started && !s.stopped)
            .count()
    }

    pub fn source_gain(&self, source: usize) -> usize {
        self.sources.borrow()[source].gain
    }

    /// Simulate the platform firing `ended` for `source`.
    pub fn end_source(&self, source: usize) {
        let callback = {
            let mut sources = self.sources.borrow_mut();
            sources[source].stopped = true;
            sources[source].on_ended.take()
        };
        if let Some(cb) = callback {
            cb();
        }
    }
}

struct HeldResume<'a> {
    backend: &'a MockBackend,
}

impl Future for HeldResume<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.backend.resume_held.get() {
            self.backend
                .resume_waiters
                .borrow_mut()
                .push(cx.waker().clone());
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

impl AudioBackend for MockBackend {
    type Buffer = String;
    type Gain = usize;
    type Source = usize;

    fn context_state(&self) -> ContextState {
        self.context.get()
    }

    async fn resume(&self) -> BackendResult<()> {
        self.resume_calls.set(self.resume_calls.get() + 1);
        HeldResume { backend: self }.await;
        if self.resume_fails.get() {
            return Err(BackendError::new("resume denied"));
        }
        self.context.set(ContextState::Running);
        Ok(())
    }

    async fn fetch_and_decode(&self, location: &str) -> BackendResult<String> {
        if self.failing_locations.borrow().contains(location) {
            return Err(BackendError::new(format!("network error for {}", location)));
        }
        Ok(location.to_string())
    }

    fn create_track_gain(&self) -> BackendResult<usize> {
        let mut gains = self.gains.borrow_mut();
        gains.push(1.0);
        Ok(gains.len() - 1)
    }

    fn set_gain(&self, gain: &usize, value: f32) {
        self.gains.borrow_mut()[*gain] = value;
    }

    fn release_gain(&self, gain: &usize) {
        self.released_gains.borrow_mut().push(*gain);
    }

    fn set_master_gain(&self, value: f32) {
        self.master_gain.set(value);
    }

    fn create_looping_source(&self, _buffer: &String, gain: &usize) -> BackendResult<usize> {
        let mut sources = self.sources.borrow_mut();
        sources.push(MockSource {
            gain: *gain,
            started: false,
            stopped: false,
            on_ended: None,
        });
        Ok(sources.len() - 1)
    }

    fn on_ended(&self, source: &usize, callback: EndedCallback) {
        self.sources.borrow_mut()[*source].on_ended = Some(callback);
    }

    fn start(&self, source: &usize) -> BackendResult<()> {
        if self.start_fails.get() {
            return Err(BackendError::new("autoplay blocked"));
        }
        self.sources.borrow_mut()[*source].started = true;
        Ok(())
    }

    fn stop(&self, source: &usize) {
        self.sources.borrow_mut()[*source].stopped = true;
    }
}
