//! Sequential shortcut recognition.
//!
//! A [`Recognizer`] judges one attempt at one shortcut. It is fed normalized
//! key presses and, for ordered sequences, polled so its per-step timer can
//! fire. It never performs I/O; renderers observe [`RecognitionState`].

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::catalog::{RecognitionMode, ShortcutDefinition};
use crate::error::CatalogError;
use crate::keys::RawKey;
use crate::platform::Platform;
use crate::timer::Timer;

/// Default window between two keys of an ordered sequence.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Idle,
    Advancing,
    Error,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionState {
    pub progress: usize,
    pub status: Status,
    pub matched_keys: Vec<String>,
}

impl Default for RecognitionState {
    fn default() -> Self {
        Self {
            progress: 0,
            status: Status::Idle,
            matched_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recognizer {
    id: String,
    target: Vec<String>,
    mode: RecognitionMode,
    state: RecognitionState,
    step_timer: Timer,
}

impl Recognizer {
    /// Builds a recognizer for `definition`, resolving the neutral primary
    /// modifier to the one used on `platform`.
    pub fn new(
        definition: &ShortcutDefinition,
        platform: Platform,
        step_timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let mode = definition.mode()?;
        let target = definition
            .sequence
            .iter()
            .map(|token| platform.resolve(token).to_string())
            .collect();

        Ok(Self {
            id: definition.id.clone(),
            target,
            mode,
            state: RecognitionState::default(),
            step_timer: Timer::new(step_timeout),
        })
    }

    pub fn state(&self) -> &RecognitionState {
        &self.state
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn target(&self) -> &[String] {
        &self.target
    }

    pub fn mode(&self) -> RecognitionMode {
        self.mode
    }

    pub fn step_deadline(&self) -> Option<Instant> {
        self.step_timer.deadline()
    }

    pub fn handle_key(&mut self, key: &RawKey) -> Status {
        self.handle_key_at(key, Instant::now())
    }

    /// Feeds one key press received at `now`.
    ///
    /// A step timer that expired before `now` fires first, so a late key
    /// lands on an attempt that has already failed and is ignored.
    pub fn handle_key_at(&mut self, key: &RawKey, now: Instant) -> Status {
        self.poll_at(now);

        match self.state.status {
            Status::Completed | Status::Error => return self.state.status,
            Status::Idle | Status::Advancing => {}
        }

        let token = key.token();
        match self.mode {
            RecognitionMode::Chord => self.handle_chord(&token, key),
            RecognitionMode::Ordered => self.handle_ordered(&token, key, now),
        }
        self.state.status
    }

    /// Fires the per-step timer if it has expired.
    pub fn poll_at(&mut self, now: Instant) -> Status {
        if self.state.status == Status::Advancing && self.step_timer.expired(now) {
            tracing::debug!(
                challenge = %self.id,
                progress = self.state.progress,
                "step timeout"
            );
            self.fail();
        }
        self.state.status
    }

    /// Back to a fresh idle attempt, disarming any pending timer.
    pub fn reset(&mut self) {
        self.step_timer.disarm();
        self.state = RecognitionState::default();
    }

    /// Disarms timers without touching state; used when the attempt is
    /// abandoned so nothing fires against a later challenge.
    pub fn cancel(&mut self) {
        self.step_timer.disarm();
    }

    fn handle_chord(&mut self, token: &str, key: &RawKey) {
        // unrelated keys are ignored; only the completing press transitions
        if key.modifiers.primary && token == self.target[1] {
            self.state.progress = self.target.len();
            self.state.matched_keys = self.target.clone();
            self.state.status = Status::Completed;
            tracing::debug!(challenge = %self.id, "chord completed");
        }
    }

    fn handle_ordered(&mut self, token: &str, key: &RawKey, now: Instant) {
        let k = self.state.progress;

        if self.state.status == Status::Idle {
            if key.modifiers.secondary && token == self.target[0] {
                self.accept(token);
                self.step_timer.arm(now);
                tracing::debug!(challenge = %self.id, "sequence started");
            }
            return;
        }

        if token != self.target[k] {
            tracing::debug!(
                challenge = %self.id,
                expected = %self.target[k],
                got = %token,
                "wrong key"
            );
            self.fail();
            return;
        }

        self.accept(token);
        if self.state.progress == self.target.len() {
            self.step_timer.disarm();
            self.state.status = Status::Completed;
            tracing::debug!(challenge = %self.id, "sequence completed");
        } else {
            self.step_timer.rearm(now);
        }
    }

    fn accept(&mut self, token: &str) {
        self.state.matched_keys.push(token.to_string());
        self.state.progress += 1;
        self.state.status = Status::Advancing;
    }

    fn fail(&mut self) {
        self.step_timer.disarm();
        self.state.progress = 0;
        self.state.matched_keys.clear();
        self.state.status = Status::Error;
    }
}
