//! Drives one or more challenges back-to-back and scores the run.
//!
//! Every challenge gets a fresh [`Recognizer`], an elapsed clock and a
//! countdown. A challenge ends either when its recognizer completes or when
//! the countdown runs out; the session then moves on to the next one.

use chrono::{DateTime, Local};
use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::catalog::{Catalog, RecognitionMode, ShortcutDefinition};
use crate::engine::{Recognizer, Status, DEFAULT_STEP_TIMEOUT};
use crate::error::SessionError;
use crate::keys::{ModifierFlags, RawKey};
use crate::platform::Platform;
use crate::timer::Timer;

pub const MIN_CHALLENGES: usize = 2;
/// How long a "wrong key" indication stays up before the attempt re-arms.
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_millis(600);

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Relaxed,
    #[default]
    Standard,
    Strict,
}

impl Difficulty {
    pub fn time_limit(&self) -> Duration {
        match self {
            Difficulty::Relaxed => Duration::from_secs(20),
            Difficulty::Standard => Duration::from_secs(10),
            Difficulty::Strict => Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub time_limit: Duration,
    pub step_timeout: Duration,
    pub error_cooldown: Duration,
    pub platform: Platform,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::default(), Platform::detect())
    }
}

impl SessionConfig {
    pub fn from_difficulty(difficulty: Difficulty, platform: Platform) -> Self {
        Self {
            time_limit: difficulty.time_limit(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
            platform,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub challenge_id: String,
    pub elapsed_millis: u64,
    pub outcome: Outcome,
}

impl AttemptRecord {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub attempts: Vec<AttemptRecord>,
    pub score: usize,
    pub max_score: usize,
}

impl SessionSummary {
    pub fn timeouts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == Outcome::TimedOut)
            .count()
    }

    /// Mean time over the challenges that were completed.
    pub fn average_completion(&self) -> Option<Duration> {
        let completed: Vec<u64> = self
            .attempts
            .iter()
            .filter(|a| a.outcome == Outcome::Completed)
            .map(|a| a.elapsed_millis)
            .collect();
        match completed.len() {
            0 => None,
            n => Some(Duration::from_millis(completed.iter().sum::<u64>() / n as u64)),
        }
    }
}

/// What a key press or tick did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ignored,
    Progress(usize),
    WrongKey,
    /// The wrong-key cool-down ran out and the attempt is idle again.
    Cleared,
    Completed(AttemptRecord),
    TimedOut(AttemptRecord),
    /// The last challenge ended; the summary is final.
    Finished,
}

/// Picks `count` distinct challenge ids in random order.
pub fn select_challenges<R: Rng + ?Sized>(
    catalog: &Catalog,
    count: usize,
    rng: &mut R,
) -> Result<Vec<String>, SessionError> {
    let max = catalog.len();
    if count < MIN_CHALLENGES || count > max {
        return Err(SessionError::ChallengeCount {
            requested: count,
            max,
        });
    }
    let mut ids: Vec<String> = catalog.ids().map(str::to_string).collect();
    ids.shuffle(rng);
    ids.truncate(count);
    Ok(ids)
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    challenges: Vec<(ShortcutDefinition, Recognizer)>,
    current: usize,
    started_at: DateTime<Local>,
    challenge_started: Instant,
    countdown: Timer,
    cooldown: Timer,
    attempts: Vec<AttemptRecord>,
    score: usize,
    finished: bool,
}

impl Session {
    pub fn start<S: AsRef<str>>(
        catalog: &Catalog,
        ids: &[S],
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        Self::start_at(catalog, ids, config, Instant::now())
    }

    /// Resolves every challenge up front so configuration defects surface
    /// before any clock starts, then begins the first challenge at `now`.
    pub fn start_at<S: AsRef<str>>(
        catalog: &Catalog,
        ids: &[S],
        config: SessionConfig,
        now: Instant,
    ) -> Result<Self, SessionError> {
        if ids.is_empty() {
            return Err(SessionError::Empty);
        }
        for (what, duration) in [
            ("time limit", config.time_limit),
            ("step timeout", config.step_timeout),
            ("error cool-down", config.error_cooldown),
        ] {
            if now.checked_add(duration).is_none() {
                return Err(SessionError::DurationOutOfRange {
                    what,
                    millis: duration.as_millis(),
                });
            }
        }

        let challenges = ids
            .iter()
            .map(|id| -> Result<_, SessionError> {
                let def = catalog.lookup(id.as_ref())?;
                let recognizer = Recognizer::new(def, config.platform, config.step_timeout)?;
                Ok((def.clone(), recognizer))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = Self {
            config,
            score: challenges.len(),
            challenges,
            current: 0,
            started_at: Local::now(),
            challenge_started: now,
            countdown: Timer::new(config.time_limit),
            cooldown: Timer::new(config.error_cooldown),
            attempts: Vec::new(),
            finished: false,
        };
        tracing::info!(
            challenges = session.challenges.len(),
            time_limit_ms = config.time_limit.as_millis() as u64,
            platform = %config.platform,
            "session started"
        );
        session.begin_challenge(now);
        Ok(session)
    }

    /// A session of one; callers ignore the score.
    pub fn single_at(
        catalog: &Catalog,
        id: &str,
        config: SessionConfig,
        now: Instant,
    ) -> Result<Self, SessionError> {
        Self::start_at(catalog, &[id], config, now)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Zero-based index of the running challenge.
    pub fn index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn current_definition(&self) -> Option<&ShortcutDefinition> {
        self.active().map(|(def, _)| def)
    }

    pub fn recognizer(&self) -> Option<&Recognizer> {
        self.active().map(|(_, r)| r)
    }

    /// Time left on the running challenge's countdown.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.finished {
            return None;
        }
        self.countdown.remaining(now)
    }

    pub fn challenge_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.challenge_started)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            started_at: self.started_at,
            attempts: self.attempts.clone(),
            score: self.score,
            max_score: self.challenges.len(),
        }
    }

    pub fn handle_key(&mut self, key: &RawKey) -> SessionEvent {
        self.handle_key_at(key, Instant::now())
    }

    /// Feeds a key press received at `now` to the running challenge.
    ///
    /// Pending timers are settled first: a countdown that ran out before the
    /// key ends the challenge and the key is dropped.
    pub fn handle_key_at(&mut self, key: &RawKey, now: Instant) -> SessionEvent {
        if self.finished {
            return SessionEvent::Ignored;
        }
        if self.countdown.expired(now) {
            return self.time_out(now);
        }
        self.clear_if_cooled(now);

        let Some((_, recognizer)) = self.challenges.get_mut(self.current) else {
            return SessionEvent::Ignored;
        };
        let before = recognizer.state().progress;
        let was_error = recognizer.status() == Status::Error;
        let status = recognizer.handle_key_at(key, now);
        let progress = recognizer.state().progress;

        match status {
            Status::Completed => self.complete(now),
            Status::Error if !was_error => {
                self.cooldown.arm(now);
                SessionEvent::WrongKey
            }
            Status::Advancing if progress != before => SessionEvent::Progress(progress),
            _ => SessionEvent::Ignored,
        }
    }

    /// Like [`Session::handle_key_at`] for terminal input, where holding a
    /// modifier produces no event of its own.
    ///
    /// When an ordered challenge is idle and the key arrives with alt held,
    /// or as a macOS option-layer character, the alt press is synthesized
    /// first so the sequence can start. Timers are settled before that check.
    pub fn handle_terminal_key_at(&mut self, key: &RawKey, now: Instant) -> SessionEvent {
        if self.finished {
            return SessionEvent::Ignored;
        }
        if self.countdown.expired(now) {
            return self.time_out(now);
        }
        self.clear_if_cooled(now);

        let implied_start = self.recognizer().is_some_and(|r| {
            r.mode() == RecognitionMode::Ordered && r.status() == Status::Idle
        }) && (key.modifiers.secondary
                || (self.config.platform == Platform::Mac && key.is_option_layer()))
            && !key.is_modifier();

        if implied_start {
            let alt = RawKey::new(
                self.config.platform.secondary_token(),
                ModifierFlags {
                    secondary: true,
                    ..key.modifiers
                },
            );
            match self.handle_key_at(&alt, now) {
                SessionEvent::Progress(_) => {}
                other => return other,
            }
        }
        self.handle_key_at(key, now)
    }

    pub fn tick(&mut self) -> SessionEvent {
        self.tick_at(Instant::now())
    }

    /// Advances timers: challenge countdown, the recognizer's step timer,
    /// and the wrong-key cool-down, in that order.
    pub fn tick_at(&mut self, now: Instant) -> SessionEvent {
        if self.finished {
            return SessionEvent::Ignored;
        }
        if self.countdown.expired(now) {
            return self.time_out(now);
        }

        if let Some((_, recognizer)) = self.challenges.get_mut(self.current) {
            let was_error = recognizer.status() == Status::Error;
            if recognizer.poll_at(now) == Status::Error && !was_error {
                self.cooldown.arm(now);
                return SessionEvent::WrongKey;
            }
        }

        if self.clear_if_cooled(now) {
            SessionEvent::Cleared
        } else {
            SessionEvent::Ignored
        }
    }

    /// Abandons the session, disarming every timer. Attempts recorded so far
    /// are kept in the summary.
    pub fn abort(&mut self) {
        if self.finished {
            return;
        }
        self.disarm_current();
        self.finished = true;
        tracing::info!(
            completed = self.attempts.len(),
            total = self.challenges.len(),
            "session aborted"
        );
    }

    fn active(&self) -> Option<&(ShortcutDefinition, Recognizer)> {
        if self.finished {
            None
        } else {
            self.challenges.get(self.current)
        }
    }

    fn begin_challenge(&mut self, now: Instant) {
        self.challenge_started = now;
        self.countdown.arm(now);
        self.cooldown.disarm();
        if let Some((def, _)) = self.challenges.get(self.current) {
            tracing::info!(
                challenge = %def.id,
                index = self.current,
                "challenge started"
            );
        }
    }

    fn clear_if_cooled(&mut self, now: Instant) -> bool {
        if !self.cooldown.expired(now) {
            return false;
        }
        self.cooldown.disarm();
        if let Some((_, recognizer)) = self.challenges.get_mut(self.current) {
            recognizer.reset();
        }
        true
    }

    fn disarm_current(&mut self) {
        self.countdown.disarm();
        self.cooldown.disarm();
        if let Some((_, recognizer)) = self.challenges.get_mut(self.current) {
            recognizer.cancel();
        }
    }

    fn complete(&mut self, now: Instant) -> SessionEvent {
        let elapsed = self.challenge_elapsed(now);
        let record = self.seal(Outcome::Completed, elapsed);
        self.advance(now, SessionEvent::Completed(record))
    }

    fn time_out(&mut self, now: Instant) -> SessionEvent {
        let record = self.seal(Outcome::TimedOut, self.config.time_limit);
        self.score = self.score.saturating_sub(1);
        self.advance(now, SessionEvent::TimedOut(record))
    }

    fn seal(&mut self, outcome: Outcome, elapsed: Duration) -> AttemptRecord {
        self.disarm_current();
        let challenge_id = self
            .challenges
            .get(self.current)
            .map(|(def, _)| def.id.clone())
            .unwrap_or_default();
        let record = AttemptRecord {
            challenge_id,
            elapsed_millis: elapsed.as_millis() as u64,
            outcome,
        };
        tracing::info!(
            challenge = %record.challenge_id,
            elapsed_ms = record.elapsed_millis,
            outcome = ?record.outcome,
            "challenge finished"
        );
        self.attempts.push(record.clone());
        record
    }

    fn advance(&mut self, now: Instant, event: SessionEvent) -> SessionEvent {
        self.current += 1;
        if self.current >= self.challenges.len() {
            self.finished = true;
            tracing::info!(
                score = self.score,
                max_score = self.challenges.len(),
                "session finished"
            );
            return SessionEvent::Finished;
        }
        self.begin_challenge(now);
        event
    }
}
