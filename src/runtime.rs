use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Interval between countdown/animation ticks.
pub const TICK_RATE_MS: u64 = 50;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum DrillEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait DrillEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError>;
}

/// Whether a terminal key event should reach the recognizer.
///
/// Only presses count. Auto-repeat from a held key is dropped here rather
/// than in the engine, so a held letter never consumes a second sequence
/// position.
pub fn is_press(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<DrillEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) if is_press(&key) => {
                    if tx.send(DrillEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(DrillEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "terminal event reader stopped");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<DrillEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<DrillEvent>) -> Self {
        Self { rx }
    }
}

impl DrillEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: DrillEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: DrillEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> DrillEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => DrillEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert_matches!(runner.step(), DrillEvent::Tick);
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(DrillEvent::Resize).unwrap();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(10)),
        );
        assert_matches!(runner.step(), DrillEvent::Resize);
    }

    #[test]
    fn repeats_and_releases_are_not_presses() {
        let press = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT);
        assert!(is_press(&press));

        let repeat = KeyEvent::new_with_kind_and_state(
            KeyCode::Char('x'),
            KeyModifiers::ALT,
            KeyEventKind::Repeat,
            KeyEventState::NONE,
        );
        assert!(!is_press(&repeat));

        let release = KeyEvent::new_with_kind(
            KeyCode::Char('x'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert!(!is_press(&release));
    }
}
