use std::sync::mpsc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use keydrill::catalog::Catalog;
use keydrill::keys::RawKey;
use keydrill::platform::Platform;
use keydrill::runtime::{DrillEvent, FixedTicker, Runner, TestEventSource};
use keydrill::session::{Outcome, Session, SessionConfig, SessionEvent};

fn config(time_limit: Duration) -> SessionConfig {
    SessionConfig {
        time_limit,
        platform: Platform::Other,
        ..SessionConfig::default()
    }
}

// Drives a session through the runtime exactly like the TUI loop does,
// bounded so a broken recognizer cannot hang the test.
fn drive(session: &mut Session, runner: &Runner<TestEventSource, FixedTicker>) {
    for _ in 0..400u32 {
        let event = match runner.step() {
            DrillEvent::Tick => session.tick_at(Instant::now()),
            DrillEvent::Resize => SessionEvent::Ignored,
            DrillEvent::Key(key) => {
                let raw = RawKey::from_key_event(&key, session.config().platform);
                session.handle_terminal_key_at(&raw, Instant::now())
            }
        };
        if event == SessionEvent::Finished {
            break;
        }
    }
}

fn runner(rx: mpsc::Receiver<DrillEvent>) -> Runner<TestEventSource, FixedTicker> {
    Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    )
}

#[test]
fn headless_chord_then_sequence_session() {
    let mut session = Session::start(
        Catalog::global().unwrap(),
        &["duplicate", "align-top"],
        config(Duration::from_secs(10)),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let keys = [
        KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE),
        KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL),
        // terminals report alt as a flag on the struck key
        KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT),
        KeyEvent::new(KeyCode::Char('a'), KeyModifiers::ALT),
        KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE),
    ];
    for key in keys {
        tx.send(DrillEvent::Key(key)).unwrap();
    }

    drive(&mut session, &runner(rx));

    assert!(session.is_finished());
    let summary = session.summary();
    assert_eq!(summary.score, 2);
    assert_eq!(summary.max_score, 2);
    assert!(summary
        .attempts
        .iter()
        .all(|a| a.outcome == Outcome::Completed));
    assert_eq!(summary.attempts[0].challenge_id, "duplicate");
    assert_eq!(summary.attempts[1].challenge_id, "align-top");
}

#[test]
fn headless_timed_session_finishes_by_countdown() {
    let mut session = Session::start(
        Catalog::global().unwrap(),
        &["group", "align-left"],
        config(Duration::from_millis(100)),
    )
    .unwrap();

    let (_tx, rx) = mpsc::channel();
    drive(&mut session, &runner(rx));

    assert!(session.is_finished(), "countdown should end both challenges");
    let summary = session.summary();
    assert_eq!(summary.score, 0);
    assert_eq!(summary.timeouts(), 2);
    assert!(summary.attempts.iter().all(|a| a.elapsed_millis == 100));
}

#[test]
fn headless_wrong_key_recovers_after_cooldown() {
    let mut session = Session::start(
        Catalog::global().unwrap(),
        &["align-top"],
        SessionConfig {
            error_cooldown: Duration::from_millis(20),
            ..config(Duration::from_secs(10))
        },
    )
    .unwrap();

    let wrong = RawKey::from_key_event(
        &KeyEvent::new(KeyCode::Char('a'), KeyModifiers::ALT),
        Platform::Other,
    );
    // alt is synthesized, then 'a' is not the expected 'x'
    assert_eq!(
        session.handle_terminal_key_at(&wrong, Instant::now()),
        SessionEvent::WrongKey
    );

    let (_tx, rx) = mpsc::channel();
    let runner = runner(rx);
    let mut cleared = false;
    for _ in 0..100u32 {
        if let DrillEvent::Tick = runner.step() {
            if session.tick_at(Instant::now()) == SessionEvent::Cleared {
                cleared = true;
                break;
            }
        }
    }
    assert!(cleared, "the wrong-key indication should self-clear");

    let alt_x = RawKey::from_key_event(
        &KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT),
        Platform::Other,
    );
    assert_matches!(
        session.handle_terminal_key_at(&alt_x, Instant::now()),
        SessionEvent::Progress(2)
    );
}
