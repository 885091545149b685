mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use itertools::Itertools;
use keydrill::{
    app_dirs::AppDirs,
    catalog::Catalog,
    config::{Config, ConfigStore, FileConfigStore},
    keys::RawKey,
    logging,
    platform::Platform,
    runtime::{CrosstermEventSource, DrillEvent, FixedTicker, Runner},
    session::{select_challenges, AttemptRecord, Difficulty, Session, SessionEvent},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

/// drill presentation editor keyboard shortcuts against the clock
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal trainer for presentation editor shortcuts: primary-modifier chords and alt ribbon sequences, each against a countdown, scored per session."
)]
pub struct Cli {
    /// drill a single shortcut by id (see --list)
    #[clap(short = 'c', long)]
    challenge: Option<String>,

    /// number of random shortcuts in a test session
    #[clap(short = 'n', long)]
    count: Option<usize>,

    /// time allowed per challenge
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// seconds allowed per challenge, overrides the difficulty tier
    #[clap(short = 't', long, value_parser = parse_seconds)]
    time_limit: Option<Duration>,

    /// milliseconds allowed between keys of an alt sequence
    #[clap(long)]
    step_timeout_ms: Option<u64>,

    /// which modifier is primary (command on mac, ctrl elsewhere)
    #[clap(long, value_enum)]
    platform: Option<Platform>,

    /// print the available shortcuts and exit
    #[clap(long)]
    list: bool,

    /// print the session summary as json on exit
    #[clap(long)]
    json: bool,

    /// append logs to this file (filter with KEYDRILL_LOG)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// CLI values win over persisted preferences.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if let Some(n) = self.count {
            config.challenge_count = n;
        }
        if let Some(ms) = self.step_timeout_ms {
            config.step_timeout_ms = ms;
        }
        if self.platform.is_some() {
            config.platform = self.platform;
        }
        config
    }

    fn time_limit(&self) -> Option<Duration> {
        self.time_limit.filter(|limit| !limit.is_zero())
    }
}

fn parse_seconds(arg: &str) -> Result<Duration, String> {
    let secs = arg.parse::<f64>().map_err(|e| e.to_string())?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("{arg} is not a usable number of seconds"))
}

/// Which challenges a run drills.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Single(String),
    Random(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Drilling,
    Summary,
}

#[derive(Debug)]
pub struct App {
    pub session: Session,
    pub state: AppState,
    pub plan: Plan,
    pub config: Config,
    pub time_limit: Option<Duration>,
    /// Most recently sealed attempt, shown briefly under the next challenge.
    pub last_attempt: Option<AttemptRecord>,
    pub now: Instant,
}

impl App {
    pub fn new(plan: Plan, config: Config, time_limit: Option<Duration>) -> Result<Self, Box<dyn Error>> {
        let now = Instant::now();
        let session = start_session(&plan, &config, time_limit, None, now)?;
        Ok(Self {
            session,
            state: AppState::Drilling,
            plan,
            config,
            time_limit,
            last_attempt: None,
            now,
        })
    }

    /// Starts over; `same` replays the current challenges in the same order.
    pub fn reset(&mut self, same: bool) -> Result<(), Box<dyn Error>> {
        let now = Instant::now();
        let ids: Option<Vec<String>> = same.then(|| {
            self.session
                .summary()
                .attempts
                .iter()
                .map(|a| a.challenge_id.clone())
                .collect()
        });
        let replay = ids.filter(|ids| ids.len() == self.session.len());
        self.session = start_session(&self.plan, &self.config, self.time_limit, replay, now)?;
        self.state = AppState::Drilling;
        self.last_attempt = None;
        self.now = now;
        Ok(())
    }

    pub fn on_key(&mut self, raw: &RawKey, now: Instant) {
        self.now = now;
        let event = self.session.handle_terminal_key_at(raw, now);
        self.on_session_event(event);
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.now = now;
        let event = self.session.tick_at(now);
        self.on_session_event(event);
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Completed(record) | SessionEvent::TimedOut(record) => {
                self.last_attempt = Some(record);
            }
            SessionEvent::Finished => {
                self.last_attempt = self.session.attempts().last().cloned();
                self.state = AppState::Summary;
            }
            SessionEvent::Ignored
            | SessionEvent::Progress(_)
            | SessionEvent::WrongKey
            | SessionEvent::Cleared => {}
        }
    }
}

fn start_session(
    plan: &Plan,
    config: &Config,
    time_limit: Option<Duration>,
    replay: Option<Vec<String>>,
    now: Instant,
) -> Result<Session, Box<dyn Error>> {
    let catalog = Catalog::global()?;
    let session_config = config.session_config(time_limit);
    let ids = match (plan, replay) {
        (_, Some(ids)) => ids,
        (Plan::Single(id), None) => vec![id.clone()],
        (Plan::Random(count), None) => select_challenges(catalog, *count, &mut rand::thread_rng())?,
    };
    Ok(Session::start_at(catalog, &ids, session_config, now)?)
}

fn print_catalog(platform: Platform) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::global()?;
    let width = catalog.ids().map(str::len).max().unwrap_or(0);
    let listing = catalog
        .iter()
        .map(|def| {
            format!(
                "{:width$}  {:16}  {}",
                def.id,
                def.label(platform),
                def.description,
                width = width
            )
        })
        .join("\n");
    println!("{listing}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());

    if cli.list {
        return print_catalog(config.platform());
    }

    if let Some(path) = cli.log_file.clone().or_else(|| {
        std::env::var_os(logging::LOG_ENV).and_then(|_| AppDirs::log_path())
    }) {
        logging::init_file_logging(&path, "info")?;
    }

    let plan = match &cli.challenge {
        Some(id) => Plan::Single(id.clone()),
        None => Plan::Random(config.challenge_count),
    };

    // configuration problems surface before the terminal is touched
    let mut app = match App::new(plan, config.clone(), cli.time_limit()) {
        Ok(app) => app,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, err).exit();
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(err) = store.save(&config) {
        tracing::warn!(error = %err, "unable to save preferences");
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // report bare modifier presses where the terminal supports it
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&app.session.summary())?);
    }

    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let platform = app.session.config().platform;

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            DrillEvent::Tick => {
                if app.state == AppState::Drilling {
                    app.on_tick(Instant::now());
                }
            }
            DrillEvent::Resize => {}
            DrillEvent::Key(key) => match app.state {
                AppState::Drilling => {
                    if key.code == KeyCode::Esc {
                        app.session.abort();
                        break;
                    }
                    app.on_key(&RawKey::from_key_event(&key, platform), Instant::now());
                }
                AppState::Summary => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    KeyCode::Char('r') => app.reset(true)?,
                    KeyCode::Char('n') => app.reset(false)?,
                    _ => {}
                },
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keydrill::keys::ModifierFlags;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("keydrill").chain(args.iter().copied()))
    }

    fn other_config() -> Config {
        Config {
            platform: Some(Platform::Other),
            ..Config::default()
        }
    }

    #[test]
    fn test_cli_defaults() {
        let cli = cli(&[]);
        assert_eq!(cli.challenge, None);
        assert_eq!(cli.count, None);
        assert_eq!(cli.difficulty, None);
        assert!(!cli.list);
        assert!(!cli.json);
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = cli(&["-n", "3", "-d", "strict", "--platform", "mac", "--step-timeout-ms", "900"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.challenge_count, 3);
        assert_eq!(cfg.difficulty, Difficulty::Strict);
        assert_eq!(cfg.platform, Some(Platform::Mac));
        assert_eq!(cfg.step_timeout_ms, 900);
    }

    #[test]
    fn test_cli_time_limit() {
        assert_eq!(cli(&["-t", "2.5"]).time_limit(), Some(Duration::from_millis(2500)));
        assert_eq!(cli(&["-t", "0"]).time_limit(), None);
        assert_eq!(cli(&[]).time_limit(), None);
    }

    #[test]
    fn test_cli_rejects_unusable_time_limit() {
        for arg in ["1e30", "inf", "NaN", "soon"] {
            let parsed = Cli::try_parse_from(["keydrill", "-t", arg]);
            assert_eq!(parsed.unwrap_err().kind(), ErrorKind::ValueValidation, "{arg}");
        }
    }

    #[test]
    fn test_app_rejects_time_limit_past_clock_range() {
        let limit = Duration::from_secs(u64::MAX);
        let result = App::new(Plan::Single("duplicate".into()), other_config(), Some(limit));
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_single_challenge() {
        let cli = cli(&["--challenge", "align-top"]);
        assert_eq!(cli.challenge.as_deref(), Some("align-top"));
    }

    #[test]
    fn test_app_rejects_unknown_challenge() {
        let result = App::new(Plan::Single("nope".into()), other_config(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_app_rejects_bad_count() {
        assert!(App::new(Plan::Random(1), other_config(), None).is_err());
        assert!(App::new(Plan::Random(3), other_config(), None).is_ok());
    }

    #[test]
    fn test_app_single_chord_reaches_summary() {
        let mut app = App::new(Plan::Single("duplicate".into()), other_config(), None).unwrap();
        let now = app.now;
        app.on_key(&RawKey::new("d", ModifierFlags::PRIMARY), now + Duration::from_millis(300));
        assert_eq!(app.state, AppState::Summary);
        assert_eq!(app.last_attempt.as_ref().unwrap().challenge_id, "duplicate");
        assert_eq!(app.session.score(), 1);
    }

    #[test]
    fn test_app_timeout_reaches_summary() {
        let mut app = App::new(
            Plan::Single("group".into()),
            other_config(),
            Some(Duration::from_secs(1)),
        )
        .unwrap();
        let now = app.now;
        app.on_tick(now + Duration::from_millis(500));
        assert_eq!(app.state, AppState::Drilling);
        app.on_tick(now + Duration::from_millis(1000));
        assert_eq!(app.state, AppState::Summary);
        assert_eq!(app.session.score(), 0);
    }

    #[test]
    fn test_app_reset_replays_same_challenges() {
        let mut app = App::new(Plan::Random(2), other_config(), Some(Duration::from_secs(1))).unwrap();
        let now = app.now;
        app.on_tick(now + Duration::from_secs(1));
        app.on_tick(now + Duration::from_secs(2));
        assert_eq!(app.state, AppState::Summary);
        let before: Vec<String> = app
            .session
            .attempts()
            .iter()
            .map(|a| a.challenge_id.clone())
            .collect();

        app.reset(true).unwrap();
        assert_eq!(app.state, AppState::Drilling);
        assert!(app.last_attempt.is_none());
        assert_eq!(
            app.session.current_definition().map(|d| d.id.clone()),
            before.first().cloned()
        );
    }
}
