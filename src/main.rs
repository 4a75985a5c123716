mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use levelcheck::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    content::ContentBanks,
    placement::PlacementTest,
    profile::{FileProfileStore, MemoryProfileStore, ProfileStore},
    result::VocabEstimates,
    runtime::{AppEvent, CrosstermEventSource, EventSource, Runner, TICK_RATE},
    session::{Session, View},
    stats::StatsDb,
    telemetry,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
};
use tracing::{info, warn};

const MAX_NAME_LEN: usize = 32;

/// CEFR English placement test in the terminal
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "An adaptive CEFR placement test: work up from A1 through C2 until the mistake budget runs out, then see your level, vocabulary estimate and a per-skill breakdown."
)]
pub struct Cli {
    /// learner name (skips the name prompt on first run)
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// directory holding a1.json..c2.json content banks instead of the built-in ones
    #[clap(short = 'b', long)]
    bank_dir: Option<PathBuf>,

    /// questions asked per level
    #[clap(short = 'q', long)]
    questions_per_level: Option<usize>,

    /// wrong answers that end a level
    #[clap(short = 'm', long)]
    mistake_budget: Option<u32>,

    /// print the stored best result and exit
    #[clap(long)]
    show_profile: bool,

    /// write every recorded answer to a CSV file and exit
    #[clap(long, value_name = "CSV")]
    export_history: Option<PathBuf>,

    /// forget the stored profile and best result before starting
    #[clap(long)]
    reset_profile: bool,
}

impl Cli {
    /// Command-line flags win over the saved config
    fn apply_to(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.learner_name = Some(name.clone());
        }
        if let Some(dir) = &self.bank_dir {
            config.bank_dir = Some(dir.clone());
        }
        if let Some(n) = self.questions_per_level {
            config.questions_per_level = n;
        }
        if let Some(n) = self.mistake_budget {
            config.mistake_budget = n;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    NamePrompt,
    Test,
    Results,
    Breakdown,
}

pub struct App {
    pub session: Session,
    pub state: AppState,
    pub name_input: String,
    pub breakdown_scroll: usize,
    pub should_quit: bool,
}

impl App {
    /// Starts the test; asks for a name only if neither `name` nor the stored profile has one
    pub fn new(mut session: Session, name: Option<String>) -> Self {
        session.begin();
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            if session.learner().is_empty() {
                session.set_learner(&name);
            }
        }
        let state = if session.learner().is_empty() {
            AppState::NamePrompt
        } else {
            AppState::Test
        };
        Self {
            session,
            state,
            name_input: String::new(),
            breakdown_scroll: 0,
            should_quit: false,
        }
    }

    pub fn on_event(&mut self, event: AppEvent) {
        if event.is_ctrl_c() {
            self.session.exit();
            self.should_quit = true;
            return;
        }
        if let AppEvent::Key(key) = event {
            self.on_key(key);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        match self.state {
            AppState::NamePrompt => self.on_name_key(key),
            AppState::Test => self.on_test_key(key),
            AppState::Results => match key.code {
                KeyCode::Char('r') => {
                    self.session.retake();
                    self.state = AppState::Test;
                }
                KeyCode::Char('b') | KeyCode::Char('s') => {
                    self.breakdown_scroll = 0;
                    self.state = AppState::Breakdown;
                }
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
            AppState::Breakdown => match key.code {
                KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                    self.state = AppState::Results;
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.breakdown_scroll = self.breakdown_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    // Upper bound is clamped while rendering
                    self.breakdown_scroll += 1;
                }
                KeyCode::Home => self.breakdown_scroll = 0,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
    }

    fn on_name_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let name = self.name_input.trim();
                if !name.is_empty() {
                    info!("new learner named");
                    self.session.set_learner(name);
                    self.state = AppState::Test;
                }
            }
            KeyCode::Backspace => {
                self.name_input.pop();
            }
            KeyCode::Esc => {
                self.session.exit();
                self.should_quit = true;
            }
            KeyCode::Char(c) if !c.is_control() => {
                if self.name_input.chars().count() < MAX_NAME_LEN {
                    self.name_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn on_test_key(&mut self, key: KeyEvent) {
        match (self.session.view().clone(), key.code) {
            (_, KeyCode::Esc) => {
                self.session.exit();
                self.should_quit = true;
            }
            (View::NoContent, KeyCode::Char('q')) => self.should_quit = true,
            (View::Question, KeyCode::Up | KeyCode::Char('k')) => self.session.select_previous(),
            (View::Question, KeyCode::Down | KeyCode::Char('j')) => self.session.select_next(),
            (View::Question, KeyCode::Char(c @ '1'..='9')) => {
                let index = c as usize - '1' as usize;
                if self.session.select(index) {
                    self.session.confirm();
                }
            }
            (View::Question, KeyCode::Enter | KeyCode::Char(' ')) => self.session.confirm(),
            (View::Feedback(_), KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right) => {
                self.session.confirm()
            }
            _ => {}
        }
        if self.session.view() == &View::Finished {
            self.state = AppState::Results;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);

    let profiles: Box<dyn ProfileStore> = match FileProfileStore::new() {
        Some(store) => {
            if cli.reset_profile {
                store.reset()?;
            }
            Box::new(store)
        }
        None => Box::new(MemoryProfileStore::new()),
    };

    if cli.show_profile {
        print_profile(profiles.as_ref())?;
        return Ok(());
    }
    if let Some(path) = &cli.export_history {
        if !StatsDb::database_exists() {
            println!("no history recorded yet");
            return Ok(());
        }
        let rows = StatsDb::new()?.export_answers_csv(path)?;
        println!("exported {rows} answers to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(e) = telemetry::init_tracing(&log_path) {
            eprintln!("logging disabled: {e}");
        }
    }

    let banks = ContentBanks::load(config.bank_dir.as_deref())?;
    let test = PlacementTest::new(
        Arc::new(banks),
        config.test_config(),
        VocabEstimates::default(),
    );
    let stats_db = match StatsDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %e, "history disabled");
            None
        }
    };
    let session = Session::new(test, "", profiles, stats_db);
    let mut app = App::new(session, config.learner_name.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), TICK_RATE);
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;
    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => continue,
            event => app.on_event(event),
        }
        terminal.draw(|f| ui(app, f))?;
    }
    Ok(())
}

fn print_profile(store: &dyn ProfileStore) -> Result<(), Box<dyn Error>> {
    let Some(profile) = store.load()? else {
        println!("no profile yet, take the test first");
        return Ok(());
    };
    println!("learner: {}", profile.name);
    match profile.best_result {
        Some(best) => {
            println!("best level: {} ({})", best.final_level, best.estimated_vocab);
            if let Some(failed) = best.failed_level {
                println!("stopped at: {failed}");
            }
            for (level, perf) in &best.levels {
                println!("  {level}: {}", perf.tally());
            }
            println!("taken: {}", best.completed_at.format("%Y-%m-%d %H:%M"));
        }
        None => println!("no completed test yet"),
    }
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.state);
    screen.render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelcheck::placement::TestConfig;
    use levelcheck::profile::LearnerProfile;
    use levelcheck::Placement;
    use rand::{rngs::StdRng, SeedableRng};
    use ratatui::{backend::TestBackend, Terminal};

    fn session_with(store: MemoryProfileStore) -> Session {
        let banks = Arc::new(ContentBanks::embedded().unwrap());
        let test = PlacementTest::new(banks, TestConfig::default(), VocabEstimates::default())
            .with_rng(StdRng::seed_from_u64(5));
        Session::new(test, "", Box::new(store), None)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.on_event(AppEvent::key(code));
    }

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    /// Press the digit key of a wrong option, then move past the feedback
    fn answer_wrong(app: &mut App) {
        let question = app.session.question().unwrap().clone();
        let index = question
            .options
            .iter()
            .position(|o| !question.is_correct(o))
            .unwrap();
        press(app, KeyCode::Char(char::from(b'1' + index as u8)));
        press(app, KeyCode::Enter);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["levelcheck"]);
        assert_eq!(cli.name, None);
        assert!(!cli.show_profile);
        assert!(!cli.reset_profile);
        assert_eq!(cli.export_history, None);
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "levelcheck",
            "--name",
            "Rami",
            "-q",
            "6",
            "--mistake-budget",
            "2",
            "--bank-dir",
            "/tmp/banks",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.learner_name.as_deref(), Some("Rami"));
        assert_eq!(config.questions_per_level, 6);
        assert_eq!(config.mistake_budget, 2);
        assert_eq!(config.bank_dir, Some(PathBuf::from("/tmp/banks")));
    }

    #[test]
    fn cli_export_history_takes_a_path() {
        let cli = Cli::parse_from(["levelcheck", "--export-history", "out.csv"]);
        assert_eq!(cli.export_history, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn first_run_prompts_for_a_name() {
        let mut app = App::new(session_with(MemoryProfileStore::new()), None);
        assert_eq!(app.state, AppState::NamePrompt);
        assert!(rendered(&mut app).contains("name"));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::NamePrompt);
        for c in "Dana".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::Test);
        assert_eq!(app.session.learner(), "Dana");
    }

    #[test]
    fn known_learner_skips_the_prompt() {
        let store = MemoryProfileStore::with_profile(LearnerProfile::new("Yusuf"));
        let mut app = App::new(session_with(store), None);
        assert_eq!(app.state, AppState::Test);
        assert!(rendered(&mut app).contains("A1"));
    }

    #[test]
    fn three_wrong_answers_lead_to_results() {
        let mut app = App::new(session_with(MemoryProfileStore::new()), Some("Lina".into()));
        for _ in 0..3 {
            answer_wrong(&mut app);
        }
        assert_eq!(app.state, AppState::Results);
        let result = app.session.result().unwrap();
        assert_eq!(result.final_level, Placement::Beginner);
        assert!(rendered(&mut app).contains("Beginner"));

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.state, AppState::Breakdown);
        rendered(&mut app);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Results);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.state, AppState::Test);
        assert!(app.session.result().is_none());
    }

    #[test]
    fn arrows_move_selection_and_enter_answers() {
        let mut app = App::new(session_with(MemoryProfileStore::new()), Some("Adam".into()));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.session.selected(), 1);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.session.selected(), 0);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.session.view(), View::Feedback(_)));
        rendered(&mut app);
    }

    #[test]
    fn escape_mid_test_quits_without_result() {
        let mut app = App::new(session_with(MemoryProfileStore::new()), Some("Mona".into()));
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
        assert_eq!(app.session.view(), &View::Exited);
        assert!(app.session.result().is_none());
    }
}
