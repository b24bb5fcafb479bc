use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use env_logger::{Builder, Env, Target};
use guessr::{
    app::{App, AppAction},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    difficulty::Difficulty,
    highscore::{HighScoreStore, MemoryStore, SqliteStore},
    round::RoundEngine,
    runtime::{spawn_terminal_events, ChannelEventSource, FixedTicker, GameEvent, Runner},
    session::SessionController,
    timer::ThreadCountdown,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc, Arc},
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// number guessing game for the terminal, with a countdown and a persistent high score
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// player name to prefill the name prompt
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// difficulty of the first round (defaults to the last one played)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// seed the target generator for reproducible rounds
    #[clap(long)]
    seed: Option<u64>,

    /// high score database (defaults to ~/.local/state/guessr/stats.db)
    #[clap(long)]
    db: Option<PathBuf>,

    /// write logs to this file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// print the current high score and exit
    #[clap(long)]
    show_high_score: bool,

    /// clear the stored high score and exit
    #[clap(long)]
    reset_high_score: bool,
}

impl Cli {
    /// CLI values take precedence over the saved config
    fn apply_to(&self, config: &Config) -> Config {
        Config {
            player_name: self.name.clone().or_else(|| config.player_name.clone()),
            difficulty: self.difficulty.unwrap_or(config.difficulty),
        }
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .init();
        }
        // stderr shares the terminal with the TUI, keep it quiet
        None => Builder::from_env(Env::default().default_filter_or("error")).init(),
    }
    Ok(())
}

/// Store for the interactive game, degrading to memory when the db is unusable
fn open_high_scores(db: Option<&PathBuf>) -> HighScoreStore {
    let path = db.cloned().or_else(AppDirs::db_path);
    let opened = match path {
        Some(path) => SqliteStore::open(&path).map_err(|e| (path, e)),
        None => {
            log::warn!("no state directory available, high score will not persist");
            return HighScoreStore::in_memory();
        }
    };
    match opened {
        Ok(store) => HighScoreStore::new(Box::new(store)),
        Err((path, e)) => {
            log::warn!(
                "could not open high score db {}: {}, falling back to memory",
                path.display(),
                e
            );
            HighScoreStore::new(Box::new(MemoryStore::new()))
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    if cli.show_high_score || cli.reset_high_score {
        let path = cli
            .db
            .clone()
            .or_else(AppDirs::db_path)
            .ok_or("no state directory for the high score db, pass --db")?;
        let store = HighScoreStore::new(Box::new(SqliteStore::open(&path)?));
        if cli.reset_high_score {
            store.reset()?;
            println!("High score cleared");
        }
        if cli.show_high_score {
            let record = store.read()?;
            if record.score == 0 {
                println!("No high score yet");
            } else {
                println!("High Score: {} by {}", record.score, record.name);
            }
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = cli.apply_to(&config_store.load());
    let high_scores = Arc::new(open_high_scores(cli.db.as_ref()));

    let (tx, rx) = mpsc::channel();
    spawn_terminal_events(tx.clone());
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    let mut controller = SessionController::new(ThreadCountdown::new(), high_scores, tx);
    if let Some(seed) = cli.seed {
        controller = controller.with_engine(RoundEngine::seeded(seed));
    }
    let mut app = App::new(controller, config.difficulty);
    if let Some(name) = &config.player_name {
        app.name_input = name.clone();
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &runner, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let saved = app.preferences(&config);
    if let Err(e) = config_store.save(&saved) {
        log::warn!("could not save config {}: {}", config_store.path().display(), e);
    }

    result
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    runner: &Runner<ChannelEventSource, FixedTicker>,
    app: &mut App<ThreadCountdown>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            GameEvent::Key(key) => {
                if app.on_key(key) == AppAction::Quit {
                    return Ok(());
                }
            }
            GameEvent::Countdown(event) => app.on_countdown(event),
            GameEvent::Celebrate => {
                let size = terminal.size().unwrap_or_default();
                app.celebrate(size.width, size.height);
            }
            GameEvent::Tick => app.on_frame(),
            GameEvent::Resize => {}
        }
    }
}
