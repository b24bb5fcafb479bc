use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use guessr::app::{App, AppAction, Screen};
use guessr::difficulty::Difficulty;
use guessr::highscore::HighScoreStore;
use guessr::round::{GuessOutcome, RoundEngine};
use guessr::runtime::{ChannelEventSource, FixedTicker, GameEvent, Runner};
use guessr::session::{SessionController, SessionPhase};
use guessr::timer::{Countdown, ThreadCountdown, TimerState};

// Headless integration using the real runtime and a fast wall-clock countdown.
// One "second" of game time lasts a couple of milliseconds here.
fn fast_app(
    tick: Duration,
) -> (
    App<ThreadCountdown>,
    Runner<ChannelEventSource, FixedTicker>,
    mpsc::Sender<GameEvent>,
) {
    let (tx, rx) = mpsc::channel();
    let controller = SessionController::new(
        ThreadCountdown::with_tick_interval(tick),
        Arc::new(HighScoreStore::in_memory()),
        tx.clone(),
    )
    .with_engine(RoundEngine::seeded(21));
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    (App::new(controller, Difficulty::Easy), runner, tx)
}

fn key(tx: &mpsc::Sender<GameEvent>, code: KeyCode) {
    tx.send(GameEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
        .unwrap();
}

/// Feed every pending event to the app, the way the binary's loop does
fn drive(
    app: &mut App<ThreadCountdown>,
    runner: &Runner<ChannelEventSource, FixedTicker>,
    steps: usize,
    mut done: impl FnMut(&App<ThreadCountdown>) -> bool,
) {
    for _ in 0..steps {
        match runner.step() {
            GameEvent::Key(k) => {
                if app.on_key(k) == AppAction::Quit {
                    return;
                }
            }
            GameEvent::Countdown(event) => app.on_countdown(event),
            GameEvent::Celebrate => app.celebrate(80, 24),
            GameEvent::Tick => app.on_frame(),
            GameEvent::Resize => {}
        }
        if done(app) {
            return;
        }
    }
}

#[test]
fn headless_round_times_out_through_the_event_loop() {
    let (mut app, runner, tx) = fast_app(Duration::from_millis(2));
    for c in "Alice".chars() {
        key(&tx, KeyCode::Char(c));
    }
    key(&tx, KeyCode::Enter);

    drive(&mut app, &runner, 2_000, |app| {
        app.controller.phase() == SessionPhase::RoundResolved
    });

    assert_eq!(app.controller.phase(), SessionPhase::RoundResolved);
    assert_eq!(app.controller.seconds_left(), Some(0));
    assert_eq!(app.controller.timer_state(), TimerState::Expired);
    assert_eq!(app.controller.cumulative_score(), 0);
    assert!(app.message.contains("Time's up!"), "{}", app.message);
}

#[test]
fn headless_win_cancels_countdown_and_celebrates() {
    // Slow enough that the round cannot time out during the test
    let (mut app, runner, tx) = fast_app(Duration::from_secs(1));
    for c in "Alice".chars() {
        key(&tx, KeyCode::Char(c));
    }
    key(&tx, KeyCode::Enter);
    drive(&mut app, &runner, 50, |app| app.screen == Screen::Playing);
    assert_eq!(app.controller.phase(), SessionPhase::InRound);

    let target = app.controller.round().unwrap().target();
    for c in target.to_string().chars() {
        key(&tx, KeyCode::Char(c));
    }
    key(&tx, KeyCode::Enter);
    drive(&mut app, &runner, 50, |app| app.celebration.is_active);

    assert_eq!(app.controller.phase(), SessionPhase::RoundResolved);
    assert_eq!(app.controller.timer().state(), TimerState::Cancelled);
    assert_eq!(app.controller.cumulative_score(), 5);
    assert_eq!(app.high_score.score, 5);
    assert_eq!(app.high_score.name, "Alice");
    assert!(app.celebration.is_active);
    assert_matches!(
        app.controller.round().unwrap().status(),
        guessr::round::RoundStatus::Won
    );
}

#[test]
fn headless_exit_needs_confirmation() {
    let (mut app, runner, tx) = fast_app(Duration::from_secs(1));
    for c in "Bob".chars() {
        key(&tx, KeyCode::Char(c));
    }
    key(&tx, KeyCode::Enter);
    key(&tx, KeyCode::Esc);
    key(&tx, KeyCode::Char('n'));
    drive(&mut app, &runner, 50, |_| false);
    assert_eq!(app.screen, Screen::Playing);
    assert_eq!(app.controller.phase(), SessionPhase::InRound);

    key(&tx, KeyCode::Esc);
    key(&tx, KeyCode::Char('y'));
    drive(&mut app, &runner, 50, |app| app.screen == Screen::NameEntry);
    assert_eq!(app.controller.phase(), SessionPhase::Ended);
    assert_eq!(app.controller.timer_state(), TimerState::Cancelled);

    // Esc on the name prompt leaves the app
    key(&tx, KeyCode::Esc);
    let mut quit = false;
    for _ in 0..50 {
        if let GameEvent::Key(k) = runner.step() {
            quit = app.on_key(k) == AppAction::Quit;
            break;
        }
    }
    assert!(quit);
}

#[test]
fn stale_expiry_from_a_won_round_is_ignored() {
    let (mut app, runner, tx) = fast_app(Duration::from_secs(1));
    for c in "Alice".chars() {
        key(&tx, KeyCode::Char(c));
    }
    key(&tx, KeyCode::Enter);
    drive(&mut app, &runner, 50, |app| app.screen == Screen::Playing);

    let round = app.controller.round().unwrap().id();
    let target = app.controller.round().unwrap().target();
    let report = app.controller.guess(&target.to_string()).unwrap();
    assert_matches!(report.outcome, GuessOutcome::Won { .. });

    // A late expiry racing the win must not resolve the round twice
    tx.send(GameEvent::Countdown(
        guessr::runtime::CountdownEvent::Expired { round },
    ))
    .unwrap();
    assert!(app
        .controller
        .on_countdown(guessr::runtime::CountdownEvent::Expired { round })
        .is_none());
    drive(&mut app, &runner, 10, |_| false);
    assert_matches!(
        app.controller.round().unwrap().status(),
        guessr::round::RoundStatus::Won
    );
}
