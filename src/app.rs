use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::celebration::CelebrationAnimation;
use crate::config::Config;
use crate::difficulty::Difficulty;
use crate::error::GameError;
use crate::highscore::HighScoreRecord;
use crate::round::GuessOutcome;
use crate::runtime::CountdownEvent;
use crate::session::{RoundReport, SessionController, SessionPhase};
use crate::timer::Countdown;

/// Longest guess the input box accepts
const MAX_GUESS_LEN: usize = 6;
const MAX_NAME_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    NameEntry,
    Playing,
    ConfirmExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Terminal front-end state wrapped around a [`SessionController`]
pub struct App<C: Countdown> {
    pub controller: SessionController<C>,
    pub screen: Screen,
    pub name_input: String,
    pub guess_input: String,
    pub difficulty: Difficulty,
    pub message: String,
    pub celebration: CelebrationAnimation,
    /// Cached for rendering, refreshed whenever it may have changed
    pub high_score: HighScoreRecord,
}

impl<C: Countdown> App<C> {
    pub fn new(mut controller: SessionController<C>, difficulty: Difficulty) -> Self {
        let high_score = controller.high_score();
        if let Err(e) = controller.select_difficulty(difficulty) {
            log::error!("could not preselect {}: {}", difficulty, e);
        }
        Self {
            controller,
            screen: Screen::NameEntry,
            name_input: String::new(),
            guess_input: String::new(),
            difficulty,
            message: String::new(),
            celebration: CelebrationAnimation::new(),
            high_score,
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::Continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.controller.end_session();
            return AppAction::Quit;
        }

        match self.screen {
            Screen::NameEntry => self.on_name_entry_key(key),
            Screen::Playing => {
                self.on_playing_key(key);
                AppAction::Continue
            }
            Screen::ConfirmExit => {
                self.on_confirm_exit_key(key);
                AppAction::Continue
            }
        }
    }

    fn on_name_entry_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::Enter => self.start(),
            KeyCode::Tab | KeyCode::Right => {
                self.pick_difficulty(self.difficulty.next());
            }
            KeyCode::Left => {
                self.pick_difficulty(self.difficulty.next().next());
            }
            KeyCode::Backspace => {
                self.name_input.pop();
            }
            KeyCode::Char(c)
                if !c.is_control() && self.name_input.chars().count() < MAX_NAME_LEN =>
            {
                self.name_input.push(c);
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn on_playing_key(&mut self, key: KeyEvent) {
        let resolved = self.controller.phase() == SessionPhase::RoundResolved;
        match key.code {
            KeyCode::Esc => self.screen = Screen::ConfirmExit,
            KeyCode::Enter if resolved => self.play_again(),
            KeyCode::Enter => self.submit_guess(),
            KeyCode::Tab if resolved => {
                let next = self.controller.difficulty().next();
                if self.pick_difficulty(next) {
                    self.message = format!("Next round on {}. Press Enter to play again.", next);
                }
            }
            KeyCode::Backspace => {
                self.guess_input.pop();
            }
            KeyCode::Char(c)
                if !resolved
                    && (c.is_ascii_digit() || c == '-')
                    && self.guess_input.len() < MAX_GUESS_LEN =>
            {
                self.guess_input.push(c);
            }
            _ => {}
        }
    }

    fn on_confirm_exit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.exit_session(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.screen = Screen::Playing;
            }
            _ => {}
        }
    }

    /// Move the selector and the controller together. Returns true on success.
    fn pick_difficulty(&mut self, difficulty: Difficulty) -> bool {
        let result = self.controller.select_difficulty(difficulty);
        if self.report_error(result) {
            self.difficulty = difficulty;
            true
        } else {
            false
        }
    }

    /// Surface a controller error as a message. Returns true on success.
    fn report_error(&mut self, result: Result<(), GameError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) if e.is_user_error() => {
                self.message = e.to_string();
                false
            }
            // Contract violations were already logged by the controller
            Err(_) => false,
        }
    }

    fn start(&mut self) {
        let result = self
            .controller
            .start_session(&self.name_input, self.difficulty);
        if self.report_error(result) {
            self.high_score = self.controller.high_score();
            self.screen = Screen::Playing;
            self.guess_input.clear();
            self.message = self.round_prompt();
        }
    }

    fn play_again(&mut self) {
        let result = self.controller.play_again();
        if self.report_error(result) {
            self.guess_input.clear();
            self.message = self.round_prompt();
        }
    }

    fn submit_guess(&mut self) {
        match self.controller.guess(&self.guess_input) {
            Ok(report) => {
                self.message = outcome_message(&report);
                self.guess_input.clear();
                if report.new_high_score {
                    self.high_score = self.controller.high_score();
                }
            }
            Err(e) if e.is_user_error() => self.message = e.to_string(),
            Err(_) => {}
        }
    }

    fn exit_session(&mut self) {
        self.controller.end_session();
        self.celebration.stop();
        self.guess_input.clear();
        self.message.clear();
        self.screen = Screen::NameEntry;
    }

    fn round_prompt(&self) -> String {
        match self.controller.round() {
            Some(round) => format!(
                "Guess a number between {} and {}. You have {} attempts.",
                round.profile().low,
                round.profile().high,
                round.attempts_remaining()
            ),
            None => String::new(),
        }
    }

    pub fn on_countdown(&mut self, event: CountdownEvent) {
        if let Some(report) = self.controller.on_countdown(event) {
            self.message = outcome_message(&report);
            self.guess_input.clear();
        }
    }

    pub fn celebrate(&mut self, width: u16, height: u16) {
        self.celebration.start(width, height);
    }

    /// Advance animations by one frame
    pub fn on_frame(&mut self) {
        self.celebration.update();
    }

    /// Name of the player of the current or last session, if any
    pub fn last_player_name(&self) -> Option<String> {
        let name = self.name_input.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Preferences to write back on exit, keeping `previous` values nothing replaced
    pub fn preferences(&self, previous: &Config) -> Config {
        Config {
            player_name: self.last_player_name().or_else(|| previous.player_name.clone()),
            difficulty: self.difficulty,
        }
    }
}

/// Player-facing text for a guess or timeout
pub fn outcome_message(report: &RoundReport) -> String {
    match report.outcome {
        GuessOutcome::TooHigh { attempts_remaining } => {
            format!("Too high! Attempts left: {}", attempts_remaining)
        }
        GuessOutcome::TooLow { attempts_remaining } => {
            format!("Too low! Attempts left: {}", attempts_remaining)
        }
        GuessOutcome::Won { points_awarded, .. } => format!(
            "🎉 Correct! You scored {} points. Press Enter to play again.",
            points_awarded
        ),
        GuessOutcome::Lost { target } => format!(
            "❌ Game Over! The number was {}. Your total score: {}.",
            target, report.cumulative_score
        ),
        GuessOutcome::TimedOut { target } => format!(
            "⏰ Time's up! The number was {}. Your total score: {}.",
            target, report.cumulative_score
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscore::HighScoreStore;
    use crate::round::RoundEngine;
    use crate::runtime::GameEvent;
    use crate::timer::ManualCountdown;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Arc;

    fn app() -> (App<ManualCountdown>, Receiver<GameEvent>) {
        let (tx, rx) = mpsc::channel();
        let controller = SessionController::new(
            ManualCountdown::new(),
            Arc::new(HighScoreStore::in_memory()),
            tx,
        )
        .with_engine(RoundEngine::seeded(3));
        (App::new(controller, Difficulty::Easy), rx)
    }

    fn press(app: &mut App<ManualCountdown>, code: KeyCode) -> AppAction {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<ManualCountdown>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn start(app: &mut App<ManualCountdown>) {
        type_text(app, "Alice");
        press(app, KeyCode::Enter);
    }

    #[test]
    fn empty_name_shows_prompt() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::NameEntry);
        assert_eq!(app.message, "Please enter your name to start!");
    }

    #[test]
    fn entering_name_starts_round() {
        let (mut app, _rx) = app();
        start(&mut app);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.controller.player_name(), "Alice");
        assert_eq!(
            app.message,
            "Guess a number between 1 and 10. You have 5 attempts."
        );
    }

    #[test]
    fn tab_cycles_difficulty_on_name_entry() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.difficulty, Difficulty::Medium);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.difficulty, Difficulty::Easy);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.difficulty, Difficulty::Hard);
    }

    #[test]
    fn guess_input_only_takes_digits() {
        let (mut app, _rx) = app();
        start(&mut app);
        type_text(&mut app, "4x2");
        assert_eq!(app.guess_input, "42");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.guess_input, "4");
    }

    #[test]
    fn out_of_range_guess_shows_range_message() {
        let (mut app, _rx) = app();
        start(&mut app);
        type_text(&mut app, "42");
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.message,
            "Please guess a number within the range 1 to 10."
        );
        assert_eq!(app.controller.round().unwrap().attempts_remaining(), 5);
    }

    #[test]
    fn empty_guess_is_invalid_input() {
        let (mut app, _rx) = app();
        start(&mut app);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.message, "Please enter a valid number!");
    }

    #[test]
    fn correct_guess_then_enter_plays_again() {
        let (mut app, rx) = app();
        start(&mut app);
        let target = app.controller.round().unwrap().target().to_string();
        type_text(&mut app, &target);
        press(&mut app, KeyCode::Enter);

        assert!(app.message.starts_with("🎉 Correct! You scored 5 points."));
        assert_eq!(app.controller.phase(), SessionPhase::RoundResolved);
        assert!(rx.try_iter().any(|e| matches!(e, GameEvent::Celebrate)));

        // Digits are ignored until the next round starts
        type_text(&mut app, "3");
        assert!(app.guess_input.is_empty());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.phase(), SessionPhase::InRound);
        assert_eq!(app.controller.cumulative_score(), 5);
    }

    #[test]
    fn tab_after_round_changes_next_difficulty() {
        let (mut app, _rx) = app();
        start(&mut app);
        let target = app.controller.round().unwrap().target().to_string();
        type_text(&mut app, &target);
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.difficulty, Difficulty::Medium);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.controller.round().unwrap().profile().high, 50);
    }

    #[test]
    fn timeout_message_reveals_target() {
        let (mut app, rx) = app();
        start(&mut app);
        let target = app.controller.round().unwrap().target();

        app.controller.timer_mut().advance(30);
        for ev in rx.try_iter() {
            if let GameEvent::Countdown(c) = ev {
                app.on_countdown(c);
            }
        }
        assert_eq!(
            app.message,
            format!("⏰ Time's up! The number was {}. Your total score: 0.", target)
        );
    }

    #[test]
    fn exit_requires_confirmation() {
        let (mut app, _rx) = app();
        start(&mut app);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::ConfirmExit);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.controller.phase(), SessionPhase::InRound);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.screen, Screen::NameEntry);
        assert_eq!(app.controller.phase(), SessionPhase::Ended);
        assert_eq!(app.controller.cumulative_score(), 0);
    }

    #[test]
    fn esc_on_name_entry_quits() {
        let (mut app, _rx) = app();
        assert_eq!(press(&mut app, KeyCode::Esc), AppAction::Quit);
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let (mut app, _rx) = app();
        start(&mut app);
        let action = app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, AppAction::Quit);
        assert_eq!(app.controller.phase(), SessionPhase::Ended);
    }

    #[test]
    fn outcome_messages() {
        let report = |outcome| RoundReport {
            round_id: 1,
            outcome,
            cumulative_score: 12,
            new_high_score: false,
        };
        assert_eq!(
            outcome_message(&report(GuessOutcome::TooHigh {
                attempts_remaining: 3
            })),
            "Too high! Attempts left: 3"
        );
        assert_eq!(
            outcome_message(&report(GuessOutcome::Lost { target: 17 })),
            "❌ Game Over! The number was 17. Your total score: 12."
        );
    }

    #[test]
    fn preselected_difficulty_is_saved_when_quitting_from_name_prompt() {
        let (tx, _rx) = mpsc::channel();
        let controller = SessionController::new(
            ManualCountdown::new(),
            Arc::new(HighScoreStore::in_memory()),
            tx,
        );
        let mut app = App::new(controller, Difficulty::Hard);
        assert_eq!(app.controller.difficulty(), Difficulty::Hard);

        assert_eq!(press(&mut app, KeyCode::Esc), AppAction::Quit);
        let saved = app.preferences(&Config::default());
        assert_eq!(saved.difficulty, Difficulty::Hard);
        assert_eq!(saved.player_name, None);
    }

    #[test]
    fn selector_change_after_exit_is_saved() {
        let (mut app, _rx) = app();
        start(&mut app);
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.screen, Screen::NameEntry);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.difficulty, Difficulty::Medium);
        assert_eq!(app.controller.difficulty(), Difficulty::Medium);

        let previous = Config {
            player_name: Some("Bob".to_string()),
            difficulty: Difficulty::Hard,
        };
        let saved = app.preferences(&previous);
        assert_eq!(saved.difficulty, Difficulty::Medium);
        assert_eq!(saved.player_name.as_deref(), Some("Alice"));
    }
}
