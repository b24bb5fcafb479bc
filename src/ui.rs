use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::app::{App, Screen};
use crate::celebration::{CelebrationAnimation, BANNER};
use crate::difficulty::Difficulty;
use crate::session::SessionPhase;
use crate::timer::Countdown;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

const CONFETTI_COLORS: [Color; 5] = [
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
    Color::Green,
    Color::Red,
];

impl<C: Countdown> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        render_header(self, chunks[0], buf);

        match self.screen {
            Screen::NameEntry => render_name_entry(self, chunks[1], buf),
            Screen::Playing => render_playing(self, chunks[1], buf),
            Screen::ConfirmExit => {
                render_playing(self, chunks[1], buf);
                render_confirm_exit(area, buf);
            }
        }

        if self.celebration.is_active {
            render_confetti(&self.celebration, area, buf);
        }
    }
}

fn high_score_line<C: Countdown>(app: &App<C>) -> String {
    let record = &app.high_score;
    if record.score == 0 {
        "🏆 High Score: none yet".to_string()
    } else {
        format!("🏆 High Score: {} by {}", record.score, record.name)
    }
}

/// Title on the left, wall clock on the right
fn render_header<C: Countdown>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let title_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    Paragraph::new(Span::styled(" 🎯 guessr", title_style)).render(area, buf);

    let clock = Local::now().format("%H:%M:%S ").to_string();
    Paragraph::new(Span::styled(clock, Style::default().add_modifier(Modifier::DIM)))
        .alignment(Alignment::Right)
        .render(area, buf);

    Paragraph::new(Span::raw(high_score_line(app)))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn difficulty_selector(selected: Difficulty) -> Line<'static> {
    let mut spans = vec![Span::raw("Difficulty: ")];
    for difficulty in Difficulty::ALL {
        let label = format!(" {} ", difficulty);
        if difficulty == selected {
            spans.push(Span::styled(
                label,
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(label, Style::default().add_modifier(Modifier::DIM)));
        }
    }
    Line::from(spans)
}

fn render_name_entry<C: Countdown>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3), // name box
            Constraint::Length(2), // difficulty
            Constraint::Length(2), // message
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::raw(app.name_input.clone()),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled("Enter your name", bold)),
    )
    .render(chunks[1], buf);

    Paragraph::new(difficulty_selector(app.difficulty))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        app.message.clone(),
        Style::default().fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(enter) start / (tab) difficulty / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}

fn render_playing<C: Countdown>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let controller = &app.controller;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim_bold = bold.add_modifier(Modifier::DIM);
    let resolved = controller.phase() == SessionPhase::RoundResolved;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // player + score
            Constraint::Length(1), // difficulty
            Constraint::Min(0),
            Constraint::Length(1), // timer
            Constraint::Length(1), // attempts
            Constraint::Length(1),
            Constraint::Length(3), // message
            Constraint::Length(3), // input
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::styled(controller.player_name().to_string(), bold.fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(format!("Score: {}", controller.cumulative_score()), bold),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let profile = controller
        .round()
        .map(|r| *r.profile())
        .unwrap_or_else(|| controller.profile());
    Paragraph::new(Span::styled(
        format!(
            "{} · {} to {} · {} attempts · {}s",
            controller.difficulty(),
            profile.low,
            profile.high,
            profile.attempts,
            profile.time_limit_secs
        ),
        dim_bold,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    if let Some(seconds) = controller.seconds_left() {
        let style = if seconds <= 5 && !resolved {
            bold.fg(Color::Red)
        } else {
            bold
        };
        Paragraph::new(Span::styled(format!("⏳ Time left: {}s", seconds), style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }

    if let Some(round) = controller.round() {
        Paragraph::new(Span::styled(
            format!("Attempts left: {}", round.attempts_remaining()),
            dim_bold,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(app.message.clone(), bold))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[6], buf);

    let input = if resolved {
        Paragraph::new(Span::styled(
            format!(
                "Play Again (enter) · next round: {} (tab)",
                controller.difficulty()
            ),
            bold.fg(Color::Green),
        ))
    } else {
        Paragraph::new(Line::from(vec![
            Span::raw(app.guess_input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
    };
    input
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Guess"))
        .render(centered(chunks[7], 56), buf);

    Paragraph::new(Span::styled(
        "(enter) guess / (esc) exit",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[9], buf);
}

fn render_confirm_exit(area: Rect, buf: &mut Buffer) {
    let popup = centered(
        Rect {
            y: area.y + area.height.saturating_sub(5) / 2,
            height: area.height.min(5),
            ..area
        },
        50,
    );
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from("Are you sure you want to exit the game?"),
        Line::from(Span::styled(
            "(y)es / (n)o",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title("Exit"),
    )
    .render(popup, buf);
}

/// Horizontally centered slice of `area`, at most `width` wide
fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

/// Draw confetti and the banner on top of whatever is already rendered
fn render_confetti(celebration: &CelebrationAnimation, area: Rect, buf: &mut Buffer) {
    for piece in &celebration.pieces {
        if piece.x < 0.0 || piece.y < 0.0 {
            continue;
        }
        let (x, y) = (piece.x as u16, piece.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }
        let color = CONFETTI_COLORS[piece.color_index % CONFETTI_COLORS.len()];
        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_char(piece.symbol);
            cell.set_style(Style::default().fg(color));
        }
    }

    let banner_area = Rect {
        y: area.y + area.height / 3,
        height: area.height.min(1),
        ..area
    };
    Paragraph::new(Span::styled(
        BANNER,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
    ))
    .alignment(Alignment::Center)
    .render(banner_area, buf);
}
