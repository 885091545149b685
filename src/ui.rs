use keydrill::{
    engine::{RecognitionState, Status},
    platform::Platform,
    session::{Outcome, Session},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

/// Visual state of one key chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    Matched,
    Next,
    Pending,
    Failed,
}

/// Chip states for every target key, derived purely from recognition state.
pub fn chip_states(target_len: usize, state: &RecognitionState) -> Vec<ChipState> {
    (0..target_len)
        .map(|i| match state.status {
            Status::Error => ChipState::Failed,
            Status::Completed => ChipState::Matched,
            Status::Idle | Status::Advancing if i < state.progress => ChipState::Matched,
            Status::Idle | Status::Advancing if i == state.progress => ChipState::Next,
            Status::Idle | Status::Advancing => ChipState::Pending,
        })
        .collect()
}

fn chip_spans(labels: &[String], states: &[ChipState]) -> Vec<Span<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let width = labels.iter().map(|l| l.width()).max().unwrap_or(1);

    let mut spans = Vec::with_capacity(labels.len() * 2);
    for (label, state) in labels.iter().zip(states) {
        let style = match state {
            ChipState::Matched => bold.fg(Color::Black).bg(Color::Green),
            ChipState::Next => bold
                .fg(Color::Yellow)
                .add_modifier(Modifier::UNDERLINED),
            ChipState::Pending => bold.add_modifier(Modifier::DIM),
            ChipState::Failed => bold.fg(Color::White).bg(Color::Red),
        };
        let pad = width.saturating_sub(label.width());
        spans.push(Span::styled(
            format!(" {}{} ", label, " ".repeat(pad)),
            style,
        ));
        spans.push(Span::raw(" "));
    }
    spans.pop();
    spans
}

fn render_drill(session: &Session, app: &App, area: Rect, buf: &mut Buffer) {
    let (Some(def), Some(recognizer)) = (session.current_definition(), session.recognizer())
    else {
        return;
    };
    let platform: Platform = session.config().platform;

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // progress + score
            Constraint::Min(0),
            Constraint::Length(1), // shortcut name
            Constraint::Length(1), // description
            Constraint::Length(1),
            Constraint::Length(1), // chips
            Constraint::Length(1), // feedback
            Constraint::Length(1), // countdown
            Constraint::Min(0),
            Constraint::Length(1), // last result
            Constraint::Length(1), // legend
        ])
        .split(area);

    // a single drill has no score to show
    let header_text = if session.len() == 1 {
        format!("challenge {}/{}", session.index() + 1, session.len())
    } else {
        format!(
            "challenge {}/{}   score {}/{}",
            session.index() + 1,
            session.len(),
            session.score(),
            session.len()
        )
    };
    let header = Paragraph::new(Span::styled(header_text, dim_style))
        .alignment(Alignment::Right);
    header.render(chunks[0], buf);

    Paragraph::new(Span::styled(def.display_name.clone(), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    Paragraph::new(Span::styled(def.description.clone(), italic_style))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let labels: Vec<String> = recognizer
        .target()
        .iter()
        .map(|token| platform.key_label(token))
        .collect();
    let states = chip_states(labels.len(), recognizer.state());
    Paragraph::new(Line::from(chip_spans(&labels, &states)))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    let feedback = match recognizer.status() {
        Status::Error => Span::styled(
            "wrong key, try again",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Status::Completed => Span::styled("nice!", Style::default().fg(Color::Green)),
        Status::Idle | Status::Advancing => {
            Span::styled(def.label(platform).to_string(), dim_style)
        }
    };
    Paragraph::new(feedback)
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    if let Some(remaining) = session.remaining(app.now) {
        let secs = remaining.as_secs_f64();
        let style = if secs < 3.0 {
            bold_style.fg(Color::Red)
        } else {
            bold_style
        };
        Paragraph::new(Span::styled(format!("{secs:.1}"), style))
            .alignment(Alignment::Center)
            .render(chunks[7], buf);
    }

    if let Some(last) = &app.last_attempt {
        let text = match last.outcome {
            Outcome::Completed => format!(
                "{} in {:.2}s",
                last.challenge_id,
                last.elapsed().as_secs_f64()
            ),
            Outcome::TimedOut => format!("{} timed out", last.challenge_id),
        };
        Paragraph::new(Span::styled(text, dim_style))
            .alignment(Alignment::Center)
            .render(chunks[9], buf);
    }

    Paragraph::new(Span::styled("(esc)ape", italic_style)).render(chunks[10], buf);
}

fn render_summary(session: &Session, area: Rect, buf: &mut Buffer) {
    let summary = session.summary();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(3),    // attempts table
            Constraint::Length(1), // score line
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let rows: Vec<Row> = summary
        .attempts
        .iter()
        .map(|attempt| {
            let (outcome, color) = match attempt.outcome {
                Outcome::Completed => ("completed", Color::Green),
                Outcome::TimedOut => ("timed out", Color::Red),
            };
            Row::new(vec![
                Cell::from(attempt.challenge_id.clone()),
                Cell::from(format!("{:.2}s", attempt.elapsed().as_secs_f64())),
                Cell::from(outcome).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Challenge", "Time", "Result"]).style(bold_style.fg(Color::Yellow)),
    )
    .block(Block::default().borders(Borders::ALL).title("Results"));
    table.render(chunks[0], buf);

    let average = summary
        .average_completion()
        .map(|d| format!("avg {:.2}s", d.as_secs_f64()));
    let line = match (summary.max_score, average) {
        (1, Some(average)) => average,
        (1, None) => String::new(),
        (_, Some(average)) => format!("score {}/{}   {}", summary.score, summary.max_score, average),
        (_, None) => format!("score {}/{}", summary.score, summary.max_score),
    };
    Paragraph::new(Span::styled(line, bold_style))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled("(r)etry / (n)ew / (esc)ape", italic_style))
        .render(chunks[3], buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Drilling => render_drill(&self.session, self, area, buf),
            AppState::Summary => render_summary(&self.session, area, buf),
        }
    }
}
