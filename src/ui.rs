pub mod breakdown;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use levelcheck::{
    placement::NextState,
    question::Question,
    result::TestResult,
    session::View,
    CefrLevel,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Rows a block of text needs when wrapped at `width` columns
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    text.lines()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum::<usize>() as u16
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::NamePrompt => render_name_prompt(self, area, buf),
            AppState::Test => match self.session.view() {
                View::NoContent => render_notice(
                    "No questions available yet. Add content to the A1 bank and try again.",
                    "(q)uit",
                    area,
                    buf,
                ),
                View::Exited => render_notice("Test abandoned.", "", area, buf),
                View::Finished => render_notice("Test complete.", "(enter) results", area, buf),
                View::Question | View::Feedback(_) => render_question(self, area, buf),
            },
            AppState::Results | AppState::Breakdown => match self.session.result() {
                Some(result) => render_results(self, result, area, buf),
                None => render_notice("No result to show.", "(q)uit", area, buf),
            },
        }
    }
}

fn render_notice(message: &str, legend: &str, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    Paragraph::new(Span::styled(message.to_string(), bold().fg(Color::Yellow)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);
    Paragraph::new(Span::styled(legend.to_string(), italic())).render(chunks[1], buf);
}

fn render_name_prompt(app: &App, area: Rect, buf: &mut Buffer) {
    let half = area.height.saturating_sub(3) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(half),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Span::styled("What is your name?", bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let input = Line::from(vec![
        Span::styled(app.name_input.clone(), bold().fg(Color::Green)),
        Span::styled("_", dim().add_modifier(Modifier::SLOW_BLINK)),
    ]);
    Paragraph::new(input)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled("(enter) start / (esc)ape", italic())).render(chunks[4], buf);
}

fn status_line(app: &App) -> Line<'static> {
    let test = app.session.test();
    let level = test.current_level();
    let mut spans = vec![
        Span::styled(format!("Level {level}"), bold().fg(Color::Cyan)),
        Span::styled(
            format!(
                "   question {}/{}",
                test.question_number(),
                test.level_question_count()
            ),
            dim(),
        ),
    ];
    let left = test.mistakes_left();
    let color = if left <= 1 { Color::Red } else { Color::Yellow };
    spans.push(Span::styled(format!("   mistakes left: {left}"), Style::default().fg(color)));
    if !app.session.learner().is_empty() {
        spans.push(Span::styled(format!("   {}", app.session.learner()), italic()));
    }
    Line::from(spans)
}

fn option_lines<'a>(question: &'a Question, view: &View, selected: usize) -> Vec<Line<'a>> {
    let outcome = match view {
        View::Feedback(outcome) => Some(outcome),
        _ => None,
    };
    let answer = question.answer_index();
    question
        .options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let label = format!(" {}. {option}", idx + 1);
            let style = match outcome {
                Some(_) if Some(idx) == answer => bold().fg(Color::Green),
                Some(_) if idx == selected => bold().fg(Color::Red),
                Some(_) => dim(),
                None if idx == selected => bold().fg(Color::Magenta),
                None => Style::default(),
            };
            let marker = if idx == selected { "▸" } else { " " };
            Line::from(vec![Span::styled(marker, style), Span::styled(label, style)])
        })
        .collect()
}

fn feedback_line(view: &View) -> Line<'static> {
    let View::Feedback(outcome) = view else {
        return Line::from("");
    };
    let verdict = if outcome.is_correct {
        Span::styled("Correct!", bold().fg(Color::Green))
    } else {
        Span::styled(
            format!("Not quite. The answer is \"{}\".", outcome.correct_answer),
            bold().fg(Color::Red),
        )
    };
    let after = match outcome.next {
        NextState::NextQuestion => Span::raw(""),
        NextState::LevelComplete => Span::styled(
            format!("   Level {} passed!", outcome.level),
            bold().fg(Color::Cyan),
        ),
        NextState::LevelFailed => Span::styled(
            format!("   Mistake limit reached at {}.", outcome.level),
            bold().fg(Color::Yellow),
        ),
    };
    Line::from(vec![verdict, after])
}

fn render_question(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(question) = app.session.question() else {
        return;
    };
    let view = app.session.view();
    let width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2);

    let context_height = question
        .context
        .as_deref()
        .map(|c| wrapped_height(c, width) + 1)
        .unwrap_or(0);
    let banner_height = u16::from(app.session.entered_level().is_some());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),                                        // status
            Constraint::Length(banner_height),                            // new level
            Constraint::Length(1),                                        // padding
            Constraint::Length(wrapped_height(&question.instruction, width)), // instruction
            Constraint::Length(context_height),                           // context
            Constraint::Length(question.options.len() as u16 + 1),        // options
            Constraint::Length(1),                                        // feedback
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(status_line(app)).render(chunks[0], buf);

    if let Some(level) = app.session.entered_level() {
        Paragraph::new(Span::styled(
            level_banner(level),
            italic().fg(Color::Cyan),
        ))
        .render(chunks[1], buf);
    }

    Paragraph::new(Span::styled(question.instruction.clone(), bold()))
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    if let Some(context) = &question.context {
        Paragraph::new(context.as_str())
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: false })
            .render(chunks[4], buf);
    }

    Paragraph::new(option_lines(question, view, app.session.selected())).render(chunks[5], buf);
    Paragraph::new(feedback_line(view)).render(chunks[6], buf);

    let legend = match view {
        View::Feedback(_) => "(enter) continue / (esc)ape",
        _ => "(↑/↓) choose / (1-9) answer / (enter) submit / (esc)ape",
    };
    Paragraph::new(Span::styled(legend, italic())).render(chunks[8], buf);
}

fn level_banner(level: CefrLevel) -> String {
    if level == CefrLevel::first() {
        format!("Starting at {level}. Answer carefully, each level allows only a few mistakes.")
    } else {
        format!("Welcome to {level}!")
    }
}

fn render_results(app: &App, result: &TestResult, area: Rect, buf: &mut Buffer) {
    let advice = app
        .session
        .analysis()
        .map(|a| a.advice.clone())
        .unwrap_or_default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),                          // headline
            Constraint::Length(1),                          // vocab
            Constraint::Length(1),                          // stopped at
            Constraint::Length(1),                          // padding
            Constraint::Length(result.levels.len() as u16), // per level
            Constraint::Length(1),                          // padding
            Constraint::Min(1),                             // advice
            Constraint::Length(1),                          // best
            Constraint::Length(1),                          // legend
        ])
        .split(area);

    let headline = if app.session.learner().is_empty() {
        format!("Your level: {}", result.final_level)
    } else {
        format!("{}, your level: {}", app.session.learner(), result.final_level)
    };
    Paragraph::new(Span::styled(headline, bold().fg(Color::Green)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!("Estimated vocabulary: {}", result.estimated_vocab),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    if let Some(failed) = result.failed_level {
        Paragraph::new(Span::styled(
            format!("Stopped at {failed}"),
            Style::default().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    let rows: Vec<Line> = result
        .levels
        .iter()
        .map(|(level, perf)| {
            let passed = Some(*level) != result.failed_level;
            let style = if passed {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            Line::from(vec![
                Span::styled(format!("{:<4}", level.to_string()), bold()),
                Span::styled(format!("{}", perf.tally()), style),
                Span::styled(format!("  ({:.0}%)", perf.percent()), dim()),
            ])
        })
        .collect();
    Paragraph::new(rows)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    let advice_lines: Vec<Line> = advice
        .iter()
        .map(|a| Line::from(Span::styled(format!("• {a}"), Style::default().fg(Color::Cyan))))
        .collect();
    Paragraph::new(advice_lines)
        .wrap(Wrap { trim: true })
        .render(chunks[6], buf);

    let best = if app.session.is_new_best() {
        Span::styled("New personal best saved!", bold().fg(Color::Magenta))
    } else {
        match app.session.best_result() {
            Some(best) => Span::styled(
                format!("Personal best: {} ({})", best.final_level, best.estimated_vocab),
                italic().fg(Color::Gray),
            ),
            None => Span::raw(""),
        }
    };
    Paragraph::new(best)
        .alignment(Alignment::Center)
        .render(chunks[7], buf);

    Paragraph::new(Span::styled(
        "(r)etake / (b)reakdown / (q)uit",
        italic(),
    ))
    .render(chunks[8], buf);
}
