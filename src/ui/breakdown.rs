use std::collections::BTreeMap;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use levelcheck::{
    analysis::{analyze, PerformanceAnalysis, STRONG_PERCENT, WEAKNESS_PERCENT},
    question::QuestionType,
    result::TypeTally,
    stats::TestRecord,
};

use crate::App;

const RECENT_TESTS: usize = 5;

pub struct SkillRowData {
    pub question_type: QuestionType,
    /// Absent when the skill was not asked in this test
    pub this_test: Option<TypeTally>,
    /// Every recorded answer, this test included
    pub lifetime: Option<TypeTally>,
}

fn percent_color(percent: f64) -> Color {
    if percent >= STRONG_PERCENT {
        Color::Green
    } else if percent >= WEAKNESS_PERCENT {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn tally_cell(tally: Option<TypeTally>) -> Cell<'static> {
    match tally {
        Some(t) if t.total > 0 => Cell::from(format!("{t}  {:.0}%", t.percent()))
            .style(Style::default().fg(percent_color(t.percent()))),
        _ => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
    }
}

/// Pure presenter for one skill row
pub fn present_row(data: &SkillRowData) -> Row<'static> {
    let trend = match (data.this_test, data.lifetime) {
        (Some(now), Some(all)) if now.total > 0 && all.total > now.total => {
            let delta = now.percent() - all.percent();
            if delta.abs() < 1.0 {
                String::new()
            } else if delta < 0.0 {
                format!("↓{:.0}", delta.abs())
            } else {
                format!("↑{delta:.0}")
            }
        }
        _ => String::new(),
    };
    let trend_style = if trend.starts_with('↑') {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };

    Row::new(vec![
        Cell::from(data.question_type.skill_name())
            .style(Style::default().add_modifier(Modifier::BOLD)),
        tally_cell(data.this_test),
        tally_cell(data.lifetime),
        Cell::from(trend).style(trend_style),
    ])
}

/// Weakest skills of this test first, then skills only seen in earlier tests
pub fn skill_rows(
    ranked: &[(QuestionType, TypeTally)],
    lifetime: &BTreeMap<QuestionType, TypeTally>,
) -> Vec<SkillRowData> {
    let mut rows: Vec<SkillRowData> = ranked
        .iter()
        .map(|(question_type, tally)| SkillRowData {
            question_type: *question_type,
            this_test: Some(*tally),
            lifetime: lifetime.get(question_type).copied(),
        })
        .collect();
    rows.extend(
        lifetime
            .iter()
            .filter(|(question_type, _)| !ranked.iter().any(|(t, _)| t == *question_type))
            .map(|(question_type, tally)| SkillRowData {
                question_type: *question_type,
                this_test: None,
                lifetime: Some(*tally),
            }),
    );
    rows
}

fn history_line(record: &TestRecord) -> String {
    let stopped = record
        .failed_level
        .map(|l| format!(", stopped at {l}"))
        .unwrap_or_default();
    format!(
        "{}  {}  {}{stopped}",
        record.completed_at.format("%Y-%m-%d %H:%M"),
        record.final_level,
        TypeTally {
            correct: record.correct,
            total: record.total,
        },
    )
}

/// Names the skills below the weakness threshold, weakest first
fn breakdown_title(analysis: Option<&PerformanceAnalysis>) -> String {
    let weak: Vec<&str> = analysis
        .map(|a| a.weaknesses().map(|s| s.question_type.skill_name()).collect())
        .unwrap_or_default();
    if weak.is_empty() {
        "Skill Breakdown".to_string()
    } else {
        format!("Skill Breakdown (practise: {})", weak.join(", "))
    }
}

/// Render the per-skill breakdown screen
pub fn render_breakdown(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),                        // title
            Constraint::Min(0),                           // skills table
            Constraint::Length(RECENT_TESTS as u16 + 2), // history
            Constraint::Length(2),                        // instructions
        ])
        .split(area);

    let title = Paragraph::new(breakdown_title(app.session.analysis()))
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let ranked: Vec<(QuestionType, TypeTally)> = app
        .session
        .analysis()
        .map(|a| a.skills.iter().map(|s| (s.question_type, s.tally)).collect())
        .unwrap_or_default();
    let lifetime: BTreeMap<QuestionType, TypeTally> = app
        .session
        .stats_db()
        .and_then(|db| db.type_summary().ok())
        .map(|summary| summary.into_iter().collect())
        .unwrap_or_default();
    let rows = skill_rows(&ranked, &lifetime);

    if rows.is_empty() {
        let no_data = Paragraph::new("No answers recorded yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = rows.len().saturating_sub(table_height);
        if app.breakdown_scroll > max_scroll {
            app.breakdown_scroll = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Skill"),
            Cell::from("This test"),
            Cell::from("All time"),
            Cell::from("Trend"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible: Vec<Row> = rows
            .iter()
            .skip(app.breakdown_scroll)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Length(24),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Min(6),
        ];
        let table = Table::new(visible, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Skills"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let history: Vec<String> = app
        .session
        .stats_db()
        .and_then(|db| db.recent_tests(RECENT_TESTS).ok())
        .unwrap_or_default()
        .iter()
        .map(history_line)
        .collect();
    let history = if history.is_empty() {
        "History is not being recorded.".to_string()
    } else {
        history.join("\n")
    };
    f.render_widget(
        Paragraph::new(history)
            .block(Block::default().borders(Borders::ALL).title("Recent tests"))
            .style(Style::default().fg(Color::Gray)),
        chunks[2],
    );

    let instructions = Paragraph::new("(↑/↓) scroll  (Home) top  (b/backspace) back  (q) quit")
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[3]);
}
