use ratatui::Frame;

use crate::{ui::breakdown::render_breakdown, App, AppState};

/// A UI screen boundary
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Name prompt, questions and results all draw through the App widget
pub struct MainScreen;

impl Screen for MainScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct BreakdownScreen;

impl Screen for BreakdownScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_breakdown(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::NamePrompt | AppState::Test | AppState::Results => Box::new(MainScreen),
        AppState::Breakdown => Box::new(BreakdownScreen),
    }
}
