use crate::ui::{App, ToastLevel};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use linefix_core::SurfaceMessage;

/// Work the runtime must start in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send an apply request to the fix host.
    Dispatch(SurfaceMessage),
    /// Run the analysis again over the same region.
    Reanalyze,
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            None
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.navigate_down();
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.navigate_up();
            None
        }
        KeyCode::Home | KeyCode::Char('g') => {
            app.select_first();
            None
        }
        KeyCode::End | KeyCode::Char('G') => {
            app.select_last();
            None
        }
        KeyCode::Enter | KeyCode::Char('f') => app.request_apply_selected().map(Action::Dispatch),
        KeyCode::Char('r') => {
            if app.loading {
                app.show_toast("Analysis already running", ToastLevel::Info);
                return None;
            }
            app.start_loading();
            Some(Action::Reanalyze)
        }
        _ => None,
    }
}
