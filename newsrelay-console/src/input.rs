use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Parse the command line and run it through the relay service
    Submit,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Backspace, Char, Enter, Esc};

    let control = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global quit shortcuts
    if control && matches!(key.code, Char('c' | 'q')) {
        return Action::Quit;
    }

    match key.code {
        Char(character) => {
            if !control && !key.modifiers.contains(KeyModifiers::ALT) {
                app.input.push(character);
            }
        }
        Backspace => {
            app.input.pop();
        }
        Esc => {
            app.input.clear();
            app.error_message = None;
        }
        Enter => {
            if !app.input.trim().is_empty() {
                return Action::Submit;
            }
        }
        _ => {}
    }
    Action::None
}
