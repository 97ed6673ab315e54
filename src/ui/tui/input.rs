use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::UiAction;
use crate::ui::{AppState, InputMode, Page};

/// Handle keyboard events for TUI, returning actions for the UI manager
pub fn handle_key_event(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    if key_event.kind == KeyEventKind::Release {
        return UiAction::None;
    }

    // Global shortcuts first
    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') | KeyCode::Char('d') = key_event.code {
            app.should_quit = true;
            return UiAction::QuitRequested;
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode_keys(app, key_event),
        InputMode::Command => handle_command_mode_keys(app, key_event),
        InputMode::Detail => handle_detail_mode_keys(app, key_event),
    }
}

fn handle_normal_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            UiAction::QuitRequested
        }
        KeyCode::Char('/') | KeyCode::Char(':') => {
            let preset = if matches!(key_event.code, KeyCode::Char('/')) {
                Some("/")
            } else {
                None
            };
            app.activate_command_mode(preset);
            UiAction::None
        }
        KeyCode::Tab | KeyCode::Right => {
            app.next_page();
            UiAction::None
        }
        KeyCode::BackTab | KeyCode::Left => {
            app.previous_page();
            UiAction::None
        }
        KeyCode::Char(c @ '1'..='5') => {
            let index = usize::from(c as u8 - b'1');
            app.show_page(Page::ALL[index]);
            UiAction::None
        }
        KeyCode::Up => {
            app.select_previous();
            UiAction::None
        }
        KeyCode::Down => {
            app.select_next();
            UiAction::None
        }
        KeyCode::Char('k') => {
            app.scroll_logs_up();
            UiAction::None
        }
        KeyCode::Char('j') => {
            app.scroll_logs_down();
            UiAction::None
        }
        KeyCode::Char('r') => {
            let command = match app.page {
                Page::Ai => "/refresh ai",
                _ => "/refresh",
            };
            UiAction::SubmitCommand(command.to_string())
        }
        KeyCode::Enter => UiAction::OpenDetail,
        _ => UiAction::None,
    }
}

fn handle_command_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.clear_command();
            app.reset_command_suggestions();
            UiAction::None
        }
        KeyCode::Enter => {
            let command = app.command_buffer.trim().to_string();
            app.input_mode = InputMode::Normal;
            app.clear_command();
            app.reset_command_suggestions();
            if command.is_empty() {
                UiAction::None
            } else {
                UiAction::SubmitCommand(command)
            }
        }
        KeyCode::Backspace => {
            app.command_buffer.pop();
            app.update_command_suggestions();
            UiAction::None
        }
        KeyCode::Up => {
            app.select_previous_suggestion();
            UiAction::None
        }
        KeyCode::Down => {
            app.select_next_suggestion();
            UiAction::None
        }
        KeyCode::Tab => {
            app.apply_selected_suggestion();
            UiAction::None
        }
        KeyCode::Char(c) => {
            if !key_event.modifiers.contains(KeyModifiers::CONTROL) {
                app.command_buffer.push(c);
                app.update_command_suggestions();
            }
            UiAction::None
        }
        _ => UiAction::None,
    }
}

fn handle_detail_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Esc | KeyCode::Char('q') => UiAction::CloseDetail,
        KeyCode::Char('r') => match app.detail.as_mut().and_then(|d| d.begin_reanalysis()) {
            Some(ticker) => UiAction::Reanalyze(ticker),
            None => UiAction::None,
        },
        KeyCode::Char('k') => {
            app.scroll_logs_up();
            UiAction::None
        }
        KeyCode::Char('j') => {
            app.scroll_logs_down();
            UiAction::None
        }
        _ => UiAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::detail::ReanalysisState;
    use crossterm::event::KeyEventState;
    use serde_json::json;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_command_entry_submits_trimmed_input() {
        let mut app = AppState::new(&Config::default());
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        assert_eq!(app.input_mode, InputMode::Command);

        for c in "page macro ".chars() {
            handle_key_event(&mut app, press(KeyCode::Char(c)));
        }
        let action = handle_key_event(&mut app, press(KeyCode::Enter));
        assert_eq!(action, UiAction::SubmitCommand("/page macro".to_string()));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_number_keys_switch_page() {
        let mut app = AppState::new(&Config::default());
        handle_key_event(&mut app, press(KeyCode::Char('5')));
        assert_eq!(app.page, Page::Jongga);
    }

    #[test]
    fn test_reanalyze_only_once_while_running() {
        let mut app = AppState::new(&Config::default());
        let signal = serde_json::from_value(json!({"ticker": "005930", "name": "Samsung"})).unwrap();
        app.open_detail(signal);

        let first = handle_key_event(&mut app, press(KeyCode::Char('r')));
        assert_eq!(first, UiAction::Reanalyze("005930".to_string()));
        let second = handle_key_event(&mut app, press(KeyCode::Char('r')));
        assert_eq!(second, UiAction::None);
        assert_eq!(
            app.detail.as_ref().map(|d| d.reanalysis().clone()),
            Some(ReanalysisState::Running)
        );

        let close = handle_key_event(&mut app, press(KeyCode::Esc));
        assert_eq!(close, UiAction::CloseDetail);
    }
}
