//! TUI reducer.
//!
//! Turns key presses into auth events, feeds them to the shared auth
//! reducer and returns the effects for the runtime to run. No I/O here.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use gatehouse_core::auth::{self, AuthEvent, Tab};
use gatehouse_core::media::{ImageSlot, normalize_input_path};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AppState, Focus, PathPrompt, REDIRECT_DELAY};

pub fn update(app: &mut AppState, event: UiEvent, now: Instant) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            let mut effects = dispatch_auth(app, AuthEvent::Tick, now);
            if app.exit_at.is_some_and(|at| now >= at) {
                effects.extend(quit(app, now));
            }
            effects
        }
        UiEvent::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            handle_key(app, key, now)
        }
        UiEvent::Terminal(Event::Paste(text)) => handle_paste(app, &text, now),
        UiEvent::Terminal(_) => vec![],
        UiEvent::Auth(event) => dispatch_auth(app, event, now),
    }
}

/// Runs the auth reducer and keeps TUI-only state in step with it.
fn dispatch_auth(app: &mut AppState, event: AuthEvent, now: Instant) -> Vec<UiEffect> {
    let tab = app.auth.tab;
    let effects = auth::update(&mut app.auth, event, now);

    if app.auth.tab != tab {
        app.focus = Focus::initial(app.auth.tab);
        app.prompt = None;
    }
    if app.auth.phase.is_done() && app.exit_at.is_none() {
        app.exit_at = Some(now + REDIRECT_DELAY);
    }

    effects.into_iter().map(UiEffect::from).collect()
}

fn quit(app: &mut AppState, now: Instant) -> Vec<UiEffect> {
    app.prompt = None;
    let mut effects = dispatch_auth(app, AuthEvent::Unmount, now);
    effects.push(UiEffect::Quit);
    effects
}

// ============================================================================
// Keys
// ============================================================================

fn handle_key(app: &mut AppState, key: KeyEvent, now: Instant) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        return quit(app, now);
    }
    if app.prompt.is_some() {
        return handle_prompt_key(app, key);
    }

    match key.code {
        KeyCode::Esc => quit(app, now),
        KeyCode::Tab | KeyCode::Down => {
            app.move_focus(1);
            vec![]
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.move_focus(-1);
            vec![]
        }
        KeyCode::F(1) => switch_tab(app, Tab::SignIn, now),
        KeyCode::F(2) => switch_tab(app, Tab::SignUp, now),
        KeyCode::Char('t') if ctrl => {
            let other = app.auth.tab.other();
            switch_tab(app, other, now)
        }
        KeyCode::Char('r') if ctrl => {
            dispatch_auth(app, AuthEvent::TogglePasswordVisibility, now)
        }
        KeyCode::Char('a') if ctrl => open_prompt(app, ImageSlot::Avatar),
        KeyCode::Char('o') if ctrl => open_prompt(app, ImageSlot::Cover),
        KeyCode::Char('x') if ctrl => remove_focused_image(app, now),
        KeyCode::Delete => remove_focused_image(app, now),
        KeyCode::Enter => activate(app, now),
        KeyCode::Backspace => edit_focused(app, now, |value| {
            value.pop();
        }),
        KeyCode::Char(c) if !ctrl => edit_focused(app, now, |value| value.push(c)),
        _ => vec![],
    }
}

fn handle_prompt_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let Some(prompt) = app.prompt.as_mut() else {
        return vec![];
    };
    match key.code {
        KeyCode::Esc => {
            app.prompt = None;
            vec![]
        }
        KeyCode::Enter => {
            let Some(prompt) = app.prompt.take() else {
                return vec![];
            };
            if prompt.buffer.trim().is_empty() {
                return vec![];
            }
            vec![UiEffect::LoadImage {
                slot: prompt.slot,
                path: normalize_input_path(&prompt.buffer),
            }]
        }
        KeyCode::Backspace => {
            prompt.buffer.pop();
            vec![]
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            prompt.buffer.push(c);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_paste(app: &mut AppState, text: &str, now: Instant) -> Vec<UiEffect> {
    let text: String = text.chars().filter(|c| !c.is_control()).collect();
    if let Some(prompt) = app.prompt.as_mut() {
        prompt.buffer.push_str(&text);
        return vec![];
    }
    edit_focused(app, now, |value| value.push_str(&text))
}

// ============================================================================
// Actions
// ============================================================================

fn switch_tab(app: &mut AppState, tab: Tab, now: Instant) -> Vec<UiEffect> {
    if !app.is_editable() {
        return vec![];
    }
    dispatch_auth(app, AuthEvent::SwitchTab(tab), now)
}

/// Enter on the focused control.
fn activate(app: &mut AppState, now: Instant) -> Vec<UiEffect> {
    match app.focus {
        Focus::Field(field) => {
            let is_last = app.auth.tab.fields().last() == Some(&field);
            if is_last {
                dispatch_auth(app, AuthEvent::Submit, now)
            } else {
                app.move_focus(1);
                vec![]
            }
        }
        Focus::OAuth(provider) => {
            if !app.is_editable() {
                return vec![];
            }
            dispatch_auth(app, AuthEvent::OAuth(provider), now)
        }
        Focus::Image(slot) => open_prompt(app, slot),
        Focus::Submit => dispatch_auth(app, AuthEvent::Submit, now),
        Focus::SwitchTab => {
            let other = app.auth.tab.other();
            switch_tab(app, other, now)
        }
    }
}

fn open_prompt(app: &mut AppState, slot: ImageSlot) -> Vec<UiEffect> {
    if app.auth.tab == Tab::SignUp && app.is_editable() {
        app.focus = Focus::Image(slot);
        app.prompt = Some(PathPrompt::new(slot));
    }
    vec![]
}

fn remove_focused_image(app: &mut AppState, now: Instant) -> Vec<UiEffect> {
    match app.focus {
        Focus::Image(slot) if app.auth.image(slot).is_some() => {
            dispatch_auth(app, AuthEvent::ImageRemoved(slot), now)
        }
        _ => vec![],
    }
}

fn edit_focused<F>(app: &mut AppState, now: Instant, edit: F) -> Vec<UiEffect>
where
    F: FnOnce(&mut String),
{
    let Focus::Field(field) = app.focus else {
        return vec![];
    };
    if !app.is_editable() {
        return vec![];
    }
    let mut value = app.auth.field_value(field).to_string();
    edit(&mut value);
    dispatch_auth(app, AuthEvent::Input { field, value }, now)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gatehouse_core::auth::{AuthEffect, Authenticated, BackendTask, Phase};
    use gatehouse_core::config::Routes;
    use gatehouse_core::validation::Field;
    use gatehouse_types::SessionUser;

    use super::*;

    fn app() -> AppState {
        AppState::new(
            Routes {
                landing_url: "http://localhost:3000/".to_string(),
                auth_url: "http://localhost:3000/start".to_string(),
            },
            Instant::now(),
        )
    }

    fn press(app: &mut AppState, code: KeyCode) -> Vec<UiEffect> {
        let key = KeyEvent::new(code, KeyModifiers::NONE);
        update(app, UiEvent::Terminal(Event::Key(key)), Instant::now())
    }

    fn ctrl(app: &mut AppState, c: char) -> Vec<UiEffect> {
        let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        update(app, UiEvent::Terminal(Event::Key(key)), Instant::now())
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_edits_focused_field() {
        let mut app = app();
        type_text(&mut app, "ada@example.comx");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.auth.field_value(Field::Email), "ada@example.com");
        assert_eq!(app.auth.field_error(Field::Email), None);
    }

    #[test]
    fn test_enter_on_last_field_submits_valid_form() {
        let mut app = app();
        type_text(&mut app, "ada@example.com");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.focus, Focus::Field(Field::Password));
        type_text(&mut app, "Abcdefg1");

        let effects = press(&mut app, KeyCode::Enter);
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::Auth(AuthEffect::Backend(BackendTask::SignIn { .. }))]
        ));
        assert_eq!(app.auth.phase, Phase::Submitting);
    }

    #[test]
    fn test_invalid_submit_reveals_errors() {
        let mut app = app();
        app.focus = Focus::Submit;
        let effects = press(&mut app, KeyCode::Enter);
        assert!(effects.is_empty());
        assert_eq!(
            app.auth.field_error(Field::Password),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_tab_switch_moves_focus_to_first_field() {
        let mut app = app();
        type_text(&mut app, "ada@example.com");
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.auth.tab, Tab::SignUp);
        assert_eq!(app.focus, Focus::Field(Field::Username));
        assert_eq!(app.auth.field_value(Field::Email), "");
    }

    #[test]
    fn test_image_prompt_only_on_sign_up() {
        let mut app = app();
        ctrl(&mut app, 'a');
        assert!(app.prompt.is_none());

        press(&mut app, KeyCode::F(2));
        ctrl(&mut app, 'a');
        assert_eq!(app.focus, Focus::Image(ImageSlot::Avatar));
        type_text(&mut app, "'/tmp/me.png'");

        let effects = press(&mut app, KeyCode::Enter);
        let [UiEffect::LoadImage { slot, path }] = effects.as_slice() else {
            panic!("expected a load effect, got {effects:?}");
        };
        assert_eq!(*slot, ImageSlot::Avatar);
        assert_eq!(path, &PathBuf::from("/tmp/me.png"));
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_paste_goes_to_prompt() {
        let mut app = app();
        press(&mut app, KeyCode::F(2));
        ctrl(&mut app, 'o');
        update(
            &mut app,
            UiEvent::Terminal(Event::Paste("/tmp/cover.jpg\n".to_string())),
            Instant::now(),
        );
        assert_eq!(
            app.prompt.as_ref().map(|p| p.buffer.as_str()),
            Some("/tmp/cover.jpg")
        );
    }

    #[test]
    fn test_escape_clears_session_and_quits() {
        let mut app = app();
        let effects = press(&mut app, KeyCode::Esc);
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::Auth(AuthEffect::ClearSession), UiEffect::Quit]
        ));
    }

    #[test]
    fn test_escape_closes_prompt_first() {
        let mut app = app();
        press(&mut app, KeyCode::F(2));
        ctrl(&mut app, 'a');
        let effects = press(&mut app, KeyCode::Esc);
        assert!(effects.is_empty());
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_editing_locked_while_submitting() {
        let mut app = app();
        type_text(&mut app, "ada@example.com");
        app.focus = Focus::Field(Field::Password);
        type_text(&mut app, "Abcdefg1");
        press(&mut app, KeyCode::Enter);

        type_text(&mut app, "zzz");
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.auth.field_value(Field::Password), "Abcdefg1");
        assert_eq!(app.auth.tab, Tab::SignIn);
    }

    #[test]
    fn test_success_quits_after_redirect_delay() {
        let mut app = app();
        let now = Instant::now();
        let user = user();
        update(
            &mut app,
            UiEvent::Auth(AuthEvent::SessionRestored(Some(Authenticated {
                user,
                avatar_url: None,
            }))),
            now,
        );
        assert!(app.exit_at.is_some());

        let early = update(&mut app, UiEvent::Tick, now);
        assert!(!early.iter().any(|e| matches!(e, UiEffect::Quit)));

        let late = update(&mut app, UiEvent::Tick, now + REDIRECT_DELAY);
        assert!(matches!(late.last(), Some(UiEffect::Quit)));
        assert!(!late
            .iter()
            .any(|e| matches!(e, UiEffect::Auth(AuthEffect::ClearSession))));
    }

    fn user() -> SessionUser {
        serde_json::from_value(serde_json::json!({
            "$id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
        }))
        .unwrap()
    }
}
