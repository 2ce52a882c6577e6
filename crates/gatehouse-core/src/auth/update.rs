//! Auth reducer.
//!
//! `update` mutates [`AuthView`] and returns the effects the host must run.
//! It never performs I/O.

use std::time::Instant;

use gatehouse_types::OAuthProvider;

use super::effects::{AuthEffect, BackendTask};
use super::events::{Authenticated, AuthEvent, FlowFailure};
use super::signup::SignUpProgress;
use super::state::{AuthView, Phase, Tab, ToastKind};
use crate::media::{ImageSelection, ImageSlot, SelectedFile};
use crate::validation::Field;

pub fn update(view: &mut AuthView, event: AuthEvent, now: Instant) -> Vec<AuthEffect> {
    match event {
        AuthEvent::Mount => {
            let lines = view.tab.humor_lines();
            view.humor.reset(lines, &mut view.rng, now);
            vec![AuthEffect::Backend(BackendTask::RestoreSession)]
        }
        AuthEvent::SessionRestored(restored) => handle_session_restored(view, restored),
        AuthEvent::SwitchTab(tab) => {
            switch_tab(view, tab, now);
            vec![]
        }
        AuthEvent::Input { field, value } => {
            handle_input(view, field, value);
            vec![]
        }
        AuthEvent::TogglePasswordVisibility => {
            view.password_visible = !view.password_visible;
            vec![]
        }
        AuthEvent::ImagePicked { slot, file } => {
            handle_image_picked(view, slot, file, now);
            vec![]
        }
        AuthEvent::ImageRemoved(slot) => {
            if !view.phase.is_submitting() {
                *view.image_slot_mut(slot) = None;
            }
            vec![]
        }
        AuthEvent::SelectionFailed { message } => {
            view.push_toast(ToastKind::Error, message, now);
            vec![]
        }
        AuthEvent::Submit => handle_submit(view),
        AuthEvent::OAuth(provider) => handle_oauth(view, provider, now),
        AuthEvent::OAuthFailed { provider, message } => {
            let message = message.unwrap_or_else(|| {
                format!("Unable to sign in with {provider}. Please try again.")
            });
            view.push_toast(ToastKind::Error, message, now);
            vec![]
        }
        AuthEvent::SignInFinished(result) => handle_sign_in_finished(view, result, now),
        AuthEvent::SignUpFinished { result, progress } => {
            handle_sign_up_finished(view, result, progress, now)
        }
        AuthEvent::Tick => {
            view.humor.tick(&mut view.rng, now);
            view.toasts.retain(|toast| !toast.is_expired(now));
            vec![]
        }
        AuthEvent::Unmount => {
            view.avatar = None;
            view.cover = None;
            if view.phase.is_done() {
                vec![]
            } else {
                vec![AuthEffect::ClearSession]
            }
        }
    }
}

fn handle_session_restored(view: &mut AuthView, restored: Option<Authenticated>) -> Vec<AuthEffect> {
    let Some(auth) = restored else {
        return vec![];
    };
    if !view.phase.is_idle() {
        return vec![];
    }
    complete(view, auth)
}

/// Shared tail of every successful authentication.
fn complete(view: &mut AuthView, auth: Authenticated) -> Vec<AuthEffect> {
    let redirect = view.routes.landing_url.clone();
    view.remote_avatar.clone_from(&auth.avatar_url);
    view.phase = Phase::Success {
        redirect: redirect.clone(),
    };

    vec![
        AuthEffect::InstallSession {
            user: auth.user.clone(),
            avatar_url: auth.avatar_url,
        },
        AuthEffect::PersistUserCookie { user: auth.user },
        AuthEffect::Navigate { url: redirect },
    ]
}

fn switch_tab(view: &mut AuthView, tab: Tab, now: Instant) {
    if view.tab == tab {
        return;
    }
    view.tab = tab;
    view.sign_in.reset();
    view.sign_up.reset();
    view.humor.reset(tab.humor_lines(), &mut view.rng, now);
}

fn handle_input(view: &mut AuthView, field: Field, value: String) {
    if view.phase.is_done() {
        return;
    }
    match view.tab {
        Tab::SignIn => view.sign_in.set(field, value),
        Tab::SignUp => view.sign_up.set(field, value),
    }
}

fn handle_image_picked(view: &mut AuthView, slot: ImageSlot, file: SelectedFile, now: Instant) {
    if view.phase.is_submitting() {
        return;
    }
    match ImageSelection::accept(slot, file, &view.previews) {
        // Replacing drops the previous selection and releases its preview.
        Ok(selection) => *view.image_slot_mut(slot) = Some(selection),
        Err(rejected) => {
            tracing::debug!(?slot, reason = ?rejected.reason, "image rejected");
            view.push_toast(ToastKind::Error, rejected.message(), now);
        }
    }
}

fn handle_submit(view: &mut AuthView) -> Vec<AuthEffect> {
    if !view.phase.is_idle() {
        return vec![];
    }

    match view.tab {
        Tab::SignIn => {
            if !view.sign_in.is_valid() {
                view.sign_in.touch_all();
                return vec![];
            }
            view.phase = Phase::Submitting;
            vec![AuthEffect::Backend(BackendTask::SignIn {
                form: view.sign_in.values.clone(),
            })]
        }
        Tab::SignUp => {
            if !view.sign_up.is_valid() {
                view.sign_up.touch_all();
                return vec![];
            }
            let form = view.sign_up.values.clone();
            let progress = SignUpProgress::resume_or_start(view.progress.take(), &form);
            let avatar = view.avatar.as_ref().map(|selection| selection.file.clone());

            view.loading_image = progress.upload_pending(avatar.is_some());
            view.phase = Phase::Submitting;
            vec![AuthEffect::Backend(BackendTask::SignUp {
                form,
                avatar,
                progress,
            })]
        }
    }
}

fn handle_oauth(view: &mut AuthView, provider: OAuthProvider, now: Instant) -> Vec<AuthEffect> {
    if view.phase.is_done() {
        return vec![];
    }
    view.push_toast(
        ToastKind::Info,
        format!(
            "Continue signing in with {} in your browser",
            provider.display_name()
        ),
        now,
    );
    vec![AuthEffect::OpenOAuth {
        provider,
        success_url: view.routes.landing_url.clone(),
        failure_url: view.routes.auth_url.clone(),
    }]
}

fn handle_sign_in_finished(
    view: &mut AuthView,
    result: Result<Authenticated, FlowFailure>,
    now: Instant,
) -> Vec<AuthEffect> {
    if !view.phase.is_submitting() {
        return vec![];
    }
    match result {
        Ok(auth) => {
            view.push_toast(
                ToastKind::Success,
                format!("Welcome back, {}!", auth.user.display_name()),
                now,
            );
            complete(view, auth)
        }
        Err(failure) => {
            view.phase = Phase::Idle;
            view.push_toast(ToastKind::Error, failure.message, now);
            vec![]
        }
    }
}

fn handle_sign_up_finished(
    view: &mut AuthView,
    result: Result<Authenticated, FlowFailure>,
    progress: SignUpProgress,
    now: Instant,
) -> Vec<AuthEffect> {
    if !view.phase.is_submitting() {
        return vec![];
    }
    view.loading_image = false;

    match result {
        Ok(auth) => {
            view.progress = None;
            view.avatar = None;
            view.cover = None;
            view.push_toast(
                ToastKind::Success,
                format!(
                    "Welcome, {}! Account created successfully.",
                    progress.username
                ),
                now,
            );
            complete(view, auth)
        }
        Err(failure) => {
            view.phase = Phase::Idle;
            view.progress = progress.account_created().then_some(progress);
            view.push_toast(ToastKind::Error, failure.message, now);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gatehouse_types::SessionUser;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use super::*;
    use crate::auth::state::{TOAST_DURATION, Toast};
    use crate::config::Routes;
    use crate::humor::{HUMOR_FADE, HUMOR_LINE_SWITCH_INTERVAL, SIGNUP_HUMOR_LINES};
    use crate::media::PreviewRegistry;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn view() -> (AuthView, Instant) {
        let now = Instant::now();
        let view = AuthView::with_rng(
            Routes {
                landing_url: "http://localhost:3000/".to_string(),
                auth_url: "http://localhost:3000/start".to_string(),
            },
            PreviewRegistry::new(),
            StdRng::seed_from_u64(42),
            now,
        );
        (view, now)
    }

    fn input(view: &mut AuthView, field: Field, value: &str, now: Instant) {
        update(
            view,
            AuthEvent::Input {
                field,
                value: value.to_string(),
            },
            now,
        );
    }

    fn fill_sign_in(view: &mut AuthView, now: Instant) {
        input(view, Field::Email, "ada@example.com", now);
        input(view, Field::Password, "Abcdefg1", now);
    }

    fn fill_sign_up(view: &mut AuthView, now: Instant) {
        update(view, AuthEvent::SwitchTab(Tab::SignUp), now);
        input(view, Field::Username, "ada_l", now);
        input(view, Field::Email, "ada@example.com", now);
        input(view, Field::Password, "Abcdefg1", now);
        input(view, Field::ConfirmPassword, "Abcdefg1", now);
    }

    fn png(len: usize) -> SelectedFile {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(len, 0);
        SelectedFile::from_bytes("me.png", bytes)
    }

    fn authenticated(name: &str) -> Authenticated {
        let user: SessionUser =
            serde_json::from_value(json!({"$id": "u1", "name": name, "email": "ada@example.com"}))
                .unwrap();
        Authenticated {
            user,
            avatar_url: Some("https://backend.test/avatar".to_string()),
        }
    }

    fn last_message(view: &AuthView) -> Option<(ToastKind, &str)> {
        view.last_toast()
            .map(|Toast { kind, message, .. }| (*kind, message.as_str()))
    }

    #[test]
    fn test_mount_requests_session_check() {
        let (mut view, now) = view();
        let effects = update(&mut view, AuthEvent::Mount, now);
        assert!(matches!(
            effects.as_slice(),
            [AuthEffect::Backend(BackendTask::RestoreSession)]
        ));
    }

    #[test]
    fn test_restored_session_installs_and_redirects() {
        let (mut view, now) = view();
        let effects = update(
            &mut view,
            AuthEvent::SessionRestored(Some(authenticated("Ada"))),
            now,
        );

        assert_eq!(
            view.phase,
            Phase::Success {
                redirect: "http://localhost:3000/".to_string()
            }
        );
        assert_eq!(view.remote_avatar.as_deref(), Some("https://backend.test/avatar"));
        assert!(matches!(
            effects.as_slice(),
            [
                AuthEffect::InstallSession { .. },
                AuthEffect::PersistUserCookie { .. },
                AuthEffect::Navigate { url }
            ] if url == "http://localhost:3000/"
        ));
        assert!(view.toasts.is_empty());
    }

    #[test]
    fn test_no_session_on_mount_is_silent() {
        let (mut view, now) = view();
        let effects = update(&mut view, AuthEvent::SessionRestored(None), now);
        assert!(effects.is_empty());
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.toasts.is_empty());
    }

    #[test]
    fn test_switching_tabs_resets_both_forms() {
        let (mut view, now) = view();
        fill_sign_in(&mut view, now);
        assert!(view.can_submit());

        update(&mut view, AuthEvent::SwitchTab(Tab::SignUp), now);
        input(&mut view, Field::Username, "ab", now);
        update(&mut view, AuthEvent::SwitchTab(Tab::SignIn), now);

        assert_eq!(view.sign_in.value(Field::Email), "");
        assert_eq!(view.sign_up.value(Field::Username), "");
        assert_eq!(view.field_error(Field::Email), None);
        assert!(!view.can_submit());
    }

    #[test]
    fn test_switching_tabs_draws_from_new_list() {
        let (mut view, now) = view();
        update(&mut view, AuthEvent::SwitchTab(Tab::SignUp), now);
        assert!(SIGNUP_HUMOR_LINES.contains(&view.humor.current()));
    }

    #[test]
    fn test_switching_tabs_keeps_submission_running() {
        let (mut view, now) = view();
        fill_sign_in(&mut view, now);
        update(&mut view, AuthEvent::Submit, now);
        update(&mut view, AuthEvent::SwitchTab(Tab::SignUp), now);
        assert_eq!(view.phase, Phase::Submitting);
    }

    #[test]
    fn test_invalid_submit_is_refused_and_reveals_errors() {
        let (mut view, now) = view();
        input(&mut view, Field::Email, "ada@example.com", now);

        let effects = update(&mut view, AuthEvent::Submit, now);
        assert!(effects.is_empty());
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(
            view.field_error(Field::Password),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_only_one_submission_in_flight() {
        let (mut view, now) = view();
        fill_sign_in(&mut view, now);

        assert_eq!(update(&mut view, AuthEvent::Submit, now).len(), 1);
        assert!(!view.can_submit());
        assert!(update(&mut view, AuthEvent::Submit, now).is_empty());
    }

    #[test]
    fn test_sign_in_success_greets_and_redirects() {
        let (mut view, now) = view();
        fill_sign_in(&mut view, now);
        update(&mut view, AuthEvent::Submit, now);

        let effects = update(
            &mut view,
            AuthEvent::SignInFinished(Ok(authenticated("Ada"))),
            now,
        );
        assert_eq!(last_message(&view), Some((ToastKind::Success, "Welcome back, Ada!")));
        assert!(view.phase.is_done());
        assert_eq!(effects.len(), 3);
    }

    #[test]
    fn test_sign_in_failure_returns_to_idle() {
        let (mut view, now) = view();
        fill_sign_in(&mut view, now);
        update(&mut view, AuthEvent::Submit, now);

        let effects = update(
            &mut view,
            AuthEvent::SignInFinished(Err(FlowFailure::new("Invalid credentials."))),
            now,
        );
        assert!(effects.is_empty());
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(last_message(&view), Some((ToastKind::Error, "Invalid credentials.")));
        assert!(view.can_submit());
    }

    #[test]
    fn test_oversized_avatar_keeps_previous_preview() {
        let (mut view, now) = view();
        update(
            &mut view,
            AuthEvent::ImagePicked {
                slot: ImageSlot::Avatar,
                file: png(1024),
            },
            now,
        );
        let before = view.avatar.as_ref().map(|s| s.preview.url().to_string());

        update(
            &mut view,
            AuthEvent::ImagePicked {
                slot: ImageSlot::Avatar,
                file: png(8_000_000),
            },
            now,
        );

        assert_eq!(
            view.avatar.as_ref().map(|s| s.preview.url().to_string()),
            before
        );
        assert_eq!(view.previews().live_count(), 1);
        assert_eq!(
            last_message(&view),
            Some((ToastKind::Error, "Image must be less than 5MB"))
        );
    }

    #[test]
    fn test_replacing_and_removing_release_previews() {
        let (mut view, now) = view();
        for _ in 0..3 {
            update(
                &mut view,
                AuthEvent::ImagePicked {
                    slot: ImageSlot::Cover,
                    file: png(64),
                },
                now,
            );
        }
        assert_eq!(view.previews().live_count(), 1);

        update(&mut view, AuthEvent::ImageRemoved(ImageSlot::Cover), now);
        assert_eq!(view.previews().live_count(), 0);
    }

    #[test]
    fn test_sign_up_submit_carries_avatar_and_flags_upload() {
        let (mut view, now) = view();
        fill_sign_up(&mut view, now);
        update(
            &mut view,
            AuthEvent::ImagePicked {
                slot: ImageSlot::Avatar,
                file: png(64),
            },
            now,
        );

        let effects = update(&mut view, AuthEvent::Submit, now);
        assert!(view.loading_image);
        match effects.as_slice() {
            [AuthEffect::Backend(BackendTask::SignUp { form, avatar, progress })] => {
                assert_eq!(form.username, "ada_l");
                assert!(avatar.is_some());
                assert!(!progress.account_created());
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_sign_up_success_drops_previews() {
        let (mut view, now) = view();
        fill_sign_up(&mut view, now);
        update(
            &mut view,
            AuthEvent::ImagePicked {
                slot: ImageSlot::Avatar,
                file: png(64),
            },
            now,
        );
        let effects = update(&mut view, AuthEvent::Submit, now);
        let [AuthEffect::Backend(BackendTask::SignUp { progress, .. })] = effects.as_slice() else {
            panic!("expected sign-up task");
        };

        update(
            &mut view,
            AuthEvent::SignUpFinished {
                result: Ok(authenticated("ada_l")),
                progress: progress.clone(),
            },
            now,
        );

        assert_eq!(view.previews().live_count(), 0);
        assert!(!view.loading_image);
        assert_eq!(
            last_message(&view),
            Some((
                ToastKind::Success,
                "Welcome, ada_l! Account created successfully."
            ))
        );
    }

    #[test]
    fn test_sign_up_failure_after_account_keeps_progress() {
        let (mut view, now) = view();
        fill_sign_up(&mut view, now);
        update(&mut view, AuthEvent::Submit, now);

        let mut progress = SignUpProgress::start(&view.sign_up.values);
        progress.account_id = Some("u1".to_string());
        update(
            &mut view,
            AuthEvent::SignUpFinished {
                result: Err(FlowFailure::new("boom")),
                progress,
            },
            now,
        );
        assert_eq!(view.phase, Phase::Idle);

        let effects = update(&mut view, AuthEvent::Submit, now);
        match effects.as_slice() {
            [AuthEffect::Backend(BackendTask::SignUp { progress, .. })] => {
                assert_eq!(progress.account_id.as_deref(), Some("u1"));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_oauth_targets_landing_and_auth_routes() {
        let (mut view, now) = view();
        let effects = update(&mut view, AuthEvent::OAuth(OAuthProvider::Github), now);

        assert_eq!(view.phase, Phase::Idle);
        match effects.as_slice() {
            [AuthEffect::OpenOAuth {
                provider,
                success_url,
                failure_url,
            }] => {
                assert_eq!(*provider, OAuthProvider::Github);
                assert_eq!(success_url, "http://localhost:3000/");
                assert_eq!(failure_url, "http://localhost:3000/start");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_oauth_failure_falls_back_to_generic_message() {
        let (mut view, now) = view();
        update(
            &mut view,
            AuthEvent::OAuthFailed {
                provider: OAuthProvider::Google,
                message: None,
            },
            now,
        );
        assert_eq!(
            last_message(&view),
            Some((
                ToastKind::Error,
                "Unable to sign in with google. Please try again."
            ))
        );
    }

    #[test]
    fn test_tick_expires_toasts_and_rotates_humor() {
        let (mut view, now) = view();
        update(
            &mut view,
            AuthEvent::SelectionFailed {
                message: "nope".to_string(),
            },
            now,
        );
        let later = now + TOAST_DURATION + Duration::from_millis(1);
        update(&mut view, AuthEvent::Tick, later);
        assert!(view.toasts.is_empty());

        let switch_at = later + HUMOR_LINE_SWITCH_INTERVAL;
        update(&mut view, AuthEvent::Tick, switch_at);
        assert!(view.humor.frame(switch_at + HUMOR_FADE / 2).opacity < 1.0);
    }

    #[test]
    fn test_password_visibility_is_shared() {
        let (mut view, now) = view();
        update(&mut view, AuthEvent::TogglePasswordVisibility, now);
        update(&mut view, AuthEvent::SwitchTab(Tab::SignUp), now);
        assert!(view.password_visible);
    }

    #[test]
    fn test_unmount_releases_previews_and_clears_session() {
        let (mut view, now) = view();
        update(
            &mut view,
            AuthEvent::ImagePicked {
                slot: ImageSlot::Avatar,
                file: png(64),
            },
            now,
        );
        let effects = update(&mut view, AuthEvent::Unmount, now);
        assert_eq!(view.previews().live_count(), 0);
        assert!(matches!(effects.as_slice(), [AuthEffect::ClearSession]));
    }
}
