//! Backend flows behind the auth page.
//!
//! Each flow runs its calls strictly in sequence and turns the outcome into
//! an [`AuthEvent`] for the reducer.

use gatehouse_types::{OAuthProvider, Permission, Preferences, SessionUser};
use uuid::Uuid;

use super::effects::BackendTask;
use super::events::{AuthEvent, Authenticated, FlowFailure};
use super::signup::SignUpProgress;
use crate::backend::{Backend, BackendError, BackendResult, NewAccount, NewFile};
use crate::media::SelectedFile;
use crate::session::{CookieJar, SessionContext, USER_COOKIE};
use crate::validation::{SignInForm, SignUpForm};

const SIGN_IN_FALLBACK: &str = "Invalid email or password. Please try again.";
const SIGN_UP_FALLBACK: &str = "Registration failed. Please try again.";
const RESUME_HINT: &str = "Your account was created; submit again to finish setting it up.";

/// Runs a backend task to completion and returns the event it produced.
pub async fn perform<B: Backend>(backend: &B, bucket_id: Option<&str>, task: BackendTask) -> AuthEvent {
    match task {
        BackendTask::RestoreSession => {
            AuthEvent::SessionRestored(restore_session(backend, bucket_id).await)
        }
        BackendTask::SignIn { form } => {
            AuthEvent::SignInFinished(sign_in(backend, bucket_id, &form).await)
        }
        BackendTask::SignUp {
            form,
            avatar,
            mut progress,
        } => {
            let result = sign_up(backend, bucket_id, &form, avatar.as_ref(), &mut progress).await;
            AuthEvent::SignUpFinished { result, progress }
        }
    }
}

/// Looks up an existing session. Any failure reads as "signed out".
pub async fn restore_session<B: Backend>(
    backend: &B,
    bucket_id: Option<&str>,
) -> Option<Authenticated> {
    match backend.current_user().await {
        Ok(user) => {
            let avatar_url = resolve_avatar(backend, bucket_id, &user);
            Some(Authenticated { user, avatar_url })
        }
        Err(err) => {
            tracing::debug!("no existing session: {err}");
            None
        }
    }
}

/// Signs in with email and password, replacing any session this client holds.
pub async fn sign_in<B: Backend>(
    backend: &B,
    bucket_id: Option<&str>,
    form: &SignInForm,
) -> Result<Authenticated, FlowFailure> {
    if let Err(err) = backend.delete_session().await {
        tracing::debug!("ignoring failed session cleanup: {err}");
    }

    let result: BackendResult<SessionUser> = async {
        backend.create_session(&form.email, &form.password).await?;
        backend.current_user().await
    }
    .await;

    match result {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "signed in");
            let avatar_url = resolve_avatar(backend, bucket_id, &user);
            Ok(Authenticated { user, avatar_url })
        }
        Err(err) => {
            tracing::warn!(kind = %err.kind, "sign-in failed: {err}");
            Err(FlowFailure::new(err.user_message().unwrap_or(SIGN_IN_FALLBACK)))
        }
    }
}

/// Creates an account and signs it in, resuming after any step `progress`
/// records as done.
///
/// Order: account, session, avatar upload, preferences, user fetch. The
/// session comes right after the account because uploads and preference
/// writes need an authenticated caller.
pub async fn sign_up<B: Backend>(
    backend: &B,
    bucket_id: Option<&str>,
    form: &SignUpForm,
    avatar: Option<&SelectedFile>,
    progress: &mut SignUpProgress,
) -> Result<Authenticated, FlowFailure> {
    match run_sign_up(backend, bucket_id, form, avatar, progress).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "account created");
            let avatar_url = resolve_avatar(backend, bucket_id, &user);
            Ok(Authenticated { user, avatar_url })
        }
        Err(err) => {
            tracing::warn!(
                kind = %err.kind,
                account_created = progress.account_created(),
                "sign-up failed: {err}"
            );
            let message = err.user_message().unwrap_or(SIGN_UP_FALLBACK);
            let message = if progress.account_created() {
                format!("{message} {RESUME_HINT}")
            } else {
                message.to_string()
            };
            Err(FlowFailure::new(message))
        }
    }
}

async fn run_sign_up<B: Backend>(
    backend: &B,
    bucket_id: Option<&str>,
    form: &SignUpForm,
    avatar: Option<&SelectedFile>,
    progress: &mut SignUpProgress,
) -> BackendResult<SessionUser> {
    let account_id = match progress.account_id.clone() {
        Some(id) => id,
        None => {
            let user_id = Uuid::new_v4().to_string();
            let user = backend
                .create_account(NewAccount {
                    user_id: &user_id,
                    email: &form.email,
                    password: &form.password,
                    name: &form.username,
                })
                .await?;
            progress.account_id = Some(user.id.clone());
            user.id
        }
    };

    if !progress.session_created {
        backend.create_session(&form.email, &form.password).await?;
        progress.session_created = true;
    }

    if let Some(file) = avatar
        && progress.uploaded_file_id.is_none()
    {
        let bucket_id = bucket_id.ok_or_else(|| {
            BackendError::config("Profile images can't be uploaded: no storage bucket is configured.")
        })?;
        let file_id = Uuid::new_v4().to_string();
        let permissions = Permission::owner(&account_id);
        let stored = backend
            .create_file(NewFile {
                bucket_id,
                file_id: &file_id,
                file,
                permissions: &permissions,
            })
            .await?;
        progress.uploaded_file_id = Some(stored.id);
    }

    if let Some(file_id) = progress.uploaded_file_id.as_deref()
        && !progress.preferences_written
    {
        backend
            .update_preferences(&Preferences::with_profile_image(file_id))
            .await?;
        progress.preferences_written = true;
    }

    backend.current_user().await
}

/// Builds the provider consent URL.
pub fn oauth_redirect<B: Backend>(
    backend: &B,
    provider: OAuthProvider,
    success_url: &str,
    failure_url: &str,
) -> BackendResult<String> {
    backend.oauth_url(provider, success_url, failure_url)
}

/// View URL of the user's stored avatar, when they have one.
pub fn resolve_avatar<B: Backend>(
    backend: &B,
    bucket_id: Option<&str>,
    user: &SessionUser,
) -> Option<String> {
    let file_id = user.profile_image_id()?;
    let Some(bucket_id) = bucket_id else {
        tracing::debug!("user has an avatar but no bucket is configured");
        return None;
    };
    match backend.file_view_url(bucket_id, file_id) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::debug!("could not resolve avatar: {err}");
            None
        }
    }
}

/// Ends the backend session and forgets the user locally.
///
/// Local state is cleared even when the backend call fails; the error is
/// returned so callers can report it.
pub async fn sign_out<B: Backend>(
    backend: &B,
    session: &mut SessionContext,
    jar: Option<&CookieJar>,
) -> BackendResult<()> {
    let result = backend.delete_session().await;
    session.clear();
    if let Some(jar) = jar
        && let Err(err) = jar.remove(USER_COOKIE)
    {
        tracing::warn!("could not remove user cookie: {err:#}");
    }
    result
}
