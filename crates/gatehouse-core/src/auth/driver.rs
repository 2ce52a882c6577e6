//! Headless host for the auth reducer.
//!
//! Runs effects inline, in order, until the event queue drains. Used by the
//! CLI subcommands and by flow tests.

use std::collections::VecDeque;
use std::time::Instant;

use super::effects::AuthEffect;
use super::events::AuthEvent;
use super::handlers::{oauth_redirect, perform};
use super::signup::ProgressStore;
use super::state::{AuthView, Phase, Toast};
use super::update::update;
use crate::backend::Backend;
use crate::config::Routes;
use crate::media::PreviewRegistry;
use crate::session::{CookieJar, SessionContext};

pub struct Driver<B> {
    backend: B,
    bucket_id: Option<String>,
    view: AuthView,
    session: SessionContext,
    jar: Option<CookieJar>,
    progress_store: Option<ProgressStore>,
    /// Every toast shown, including ones that have since expired.
    shown: Vec<Toast>,
    navigations: Vec<String>,
    external_urls: Vec<String>,
}

impl<B: Backend> Driver<B> {
    pub fn new(backend: B, bucket_id: Option<String>, routes: Routes) -> Self {
        Self {
            backend,
            bucket_id,
            view: AuthView::new(routes, PreviewRegistry::new(), Instant::now()),
            session: SessionContext::new(),
            jar: None,
            progress_store: None,
            shown: Vec::new(),
            navigations: Vec::new(),
            external_urls: Vec::new(),
        }
    }

    /// Persists the `user` cookie to `jar` after authentication.
    #[must_use]
    pub fn with_cookie_jar(mut self, jar: CookieJar) -> Self {
        self.jar = Some(jar);
        self
    }

    /// Resumes an unfinished sign-up recorded in `store`, and keeps the
    /// record current after every dispatch.
    #[must_use]
    pub fn with_progress_store(mut self, store: ProgressStore) -> Self {
        match store.load() {
            Ok(progress) => self.view.progress = progress,
            Err(err) => tracing::warn!("ignoring unreadable sign-up progress: {err:#}"),
        }
        self.progress_store = Some(store);
        self
    }

    /// Dispatches `event` and everything it causes.
    pub async fn dispatch(&mut self, event: AuthEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let seen = self.view.toasts.last().map(|t| t.id);
            let effects = update(&mut self.view, event, Instant::now());
            self.record_toasts(seen);

            for effect in effects {
                if let Some(next) = self.run(effect).await {
                    queue.push_back(next);
                }
            }
        }

        self.sync_progress();
    }

    fn sync_progress(&self) {
        let Some(store) = &self.progress_store else {
            return;
        };
        let result = match &self.view.progress {
            Some(progress) => store.save(progress),
            None => store.clear(),
        };
        if let Err(err) = result {
            tracing::warn!("could not update sign-up progress: {err:#}");
        }
    }

    async fn run(&mut self, effect: AuthEffect) -> Option<AuthEvent> {
        match effect {
            AuthEffect::Backend(task) => {
                Some(perform(&self.backend, self.bucket_id.as_deref(), task).await)
            }
            AuthEffect::OpenOAuth {
                provider,
                success_url,
                failure_url,
            } => match oauth_redirect(&self.backend, provider, &success_url, &failure_url) {
                Ok(url) => {
                    self.external_urls.push(url);
                    None
                }
                Err(err) => Some(AuthEvent::OAuthFailed {
                    provider,
                    message: err.user_message().map(str::to_string),
                }),
            },
            AuthEffect::InstallSession { user, avatar_url } => {
                self.session.install(user, avatar_url);
                None
            }
            AuthEffect::PersistUserCookie { user } => {
                if let Some(jar) = &self.jar
                    && let Err(err) = jar.set_user(&user)
                {
                    tracing::warn!("could not write user cookie: {err:#}");
                }
                None
            }
            AuthEffect::Navigate { url } => {
                tracing::info!(%url, "navigate");
                self.navigations.push(url);
                None
            }
            AuthEffect::ClearSession => {
                self.session.clear();
                None
            }
        }
    }

    fn record_toasts(&mut self, seen: Option<u64>) {
        let fresh = self
            .view
            .toasts
            .iter()
            .filter(|toast| seen.is_none_or(|id| toast.id > id));
        self.shown.extend(fresh.cloned());
    }

    pub fn view(&self) -> &AuthView {
        &self.view
    }

    pub fn phase(&self) -> &Phase {
        &self.view.phase
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.shown
    }

    pub fn last_toast(&self) -> Option<&Toast> {
        self.shown.last()
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// URLs the host should open outside the app (OAuth consent pages).
    pub fn external_urls(&self) -> &[String] {
        &self.external_urls
    }
}
