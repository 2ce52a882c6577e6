//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! The reducer stays pure. Backend calls are spawned and report back through
//! an inbox channel that the loop drains every frame, so the UI keeps
//! animating while a request is in flight.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use gatehouse_core::auth::{AuthEffect, AuthEvent, oauth_redirect, perform};
use gatehouse_core::backend::Backend;
use gatehouse_core::config::Routes;
use gatehouse_core::media::{ImageSlot, SelectedFile};
use gatehouse_core::session::CookieJar;
use tokio::sync::mpsc;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AppState, Outcome};
use crate::terminal::{self, Tty};
use crate::{render, update};

/// Tick cadence. Fast enough for the humor fade and the spinner.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Settings the runtime needs besides the backend itself.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub routes: Routes,
    pub bucket_id: Option<String>,
    /// Open redirect and consent URLs in the system browser.
    pub open_browser: bool,
    pub cookie_jar: Option<CookieJar>,
}

// ============================================================================
// Effect execution
// ============================================================================

/// Executes effects. Kept apart from the terminal so it can run in tests.
pub struct EffectRunner<B> {
    backend: Arc<B>,
    bucket_id: Option<String>,
    open_browser: bool,
    jar: Option<CookieJar>,
    inbox_tx: UiEventSender,
}

impl<B> EffectRunner<B>
where
    B: Backend + Send + Sync + 'static,
{
    pub fn new(backend: Arc<B>, options: &RuntimeOptions, inbox_tx: UiEventSender) -> Self {
        Self {
            backend,
            bucket_id: options.bucket_id.clone(),
            open_browser: options.open_browser,
            jar: options.cookie_jar.clone(),
            inbox_tx,
        }
    }

    pub fn execute_all(&self, state: &mut AppState, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute(state, effect);
        }
    }

    pub fn execute(&self, state: &mut AppState, effect: UiEffect) {
        match effect {
            UiEffect::Quit => state.should_quit = true,
            UiEffect::LoadImage { slot, path } => {
                self.spawn_effect(async move {
                    tokio::task::spawn_blocking(move || load_image(slot, &path))
                        .await
                        .unwrap_or_else(|err| AuthEvent::SelectionFailed {
                            message: format!("Could not load the image: {err}"),
                        })
                });
            }
            UiEffect::Auth(effect) => self.execute_auth(state, effect),
        }
    }

    fn execute_auth(&self, state: &mut AppState, effect: AuthEffect) {
        match effect {
            AuthEffect::Backend(task) => {
                let backend = Arc::clone(&self.backend);
                let bucket_id = self.bucket_id.clone();
                self.spawn_effect(async move {
                    perform(backend.as_ref(), bucket_id.as_deref(), task).await
                });
            }
            AuthEffect::OpenOAuth {
                provider,
                success_url,
                failure_url,
            } => {
                match oauth_redirect(self.backend.as_ref(), provider, &success_url, &failure_url) {
                    Ok(url) => {
                        tracing::info!(%provider, %url, "oauth consent");
                        if let Err(err) = self.open_external(&url) {
                            self.send(AuthEvent::OAuthFailed {
                                provider,
                                message: Some(format!("Could not open the browser: {err}")),
                            });
                        }
                    }
                    Err(err) => self.send(AuthEvent::OAuthFailed {
                        provider,
                        message: err.user_message().map(str::to_string),
                    }),
                }
            }
            AuthEffect::InstallSession { user, avatar_url } => {
                state.session.install(user, avatar_url);
            }
            AuthEffect::PersistUserCookie { user } => {
                if let Some(jar) = &self.jar
                    && let Err(err) = jar.set_user(&user)
                {
                    tracing::warn!("could not write user cookie: {err:#}");
                }
            }
            AuthEffect::Navigate { url } => {
                tracing::info!(%url, "navigate");
                if let Err(err) = self.open_external(&url) {
                    tracing::warn!(%url, "could not open browser: {err}");
                }
            }
            AuthEffect::ClearSession => state.session.clear(),
        }
    }

    fn open_external(&self, url: &str) -> io::Result<()> {
        if self.open_browser {
            open::that(url)
        } else {
            Ok(())
        }
    }

    fn send(&self, event: AuthEvent) {
        let _ = self.inbox_tx.send(UiEvent::Auth(event));
    }

    fn spawn_effect<Fut>(&self, fut: Fut)
    where
        Fut: Future<Output = AuthEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(UiEvent::Auth(fut.await));
        });
    }
}

/// Reads a picked file into memory. Blocking; failures become a
/// notification.
pub fn load_image(slot: ImageSlot, path: &Path) -> AuthEvent {
    match SelectedFile::from_path_for(slot, path) {
        Ok(file) => AuthEvent::ImagePicked { slot, file },
        Err(err) => {
            tracing::debug!(path = %path.display(), "image read failed: {err:#}");
            AuthEvent::SelectionFailed {
                message: format!("{err:#}"),
            }
        }
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Full-screen auth runtime. Restores the terminal on drop.
pub struct TuiRuntime<B> {
    terminal: Tty,
    pub state: AppState,
    runner: EffectRunner<B>,
    inbox_rx: UiEventReceiver,
    last_tick: Instant,
}

impl<B> TuiRuntime<B>
where
    B: Backend + Send + Sync + 'static,
{
    pub fn new(backend: B, options: RuntimeOptions) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let now = Instant::now();
        Ok(Self {
            terminal,
            state: AppState::new(options.routes.clone(), now),
            runner: EffectRunner::new(Arc::new(backend), &options, inbox_tx),
            inbox_rx,
            last_tick: now,
        })
    }

    /// Runs until the user quits or a redirect completes.
    pub fn run(&mut self) -> Result<Outcome> {
        self.dispatch(UiEvent::Auth(AuthEvent::Mount));
        self.event_loop()?;
        Ok(self.state.outcome())
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame, Instant::now());
                })?;
                dirty = false;
            }

            for event in self.collect_events()? {
                self.dispatch(event);
                dirty = true;
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event, Instant::now());
        self.runner.execute_all(&mut self.state, effects);
    }

    /// Inbox results first, then terminal input, then the tick when due.
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox_rx.try_recv() {
            events.push(event);
        }

        let poll_duration = if events.is_empty() {
            TICK_INTERVAL.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };
        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= TICK_INTERVAL {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }
}

impl<B> Drop for TuiRuntime<B> {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
