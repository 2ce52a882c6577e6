//! UI events fed to the reducer.

use crossterm::event::Event;
use gatehouse_core::auth::AuthEvent;

#[derive(Debug)]
pub enum UiEvent {
    /// Clock tick (spinner, humor fade, toast expiry, exit delay).
    Tick,
    /// Raw terminal input.
    Terminal(Event),
    /// Result of a spawned effect, routed straight into the auth reducer.
    Auth(AuthEvent),
}

impl From<AuthEvent> for UiEvent {
    fn from(event: AuthEvent) -> Self {
        UiEvent::Auth(event)
    }
}
