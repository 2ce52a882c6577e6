//! Records exchanged with the account and storage backend.

mod oauth;
mod permission;
mod session;
mod storage;
mod user;

pub use oauth::OAuthProvider;
pub use permission::{Permission, Role};
pub use session::Session;
pub use storage::StoredFile;
pub use user::{PROFILE_IMAGE_KEY, Preferences, SessionUser};
