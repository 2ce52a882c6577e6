//! Gatehouse core: configuration, validation, backend access and the auth
//! page controller shared by the terminal UI and the CLI.

pub mod auth;
pub mod backend;
pub mod config;
pub mod humor;
pub mod logging;
pub mod media;
pub mod session;
pub mod validation;
