//! Backend fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT: &str = "test-project";

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// `gatehouse` wired to `server`, with all state under `home`.
pub fn gatehouse(home: &Path, server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("gatehouse");
    cmd.env("GATEHOUSE_HOME", home)
        .env("GATEHOUSE_ENDPOINT", format!("{}/v1", server.uri()))
        .env("GATEHOUSE_PROJECT_ID", PROJECT)
        .env("GATEHOUSE_BUCKET_ID", "avatars")
        .env_remove("GATEHOUSE_CONFIG")
        .env_remove("GATEHOUSE_APP_ORIGIN");
    cmd
}

pub fn user_body(id: &str, name: &str, email: &str) -> Value {
    json!({"$id": id, "name": name, "email": email, "prefs": {}})
}

pub fn session_body(user_id: &str) -> Value {
    json!({"$id": "s1", "userId": user_id, "provider": "email"})
}

pub fn error_body(code: u16, error_type: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "message": message,
        "code": code,
        "type": error_type,
    }))
}

/// Deleting a session that doesn't exist, as before a fresh sign-in.
pub async fn mount_no_current_session(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .respond_with(error_body(
            401,
            "general_unauthorized_scope",
            "User (role: guests) missing scope (account)",
        ))
        .mount(server)
        .await;
}
