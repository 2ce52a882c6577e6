//! In-memory backend for tests.
//!
//! Mirrors the backend's observable rules: one session per client, guests
//! can't read or change an account, duplicate emails are refused. Every
//! call is recorded so tests can assert exactly what reached the backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gatehouse_types::{OAuthProvider, Preferences, Session, SessionUser, StoredFile};
use serde_json::Map;
use url::Url;

use super::{
    AccountService, BackendError, BackendResult, NewAccount, NewFile, StorageService,
};

const FAKE_ENDPOINT: &str = "https://backend.test/v1";
const FAKE_PROJECT: &str = "test-project";

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateAccount,
    CreateSession,
    CurrentUser,
    DeleteSession,
    UpdatePreferences,
    CreateFile,
}

/// A call that reached the fake, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateAccount { user_id: String, email: String, name: String },
    CreateSession { email: String },
    CurrentUser,
    DeleteSession,
    UpdatePreferences(Preferences),
    CreateFile { bucket_id: String, file_id: String, permissions: Vec<String> },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::CreateAccount { .. } => Op::CreateAccount,
            Call::CreateSession { .. } => Op::CreateSession,
            Call::CurrentUser => Op::CurrentUser,
            Call::DeleteSession => Op::DeleteSession,
            Call::UpdatePreferences(_) => Op::UpdatePreferences,
            Call::CreateFile { .. } => Op::CreateFile,
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: SessionUser,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Account>,
    session_user: Option<String>,
    files: Vec<StoredFile>,
    calls: Vec<Call>,
    failures: HashMap<Op, VecDeque<BackendError>>,
    session_counter: u64,
}

impl State {
    fn take_failure(&mut self, op: Op) -> Option<BackendError> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn signed_in(&self) -> Option<&Account> {
        let id = self.session_user.as_deref()?;
        self.accounts.iter().find(|a| a.user.id == id)
    }

    fn signed_in_mut(&mut self) -> Option<&mut Account> {
        let id = self.session_user.clone()?;
        self.accounts.iter_mut().find(|a| a.user.id == id)
    }
}

/// Clones share state, like two clients of the same server and cookie jar.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing account.
    #[must_use]
    pub fn with_account(self, user_id: &str, email: &str, password: &str, name: &str) -> Self {
        self.lock().accounts.push(Account {
            user: user(user_id, email, name),
            password: password.to_string(),
        });
        self
    }

    /// Marks `user_id` as already signed in on this client.
    #[must_use]
    pub fn with_session(self, user_id: &str) -> Self {
        self.lock().session_user = Some(user_id.to_string());
        self
    }

    /// Seeds preferences on an existing account.
    #[must_use]
    pub fn with_preferences(self, user_id: &str, prefs: Preferences) -> Self {
        if let Some(account) = self.lock().accounts.iter_mut().find(|a| a.user.id == user_id) {
            account.user.prefs = prefs;
        }
        self
    }

    /// Makes the next call to `op` fail with `error`. Queues if called repeatedly.
    pub fn fail_next(&self, op: Op, error: BackendError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.lock().calls.iter().map(Call::op).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    pub fn account(&self, email: &str) -> Option<SessionUser> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.user.email == email)
            .map(|a| a.user.clone())
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.lock().files.clone()
    }

    pub fn session_user(&self) -> Option<String> {
        self.lock().session_user.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test already failed; keep going with the data.
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, call: Call) -> Result<MutexGuard<'_, State>, BackendError> {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);
        match state.take_failure(op) {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn user(id: &str, email: &str, name: &str) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        prefs: Preferences::default(),
        extra: Map::new(),
    }
}

fn guest_scope(scope: &str) -> BackendError {
    BackendError::http_status(
        401,
        &serde_json::json!({
            "message": format!("User (role: guests) missing scope ({scope})"),
            "code": 401,
            "type": "general_unauthorized_scope",
        })
        .to_string(),
    )
}

fn respond(status: u16, error_type: &str, message: &str) -> BackendError {
    BackendError::http_status(
        status,
        &serde_json::json!({"message": message, "code": status, "type": error_type}).to_string(),
    )
}

impl AccountService for FakeBackend {
    async fn create_account(&self, account: NewAccount<'_>) -> BackendResult<SessionUser> {
        let mut state = self.begin(Call::CreateAccount {
            user_id: account.user_id.to_string(),
            email: account.email.to_string(),
            name: account.name.to_string(),
        })?;

        if state
            .accounts
            .iter()
            .any(|a| a.user.email == account.email || a.user.id == account.user_id)
        {
            return Err(respond(
                409,
                "user_already_exists",
                "A user with the same id, email, or phone already exists in this project.",
            ));
        }

        let created = user(account.user_id, account.email, account.name);
        state.accounts.push(Account {
            user: created.clone(),
            password: account.password.to_string(),
        });
        Ok(created)
    }

    async fn create_session(&self, email: &str, password: &str) -> BackendResult<Session> {
        let mut state = self.begin(Call::CreateSession {
            email: email.to_string(),
        })?;

        if state.session_user.is_some() {
            return Err(respond(
                401,
                "user_session_already_exists",
                "Creation of a session is prohibited when a session is active.",
            ));
        }

        let Some(user_id) = state
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.id.clone())
        else {
            return Err(respond(
                401,
                "user_invalid_credentials",
                "Invalid credentials. Please check the email and password.",
            ));
        };

        state.session_counter += 1;
        state.session_user = Some(user_id.clone());
        Ok(Session {
            id: format!("session-{}", state.session_counter),
            user_id,
            provider: "email".to_string(),
            expire: None,
        })
    }

    async fn current_user(&self) -> BackendResult<SessionUser> {
        let state = self.begin(Call::CurrentUser)?;
        state
            .signed_in()
            .map(|a| a.user.clone())
            .ok_or_else(|| guest_scope("account"))
    }

    async fn delete_session(&self) -> BackendResult<()> {
        let mut state = self.begin(Call::DeleteSession)?;
        if state.session_user.take().is_none() {
            return Err(guest_scope("account"));
        }
        Ok(())
    }

    async fn update_preferences(&self, prefs: &Preferences) -> BackendResult<SessionUser> {
        let mut state = self.begin(Call::UpdatePreferences(prefs.clone()))?;
        let account = state.signed_in_mut().ok_or_else(|| guest_scope("account"))?;
        account.user.prefs = prefs.clone();
        Ok(account.user.clone())
    }

    fn oauth_url(
        &self,
        provider: OAuthProvider,
        success_url: &str,
        failure_url: &str,
    ) -> BackendResult<String> {
        let mut url = Url::parse(&format!(
            "{FAKE_ENDPOINT}/account/sessions/oauth2/{}",
            provider.as_str()
        ))
        .map_err(|e| BackendError::parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("success", success_url)
            .append_pair("failure", failure_url)
            .append_pair("project", FAKE_PROJECT);
        Ok(url.into())
    }
}

impl StorageService for FakeBackend {
    async fn create_file(&self, file: NewFile<'_>) -> BackendResult<StoredFile> {
        let mut state = self.begin(Call::CreateFile {
            bucket_id: file.bucket_id.to_string(),
            file_id: file.file_id.to_string(),
            permissions: file.permissions.iter().map(ToString::to_string).collect(),
        })?;

        if state.signed_in().is_none() {
            return Err(respond(
                401,
                "user_unauthorized",
                "The current user is not authorized to perform the requested action.",
            ));
        }

        let stored = StoredFile {
            id: file.file_id.to_string(),
            bucket_id: file.bucket_id.to_string(),
            name: file.file.name.clone(),
            mime_type: file.file.mime.clone(),
            size_original: file.file.size(),
        };
        state.files.push(stored.clone());
        Ok(stored)
    }

    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> BackendResult<String> {
        Ok(format!(
            "{FAKE_ENDPOINT}/storage/buckets/{bucket_id}/files/{file_id}/view?project={FAKE_PROJECT}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_rules() {
        let backend = FakeBackend::new().with_account("u1", "ada@example.com", "Abcdefg1", "ada");

        assert!(backend.current_user().await.unwrap_err().is_unauthorized());
        assert!(
            backend
                .create_session("ada@example.com", "wrong")
                .await
                .is_err()
        );

        backend.create_session("ada@example.com", "Abcdefg1").await.unwrap();
        assert_eq!(backend.current_user().await.unwrap().id, "u1");
        assert!(
            backend
                .create_session("ada@example.com", "Abcdefg1")
                .await
                .is_err()
        );

        backend.delete_session().await.unwrap();
        assert!(backend.delete_session().await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failure_applies_once() {
        let backend = FakeBackend::new()
            .with_account("u1", "ada@example.com", "Abcdefg1", "ada")
            .with_session("u1");
        backend.fail_next(Op::CurrentUser, BackendError::timeout("slow"));

        assert!(backend.current_user().await.is_err());
        assert!(backend.current_user().await.is_ok());
        assert_eq!(backend.ops(), vec![Op::CurrentUser, Op::CurrentUser]);
    }
}
