//! HTTP client for Appwrite-compatible account and storage APIs.

use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use gatehouse_types::{OAuthProvider, Preferences, Session, SessionUser, StoredFile};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::{
    AccountService, BackendError, BackendResult, NewAccount, NewFile, StorageService,
    classify_reqwest_error,
};
use crate::config::BackendSettings;
use crate::session::{BACKEND_COOKIE, CookieJar};

/// Standard User-Agent header for gatehouse requests.
pub const USER_AGENT: &str = concat!("gatehouse/", env!("CARGO_PKG_VERSION"));

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

/// Client bound to one endpoint and project.
///
/// Headless clients can't hold browser cookies, so the server hands the
/// session back in `X-Fallback-Cookies`. The client echoes it on every later
/// request and, when a [`CookieJar`] is attached, persists it across runs.
#[derive(Debug)]
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    fallback_cookies: Mutex<Option<String>>,
    jar: Option<CookieJar>,
}

impl AppwriteClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            fallback_cookies: Mutex::new(None),
            jar: None,
        })
    }

    /// Restores and persists the backend session through `jar`.
    #[must_use]
    pub fn with_cookie_jar(mut self, jar: CookieJar) -> Self {
        match jar.get(BACKEND_COOKIE) {
            Ok(stored) => self.set_fallback_cookies(stored),
            Err(err) => tracing::warn!("could not read stored session: {err:#}"),
        }
        self.jar = Some(jar);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_fallback_cookies(&self, value: Option<String>) {
        *self
            .fallback_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn fallback_cookies(&self) -> Option<String> {
        self.fallback_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "backend request");

        let mut req = self
            .http
            .request(method, format!("{}{path}", self.endpoint))
            .header(PROJECT_HEADER, &self.project_id);
        if let Some(cookies) = self.fallback_cookies() {
            req = req.header(FALLBACK_COOKIES_HEADER, cookies);
        }
        req
    }

    /// Stores a session handed back by the server.
    fn capture_cookies(&self, headers: &HeaderMap) {
        let Some(value) = headers
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "[]" && *v != "{}")
        else {
            return;
        };

        self.set_fallback_cookies(Some(value.to_string()));
        if let Some(jar) = &self.jar
            && let Err(err) = jar.set(BACKEND_COOKIE, value)
        {
            tracing::warn!("could not persist session: {err:#}");
        }
    }

    fn forget_session(&self) {
        self.set_fallback_cookies(None);
        if let Some(jar) = &self.jar
            && let Err(err) = jar.remove(BACKEND_COOKIE)
        {
            tracing::warn!("could not clear stored session: {err:#}");
        }
    }

    async fn execute(&self, req: RequestBuilder) -> BackendResult<String> {
        let response = req.send().await.map_err(|e| classify_reqwest_error(&e))?;
        self.capture_cookies(response.headers());

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        if !status.is_success() {
            let error = BackendError::http_status(status.as_u16(), &body);
            tracing::debug!(kind = %error.kind, "backend error: {error}");
            return Err(error);
        }
        Ok(body)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> BackendResult<T> {
        let body = self.execute(req).await?;
        serde_json::from_str(&body).map_err(|e| {
            let mut error = BackendError::parse(format!("Unexpected response: {e}"));
            error.details = Some(body);
            error
        })
    }

    fn url(&self, path: &str) -> BackendResult<Url> {
        Url::parse(&format!("{}{path}", self.endpoint))
            .map_err(|e| BackendError::parse(format!("Invalid URL for {path}: {e}")))
    }
}

impl AccountService for AppwriteClient {
    async fn create_account(&self, account: NewAccount<'_>) -> BackendResult<SessionUser> {
        let req = self.request(Method::POST, "/account").json(&json!({
            "userId": account.user_id,
            "email": account.email,
            "password": account.password,
            "name": account.name,
        }));
        self.send(req).await
    }

    async fn create_session(&self, email: &str, password: &str) -> BackendResult<Session> {
        let req = self
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        self.send(req).await
    }

    async fn current_user(&self) -> BackendResult<SessionUser> {
        self.send(self.request(Method::GET, "/account")).await
    }

    async fn delete_session(&self) -> BackendResult<()> {
        let result = self
            .execute(self.request(Method::DELETE, "/account/sessions/current"))
            .await;
        // A rejected delete still means this client holds no usable session.
        self.forget_session();
        result.map(|_| ())
    }

    async fn update_preferences(&self, prefs: &Preferences) -> BackendResult<SessionUser> {
        let req = self
            .request(Method::PATCH, "/account/prefs")
            .json(&json!({ "prefs": prefs }));
        self.send(req).await
    }

    fn oauth_url(
        &self,
        provider: OAuthProvider,
        success_url: &str,
        failure_url: &str,
    ) -> BackendResult<String> {
        let mut url = self.url(&format!("/account/sessions/oauth2/{}", provider.as_str()))?;
        url.query_pairs_mut()
            .append_pair("success", success_url)
            .append_pair("failure", failure_url)
            .append_pair("project", &self.project_id);
        Ok(url.into())
    }
}

impl StorageService for AppwriteClient {
    async fn create_file(&self, file: NewFile<'_>) -> BackendResult<StoredFile> {
        let part = Part::bytes(file.file.bytes.clone())
            .file_name(file.file.name.clone())
            .mime_str(&file.file.mime)
            .map_err(|e| BackendError::parse(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .text("fileId", file.file_id.to_string())
            .part("file", part);
        for permission in file.permissions {
            form = form.text("permissions[]", permission.to_string());
        }

        let path = format!("/storage/buckets/{}/files", file.bucket_id);
        self.send(self.request(Method::POST, &path).multipart(form))
            .await
    }

    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> BackendResult<String> {
        let mut url = self.url(&format!("/storage/buckets/{bucket_id}/files/{file_id}/view"))?;
        url.query_pairs_mut().append_pair("project", &self.project_id);
        Ok(url.into())
    }
}
