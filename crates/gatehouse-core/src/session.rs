//! Who is signed in, and the cookies that outlive the process.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gatehouse_types::SessionUser;

use crate::config::paths;

/// Cookie holding the JSON user record for downstream tools.
pub const USER_COOKIE: &str = "user";

/// Cookie holding the backend's fallback session token.
pub const BACKEND_COOKIE: &str = "backend_session";

/// The signed-in user as seen by the rest of the app.
///
/// Owned by the runtime and handed to the auth controller's effects. Nothing
/// else writes to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    user: Option<SessionUser>,
    avatar_url: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an authenticated user and their resolved avatar URL.
    pub fn install(&mut self, user: SessionUser, avatar_url: Option<String>) {
        tracing::debug!(user_id = %user.id, "session installed");
        self.user = Some(user);
        self.avatar_url = avatar_url;
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.avatar_url = None;
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Name/value cookies persisted as JSON in `$GATEHOUSE_HOME/cookies.json`.
///
/// Every operation re-reads the file, so several handles on the same path
/// never clobber each other's keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    /// Jar at the default location.
    pub fn open_default() -> Self {
        Self::at(paths::cookie_jar_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(name))
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut cookies = self.load()?;
        cookies.insert(name.to_string(), value.to_string());
        self.save(&cookies)
    }

    /// Removes a cookie. Returns whether it was present.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut cookies = self.load()?;
        let existed = cookies.remove(name).is_some();
        if existed {
            self.save(&cookies)?;
        }
        Ok(existed)
    }

    /// Writes `user=<JSON user record>`.
    pub fn set_user(&self, user: &SessionUser) -> Result<()> {
        let json = serde_json::to_string(user).context("Failed to serialize user cookie")?;
        self.set(USER_COOKIE, &json)
    }

    /// Reads back the `user` cookie, if present and well formed.
    pub fn user(&self) -> Result<Option<SessionUser>> {
        let Some(raw) = self.get(USER_COOKIE)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                tracing::warn!("ignoring malformed user cookie: {err}");
                Ok(None)
            }
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cookies from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cookies from {}", self.path.display()))
    }

    fn save(&self, cookies: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(cookies).context("Failed to serialize cookies")?;

        // Session tokens live here.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn user(id: &str) -> SessionUser {
        serde_json::from_value(json!({"$id": id, "name": "Ada", "email": "ada@example.com"}))
            .unwrap()
    }

    #[test]
    fn test_context_install_and_clear() {
        let mut ctx = SessionContext::new();
        assert!(!ctx.is_authenticated());

        ctx.install(user("u1"), Some("https://cdn/x".to_string()));
        assert_eq!(ctx.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(ctx.avatar_url(), Some("https://cdn/x"));

        ctx.clear();
        assert!(ctx.user().is_none());
        assert!(ctx.avatar_url().is_none());
    }

    #[test]
    fn test_jar_handles_share_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home").join("cookies.json");
        let a = CookieJar::at(&path);
        let b = CookieJar::at(&path);

        a.set(BACKEND_COOKIE, "token").unwrap();
        b.set_user(&user("u1")).unwrap();

        assert_eq!(a.get(BACKEND_COOKIE).unwrap().as_deref(), Some("token"));
        assert_eq!(a.user().unwrap().map(|u| u.id), Some("u1".to_string()));

        assert!(a.remove(USER_COOKIE).unwrap());
        assert!(!b.remove(USER_COOKIE).unwrap());
        assert_eq!(b.get(BACKEND_COOKIE).unwrap().as_deref(), Some("token"));
    }

    #[test]
    fn test_user_cookie_is_raw_json() {
        let dir = tempdir().unwrap();
        let jar = CookieJar::at(dir.path().join("cookies.json"));
        jar.set_user(&user("u9")).unwrap();

        let raw = jar.get(USER_COOKIE).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["$id"], "u9");
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn test_malformed_user_cookie_reads_as_none() {
        let dir = tempdir().unwrap();
        let jar = CookieJar::at(dir.path().join("cookies.json"));
        jar.set(USER_COOKIE, "{not json").unwrap();
        assert!(jar.user().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_jar_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let jar = CookieJar::at(dir.path().join("cookies.json"));
        jar.set(BACKEND_COOKIE, "t").unwrap();

        let mode = fs::metadata(jar.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
