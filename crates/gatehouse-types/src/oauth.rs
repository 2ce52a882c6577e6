use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// OAuth providers offered on the auth page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Github,
    Google,
}

impl OAuthProvider {
    /// Provider id as the backend expects it in the redirect path.
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Github => "github",
            OAuthProvider::Google => "google",
        }
    }

    /// Capitalized label used in notifications.
    pub fn display_name(self) -> &'static str {
        match self {
            OAuthProvider::Github => "Github",
            OAuthProvider::Google => "Google",
        }
    }

    pub fn all() -> &'static [OAuthProvider] {
        &[OAuthProvider::Github, OAuthProvider::Google]
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(OAuthProvider::Github),
            "google" => Ok(OAuthProvider::Google),
            other => Err(format!("Unknown OAuth provider: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("GitHub".parse::<OAuthProvider>(), Ok(OAuthProvider::Github));
        assert_eq!(" google ".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert!("gitlab".parse::<OAuthProvider>().is_err());
    }
}
