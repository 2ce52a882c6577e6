use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preference key holding the storage id of the uploaded avatar.
pub const PROFILE_IMAGE_KEY: &str = "profileImageId";

/// Free-form key/value record attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(pub Map<String, Value>);

impl Preferences {
    /// Builds preferences pointing at an uploaded avatar.
    pub fn with_profile_image(file_id: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(PROFILE_IMAGE_KEY.to_string(), Value::String(file_id.into()));
        Self(map)
    }

    /// Returns the avatar storage id, ignoring empty or non-string values.
    pub fn profile_image_id(&self) -> Option<&str> {
        self.0
            .get(PROFILE_IMAGE_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Account record returned by the backend.
///
/// Only the id, display name, email and preferences are interpreted. Every
/// other field is carried through untouched so the copy written to the
/// `user` cookie matches what the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub prefs: Preferences,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionUser {
    /// Name shown in greetings, falling back to the email when unset.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    pub fn profile_image_id(&self) -> Option<&str> {
        self.prefs.profile_image_id()
    }
}
