use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-issued authenticated context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire.is_some_and(|expire| expire <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_backend_session() {
        let session: Session = serde_json::from_str(
            r#"{"$id":"s1","userId":"u1","provider":"email","expire":"2030-01-01T00:00:00.000+00:00"}"#,
        )
        .unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(!session.is_expired_at(Utc::now()));
    }
}
