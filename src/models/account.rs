use serde::{Deserialize, Serialize};

/// Account snapshot as returned by the user service.
///
/// Always fetched fresh per request; never cached here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Registration payload forwarded to the user service as-is. Password
/// handling is entirely the user service's job.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_default_to_none() {
        let account: Account =
            serde_json::from_str(r#"{"id":1,"name":"Daniel","email":"daniel@example.com"}"#)
                .unwrap();
        assert_eq!(account.id, 1);
        assert!(account.image.is_none());
        assert!(account.created_at.is_none());

        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_new_account_debug_redacts_password() {
        let new = NewAccount {
            name: "Daniel".into(),
            email: "daniel@example.com".into(),
            password: "hunter2".into(),
        };
        let dbg = format!("{:?}", new);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
