use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is holding seats: an authenticated user or an anonymous guest session.
///
/// Exactly one of the two ids exists by construction, so the "both or neither
/// supplied" programming error cannot be expressed. On the wire this becomes
/// either a `userId` or a `guestSessionId` field, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HolderIdentity {
    User {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Guest {
        #[serde(rename = "guestSessionId")]
        guest_session_id: String,
    },
}

impl HolderIdentity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User { user_id: user_id.into() }
    }

    pub fn guest(guest_session_id: impl Into<String>) -> Self {
        Self::Guest { guest_session_id: guest_session_id.into() }
    }

    /// Mint a fresh anonymous guest session id
    pub fn new_guest() -> Self {
        Self::Guest { guest_session_id: Uuid::new_v4().to_string() }
    }

    /// The raw id, whichever kind it is
    pub fn id(&self) -> &str {
        match self {
            Self::User { user_id } => user_id,
            Self::Guest { guest_session_id } => guest_session_id,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_to_user_id_only() {
        let holder = HolderIdentity::user("u-42");
        let json = serde_json::to_value(&holder).unwrap();

        assert_eq!(json["userId"], "u-42");
        assert!(json.get("guestSessionId").is_none());
    }

    #[test]
    fn test_guest_serializes_to_guest_session_id_only() {
        let holder = HolderIdentity::guest("g-7");
        let json = serde_json::to_value(&holder).unwrap();

        assert_eq!(json["guestSessionId"], "g-7");
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn test_roundtrip() {
        let holder = HolderIdentity::new_guest();
        let json = serde_json::to_string(&holder).unwrap();
        let back: HolderIdentity = serde_json::from_str(&json).unwrap();

        assert_eq!(holder, back);
        assert!(back.is_guest());
    }
}
