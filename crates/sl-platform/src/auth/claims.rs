//! Claims and the authenticated principal

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known claim types
pub mod claim_types {
    pub const SUBJECT: &str = "sub";
    pub const NAME: &str = "name";
    pub const GIVEN_NAME: &str = "given_name";
    pub const FAMILY_NAME: &str = "family_name";
    pub const PREFERRED_USERNAME: &str = "preferred_username";
    pub const EMAIL: &str = "email";
    pub const LOCALE: &str = "locale";
    pub const ZONEINFO: &str = "zoneinfo";
    pub const IDP: &str = "idp";
    pub const REWARDS_NUMBER: &str = "rewardsNumber";
}

/// Claims mapped from the ID token and user-info response by default.
/// Anything else must be listed as a custom claim to reach the session.
const STANDARD_CLAIMS: &[&str] = &[
    claim_types::SUBJECT,
    claim_types::NAME,
    claim_types::GIVEN_NAME,
    claim_types::FAMILY_NAME,
    claim_types::PREFERRED_USERNAME,
    claim_types::EMAIL,
    claim_types::LOCALE,
    claim_types::ZONEINFO,
    claim_types::IDP,
];

/// A named string attribute of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "t")]
    pub claim_type: String,
    #[serde(rename = "v")]
    pub value: String,
}

/// The signed-in user, as a set of claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    claims: Vec<Claim>,
}

impl Principal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_claims<I, K, V>(claims: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut principal = Self::new();
        for (claim_type, value) in claims {
            principal.add_claim(claim_type, value);
        }
        principal
    }

    pub fn add_claim(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim {
            claim_type: claim_type.into(),
            value: value.into(),
        });
    }

    /// Replace every claim of this type with a single value.
    pub fn set_claim(&mut self, claim_type: &str, value: impl Into<String>) {
        self.claims.retain(|c| c.claim_type != claim_type);
        self.add_claim(claim_type, value);
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Unique user identifier (`sub`), if present and non-empty.
    pub fn user_id(&self) -> Option<&str> {
        self.find_first(claim_types::SUBJECT).filter(|v| !v.is_empty())
    }

    /// Best name for display: `name`, then `preferred_username`, then `email`.
    pub fn display_name(&self) -> Option<&str> {
        [
            claim_types::NAME,
            claim_types::PREFERRED_USERNAME,
            claim_types::EMAIL,
        ]
        .into_iter()
        .find_map(|t| self.find_first(t).filter(|v| !v.is_empty()))
    }
}

/// Build the session principal from ID-token claims and the user-info response.
///
/// Standard claims come from both documents, user-info winning on conflict.
/// `custom_claims` are copied from the user-info response only.
pub fn principal_from_login(
    id_token_claims: &Map<String, Value>,
    user_info: &Map<String, Value>,
    custom_claims: &[String],
) -> Principal {
    let mut principal = Principal::new();

    for claim_type in STANDARD_CLAIMS {
        let value = user_info
            .get(*claim_type)
            .and_then(claim_value)
            .or_else(|| id_token_claims.get(*claim_type).and_then(claim_value));
        if let Some(value) = value {
            principal.add_claim(*claim_type, value);
        }
    }

    copy_custom_claims(&mut principal, user_info, custom_claims);
    principal
}

/// Copy configured non-standard claims from the user-info response.
pub fn copy_custom_claims(
    principal: &mut Principal,
    user_info: &Map<String, Value>,
    custom_claims: &[String],
) {
    for claim_type in custom_claims {
        if let Some(value) = user_info.get(claim_type).and_then(claim_value) {
            principal.set_claim(claim_type, value);
        }
    }
}

fn claim_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_find_first_and_user_id() {
        let principal = Principal::from_claims([("sub", "00u1"), ("email", "a@b.com")]);
        assert_eq!(principal.user_id(), Some("00u1"));
        assert_eq!(principal.find_first("email"), Some("a@b.com"));
        assert_eq!(principal.find_first("rewardsNumber"), None);

        let empty_sub = Principal::from_claims([("sub", "")]);
        assert_eq!(empty_sub.user_id(), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let principal = Principal::from_claims([("email", "a@b.com"), ("preferred_username", "ada")]);
        assert_eq!(principal.display_name(), Some("ada"));
        assert_eq!(Principal::new().display_name(), None);
    }

    #[test]
    fn test_custom_claim_is_copied_from_user_info() {
        let id_token = map(json!({ "sub": "00u1", "email": "a@b.com", "aud": "client" }));
        let user_info = map(json!({
            "sub": "00u1",
            "preferred_username": "a@b.com",
            "rewardsNumber": "RN123",
            "favoriteColor": "blue"
        }));

        let principal = principal_from_login(&id_token, &user_info, &["rewardsNumber".to_string()]);

        assert_eq!(principal.find_first("rewardsNumber"), Some("RN123"));
        assert_eq!(principal.find_first("preferred_username"), Some("a@b.com"));
        assert_eq!(principal.find_first("email"), Some("a@b.com"));
        assert!(principal.find_first("favoriteColor").is_none());
        assert!(principal.find_first("aud").is_none());
    }

    #[test]
    fn test_null_custom_claim_is_skipped_and_numbers_stringified() {
        let mut principal = Principal::from_claims([("sub", "00u1")]);
        copy_custom_claims(
            &mut principal,
            &map(json!({ "rewardsNumber": null, "tier": 3 })),
            &["rewardsNumber".to_string(), "tier".to_string()],
        );
        assert!(principal.find_first("rewardsNumber").is_none());
        assert_eq!(principal.find_first("tier"), Some("3"));
    }
}
