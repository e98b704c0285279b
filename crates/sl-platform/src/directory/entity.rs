//! Directory Entities
//!
//! User records, profiles and identity-provider links as returned by the
//! identity-management API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Custom profile attribute holding the rewards number
pub const REWARDS_NUMBER: &str = "rewardsNumber";

/// Recovery question set on every registered account
pub const RECOVERY_QUESTION: &str = "ResetKey";

/// Remote user profile.
///
/// `firstName`, `lastName`, `email` and `login` are always present on a
/// directory profile. Every other attribute, including custom ones such as
/// `rewardsNumber`, lands in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub login: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl UserProfile {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        login: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            login: login.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// String value of a custom attribute. Non-string values read as absent.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn rewards_number(&self) -> Option<&str> {
        self.attribute_str(REWARDS_NUMBER)
    }

    pub fn has_rewards_number(&self) -> bool {
        self.rewards_number().is_some_and(|v| !v.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// User record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile: UserProfile,
}

/// Identity provider linked to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub id: String,
    /// Provider type, e.g. `FACEBOOK` or `GOOGLE`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl IdentityProvider {
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }
}

/// Body of `POST /api/v1/users`
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub profile: UserProfile,
    pub credentials: UserCredentials,
}

impl CreateUserRequest {
    /// Password credentials plus a recovery answer nobody is ever told.
    pub fn with_password(profile: UserProfile, password: impl Into<String>) -> Self {
        Self {
            profile,
            credentials: UserCredentials {
                password: PasswordCredential {
                    value: password.into(),
                },
                recovery_question: RecoveryQuestion {
                    question: RECOVERY_QUESTION.to_string(),
                    answer: Uuid::new_v4().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCredentials {
    pub password: PasswordCredential,
    pub recovery_question: RecoveryQuestion,
}

#[derive(Clone, Serialize)]
pub struct PasswordCredential {
    pub value: String,
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("value", &"[redacted]")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RecoveryQuestion {
    pub question: String,
    pub answer: String,
}

impl fmt::Debug for RecoveryQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryQuestion")
            .field("question", &self.question)
            .field("answer", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateUserRequest<'a> {
    pub profile: &'a UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_keeps_custom_attributes() {
        let profile: UserProfile = serde_json::from_value(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "login": "ada@example.com",
            "rewardsNumber": "RN123",
            "mobilePhone": null
        }))
        .unwrap();

        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.rewards_number(), Some("RN123"));
        assert!(profile.has_rewards_number());
        assert_eq!(profile.attributes.get("mobilePhone"), Some(&Value::Null));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["rewardsNumber"], "RN123");
        assert_eq!(back["firstName"], "Ada");
    }

    #[test]
    fn test_empty_or_non_string_rewards_number_is_missing() {
        let mut profile = UserProfile::default();
        assert!(!profile.has_rewards_number());

        profile.set_attribute(REWARDS_NUMBER, "");
        assert!(!profile.has_rewards_number());

        profile.set_attribute(REWARDS_NUMBER, 42);
        assert!(!profile.has_rewards_number());
    }

    #[test]
    fn test_null_required_fields_become_empty() {
        let profile: UserProfile =
            serde_json::from_value(json!({ "firstName": null, "login": "x" })).unwrap();
        assert_eq!(profile.first_name, "");
        assert_eq!(profile.login, "x");
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateUserRequest::with_password(
            UserProfile::new("Ada", "Lovelace", "ada@example.com", "ada@example.com"),
            "S3cret!pass",
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["credentials"]["password"]["value"], "S3cret!pass");
        assert_eq!(body["credentials"]["recovery_question"]["question"], "ResetKey");
        let answer = body["credentials"]["recovery_question"]["answer"].as_str().unwrap();
        assert!(Uuid::parse_str(answer).is_ok());
        assert!(!format!("{:?}", request).contains("S3cret!pass"));
    }

    #[test]
    fn test_identity_provider_kind_ignores_case() {
        let idp: IdentityProvider = serde_json::from_value(json!({
            "id": "0oa1",
            "type": "FACEBOOK",
            "name": "Facebook",
            "status": "ACTIVE",
            "created": "2018-01-12T18:49:52.000Z"
        }))
        .unwrap();
        assert!(idp.is_kind("facebook"));
        assert!(!idp.is_kind("google"));
        assert!(idp.created.is_some());
    }
}
