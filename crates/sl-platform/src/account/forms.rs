//! Account form models
//!
//! Field names follow the HTML form (`Email`, `GivenName`, ...). Text fields
//! are trimmed before validation so whitespace-only input counts as missing.

use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::directory::{UserProfile, REWARDS_NUMBER};
use crate::shared::views::RegisterFields;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegisterForm {
    #[validate(
        length(min = 1, message = "The Email field is required."),
        email(message = "The Email field is not a valid e-mail address.")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "The Password field is required."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "The passwords do not match."))]
    pub confirm_password: String,

    #[validate(length(min = 1, message = "The Given name field is required."))]
    pub given_name: String,

    #[validate(length(min = 1, message = "The Surname field is required."))]
    pub surname: String,

    #[validate(length(min = 1, message = "The Rewards number field is required."))]
    pub rewards_number: String,

    #[serde(rename = "__RequestVerificationToken")]
    pub request_verification_token: String,
}

impl RegisterForm {
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.given_name = self.given_name.trim().to_string();
        self.surname = self.surname.trim().to_string();
        self.rewards_number = self.rewards_number.trim().to_string();
        self
    }

    /// Directory profile for the new account; the email doubles as login.
    pub fn to_profile(&self) -> UserProfile {
        let mut profile = UserProfile::new(
            self.given_name.clone(),
            self.surname.clone(),
            self.email.clone(),
            self.email.clone(),
        );
        profile.set_attribute(REWARDS_NUMBER, self.rewards_number.clone());
        profile
    }

    /// Values to put back into the form when it is redisplayed.
    pub fn fields(&self) -> RegisterFields {
        RegisterFields {
            email: self.email.clone(),
            given_name: self.given_name.clone(),
            surname: self.surname.clone(),
            rewards_number: self.rewards_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompleteProfileForm {
    #[validate(length(min = 1, message = "The Rewards number field is required."))]
    pub rewards_number: String,

    #[serde(rename = "__RequestVerificationToken")]
    pub request_verification_token: String,
}

impl CompleteProfileForm {
    pub fn normalized(mut self) -> Self {
        self.rewards_number = self.rewards_number.trim().to_string();
        self
    }
}

/// Validation messages keyed by form field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn for_field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors.iter().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", field))
            });
            map.entry(field.to_string()).or_default().extend(messages);
        }
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register_form() -> RegisterForm {
        RegisterForm {
            email: "ada@example.com".to_string(),
            password: "S3cret!pass".to_string(),
            confirm_password: "S3cret!pass".to_string(),
            given_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            rewards_number: "RN123".to_string(),
            request_verification_token: "token".to_string(),
        }
    }

    #[test]
    fn test_valid_register_form() {
        assert!(valid_register_form().validate().is_ok());
    }

    #[test]
    fn test_password_mismatch_message() {
        let mut form = valid_register_form();
        form.confirm_password = "different".to_string();
        let errors = FieldErrors::from(&form.validate().unwrap_err());

        assert_eq!(errors.for_field("confirm_password"), ["The passwords do not match."]);
        assert!(errors.for_field("password").is_empty());
    }

    #[test]
    fn test_whitespace_only_fields_are_missing() {
        let mut form = valid_register_form();
        form.given_name = "   ".to_string();
        form.rewards_number = " ".to_string();
        let errors = FieldErrors::from(&form.normalized().validate().unwrap_err());

        assert_eq!(errors.for_field("given_name"), ["The Given name field is required."]);
        assert_eq!(errors.for_field("rewards_number"), ["The Rewards number field is required."]);
    }

    #[test]
    fn test_invalid_email() {
        let mut form = valid_register_form();
        form.email = "not-an-email".to_string();
        let errors = FieldErrors::from(&form.validate().unwrap_err());
        assert_eq!(
            errors.for_field("email"),
            ["The Email field is not a valid e-mail address."]
        );
    }

    #[test]
    fn test_profile_from_register_form() {
        let profile = valid_register_form().to_profile();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "Lovelace");
        assert_eq!(profile.login, "ada@example.com");
        assert_eq!(profile.rewards_number(), Some("RN123"));
    }

    #[test]
    fn test_form_field_names() {
        let form: RegisterForm = serde_json::from_value(serde_json::json!({
            "Email": "ada@example.com",
            "ConfirmPassword": "x",
            "GivenName": "Ada",
            "__RequestVerificationToken": "tok"
        }))
        .unwrap();
        assert_eq!(form.email, "ada@example.com");
        assert_eq!(form.confirm_password, "x");
        assert_eq!(form.given_name, "Ada");
        assert_eq!(form.request_verification_token, "tok");
        assert_eq!(form.surname, "");
    }

    #[test]
    fn test_complete_profile_form_requires_rewards_number() {
        let form = CompleteProfileForm {
            rewards_number: "  ".to_string(),
            request_verification_token: String::new(),
        };
        assert!(form.normalized().validate().is_err());
    }
}
