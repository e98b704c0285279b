//! Profile completion policy
//!
//! A profile is complete once the user has a rewards number. The session
//! claim is trusted when present; otherwise the directory record decides.

use std::sync::Arc;

use tracing::debug;

use crate::auth::claims::{claim_types, Principal};
use crate::directory::UserDirectory;
use crate::shared::error::AppError;

#[derive(Clone)]
pub struct ProfileCompletionPolicy {
    directory: Arc<dyn UserDirectory>,
}

impl ProfileCompletionPolicy {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Whether the principal's profile is complete.
    ///
    /// Makes no remote call when the session already carries a non-empty
    /// rewards number, and exactly one otherwise. Directory errors propagate.
    pub async fn is_complete(&self, principal: &Principal) -> Result<bool, AppError> {
        if principal
            .find_first(claim_types::REWARDS_NUMBER)
            .is_some_and(|v| !v.is_empty())
        {
            return Ok(true);
        }

        let user_id = principal
            .user_id()
            .ok_or_else(|| AppError::missing_claim(claim_types::SUBJECT))?;

        debug!(user_id, "Rewards number not in session, checking directory");
        let user = self.directory.get_user(user_id).await?;
        Ok(user.profile.has_rewards_number())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CountingDirectory;
    use super::*;

    fn policy(directory: &Arc<CountingDirectory>) -> ProfileCompletionPolicy {
        ProfileCompletionPolicy::new(directory.clone())
    }

    #[tokio::test]
    async fn test_claim_present_needs_no_remote_call() {
        let directory = Arc::new(CountingDirectory::default());
        let principal = Principal::from_claims([("sub", "00u1"), ("rewardsNumber", "RN123")]);

        assert!(policy(&directory).is_complete(&principal).await.unwrap());
        assert_eq!(directory.gets(), 0);
    }

    #[tokio::test]
    async fn test_claim_absent_fetches_once_and_finds_number() {
        let directory = Arc::new(CountingDirectory::with_user("00u1", Some("RN123")));
        let principal = Principal::from_claims([("sub", "00u1"), ("email", "a@b.com")]);

        assert!(policy(&directory).is_complete(&principal).await.unwrap());
        assert_eq!(directory.gets(), 1);
    }

    #[tokio::test]
    async fn test_empty_claim_and_empty_remote_value_is_incomplete() {
        let directory = Arc::new(CountingDirectory::with_user("00u1", Some("")));
        let principal = Principal::from_claims([("sub", "00u1"), ("rewardsNumber", "")]);

        assert!(!policy(&directory).is_complete(&principal).await.unwrap());
        assert_eq!(directory.gets(), 1);
    }

    #[tokio::test]
    async fn test_remote_attribute_missing_is_incomplete() {
        let directory = Arc::new(CountingDirectory::with_user("00u1", None));
        let principal = Principal::from_claims([("sub", "00u1")]);

        assert!(!policy(&directory).is_complete(&principal).await.unwrap());
        assert_eq!(directory.gets(), 1);
    }

    #[tokio::test]
    async fn test_missing_subject_is_internal_error() {
        let directory = Arc::new(CountingDirectory::default());
        let principal = Principal::from_claims([("email", "a@b.com")]);

        let err = policy(&directory).is_complete(&principal).await.unwrap_err();
        assert!(matches!(err, AppError::MissingClaim { claim: "sub" }));
        assert_eq!(directory.gets(), 0);
    }

    #[tokio::test]
    async fn test_directory_error_propagates() {
        let directory = Arc::new(CountingDirectory::failing(500, "Internal Server Error"));
        let principal = Principal::from_claims([("sub", "00u1")]);

        let err = policy(&directory).is_complete(&principal).await.unwrap_err();
        assert!(matches!(err, AppError::Directory(_)));
        assert_eq!(directory.gets(), 1);
    }
}
