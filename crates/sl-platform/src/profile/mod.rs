//! Profile completion
//!
//! - `policy`: decides whether a signed-in user's profile is complete
//! - `gate`: middleware redirecting incomplete profiles to the completion form

pub mod gate;
pub mod policy;

pub use gate::require_profile_completion;
pub use policy::ProfileCompletionPolicy;
