//! Profile screen presentation

use auth_store::UserRecord;
use serde::{Deserialize, Serialize};

/// Everything the profile screen renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    /// Greeting line
    pub greeting: String,
    /// Email line, shown when the account has one
    pub email: Option<String>,
}

impl ProfileView {
    /// Build the view for the current user, if any
    pub fn for_user(user: Option<&UserRecord>) -> Self {
        Self {
            greeting: profile_greeting(user),
            email: user.and_then(|u| u.email.clone()),
        }
    }
}

/// The greeting shown at the top of the profile screen
pub fn profile_greeting(user: Option<&UserRecord>) -> String {
    match user {
        Some(user) => format!("Welcome, {}!", user.name),
        None => "No user logged in".to_string(),
    }
}
