//! Member identifier template

/// Prefix of every service account member string
pub const SERVICE_ACCOUNT_MEMBER_PREFIX: &str = "serviceAccount:";

/// Format a bare service account email as a binding member (`serviceAccount:<email>`)
pub fn service_account_member(email: &str) -> String {
    format!("{SERVICE_ACCOUNT_MEMBER_PREFIX}{email}")
}
