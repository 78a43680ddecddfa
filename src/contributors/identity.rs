use serde::{Deserialize, Serialize};

/// A contributor with a verified platform account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerifiedContributor {
    /// Stable account handle
    pub login: String,
    pub avatar_url: String,
    /// Profile page
    pub html_url: String,
}

/// Who authored (or co-authored) a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContributorIdentity {
    /// Resolved to a platform account
    #[serde(rename = "github_user")]
    Verified(VerifiedContributor),
    /// Bare VCS identity with no linked account
    #[serde(rename = "git_user")]
    Unverified { name: String, email: String },
}

impl ContributorIdentity {
    pub fn verified(
        login: impl Into<String>,
        avatar_url: impl Into<String>,
        html_url: impl Into<String>,
    ) -> Self {
        Self::Verified(VerifiedContributor {
            login: login.into(),
            avatar_url: avatar_url.into(),
            html_url: html_url.into(),
        })
    }

    pub fn unverified(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::Unverified {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Deduplication key: the account handle when verified, else the email address
    pub fn key(&self) -> &str {
        match self {
            Self::Verified(user) => &user.login,
            Self::Unverified { email, .. } => email,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Verified(user) => &user.login,
            Self::Unverified { name, .. } => name,
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.as_verified().map(|user| user.avatar_url.as_str())
    }

    pub fn as_verified(&self) -> Option<&VerifiedContributor> {
        match self {
            Self::Verified(user) => Some(user),
            Self::Unverified { .. } => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.as_verified().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefers_login() {
        let verified = ContributorIdentity::verified("octocat", "https://a/1", "https://gh/octocat");
        assert_eq!(verified.key(), "octocat");
        assert!(verified.is_verified());

        let bare = ContributorIdentity::unverified("Octo Cat", "octo@example.com");
        assert_eq!(bare.key(), "octo@example.com");
        assert_eq!(bare.display_name(), "Octo Cat");
        assert_eq!(bare.avatar_url(), None);
    }

    #[test]
    fn test_serialized_kind_tags() {
        let verified = ContributorIdentity::verified("octocat", "https://a/1", "https://gh/octocat");
        let json = serde_json::to_value(&verified).unwrap();
        assert_eq!(json["type"], "github_user");
        assert_eq!(json["login"], "octocat");

        let bare = ContributorIdentity::unverified("Octo", "octo@example.com");
        let json = serde_json::to_value(&bare).unwrap();
        assert_eq!(json["type"], "git_user");
        assert_eq!(json["email"], "octo@example.com");
    }
}
