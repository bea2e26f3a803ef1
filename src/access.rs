//! Operator-only access control.
//!
//! When neither an admin id nor an admin username is configured the bot is open
//! to everyone. This is a deliberate deployment mode, logged at startup.

/// The configured operator, normalised for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorIdentity {
    numeric_id: Option<String>,
    username: Option<String>,
}

fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('@').to_lowercase();
    (!name.is_empty()).then_some(name)
}

impl OperatorIdentity {
    pub fn new(numeric_id: Option<&str>, username: Option<&str>) -> Self {
        Self {
            numeric_id: numeric_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            username: username.and_then(normalize_username),
        }
    }

    /// True when no operator is configured and every sender is allowed.
    pub fn is_open(&self) -> bool {
        self.numeric_id.is_none() && self.username.is_none()
    }

    /// Whether a sender with this id and optional username may use the bot.
    pub fn allows(&self, sender_id: u64, sender_username: Option<&str>) -> bool {
        if self.is_open() {
            return true;
        }

        let id_match = self
            .numeric_id
            .as_deref()
            .is_some_and(|id| id == sender_id.to_string());

        let username_match = match (&self.username, sender_username.and_then(normalize_username)) {
            (Some(expected), Some(actual)) => *expected == actual,
            _ => false,
        };

        id_match || username_match
    }
}

impl std::fmt::Display for OperatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.numeric_id, &self.username) {
            (None, None) => write!(f, "everyone"),
            (Some(id), None) => write!(f, "id {}", id),
            (None, Some(name)) => write!(f, "@{}", name),
            (Some(id), Some(name)) => write!(f, "id {} or @{}", id, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_policy_allows_everyone() {
        let op = OperatorIdentity::new(None, None);
        assert!(op.is_open());
        assert!(op.allows(1, None));
        assert!(op.allows(42, Some("stranger")));
    }

    #[test]
    fn test_blank_settings_are_open() {
        let op = OperatorIdentity::new(Some("  "), Some("@"));
        assert!(op.is_open());
    }

    #[test]
    fn test_numeric_id_match() {
        let op = OperatorIdentity::new(Some("123456"), None);
        assert!(op.allows(123456, None));
        assert!(!op.allows(654321, Some("123456")));
    }

    #[test]
    fn test_username_is_case_insensitive_and_at_stripped() {
        let op = OperatorIdentity::new(None, Some("@ChannelBoss"));
        assert!(op.allows(1, Some("channelboss")));
        assert!(op.allows(2, Some("@CHANNELBOSS")));
        assert!(!op.allows(3, Some("channelboss2")));
        assert!(!op.allows(4, None));
    }

    #[test]
    fn test_either_identity_matches() {
        let op = OperatorIdentity::new(Some("10"), Some("boss"));
        assert!(op.allows(10, Some("someone")));
        assert!(op.allows(99, Some("Boss")));
        assert!(!op.allows(99, Some("someone")));
    }

    #[test]
    fn test_display() {
        assert_eq!(OperatorIdentity::new(None, None).to_string(), "everyone");
        assert_eq!(
            OperatorIdentity::new(Some("7"), Some("@Boss")).to_string(),
            "id 7 or @boss"
        );
    }
}
