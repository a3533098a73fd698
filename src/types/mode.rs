//! Session mode definitions

use serde::{Deserialize, Serialize};

use crate::types::ResourceKind;

/// Game mode of a session, fixed for the session lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionMode {
    /// No shared progress, nothing is locked or replicated
    Sandbox,
    /// Only science is shared
    Science,
    /// Funds, science, reputation, technology and contracts are shared
    Career,
}

impl SessionMode {
    /// Resource kinds replicated in this mode
    pub fn replicated_kinds(&self) -> &'static [ResourceKind] {
        match self {
            SessionMode::Sandbox => &[],
            SessionMode::Science => &[ResourceKind::Science],
            SessionMode::Career => &ResourceKind::ALL,
        }
    }

    /// Is `kind` replicated in this mode?
    pub fn replicates(&self, kind: ResourceKind) -> bool {
        self.replicated_kinds().contains(&kind)
    }

    /// Does this mode compete for contract generation authority?
    pub fn uses_contract_lock(&self) -> bool {
        matches!(self, SessionMode::Career)
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionMode::Sandbox => "SANDBOX",
            SessionMode::Science => "SCIENCE",
            SessionMode::Career => "CAREER",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(SessionMode::Sandbox),
            "science" => Ok(SessionMode::Science),
            "career" => Ok(SessionMode::Career),
            other => Err(format!("unknown session mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_replicates_nothing() {
        assert!(SessionMode::Sandbox.replicated_kinds().is_empty());
        assert!(!SessionMode::Sandbox.uses_contract_lock());
    }

    #[test]
    fn test_science_replicates_science_only() {
        assert!(SessionMode::Science.replicates(ResourceKind::Science));
        assert!(!SessionMode::Science.replicates(ResourceKind::Funds));
        assert!(!SessionMode::Science.replicates(ResourceKind::Contract));
        assert!(!SessionMode::Science.uses_contract_lock());
    }

    #[test]
    fn test_career_replicates_everything() {
        for kind in ResourceKind::ALL {
            assert!(SessionMode::Career.replicates(kind));
        }
        assert!(SessionMode::Career.uses_contract_lock());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Career".parse::<SessionMode>(), Ok(SessionMode::Career));
        assert!("campaign".parse::<SessionMode>().is_err());
    }
}
