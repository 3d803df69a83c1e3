use std::fmt;

use serde::Deserialize;

/// One of the two marketplace pools a GPU can be rented from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScope {
    Secure,
    Community,
}

impl MarketScope {
    pub fn label(self) -> &'static str {
        match self {
            Self::Secure => "SECURE",
            Self::Community => "COMMUNITY",
        }
    }

    pub fn secure_cloud(self) -> bool {
        matches!(self, Self::Secure)
    }
}

impl fmt::Display for MarketScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMode {
    #[default]
    Auto,
    Secure,
    Community,
    Both,
}

impl MarketMode {
    /// Markets to poll, in cycle order. Auto narrows to the secure pool when
    /// a network volume is configured, since volumes only attach there.
    pub fn scopes(self, has_network_volume: bool) -> Vec<MarketScope> {
        match self {
            Self::Secure => vec![MarketScope::Secure],
            Self::Community => vec![MarketScope::Community],
            Self::Both => vec![MarketScope::Secure, MarketScope::Community],
            Self::Auto => {
                if has_network_volume {
                    vec![MarketScope::Secure]
                } else {
                    vec![MarketScope::Secure, MarketScope::Community]
                }
            }
        }
    }
}

impl fmt::Display for MarketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            Self::Auto => "auto",
            Self::Secure => "secure",
            Self::Community => "community",
            Self::Both => "both",
        };
        write!(f, "{mode}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_narrows_to_secure_with_volume() {
        assert_eq!(MarketMode::Auto.scopes(true), vec![MarketScope::Secure]);
    }

    #[test]
    fn test_auto_watches_both_without_volume() {
        assert_eq!(
            MarketMode::Auto.scopes(false),
            vec![MarketScope::Secure, MarketScope::Community]
        );
    }

    #[test]
    fn test_explicit_modes_ignore_volume() {
        assert_eq!(MarketMode::Secure.scopes(false), vec![MarketScope::Secure]);
        assert_eq!(
            MarketMode::Community.scopes(true),
            vec![MarketScope::Community]
        );
        assert_eq!(
            MarketMode::Both.scopes(true),
            vec![MarketScope::Secure, MarketScope::Community]
        );
    }

    #[test]
    fn test_mode_parses_from_lowercase_yaml() {
        let mode: MarketMode = serde_yaml::from_str("community").unwrap();
        assert_eq!(mode, MarketMode::Community);
        assert!(serde_yaml::from_str::<MarketMode>("sideways").is_err());
    }

    #[test]
    fn test_scope_labels() {
        assert_eq!(MarketScope::Secure.to_string(), "SECURE");
        assert_eq!(MarketScope::Community.to_string(), "COMMUNITY");
        assert!(MarketScope::Secure.secure_cloud());
        assert!(!MarketScope::Community.secure_cloud());
    }
}
