// ABOUTME: Downstream service definitions for the tool router
// ABOUTME: Maps service names to base URLs and the actions wired through so far

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// The downstream service family the tool router forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Blog platform
    Lattice,
    /// Object storage
    Amber,
    /// Social feed
    Bloom,
    /// Analytics
    Pulse,
    /// Deal finding
    Forage,
    /// Remote development workspaces
    Arbor,
}

impl Service {
    /// Base URL for this service, overridable per deployment.
    pub fn base_url(&self) -> String {
        let env_var = match self {
            Self::Lattice => "GROVE_LATTICE_URL",
            Self::Amber => "GROVE_AMBER_URL",
            Self::Bloom => "GROVE_BLOOM_URL",
            Self::Pulse => "GROVE_PULSE_URL",
            Self::Forage => "GROVE_FORAGE_URL",
            Self::Arbor => "GROVE_ARBOR_URL",
        };

        std::env::var(env_var).unwrap_or_else(|_| match self {
            Self::Lattice => "https://lattice.grove.dev".to_string(),
            Self::Amber => "https://amber.grove.dev".to_string(),
            Self::Bloom => "https://bloom.grove.dev".to_string(),
            Self::Pulse => "https://pulse.grove.dev".to_string(),
            Self::Forage => "https://forage.grove.dev".to_string(),
            Self::Arbor => "https://arbor.grove.dev".to_string(),
        })
    }

    /// REST path an action forwards to, if it is wired through. Most tool
    /// actions are not wired yet and get a stub response from the router.
    pub fn route_for(&self, action: &str) -> Option<&'static str> {
        match (self, action) {
            (Self::Lattice, "publish_post") => Some("/posts"),
            (Self::Lattice, "search_posts") => Some("/posts/search"),
            (Self::Amber, "put_object") => Some("/objects"),
            (Self::Bloom, "create_note") => Some("/notes"),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Lattice,
            Self::Amber,
            Self::Bloom,
            Self::Pulse,
            Self::Forage,
            Self::Arbor,
        ]
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lattice => write!(f, "lattice"),
            Self::Amber => write!(f, "amber"),
            Self::Bloom => write!(f, "bloom"),
            Self::Pulse => write!(f, "pulse"),
            Self::Forage => write!(f, "forage"),
            Self::Arbor => write!(f, "arbor"),
        }
    }
}

impl FromStr for Service {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lattice" => Ok(Self::Lattice),
            "amber" => Ok(Self::Amber),
            "bloom" => Ok(Self::Bloom),
            "pulse" => Ok(Self::Pulse),
            "forage" => Ok(Self::Forage),
            "arbor" => Ok(Self::Arbor),
            _ => Err(ServiceError::NotFound(format!(
                "Unknown service: {}. Supported: lattice, amber, bloom, pulse, forage, arbor",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_parsing() {
        assert_eq!("lattice".parse::<Service>().unwrap(), Service::Lattice);
        assert_eq!("AMBER".parse::<Service>().unwrap(), Service::Amber);
        assert!("maple".parse::<Service>().is_err());
    }

    #[test]
    fn test_service_display() {
        assert_eq!(Service::Bloom.to_string(), "bloom");
        assert_eq!(Service::Arbor.to_string(), "arbor");
    }

    #[test]
    fn test_route_for() {
        assert_eq!(Service::Lattice.route_for("publish_post"), Some("/posts"));
        assert_eq!(Service::Pulse.route_for("query"), None);
    }
}
