use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Whether a path may be visited without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

/// Allow-list of routes reachable without a session token.
///
/// Loaded as data so deployments can extend it:
///
/// ```yaml
/// exact:
///   - /
///   - /pages/login
/// prefixes:
///   - /pages/public
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoutes {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl Default for PublicRoutes {
    fn default() -> Self {
        Self {
            exact: vec![
                "/".to_string(),
                "/pages/login".to_string(),
                "/pages/cadastro".to_string(),
            ],
            prefixes: Vec::new(),
        }
    }
}

impl PublicRoutes {
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { exact, prefixes }
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Classify a navigation target. A missing or malformed path is protected.
    pub fn classify(&self, path: Option<&str>) -> RouteClass {
        let Some(path) = path.and_then(normalize) else {
            return RouteClass::Protected;
        };

        let exact = self.exact.iter().filter_map(|p| normalize(p)).any(|p| p == path);
        let prefixed = self
            .prefixes
            .iter()
            .filter_map(|p| normalize(p))
            .any(|prefix| has_segment_prefix(path, prefix));

        if exact || prefixed {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }

    pub fn is_public(&self, path: Option<&str>) -> bool {
        self.classify(path) == RouteClass::Public
    }
}

/// Strip query string, fragment and trailing slash. Paths must be absolute.
fn normalize(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    if !path.starts_with('/') {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    Some(if trimmed.is_empty() { "/" } else { trimmed })
}

fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
