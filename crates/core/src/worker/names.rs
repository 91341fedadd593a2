//! Generation-scoped store names.

use serde::{Deserialize, Serialize};

/// The static and dynamic store names for one deployment generation.
///
/// Both names embed the same version tag, so bumping it orphans every store
/// from earlier generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    version: String,
    static_name: String,
    dynamic_name: String,
}

impl CacheNames {
    pub fn new(app: &str, version: &str) -> Self {
        Self {
            version: version.to_string(),
            static_name: format!("{app}-static-{version}"),
            dynamic_name: format!("{app}-dynamic-{version}"),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn static_name(&self) -> &str {
        &self.static_name
    }

    pub fn dynamic_name(&self) -> &str {
        &self.dynamic_name
    }

    /// True for the two stores this generation owns.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}
