//! Template identity and file naming

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stencil_core::{Config, Direction, Flavor, Strategy, Type};

/// Identity of one generated template.
///
/// Two equal keys always produce interchangeable templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub ty: Type,
    pub format: String,
    pub direction: Direction,
    pub flavor: Flavor,
    pub strategy: Strategy,
    /// Tag of the configuration options that change generated code
    pub variation: String,
}

impl CacheKey {
    /// Key for a JSON template; encoding has no lazy strategy
    pub fn new(
        ty: Type,
        direction: Direction,
        flavor: Flavor,
        strategy: Strategy,
        config: &Config,
    ) -> Self {
        Self {
            ty,
            format: stencil_json::FORMAT.to_string(),
            direction,
            flavor,
            strategy: match direction {
                Direction::Encode => Strategy::Eager,
                Direction::Decode => strategy,
            },
            variation: config.variation_tag(),
        }
    }

    /// Hex SHA-256 of the key fields
    pub fn digest(&self) -> String {
        let canonical = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.ty, self.format, self.direction, self.flavor, self.strategy, self.variation
        );
        compute_sha256(canonical.as_bytes())
    }

    /// `<digest>.<format>.<direction>.<flavor>.<strategy>.tpl`
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{}",
            self.digest(),
            self.format,
            self.direction,
            self.flavor,
            self.strategy,
            TEMPLATE_EXTENSION
        )
    }
}

/// Extension of template files in the cache directory
pub const TEMPLATE_EXTENSION: &str = "tpl";

/// Compute SHA256 hash of data and return as hex string.
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
