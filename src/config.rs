//! Exchange configuration.
//!
//! Only sizing knobs live here; grid shape and extents come from the mesh
//! domain that owns the exchange.

use crate::mesh_error::MeshHaloError;
use serde::{Deserialize, Serialize};

/// Most fields any single exchange kind moves (x, y, z, xd, yd, zd).
pub const DEFAULT_MAX_FIELDS: usize = 6;
/// Corner messages are padded to this many bytes.
pub const DEFAULT_CACHE_LINE_BYTES: usize = 128;

/// Sizing of the pre-allocated message buffers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaloConfig {
    /// Upper bound on the number of fields in one exchange round.
    pub max_fields: usize,
    /// Padding unit for corner regions, so each corner message starts on its
    /// own cache line.
    pub cache_line_bytes: usize,
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            cache_line_bytes: DEFAULT_CACHE_LINE_BYTES,
        }
    }
}

impl HaloConfig {
    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields;
        self
    }

    pub fn with_cache_line_bytes(mut self, bytes: usize) -> Self {
        self.cache_line_bytes = bytes;
        self
    }

    pub fn validate(&self) -> Result<(), MeshHaloError> {
        if self.max_fields == 0 {
            return Err(MeshHaloError::Config("max_fields must be at least 1".into()));
        }
        if self.cache_line_bytes == 0 || !self.cache_line_bytes.is_power_of_two() {
            return Err(MeshHaloError::Config(format!(
                "cache_line_bytes must be a power of two, got {}",
                self.cache_line_bytes
            )));
        }
        Ok(())
    }

    /// Corner padding unit expressed in elements of `elem_bytes` bytes.
    pub fn pad_elements(&self, elem_bytes: usize) -> usize {
        (self.cache_line_bytes / elem_bytes.max(1)).max(1)
    }
}
