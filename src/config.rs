//! Configuration for encoding, decoding, logging and file transport.
//!
//! Every section has sensible defaults and can be loaded from or saved to
//! JSON.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, Result};

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrConfig {
    /// Wire codec limits and decode behaviour.
    pub codec: CodecConfig,
    /// Tracing subscriber setup.
    pub logging: LoggingConfig,
    /// File transport limits.
    pub io: IoConfig,
}

impl IrConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| IrError::InvalidInput(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| IrError::Serialization(e.to_string()))
    }
}

/// Codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest encoded message accepted by decode (default: 268435456 = 256MB).
    pub max_message_bytes: usize,
    /// Decode AuxData entries whose shape is in the schema while loading
    /// (default: true). Other entries stay raw until read.
    pub eager_aux_data: bool,
    /// Reject trees whose symbols refer to nodes that are not in the tree
    /// (default: false).
    pub strict_symbol_referents: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 268435456, // 256MB
            eager_aux_data: true,
            strict_symbol_referents: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output (default: false).
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset (default: "info").
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_filter: "info".to_string(),
        }
    }
}

/// File transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Maximum IR file size to load (default: 1073741824 = 1GB).
    pub max_file_size: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1073741824, // 1GB
        }
    }
}
