//! Builder configuration
//!
//! Controls buffer sizing for message builders.

use serde::Deserialize;

use crate::{CodecError, MAX_BUFFER_SIZE, Result};

/// Default preallocated buffer size in bytes
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Builder configuration
///
/// # Example
///
/// ```toml
/// [flatbuf]
/// initial_capacity = 4096
/// max_buffer_size = 1048576
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Bytes allocated up front (0 defers allocation to the first write)
    /// Default: 1024
    pub initial_capacity: usize,

    /// Largest message the builder may grow to
    /// Default: 2^31 - 1 (the wire-format ceiling)
    pub max_buffer_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl BuilderConfig {
    /// Check limits against each other and the wire-format ceiling
    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_size > MAX_BUFFER_SIZE {
            return Err(CodecError::invalid_config(format!(
                "max_buffer_size {} exceeds wire-format maximum {}",
                self.max_buffer_size, MAX_BUFFER_SIZE
            )));
        }
        if self.initial_capacity > self.max_buffer_size {
            return Err(CodecError::invalid_config(format!(
                "initial_capacity {} exceeds max_buffer_size {}",
                self.initial_capacity, self.max_buffer_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.max_buffer_size, MAX_BUFFER_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty() {
        let config: BuilderConfig = toml::from_str("").unwrap();
        assert_eq!(config, BuilderConfig::default());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
initial_capacity = 4096
max_buffer_size = 1048576
"#;
        let config: BuilderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.initial_capacity, 4096);
        assert_eq!(config.max_buffer_size, 1_048_576);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_section() {
        #[derive(Deserialize)]
        struct Wrapper {
            flatbuf: BuilderConfig,
        }

        let toml = r#"
[flatbuf]
initial_capacity = 0
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.flatbuf.initial_capacity, 0);
        assert_eq!(wrapper.flatbuf.max_buffer_size, MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_validate_limit_above_ceiling() {
        let config = BuilderConfig {
            initial_capacity: 0,
            max_buffer_size: MAX_BUFFER_SIZE + 1,
        };
        assert!(matches!(config.validate(), Err(CodecError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_capacity_above_limit() {
        let config = BuilderConfig {
            initial_capacity: 8192,
            max_buffer_size: 4096,
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid config: initial_capacity 8192 exceeds max_buffer_size 4096"
        );
    }
}
