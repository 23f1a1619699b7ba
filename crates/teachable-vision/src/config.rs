//! Loop configuration.

use serde::{Deserialize, Serialize};

use crate::types::{VisionError, VisionResult};

/// Default number of trainable classes.
pub const DEFAULT_NUM_CLASSES: usize = 5;

/// Default neighbor count for predictions.
pub const DEFAULT_TOP_K: usize = 30;

/// Default display refresh rate.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Upper bound on classes so each one maps to a digit key.
pub const MAX_NUM_CLASSES: usize = 9;

/// Settings fixed at startup for the capture-predict loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub num_classes: usize,
    pub top_k: usize,
    pub frame_rate: u32,
    /// Per-class cap enforced by the classifier; `None` keeps every example.
    #[serde(default)]
    pub max_examples_per_class: Option<usize>,
    /// Stop after this many iterations; `None` runs until the process exits.
    #[serde(default)]
    pub max_frames: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            num_classes: DEFAULT_NUM_CLASSES,
            top_k: DEFAULT_TOP_K,
            frame_rate: DEFAULT_FRAME_RATE,
            max_examples_per_class: None,
            max_frames: None,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> VisionResult<()> {
        if self.num_classes == 0 || self.num_classes > MAX_NUM_CLASSES {
            return Err(VisionError::InvalidInput(format!(
                "num_classes must be between 1 and {MAX_NUM_CLASSES}, got {}",
                self.num_classes
            )));
        }
        if self.frame_rate == 0 {
            return Err(VisionError::InvalidInput(
                "frame_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.num_classes, 5);
        assert_eq!(config.top_k, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_class_count() {
        let mut config = LoopConfig {
            num_classes: 0,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());
        config.num_classes = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_k_is_allowed() {
        let config = LoopConfig {
            top_k: 0,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_missing_optionals() {
        let config: LoopConfig =
            serde_json::from_str(r#"{"num_classes":3,"top_k":10,"frame_rate":30}"#).unwrap();
        assert_eq!(config.max_frames, None);
        assert_eq!(config.num_classes, 3);
    }
}
