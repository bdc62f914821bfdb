use super::error::PipelineError;
use crate::core::detect::{DetectionPolicy, ModelType};
use crate::core::video::EnhancementLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 用户扫描设置（宿主端以 camelCase JSON 传入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanSettings {
    pub confidence_threshold: f32,
    pub max_detections: usize,
    /// Sample every N frames (at 30 fps) instead of the duration table
    pub frame_skip: Option<u32>,
    /// Replaces the 10 px minimum crop margin
    pub bounding_box_padding: Option<f32>,
    pub image_enhancement: EnhancementLevel,
    pub model_type: ModelType,
    pub normalize_frames: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            max_detections: 20,
            frame_skip: None,
            bounding_box_padding: None,
            image_enhancement: EnhancementLevel::Advanced,
            model_type: ModelType::Accurate,
            normalize_frames: false,
        }
    }
}

impl ScanSettings {
    /// 移动设备：稀疏采样 + 轻量模型
    pub fn for_mobile() -> Self {
        Self {
            frame_skip: Some(10),
            model_type: ModelType::Lite,
            image_enhancement: EnhancementLevel::Basic,
            ..Default::default()
        }
    }

    /// 省电模式：更稀疏，不做增强
    pub fn for_low_power() -> Self {
        Self {
            frame_skip: Some(15),
            model_type: ModelType::Lite,
            image_enhancement: EnhancementLevel::None,
            ..Default::default()
        }
    }

    pub fn for_high_performance() -> Self {
        Self {
            frame_skip: Some(2),
            model_type: ModelType::Accurate,
            image_enhancement: EnhancementLevel::Advanced,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PipelineError::InvalidSettings(format!(
                "confidenceThreshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.max_detections == 0 {
            return Err(PipelineError::InvalidSettings(
                "maxDetections must be at least 1".to_string(),
            ));
        }
        if let Some(padding) = self.bounding_box_padding {
            if !padding.is_finite() || padding < 0.0 {
                return Err(PipelineError::InvalidSettings(format!(
                    "boundingBoxPadding must be a non-negative number, got {}",
                    padding
                )));
            }
        }
        Ok(())
    }
}

/// Pipeline tunables that are not user settings
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub policy: DetectionPolicy,
    pub thumbnail_quality: u8,
    pub crop_quality: u8,
    pub progress_interval: Duration,
    pub worker_timeout: Duration,
    /// Seeks stop this far before the end of the video
    pub seek_end_guard: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::default(),
            thumbnail_quality: 70,
            crop_quality: 90,
            progress_interval: Duration::from_millis(200),
            worker_timeout: crate::core::video::worker::DEFAULT_TIMEOUT,
            seek_end_guard: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ScanSettings::default();
        assert_eq!(settings.confidence_threshold, 0.6);
        assert_eq!(settings.max_detections, 20);
        assert_eq!(settings.image_enhancement, EnhancementLevel::Advanced);
        assert_eq!(settings.model_type, ModelType::Accurate);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_camel_case_json() {
        let settings: ScanSettings = serde_json::from_str(
            r#"{"confidenceThreshold":0.4,"frameSkip":6,"imageEnhancement":"ultra","modelType":"lite"}"#,
        )
        .unwrap();
        assert_eq!(settings.confidence_threshold, 0.4);
        assert_eq!(settings.frame_skip, Some(6));
        assert_eq!(settings.image_enhancement, EnhancementLevel::Ultra);
        assert_eq!(settings.model_type, ModelType::Lite);
        // 缺省字段取默认值
        assert_eq!(settings.max_detections, 20);

        let json = serde_json::to_string(&ScanSettings::default()).unwrap();
        assert!(json.contains("\"maxDetections\":20"));
        assert!(json.contains("\"normalizeFrames\":false"));
    }

    #[test]
    fn test_validation() {
        let bad_threshold = ScanSettings {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad_threshold.validate(), Err(PipelineError::InvalidSettings(_))));

        let bad_max = ScanSettings {
            max_detections: 0,
            ..Default::default()
        };
        assert!(bad_max.validate().is_err());

        let bad_padding = ScanSettings {
            bounding_box_padding: Some(-1.0),
            ..Default::default()
        };
        assert!(bad_padding.validate().is_err());
    }

    #[test]
    fn test_device_presets() {
        let mobile = ScanSettings::for_mobile();
        assert_eq!(mobile.frame_skip, Some(10));
        assert_eq!(mobile.model_type, ModelType::Lite);

        let low = ScanSettings::for_low_power();
        assert_eq!(low.frame_skip, Some(15));
        assert_eq!(low.image_enhancement, EnhancementLevel::None);

        let high = ScanSettings::for_high_performance();
        assert_eq!(high.frame_skip, Some(2));
        assert_eq!(high.model_type, ModelType::Accurate);
    }
}
