//! 检测调用策略 - 有效阈值、结果筛选、零结果重试

use super::backend::Detector;
use super::error::DetectError;
use super::result::Prediction;
use crate::core::video::Frame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPolicy {
    /// 配置阈值乘以该系数，检出更多候选
    pub threshold_scale: f32,
    pub threshold_floor: f32,
    /// Fixed threshold used by the zero-result retry pass
    pub retry_threshold: f32,
    /// Hard ceiling on results per frame, whatever `maxDetections` says
    pub max_results_cap: usize,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            threshold_scale: 0.7,
            threshold_floor: 0.25,
            retry_threshold: 0.1,
            max_results_cap: 20,
        }
    }
}

impl DetectionPolicy {
    pub fn effective_threshold(&self, configured: f32) -> f32 {
        self.threshold_floor.max(configured * self.threshold_scale)
    }

    pub fn result_limit(&self, max_detections: usize) -> usize {
        max_detections.min(self.max_results_cap)
    }

    /// Primary pass: effective threshold, sorted by score, capped.
    pub fn detect_frame(
        &self,
        detector: &dyn Detector,
        frame: &Frame,
        configured_threshold: f32,
        max_detections: usize,
    ) -> Result<Vec<Prediction>, DetectError> {
        let threshold = self.effective_threshold(configured_threshold);
        let predictions = detector.detect(frame, None, Some(threshold))?;
        Ok(Self::select(predictions, threshold, Some(self.result_limit(max_detections))))
    }

    /// Retry pass: fixed low threshold, no cap.
    pub fn detect_retry(&self, detector: &dyn Detector, frame: &Frame) -> Result<Vec<Prediction>, DetectError> {
        let predictions = detector.detect(frame, None, Some(self.retry_threshold))?;
        Ok(Self::select(predictions, self.retry_threshold, None))
    }

    /// `[0, d/2, max(0, d-1)]`
    pub fn retry_timestamps(duration: f64) -> [f64; 3] {
        let d = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        [0.0, d / 2.0, (d - 1.0).max(0.0)]
    }

    /// Drops predictions under `min_score`, stable-sorts the rest by
    /// descending score and truncates to `limit`.
    pub fn select(mut predictions: Vec<Prediction>, min_score: f32, limit: Option<usize>) -> Vec<Prediction> {
        predictions.retain(|p| p.score >= min_score);
        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(limit) = limit {
            predictions.truncate(limit);
        }
        predictions
    }
}
