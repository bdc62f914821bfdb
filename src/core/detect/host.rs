//! 宿主检测器 - 重放宿主端模型对每帧给出的原始预测

use super::backend::Detector;
use super::error::DetectError;
use super::policy::DetectionPolicy;
use super::result::Prediction;
use crate::core::video::Frame;
use std::collections::HashMap;

/// Replays predictions the host computed for each decoded frame, keyed by
/// frame number. Frames without an entry yield no predictions.
#[derive(Debug, Clone, Default)]
pub struct HostDetector {
    predictions: HashMap<u64, Vec<Prediction>>,
}

impl HostDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame_number: u64, predictions: Vec<Prediction>) {
        self.predictions.entry(frame_number).or_default().extend(predictions);
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

impl FromIterator<(u64, Vec<Prediction>)> for HostDetector {
    fn from_iter<I: IntoIterator<Item = (u64, Vec<Prediction>)>>(iter: I) -> Self {
        let mut detector = Self::new();
        for (frame_number, predictions) in iter {
            detector.insert(frame_number, predictions);
        }
        detector
    }
}

impl Detector for HostDetector {
    fn detect(
        &self,
        frame: &Frame,
        max_results: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Prediction>, DetectError> {
        let Some(predictions) = self.predictions.get(&frame.frame_number) else {
            return Ok(Vec::new());
        };

        if let Some(bad) = predictions.iter().find(|p| !p.score.is_finite()) {
            return Err(DetectError::Inference(format!(
                "host prediction '{}' on frame {} has score {}",
                bad.label, frame.frame_number, bad.score
            )));
        }

        Ok(DetectionPolicy::select(
            predictions.clone(),
            min_score.unwrap_or(0.0),
            max_results,
        ))
    }
}
