//! 测试用检测器 / 加载器

use super::backend::{Classifier, Detector, DetectorLoader, ModelConfig, ModelType};
use super::error::DetectError;
use super::result::{Classification, Prediction};
use crate::core::video::{Frame, PixelBuffer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One recorded `detect` call
#[derive(Debug, Clone, PartialEq)]
pub struct DetectCall {
    pub frame_number: u64,
    pub time: f64,
    pub max_results: Option<usize>,
    pub min_score: Option<f32>,
}

type Pattern = Box<dyn Fn(&Frame) -> Result<Vec<Prediction>, DetectError> + Send + Sync>;

/// 按帧模式返回预测结果，并记录每次调用的阈值
pub struct MockDetector {
    pattern: Pattern,
    calls: Mutex<Vec<DetectCall>>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self::with_pattern(|_| Vec::new())
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> Vec<Prediction> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(move |frame| Ok(pattern(frame))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallible_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> Result<Vec<Prediction>, DetectError> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::with_fallible_pattern(|_| Err(DetectError::Inference("mock failure".to_string())))
    }

    pub fn calls(&self) -> Vec<DetectCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for MockDetector {
    fn detect(
        &self,
        frame: &Frame,
        max_results: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Prediction>, DetectError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DetectCall {
                frame_number: frame.frame_number,
                time: frame.time_secs(),
                max_results,
                min_score,
            });
        (self.pattern)(frame)
    }
}

/// Shares a detector so tests can inspect its calls after a run
impl Detector for Arc<MockDetector> {
    fn detect(
        &self,
        frame: &Frame,
        max_results: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Prediction>, DetectError> {
        self.as_ref().detect(frame, max_results, min_score)
    }
}

pub struct MockClassifier {
    results: Vec<Classification>,
}

impl MockClassifier {
    pub fn new(results: Vec<(&str, f32)>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|(name, p)| Classification::new(name, p))
                .collect(),
        }
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _image: &PixelBuffer) -> Result<Vec<Classification>, DetectError> {
        Ok(self.results.clone())
    }
}

type DetectorFactory = Box<dyn Fn() -> Box<dyn Detector> + Send + Sync>;

pub struct MockDetectorLoader {
    factory: DetectorFactory,
    failing: HashSet<ModelType>,
    load_delay: Duration,
    classifier: Option<Vec<(String, f32)>>,
    loads: AtomicUsize,
    attempts: Mutex<Vec<ModelType>>,
}

impl MockDetectorLoader {
    pub fn new() -> Self {
        Self::with_factory(|| Box::new(MockDetector::new()))
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn Detector> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            failing: HashSet::new(),
            load_delay: Duration::ZERO,
            classifier: None,
            loads: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, model_type: ModelType) -> Self {
        self.failing.insert(model_type);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn with_classifier(mut self, results: Vec<(&str, f32)>) -> Self {
        self.classifier = Some(results.into_iter().map(|(n, p)| (n.to_string(), p)).collect());
        self
    }

    /// Successful loads
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<ModelType> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for MockDetectorLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorLoader for MockDetectorLoader {
    fn load(&self, config: &ModelConfig) -> Result<Box<dyn Detector>, DetectError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config.model_type);

        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }

        if self.failing.contains(&config.model_type) {
            return Err(DetectError::ModelLoad {
                model: config.base.clone(),
                reason: "mock load failure".to_string(),
            });
        }

        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok((self.factory)())
    }

    fn load_classifier(&self) -> Result<Box<dyn Classifier>, DetectError> {
        match &self.classifier {
            Some(results) => Ok(Box::new(MockClassifier::new(
                results.iter().map(|(n, p)| (n.as_str(), *p)).collect(),
            ))),
            None => Err(DetectError::ModelLoad {
                model: "classifier".to_string(),
                reason: "not configured".to_string(),
            }),
        }
    }
}
