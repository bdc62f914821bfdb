//! 模型注册表 - 每种模型懒加载一次，并发加载共享同一次初始化

use super::backend::{Classifier, Detector, DetectorLoader, ModelConfig, ModelType};
use super::error::DetectError;
use super::result::Prediction;
use crate::core::video::Frame;
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A loaded detector, shared read-only between runs
#[derive(Clone)]
pub struct ModelHandle {
    /// Type that was actually loaded (may differ after fallback)
    pub model_type: ModelType,
    pub detector: Arc<dyn Detector>,
    pub classifier: Option<Arc<dyn Classifier>>,
}

impl ModelHandle {
    pub fn new(model_type: ModelType, detector: Arc<dyn Detector>) -> Self {
        Self {
            model_type,
            detector,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model_type", &self.model_type)
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}

/// 带分数下限的检测器：调用方的 min_score 只能更严，不能更松
struct ScoreFloor {
    inner: Box<dyn Detector>,
    floor: f32,
}

impl Detector for ScoreFloor {
    fn detect(
        &self,
        frame: &Frame,
        max_results: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Prediction>, DetectError> {
        let threshold = min_score.map_or(self.floor, |s| s.max(self.floor));
        let mut predictions = self.inner.detect(frame, max_results, Some(threshold))?;
        predictions.retain(|p| p.score >= threshold);
        Ok(predictions)
    }
}

type Slot = Arc<OnceCell<ModelHandle>>;

pub struct ModelRegistry {
    loader: Arc<dyn DetectorLoader>,
    slots: Mutex<HashMap<ModelType, Slot>>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_loaded(&self, model_type: ModelType) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&model_type)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Returns the cached model for `model_type`, loading it on first use.
    ///
    /// A failed non-standard load falls back to the standard configuration
    /// once. A failure is not cached; the next call retries.
    pub fn get(&self, model_type: ModelType) -> Result<ModelHandle, DetectError> {
        let slot: Slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(model_type).or_default().clone()
        };

        slot.get_or_try_init(|| self.load_with_fallback(model_type))
            .cloned()
    }

    fn load_with_fallback(&self, model_type: ModelType) -> Result<ModelHandle, DetectError> {
        match self.load(model_type) {
            Ok(handle) => Ok(handle),
            Err(e) if model_type != ModelType::Standard => {
                warn!("⚠️ {} model failed to load ({}), falling back to standard", model_type, e);
                self.load(ModelType::Standard)
            }
            Err(e) => Err(e),
        }
    }

    fn load(&self, model_type: ModelType) -> Result<ModelHandle, DetectError> {
        let config = ModelConfig::for_type(model_type);
        info!("📦 Loading {} detector ({})", model_type, config.base);

        let loaded = self.loader.load(&config)?;
        let detector: Arc<dyn Detector> = match config.score_threshold {
            Some(floor) => Arc::new(ScoreFloor { inner: loaded, floor }),
            None => Arc::from(loaded),
        };
        let mut handle = ModelHandle::new(model_type, detector);

        if config.secondary_classifier {
            match self.loader.load_classifier() {
                Ok(classifier) => handle = handle.with_classifier(Arc::from(classifier)),
                // 二级分类器可选，加载失败只记录
                Err(e) => warn!("⚠️ Secondary classifier unavailable: {}", e),
            }
        }

        info!("✅ {} detector ready", model_type);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detect::mock::{MockDetector, MockDetectorLoader};
    use crate::core::video::{BoundingBox, PixelBuffer};
    use std::time::Duration;

    fn two_scores() -> MockDetectorLoader {
        MockDetectorLoader::with_factory(|| {
            Box::new(MockDetector::with_pattern(|_| {
                vec![
                    Prediction::new("cup", 0.2, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
                    Prediction::new("dog", 0.5, BoundingBox::new(20.0, 0.0, 10.0, 10.0)),
                ]
            })) as Box<dyn Detector>
        })
    }

    #[test]
    fn test_loads_once_and_caches() {
        let loader = Arc::new(MockDetectorLoader::new());
        let registry = ModelRegistry::new(loader.clone());

        assert!(!registry.is_loaded(ModelType::Lite));
        let a = registry.get(ModelType::Lite).unwrap();
        let b = registry.get(ModelType::Lite).unwrap();
        assert_eq!(a.model_type, ModelType::Lite);
        assert!(Arc::ptr_eq(&a.detector, &b.detector));
        assert_eq!(loader.load_count(), 1);
        assert!(registry.is_loaded(ModelType::Lite));
    }

    #[test]
    fn test_concurrent_loads_share_one_initialisation() {
        let loader = Arc::new(MockDetectorLoader::new().with_load_delay(Duration::from_millis(50)));
        let registry = ModelRegistry::new(loader.clone());

        std::thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| {
                    registry.get(ModelType::Standard).unwrap();
                });
            }
        });

        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_falls_back_to_standard() {
        let loader = Arc::new(MockDetectorLoader::new().failing_for(ModelType::Accurate));
        let registry = ModelRegistry::new(loader.clone());

        let handle = registry.get(ModelType::Accurate).unwrap();
        assert_eq!(handle.model_type, ModelType::Standard);
        assert_eq!(loader.attempts(), vec![ModelType::Accurate, ModelType::Standard]);
    }

    #[test]
    fn test_standard_failure_is_fatal() {
        let loader = Arc::new(
            MockDetectorLoader::new()
                .failing_for(ModelType::Lite)
                .failing_for(ModelType::Standard),
        );
        let registry = ModelRegistry::new(loader);

        let err = registry.get(ModelType::Lite).unwrap_err();
        assert!(matches!(err, DetectError::ModelLoad { .. }));
        assert!(!registry.is_loaded(ModelType::Lite));
    }

    #[test]
    fn test_accurate_loads_classifier() {
        let loader = Arc::new(MockDetectorLoader::new().with_classifier(vec![("tabby, tabby cat", 0.8)]));
        let registry = ModelRegistry::new(loader);

        assert!(registry.get(ModelType::Accurate).unwrap().classifier.is_some());
        assert!(registry.get(ModelType::Lite).unwrap().classifier.is_none());
    }

    #[test]
    fn test_accurate_applies_model_score_floor() {
        let registry = ModelRegistry::new(Arc::new(two_scores()));
        let frame = Frame::new(PixelBuffer::filled(4, 4, [0; 4]), 0.0, 0);

        let accurate = registry.get(ModelType::Accurate).unwrap();
        let kept = accurate.detector.detect(&frame, None, None).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label, "dog");

        // 更严的调用方阈值仍然生效
        assert!(accurate.detector.detect(&frame, None, Some(0.6)).unwrap().is_empty());

        let lite = registry.get(ModelType::Lite).unwrap();
        assert_eq!(lite.detector.detect(&frame, None, Some(0.1)).unwrap().len(), 2);
    }
}
