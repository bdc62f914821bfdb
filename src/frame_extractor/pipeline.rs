use crate::core::detect::{Classification, Detection, DetectionPolicy, ModelHandle, ModelRegistry, Prediction};
use crate::core::video::{
    EncodedImage, EnhancementWorker, Frame, FramePreparer, FrameSampler, ObjectDeduplicator, ObjectExtractor,
};
use crate::frame_extractor::config::{ExtractionConfig, ScanSettings};
use crate::frame_extractor::error::{FrameProcessingError, PipelineError};
use crate::frame_extractor::progress::{ProgressReporter, ProgressUpdate};
use crate::frame_extractor::result::{ObjectCrop, RunResult, RunStatus, UniqueObject};
use crate::frame_extractor::source::FrameSource;
use crate::frame_extractor::state_machine::{RunAction, RunEvent, RunState, RunStateMachine};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 取消信号：在每帧开始前检查
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Holds the pipeline's busy flag for the duration of one run
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 单次扫描中累积的中间结果
#[derive(Default)]
struct RunAccumulator {
    crops: Vec<ObjectCrop>,
    thumbnail: Option<EncodedImage>,
    frames_processed: usize,
    frames_failed: usize,
    retried: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    Primary,
    Retry,
}

/// Drives sampling, detection, extraction, enhancement and deduplication
/// for one video at a time.
pub struct ObjectPipeline {
    config: ExtractionConfig,
    busy: AtomicBool,
    worker: EnhancementWorker,
    preparer: FramePreparer,
    deduplicator: ObjectDeduplicator,
}

impl ObjectPipeline {
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    pub fn with_config(config: ExtractionConfig) -> Self {
        Self {
            worker: EnhancementWorker::with_timeout(config.worker_timeout),
            config,
            busy: AtomicBool::new(false),
            preparer: FramePreparer::new(),
            deduplicator: ObjectDeduplicator::new(),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Loads the model for `settings.model_type` through `registry`, then runs.
    pub fn process_video(
        &self,
        registry: &ModelRegistry,
        source: &mut dyn FrameSource,
        settings: &ScanSettings,
        abort: &AbortSignal,
        progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<RunResult, PipelineError> {
        let _guard = RunGuard::try_acquire(&self.busy).ok_or(PipelineError::Busy)?;
        settings.validate()?;

        let mut machine = RunStateMachine::new();
        let handle = match registry.get(settings.model_type) {
            Ok(handle) => handle,
            Err(e) => {
                machine.process(RunEvent::Fatal);
                error!("❌ Detector unavailable: {}", e);
                return Err(PipelineError::ModelLoad(e));
            }
        };

        self.run(&mut machine, &handle, source, settings, abort, progress)
    }

    /// Runs with an already loaded model
    pub fn process_with_model(
        &self,
        handle: &ModelHandle,
        source: &mut dyn FrameSource,
        settings: &ScanSettings,
        abort: &AbortSignal,
        progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<RunResult, PipelineError> {
        let guard = self.begin()?;
        self.run_guarded(&guard, handle, source, settings, abort, progress)
    }

    /// 占住 busy 标志；调用方可以在真正开始前准备本次运行的状态（如取消信号）
    pub fn begin(&self) -> Result<RunGuard<'_>, PipelineError> {
        RunGuard::try_acquire(&self.busy).ok_or(PipelineError::Busy)
    }

    /// Runs under a guard obtained from [`ObjectPipeline::begin`] on this pipeline.
    pub fn run_guarded(
        &self,
        guard: &RunGuard<'_>,
        handle: &ModelHandle,
        source: &mut dyn FrameSource,
        settings: &ScanSettings,
        abort: &AbortSignal,
        progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<RunResult, PipelineError> {
        if !std::ptr::eq(guard.flag, &self.busy) {
            return Err(PipelineError::Busy);
        }
        settings.validate()?;

        let mut machine = RunStateMachine::new();
        self.run(&mut machine, handle, source, settings, abort, progress)
    }

    fn run(
        &self,
        machine: &mut RunStateMachine,
        handle: &ModelHandle,
        source: &mut dyn FrameSource,
        settings: &ScanSettings,
        abort: &AbortSignal,
        progress: &mut dyn FnMut(&ProgressUpdate),
    ) -> Result<RunResult, PipelineError> {
        let mut reporter = ProgressReporter::new(progress, self.config.progress_interval);

        let duration = source.duration();
        if !duration.is_finite() || duration < 0.0 {
            machine.process(RunEvent::Fatal);
            return Err(PipelineError::Source(format!("unusable duration {}", duration)));
        }

        let plan = FrameSampler::plan_with_override(duration, settings.frame_skip);
        let retry_points = DetectionPolicy::retry_timestamps(duration);
        let extractor = settings
            .bounding_box_padding
            .map(ObjectExtractor::with_min_margin)
            .unwrap_or_default();

        info!(
            "🎬 Scan started: {:.2}s, {} sample points, model {}, enhancement {}",
            duration,
            plan.len(),
            handle.model_type,
            settings.image_enhancement
        );

        let mut acc = RunAccumulator::default();
        let mut action = machine.process(RunEvent::PlanReady { total: plan.len() });

        loop {
            match action {
                RunAction::ProcessFrame(i) | RunAction::ProcessRetryFrame(i) => {
                    if abort.is_aborted() {
                        info!("🛑 Scan aborted before frame {}", i);
                        action = machine.process(RunEvent::AbortRequested);
                        continue;
                    }

                    let (pass, time) = match action {
                        RunAction::ProcessFrame(_) => (Pass::Primary, plan.timestamps()[i]),
                        _ => (Pass::Retry, retry_points[i]),
                    };

                    let detections = self.process_sample(
                        source, handle, settings, &extractor, duration, time, pass, &mut acc,
                    );

                    match pass {
                        Pass::Primary => reporter.report(
                            ProgressReporter::frame_percent(i, plan.len()),
                            &format!("Analyzing frame {}/{}", i + 1, plan.len()),
                        ),
                        Pass::Retry => reporter.report(95, "Retrying with a lower threshold"),
                    }

                    action = machine.process(RunEvent::FrameProcessed { detections });
                }
                RunAction::StartRetry => {
                    info!("🔁 No detections, retrying at {:?}", retry_points);
                    acc.retried = true;
                    action = machine.process(RunEvent::PlanReady {
                        total: retry_points.len(),
                    });
                }
                RunAction::Deduplicate => {
                    reporter.report(97, "Removing duplicates");
                    let before = acc.crops.len();
                    acc.crops = self.deduplicator.dedupe(std::mem::take(&mut acc.crops));
                    debug!("Dedup: {} -> {}", before, acc.crops.len());
                    action = machine.process(RunEvent::DedupFinished);
                }
                RunAction::Finish | RunAction::Fail | RunAction::Ignore => break,
            }
        }

        let status = match machine.current_state() {
            RunState::Aborted => RunStatus::Aborted,
            _ => RunStatus::Completed,
        };

        let objects: Vec<UniqueObject> = acc.crops.into_iter().map(UniqueObject::from).collect();
        reporter.report(100, "Done");

        info!(
            "✅ Scan finished ({:?}): {} objects, {} frames ok, {} failed",
            status,
            objects.len(),
            acc.frames_processed,
            acc.frames_failed
        );

        Ok(RunResult {
            duration,
            thumbnail: acc.thumbnail,
            object_count: objects.len(),
            objects,
            status,
            frames_processed: acc.frames_processed,
            frames_failed: acc.frames_failed,
            retried: acc.retried,
        })
    }

    /// Returns the number of detections the detector reported for this
    /// sample. Errors are logged and count as zero.
    #[allow(clippy::too_many_arguments)]
    fn process_sample(
        &self,
        source: &mut dyn FrameSource,
        handle: &ModelHandle,
        settings: &ScanSettings,
        extractor: &ObjectExtractor,
        duration: f64,
        time: f64,
        pass: Pass,
        acc: &mut RunAccumulator,
    ) -> usize {
        let frame = match self.capture(source, duration, time) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("⚠️ Frame at {:.2}s unavailable: {}", time, e);
                acc.frames_failed += 1;
                return 0;
            }
        };

        if acc.thumbnail.is_none() {
            match frame.pixels.encode_jpeg(self.config.thumbnail_quality) {
                Ok(jpeg) => acc.thumbnail = Some(jpeg),
                Err(e) => warn!("⚠️ Thumbnail encoding failed: {}", e),
            }
        }

        let predictions = match self.detect(handle, settings, &frame, pass) {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!("⚠️ Detection failed at {:.2}s: {}", time, e);
                acc.frames_failed += 1;
                return 0;
            }
        };
        acc.frames_processed += 1;

        let count = predictions.len();
        for prediction in predictions {
            let detection = Detection::from_prediction(prediction, time);
            if let Some(crop) = self.build_crop(handle, settings, extractor, &frame, detection) {
                acc.crops.push(crop);
            }
        }
        count
    }

    fn capture(&self, source: &mut dyn FrameSource, duration: f64, time: f64) -> Result<Frame, FrameProcessingError> {
        // 不要 seek 到最末尾，部分解码器取不到最后一帧
        let target = time.min(duration - self.config.seek_end_guard).max(0.0);
        source.seek(target)?;
        Ok(source.current_frame()?)
    }

    fn detect(
        &self,
        handle: &ModelHandle,
        settings: &ScanSettings,
        frame: &Frame,
        pass: Pass,
    ) -> Result<Vec<Prediction>, FrameProcessingError> {
        let prepared;
        let input = if settings.normalize_frames {
            prepared = Frame {
                pixels: self.preparer.prepare(&frame.pixels),
                timestamp: frame.timestamp,
                frame_number: frame.frame_number,
            };
            &prepared
        } else {
            frame
        };

        let policy = &self.config.policy;
        let detector = handle.detector.as_ref();
        let predictions = match pass {
            Pass::Primary => {
                policy.detect_frame(detector, input, settings.confidence_threshold, settings.max_detections)?
            }
            Pass::Retry => policy.detect_retry(detector, input)?,
        };
        Ok(predictions)
    }

    /// 裁剪 → 增强 → 二级分类 → 编码；任一步失败只影响当前目标
    fn build_crop(
        &self,
        handle: &ModelHandle,
        settings: &ScanSettings,
        extractor: &ObjectExtractor,
        frame: &Frame,
        detection: Detection,
    ) -> Option<ObjectCrop> {
        let crop = match extractor.extract(&frame.pixels, &detection.bbox) {
            Ok(crop) => crop,
            Err(e) => {
                warn!("⚠️ Skipping '{}': {}", detection.label, e);
                return None;
            }
        };

        let level = settings.image_enhancement;
        let enhanced = match self.worker.enhance(&crop, level) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!("⚠️ Enhancement failed for '{}', keeping original: {}", detection.label, e);
                crop
            }
        };

        let mut refined_label = None;
        let mut subcategories = Vec::new();
        if let Some(classifier) = &handle.classifier {
            match classifier.classify(&enhanced) {
                Ok(results) if !results.is_empty() => {
                    refined_label = Some(Classification::short_name(&results[0].name));
                    subcategories = results
                        .iter()
                        .take(3)
                        .map(|c| Classification::new(Classification::short_name(&c.name), c.probability))
                        .collect();
                }
                Ok(_) => {}
                Err(e) => warn!("⚠️ Secondary classification failed: {}", e),
            }
        }

        let image = match enhanced.encode_jpeg(self.config.crop_quality) {
            Ok(image) => image,
            Err(e) => {
                warn!("⚠️ Crop encoding failed for '{}': {}", detection.label, e);
                return None;
            }
        };

        Some(ObjectCrop {
            detection,
            image,
            enhancement_level: level,
            refined_label,
            subcategories,
        })
    }
}

impl Default for ObjectPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detect::{Detector, MockDetector, MockDetectorLoader, ModelType};
    use crate::core::video::{BoundingBox, EnhancementLevel, FrameError, PixelBuffer};
    use std::sync::mpsc;
    use std::time::Duration;

    /// 合成视频：灰色背景上一个静止方块，帧号 = round(t * 30)
    struct SyntheticSource {
        duration: f64,
        position: f64,
        seeks: Vec<f64>,
    }

    impl SyntheticSource {
        fn new(duration: f64) -> Self {
            Self {
                duration,
                position: 0.0,
                seeks: Vec::new(),
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn duration(&self) -> f64 {
            self.duration
        }

        fn seek(&mut self, time: f64) -> Result<(), FrameError> {
            self.position = time;
            self.seeks.push(time);
            Ok(())
        }

        fn current_frame(&mut self) -> Result<Frame, FrameError> {
            let mut pixels = PixelBuffer::filled(160, 120, [90, 90, 90, 255]);
            for y in 40..80 {
                for x in 60..100 {
                    pixels.set_pixel(x, y, [200, 120, 40, 255]);
                }
            }
            Ok(Frame::new(pixels, self.position, (self.position * 30.0).round() as u64))
        }
    }

    fn box_prediction() -> Prediction {
        Prediction::new("box", 0.8, BoundingBox::new(60.0, 40.0, 40.0, 40.0))
    }

    fn handle_for(detector: MockDetector) -> (ModelHandle, Arc<MockDetector>) {
        let shared = Arc::new(detector);
        let handle = ModelHandle::new(ModelType::Standard, Arc::new(shared.clone()) as Arc<dyn Detector>);
        (handle, shared)
    }

    fn quiet() -> impl FnMut(&ProgressUpdate) {
        |_| {}
    }

    #[test]
    fn test_box_video_collapses_to_one_object() {
        let (handle, detector) = handle_for(MockDetector::with_pattern(|_| vec![box_prediction()]));
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(3.0);
        let settings = ScanSettings {
            image_enhancement: EnhancementLevel::Basic,
            ..Default::default()
        };

        let result = pipeline
            .process_with_model(&handle, &mut source, &settings, &AbortSignal::new(), &mut quiet())
            .unwrap();

        // 3s 视频：0, 0.5 .. 2.5 共 6 个采样点
        let calls = detector.calls().len();
        assert_eq!(calls, 6);
        assert_eq!(result.object_count, 1);
        assert_eq!(result.objects[0].label, "box");
        assert_eq!(result.objects[0].confidence, 0.8);
        assert_eq!(result.status, RunStatus::Completed);
        assert!(!result.retried);
        assert_eq!(result.frames_processed, calls);
        assert!(result.thumbnail.is_some());
        assert_eq!(&result.objects[0].image.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(result.duration, 3.0);
    }

    #[test]
    fn test_zero_detections_trigger_retry_pass() {
        let (handle, detector) = handle_for(MockDetector::new());
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(3.0);

        let result = pipeline
            .process_with_model(
                &handle,
                &mut source,
                &ScanSettings::default(),
                &AbortSignal::new(),
                &mut quiet(),
            )
            .unwrap();

        assert!(result.is_empty());
        assert!(result.retried);
        assert_eq!(result.status, RunStatus::Completed);

        let calls = detector.calls();
        assert_eq!(calls.len(), 6 + 3);
        for call in &calls[6..] {
            assert_eq!(call.min_score, Some(0.1));
        }
        // 重试点 {0, d/2, d-1}
        assert_eq!(&source.seeks[6..], &[0.0, 1.5, 2.0]);
        assert!(calls[..6].iter().all(|c| (c.min_score.unwrap() - 0.42).abs() < 1e-6));
    }

    #[test]
    fn test_retry_hits_are_kept() {
        let (handle, _) = handle_for(MockDetector::with_pattern(|frame: &Frame| {
            if frame.frame_number == 45 {
                vec![Prediction::new("lamp", 0.15, BoundingBox::new(10.0, 10.0, 30.0, 30.0))]
            } else {
                Vec::new()
            }
        }));
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(3.0);
        let settings = ScanSettings {
            image_enhancement: EnhancementLevel::None,
            ..Default::default()
        };

        let result = pipeline
            .process_with_model(&handle, &mut source, &settings, &AbortSignal::new(), &mut quiet())
            .unwrap();
        // 主扫描阈值 0.42 过滤掉 0.15，重试时在 1.5s 命中
        assert!(result.retried);
        assert_eq!(result.object_count, 1);
        assert_eq!(result.objects[0].label, "lamp");
        assert_eq!(result.objects[0].frame_time, 1.5);
    }

    #[test]
    fn test_second_run_is_busy() {
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = std::sync::Mutex::new(release_rx);

        let (handle, _) = handle_for(MockDetector::with_pattern(|_| vec![box_prediction()]));
        let pipeline = ObjectPipeline::new();

        struct BlockingSource<'a> {
            inner: SyntheticSource,
            entered: mpsc::Sender<()>,
            release: &'a std::sync::Mutex<mpsc::Receiver<()>>,
            blocked: bool,
        }

        impl FrameSource for BlockingSource<'_> {
            fn duration(&self) -> f64 {
                self.inner.duration()
            }
            fn seek(&mut self, time: f64) -> Result<(), FrameError> {
                if !self.blocked {
                    self.blocked = true;
                    let _ = self.entered.send(());
                    if let Ok(rx) = self.release.lock() {
                        let _ = rx.recv_timeout(Duration::from_secs(5));
                    }
                }
                self.inner.seek(time)
            }
            fn current_frame(&mut self) -> Result<Frame, FrameError> {
                self.inner.current_frame()
            }
        }

        std::thread::scope(|s| {
            let first = s.spawn(|| {
                let mut source = BlockingSource {
                    inner: SyntheticSource::new(2.0),
                    entered: entered_tx,
                    release: &release_rx,
                    blocked: false,
                };
                pipeline.process_with_model(
                    &handle,
                    &mut source,
                    &ScanSettings::default(),
                    &AbortSignal::new(),
                    &mut quiet(),
                )
            });

            entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(pipeline.is_busy());

            let mut other = SyntheticSource::new(2.0);
            let second = pipeline.process_with_model(
                &handle,
                &mut other,
                &ScanSettings::default(),
                &AbortSignal::new(),
                &mut quiet(),
            );
            assert!(matches!(second, Err(PipelineError::Busy)));
            assert!(other.seeks.is_empty());

            release_tx.send(()).unwrap();
            let first = first.join().unwrap().unwrap();
            assert_eq!(first.object_count, 1);
        });

        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_abort_returns_partial_result() {
        let abort = AbortSignal::new();
        let trigger = abort.clone();
        let (handle, detector) = handle_for(MockDetector::with_pattern(move |frame: &Frame| {
            // 处理第二帧时请求取消
            if frame.frame_number == 15 {
                trigger.abort();
            }
            vec![Prediction::new(
                format!("obj{}", frame.frame_number),
                0.9,
                BoundingBox::new(60.0, 40.0, 40.0, 40.0),
            )]
        }));
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(5.0);
        let settings = ScanSettings {
            image_enhancement: EnhancementLevel::None,
            ..Default::default()
        };

        let result = pipeline
            .process_with_model(&handle, &mut source, &settings, &abort, &mut quiet())
            .unwrap();

        assert_eq!(result.status, RunStatus::Aborted);
        assert_eq!(detector.calls().len(), 2);
        assert_eq!(result.object_count, 2);
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        let (handle, _) = handle_for(MockDetector::with_pattern(|_| vec![box_prediction()]));
        let pipeline = ObjectPipeline::with_config(ExtractionConfig {
            progress_interval: Duration::ZERO,
            ..Default::default()
        });
        let mut source = SyntheticSource::new(3.0);
        let mut seen: Vec<u8> = Vec::new();
        {
            let mut record = |u: &ProgressUpdate| seen.push(u.percent);
            pipeline
                .process_with_model(
                    &handle,
                    &mut source,
                    &ScanSettings {
                        image_enhancement: EnhancementLevel::None,
                        ..Default::default()
                    },
                    &AbortSignal::new(),
                    &mut record,
                )
                .unwrap();
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(*seen.last().unwrap(), 100);
        assert!(seen.contains(&97));
        assert!(seen.iter().filter(|p| **p < 97).all(|p| *p <= 95));
    }

    #[test]
    fn test_seek_never_reaches_end() {
        let (handle, _) = handle_for(MockDetector::new());
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(0.5);
        pipeline
            .process_with_model(&handle, &mut source, &ScanSettings::default(), &AbortSignal::new(), &mut quiet())
            .unwrap();
        assert!(source.seeks.iter().all(|t| *t <= 0.4 + 1e-9 && *t >= 0.0));
    }

    #[test]
    fn test_detector_errors_count_as_failed_frames() {
        let (handle, _) = handle_for(MockDetector::failing());
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(2.0);
        let result = pipeline
            .process_with_model(&handle, &mut source, &ScanSettings::default(), &AbortSignal::new(), &mut quiet())
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.frames_processed, 0);
        // 4 个采样点 + 3 个重试点
        assert_eq!(result.frames_failed, 7);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (handle, detector) = handle_for(MockDetector::new());
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(2.0);
        let settings = ScanSettings {
            max_detections: 0,
            ..Default::default()
        };
        let err = pipeline
            .process_with_model(&handle, &mut source, &settings, &AbortSignal::new(), &mut quiet())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSettings(_)));
        assert!(detector.calls().is_empty());
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_model_load_failure_is_fatal() {
        let loader = MockDetectorLoader::new()
            .failing_for(ModelType::Lite)
            .failing_for(ModelType::Standard);
        let registry = ModelRegistry::new(Arc::new(loader));
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(2.0);
        let settings = ScanSettings {
            model_type: ModelType::Lite,
            ..Default::default()
        };

        let err = pipeline
            .process_video(&registry, &mut source, &settings, &AbortSignal::new(), &mut quiet())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
        assert!(source.seeks.is_empty());
    }

    #[test]
    fn test_process_video_through_registry_with_classifier() {
        let loader = MockDetectorLoader::with_factory(|| {
            Box::new(MockDetector::with_pattern(|_| vec![box_prediction()])) as Box<dyn Detector>
        })
        .with_classifier(vec![("carton, box", 0.7), ("crate", 0.2), ("chest", 0.05), ("bin", 0.01)]);
        let registry = ModelRegistry::new(Arc::new(loader));
        let pipeline = ObjectPipeline::new();
        let mut source = SyntheticSource::new(2.0);

        let result = pipeline
            .process_video(&registry, &mut source, &ScanSettings::default(), &AbortSignal::new(), &mut quiet())
            .unwrap();

        assert_eq!(result.object_count, 1);
        let object = &result.objects[0];
        assert_eq!(object.refined_label.as_deref(), Some("carton"));
        assert_eq!(object.subcategories.len(), 3);
        assert_eq!(object.subcategories[0].name, "carton");
    }

    #[test]
    fn test_guard_from_other_pipeline_rejected() {
        let (handle, detector) = handle_for(MockDetector::new());
        let pipeline = ObjectPipeline::new();
        let other = ObjectPipeline::new();
        let foreign = other.begin().unwrap();
        assert!(matches!(pipeline.begin(), Ok(_)));

        let mut source = SyntheticSource::new(1.0);
        let err = pipeline
            .run_guarded(&foreign, &handle, &mut source, &ScanSettings::default(), &AbortSignal::new(), &mut quiet())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Busy));
        assert!(detector.calls().is_empty());

        let held = pipeline.begin().unwrap();
        assert!(matches!(pipeline.begin(), Err(PipelineError::Busy)));
        pipeline
            .run_guarded(&held, &handle, &mut source, &ScanSettings::default(), &AbortSignal::new(), &mut quiet())
            .unwrap();
        assert!(pipeline.is_busy());
        drop(held);
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_guard_releases_flag() {
        let flag = AtomicBool::new(false);
        {
            let _guard = RunGuard::try_acquire(&flag).unwrap();
            assert!(RunGuard::try_acquire(&flag).is_none());
        }
        assert!(RunGuard::try_acquire(&flag).is_some());
    }
}
