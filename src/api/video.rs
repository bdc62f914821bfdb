//! 视频目标扫描器

use crate::api::models::scan::{DecodedFrame, HistoryItem, ScanApiError, ScanReport};
use crate::core::detect::{DetectionPolicy, HostDetector, ModelHandle, Prediction};
use crate::core::report::{self, HistoryEntry, HistoryStore, JsonReport};
use crate::core::video::{
    EnhancementLevel, Frame, FrameSampler, ImageEnhancer, ObjectTracker, PixelBuffer, PixelRect, TrackResult,
};
use crate::frame_extractor::{
    AbortSignal, BufferedFrameSource, ObjectPipeline, ProgressUpdate, RunResult, ScanSettings,
};
use flutter_rust_bridge::frb;
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// 视频目标扫描器 - 检测 + 裁剪增强 + 去重 + 历史
///
/// ```dart
/// final scanner = VideoObjectScanner.create(historyPath: path);
/// final times = VideoObjectScanner.samplingPlan(duration: d, frameSkip: null);
/// final report = await scanner.scanFrames(fileName: name, frames: decoded, duration: d, settings: s);
/// final progress = scanner.progress;
/// ```
#[frb(opaque)]
pub struct VideoObjectScanner {
    pipeline: ObjectPipeline,
    /// 当前（或最近一次）运行的取消信号，每次运行拿到 busy 后换新
    abort: Mutex<AbortSignal>,
    progress: Arc<Mutex<ProgressUpdate>>,
    history: Option<HistoryStore>,
    last_run: Mutex<Option<(RunResult, ScanSettings)>>,
}

impl VideoObjectScanner {
    /// 创建扫描器；history_path 为空时不记录历史
    #[frb(sync)]
    pub fn create(history_path: Option<String>) -> Result<Self, ScanApiError> {
        crate::init_logging();
        let history = history_path.map(HistoryStore::open).transpose()?;
        info!("🎬 VideoObjectScanner: created (history: {})", history.is_some());
        Ok(Self {
            pipeline: ObjectPipeline::new(),
            abort: Mutex::new(AbortSignal::new()),
            progress: Arc::new(Mutex::new(ProgressUpdate::default())),
            history,
            last_run: Mutex::new(None),
        })
    }

    /// 需要宿主解码的时间点
    #[frb(sync)]
    pub fn sampling_plan(duration: f64, frame_skip: Option<u32>) -> Vec<f64> {
        FrameSampler::plan_with_override(duration, frame_skip).into_inner()
    }

    /// 零结果时重试的时间点
    #[frb(sync)]
    pub fn retry_timestamps(duration: f64) -> Vec<f64> {
        DetectionPolicy::retry_timestamps(duration).to_vec()
    }

    #[frb(sync)]
    pub fn default_settings(preset: Option<String>) -> ScanSettings {
        match preset.as_deref() {
            Some("mobile") => ScanSettings::for_mobile(),
            Some("low_power") => ScanSettings::for_low_power(),
            Some("high_performance") => ScanSettings::for_high_performance(),
            _ => ScanSettings::default(),
        }
    }

    /// 扫描宿主解码好的帧（每帧附带宿主模型的预测）
    ///
    /// Detection here is whatever the host already ran: `settings.model_type`
    /// only labels the run, and no secondary classifier is attached. Model
    /// loading with standard fallback and subcategory classification happen
    /// only when a Rust caller drives [`ObjectPipeline::process_video`] with a
    /// [`crate::core::detect::ModelRegistry`].
    ///
    /// While another scan is running this returns `Busy` and leaves that
    /// scan's abort request intact.
    #[frb]
    pub fn scan_frames(
        &self,
        file_name: String,
        frames: Vec<DecodedFrame>,
        duration: f64,
        settings: ScanSettings,
    ) -> Result<ScanReport, ScanApiError> {
        let mut detector = HostDetector::new();
        let mut decoded = Vec::with_capacity(frames.len());
        for f in frames {
            let pixels = PixelBuffer::new(f.width, f.height, f.rgba)?;
            detector.insert(f.frame_number, f.predictions.into_iter().map(Prediction::from).collect());
            decoded.push(Frame::new(pixels, f.timestamp, f.frame_number));
        }
        let mut source = BufferedFrameSource::new(decoded, duration);
        let handle = ModelHandle::new(settings.model_type, Arc::new(detector));

        let guard = self.pipeline.begin()?;
        let abort = AbortSignal::new();
        *self.abort.lock().unwrap_or_else(PoisonError::into_inner) = abort.clone();

        let progress = Arc::clone(&self.progress);
        let mut publish = move |update: &ProgressUpdate| {
            *progress.lock().unwrap_or_else(PoisonError::into_inner) = update.clone();
        };

        let run = self
            .pipeline
            .run_guarded(&guard, &handle, &mut source, &settings, &abort, &mut publish)?;
        let report = ScanReport::from(&run);

        if let Some(history) = &self.history {
            if let Err(e) = history.record(HistoryEntry::from_run(file_name, &run)) {
                warn!("⚠️ Failed to record history: {}", e);
            }
        }
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some((run, settings));

        Ok(report)
    }

    /// 请求取消当前扫描（在下一帧开始前生效）
    #[frb(sync)]
    pub fn abort(&self) {
        info!("🛑 VideoObjectScanner: abort requested");
        self.abort.lock().unwrap_or_else(PoisonError::into_inner).abort();
    }

    #[frb(sync, getter)]
    pub fn is_busy(&self) -> bool {
        self.pipeline.is_busy()
    }

    /// 最近一次进度回调
    #[frb(sync, getter)]
    pub fn progress(&self) -> ProgressUpdate {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 将最近一次扫描结果导出为 JSON
    #[frb(sync)]
    pub fn export_json(&self, path: String) -> Result<(), ScanApiError> {
        let guard = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        let (run, settings) = guard.as_ref().ok_or_else(ScanApiError::no_result)?;
        JsonReport::from_run(run, settings).write_to(path)?;
        Ok(())
    }

    #[frb(sync)]
    pub fn history(&self) -> Vec<HistoryItem> {
        self.history
            .as_ref()
            .map(|h| h.entries().iter().map(HistoryItem::from).collect())
            .unwrap_or_default()
    }

    #[frb(sync)]
    pub fn delete_history(&self, id: String) -> Result<bool, ScanApiError> {
        let Some(history) = &self.history else {
            return Ok(false);
        };
        let id = Uuid::parse_str(&id).map_err(|e| ScanApiError::new("InvalidId", e.to_string()))?;
        Ok(history.remove(id)?.is_some())
    }

    #[frb(sync)]
    pub fn clear_history(&self) -> Result<(), ScanApiError> {
        if let Some(history) = &self.history {
            history.clear()?;
        }
        Ok(())
    }
}

impl Drop for VideoObjectScanner {
    fn drop(&mut self) {
        info!("🗑️ VideoObjectScanner: released");
    }
}

/// 单张 RGBA 图像增强
#[frb(sync)]
pub fn enhance_image(width: u32, height: u32, rgba: Vec<u8>, level: EnhancementLevel) -> Result<Vec<u8>, ScanApiError> {
    let image = PixelBuffer::new(width, height, rgba)?;
    Ok(ImageEnhancer::new().enhance(&image, level)?.data)
}

/// 在相邻两帧间跟踪目标
#[frb(sync)]
#[allow(clippy::too_many_arguments)]
pub fn track_object(
    width: u32,
    height: u32,
    prev_rgba: Vec<u8>,
    curr_rgba: Vec<u8>,
    x: u32,
    y: u32,
    box_width: u32,
    box_height: u32,
) -> Result<TrackResult, ScanApiError> {
    let prev = PixelBuffer::new(width, height, prev_rgba)?;
    let curr = PixelBuffer::new(width, height, curr_rgba)?;
    Ok(ObjectTracker::new().track(&prev, &curr, PixelRect::new(x, y, box_width, box_height))?)
}

/// `m:ss`
#[frb(sync)]
pub fn format_frame_time(seconds: f64) -> String {
    report::format_time(seconds)
}
