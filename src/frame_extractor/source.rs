//! 帧来源 - 抽象 seek + 取帧

use crate::core::video::{Frame, FrameError};

pub trait FrameSource {
    /// Video duration in seconds
    fn duration(&self) -> f64;

    fn seek(&mut self, time: f64) -> Result<(), FrameError>;

    /// Frame at the last seek position
    fn current_frame(&mut self) -> Result<Frame, FrameError>;
}

/// 宿主已解码的帧序列
///
/// `seek(t)` selects the latest frame with timestamp <= t, or the earliest
/// frame when every frame is later than t.
#[derive(Debug, Clone)]
pub struct BufferedFrameSource {
    frames: Vec<Frame>,
    duration: f64,
    position: Option<usize>,
}

impl BufferedFrameSource {
    pub fn new(mut frames: Vec<Frame>, duration: f64) -> Self {
        frames.sort_by_key(|f| f.timestamp);
        Self {
            frames,
            duration,
            position: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for BufferedFrameSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn seek(&mut self, time: f64) -> Result<(), FrameError> {
        if self.frames.is_empty() {
            self.position = None;
            return Err(FrameError::Unavailable(time));
        }
        if !time.is_finite() {
            return Err(FrameError::Seek {
                time,
                reason: "non-finite seek target".to_string(),
            });
        }

        // 第一个时间戳 > t 的位置
        let after = self.frames.partition_point(|f| f.time_secs() <= time);
        self.position = Some(after.saturating_sub(1));
        Ok(())
    }

    fn current_frame(&mut self) -> Result<Frame, FrameError> {
        self.position
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or(FrameError::Unavailable(0.0))
    }
}
