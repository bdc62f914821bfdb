//! 增强任务线程池 - 限时等待，超时回退到调用线程同步计算

use super::enhancer::{EnhanceError, EnhancementLevel, ImageEnhancer};
use super::frame::PixelBuffer;
use log::{debug, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
const MAX_WORKERS: usize = 4;

pub struct EnhancementWorker {
    /// None when the pool could not be built; everything then runs inline
    pool: Option<ThreadPool>,
    enhancer: ImageEnhancer,
    timeout: Duration,
}

impl EnhancementWorker {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let threads = num_cpus::get().clamp(1, MAX_WORKERS);
        let pool = match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("enhance-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("⚠️ Enhancement pool unavailable, running inline: {}", e);
                None
            }
        };

        Self {
            pool,
            enhancer: ImageEnhancer::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn thread_count(&self) -> usize {
        self.pool.as_ref().map_or(0, |p| p.current_num_threads())
    }

    /// basic/none 直接在当前线程完成；advanced/ultra 交给线程池
    pub fn enhance(&self, image: &PixelBuffer, level: EnhancementLevel) -> Result<PixelBuffer, EnhanceError> {
        let pool = match &self.pool {
            Some(pool) if level.is_offloadable() => pool,
            _ => return self.enhancer.enhance(image, level),
        };

        let (tx, rx) = mpsc::channel();
        let job = image.clone();
        let enhancer = self.enhancer;
        pool.spawn(move || {
            // 调用方可能已超时离开，发送失败可忽略
            let _ = tx.send(enhancer.enhance(&job, level));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "⏱️ {} enhancement exceeded {:?}, recomputing inline",
                    level, self.timeout
                );
                self.enhancer.enhance(image, level)
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Enhancement job dropped, recomputing inline");
                self.enhancer.enhance(image, level)
            }
        }
    }
}

impl Default for EnhancementWorker {
    fn default() -> Self {
        Self::new()
    }
}
