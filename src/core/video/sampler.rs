//! 帧采样 - 根据视频时长决定检测的时间点

/// Frames per second assumed when a frame-skip count is converted to seconds
pub const ASSUMED_FPS: f64 = 30.0;

/// Sampling always ends within this many seconds of the end of the video
const END_GUARD_SECS: f64 = 1.0;

/// Ordered, strictly increasing timestamps (seconds) to examine
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPlan {
    timestamps: Vec<f64>,
}

impl SamplingPlan {
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.timestamps.iter().copied()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.timestamps
    }
}

pub struct FrameSampler;

impl FrameSampler {
    /// 短视频采样更密，长视频更稀疏
    pub fn interval_for(duration: f64) -> f64 {
        if duration < 10.0 {
            0.5
        } else if duration < 30.0 {
            1.0
        } else if duration < 60.0 {
            2.0
        } else if duration < 300.0 {
            5.0
        } else {
            10.0
        }
    }

    pub fn plan(duration: f64) -> SamplingPlan {
        Self::plan_with_interval(duration, Self::interval_for(duration))
    }

    /// `frame_skip` frames at 30 fps replace the duration table when set
    pub fn plan_with_override(duration: f64, frame_skip: Option<u32>) -> SamplingPlan {
        match frame_skip {
            Some(skip) if skip > 0 => Self::plan_with_interval(duration, skip as f64 / ASSUMED_FPS),
            _ => Self::plan(duration),
        }
    }

    fn plan_with_interval(duration: f64, interval: f64) -> SamplingPlan {
        let mut timestamps = vec![0.0];

        if !duration.is_finite() || duration <= 0.0 || !(interval > 0.0) {
            return SamplingPlan { timestamps };
        }

        // k * interval instead of repeated addition keeps multiples exact
        let mut k = 1u64;
        loop {
            let t = k as f64 * interval;
            if t >= duration {
                break;
            }
            timestamps.push(t);
            k += 1;
        }

        if duration > END_GUARD_SECS {
            let last = timestamps[timestamps.len() - 1];
            if last < duration - END_GUARD_SECS {
                timestamps.push(duration - END_GUARD_SECS);
            }
        }

        SamplingPlan { timestamps }
    }
}
