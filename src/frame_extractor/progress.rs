use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub status: String,
}

/// 进度回调节流：百分比单调不减，两次回调间隔至少 `interval`，100% 总会送达
pub struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(&ProgressUpdate),
    interval: Duration,
    highest: u8,
    last_emit: Option<Instant>,
    finished: bool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: &'a mut dyn FnMut(&ProgressUpdate), interval: Duration) -> Self {
        Self {
            callback,
            interval,
            highest: 0,
            last_emit: None,
            finished: false,
        }
    }

    pub fn report(&mut self, percent: u8, status: &str) {
        if self.finished {
            return;
        }

        let percent = percent.min(100).max(self.highest);
        self.highest = percent;

        let due = self.last_emit.map_or(true, |t| t.elapsed() >= self.interval);
        if percent < 100 && !due {
            return;
        }

        self.finished = percent == 100;
        self.last_emit = Some(Instant::now());
        (self.callback)(&ProgressUpdate {
            percent,
            status: status.to_string(),
        });
    }

    /// Percentage for frame `index` of `total` during the sampling pass,
    /// capped at 95.
    pub fn frame_percent(index: usize, total: usize) -> u8 {
        if total == 0 {
            return 0;
        }
        let pct = ((index + 1) as f64 / total as f64 * 100.0).round();
        pct.min(95.0) as u8
    }

    pub fn highest(&self) -> u8 {
        self.highest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_and_final() {
        let mut seen: Vec<u8> = Vec::new();
        {
            let mut record = |u: &ProgressUpdate| seen.push(u.percent);
            let mut reporter = ProgressReporter::new(&mut record, Duration::ZERO);
            reporter.report(10, "a");
            reporter.report(5, "b");
            reporter.report(50, "c");
            reporter.report(100, "done");
            reporter.report(100, "again");
        }
        assert_eq!(seen, vec![10, 10, 50, 100]);
    }

    #[test]
    fn test_throttled_but_final_delivered() {
        let mut seen: Vec<u8> = Vec::new();
        {
            let mut record = |u: &ProgressUpdate| seen.push(u.percent);
            let mut reporter = ProgressReporter::new(&mut record, Duration::from_secs(60));
            for p in 1..=99 {
                reporter.report(p, "working");
            }
            reporter.report(100, "done");
        }
        assert_eq!(seen, vec![1, 100]);
    }

    #[test]
    fn test_frame_percent() {
        assert_eq!(ProgressReporter::frame_percent(0, 4), 25);
        assert_eq!(ProgressReporter::frame_percent(3, 4), 95);
        assert_eq!(ProgressReporter::frame_percent(0, 3), 33);
        assert_eq!(ProgressReporter::frame_percent(0, 0), 0);
    }
}
