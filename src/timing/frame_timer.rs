use std::time::{Duration, Instant};

use super::FrameTimer;

/// How often [FrameTimer::poll_report] yields a new FPS value by default.
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(500);

impl FrameTimer {
    /// Create a new frame timer.
    ///
    /// `target_fps` of `None` (or zero) disables frame limiting. At least
    /// two frames are always tracked so an average can be computed.
    pub fn new(target_fps: Option<u32>, frames_to_track: usize) -> Self {
        let frames_to_track = frames_to_track.max(2);
        Self {
            frames_to_track,
            frame_starts: std::collections::VecDeque::with_capacity(
                frames_to_track,
            ),
            target_duration: target_fps
                .filter(|&fps| fps > 0)
                .map(|fps| Duration::from_secs(1) / fps),
            report_interval: DEFAULT_REPORT_INTERVAL,
            last_report: Instant::now(),
        }
    }

    /// Replace the interval used by [FrameTimer::poll_report].
    pub fn with_report_interval(mut self, report_interval: Duration) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Call at the beginning of each frame to establish the start-point when
    /// computing elapsed time.
    pub fn start_frame(&mut self) {
        while self.frame_starts.len() >= self.frames_to_track {
            self.frame_starts.pop_back();
        }
        self.frame_starts.push_front(Instant::now());
    }

    /// Sleep for any remaining time in the target frame duration.
    ///
    /// No-op when no target is set or no frame has been started.
    pub fn sleep_to_limit(&self) {
        let (target, frame_start) =
            match (self.target_duration, self.frame_starts.front()) {
                (Some(target), Some(start)) => (target, *start),
                _ => return,
            };
        let elapsed = Instant::now() - frame_start;
        if elapsed < target {
            spin_sleep::sleep(target - elapsed);
        }
    }

    /// The average time spent on each of the tracked frames, measured from
    /// the oldest tracked frame start until now.
    pub fn avg_frame_time(&self) -> Option<Duration> {
        let oldest_frame = self.frame_starts.back()?;
        let total_duration = Instant::now() - *oldest_frame;
        Some(total_duration / self.frame_starts.len() as u32)
    }

    /// Frames per second derived from [FrameTimer::avg_frame_time].
    pub fn fps(&self) -> Option<f32> {
        let seconds = self.avg_frame_time()?.as_secs_f32();
        if seconds > 0.0 {
            Some(1.0 / seconds)
        } else {
            None
        }
    }

    /// Returns the current FPS once every report interval, `None` otherwise.
    pub fn poll_report(&mut self) -> Option<f32> {
        let now = Instant::now();
        if now - self.last_report < self.report_interval {
            return None;
        }
        self.last_report = now;
        self.fps()
    }

    /// The number of frame starts currently being tracked.
    pub fn tracked_frames(&self) -> usize {
        self.frame_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_average_before_the_first_frame() {
        let timer = FrameTimer::new(None, 10);
        assert!(timer.avg_frame_time().is_none());
        assert!(timer.fps().is_none());
    }

    #[test]
    fn tracked_frames_are_bounded() {
        let mut timer = FrameTimer::new(None, 3);
        for _ in 0..10 {
            timer.start_frame();
        }
        assert_eq!(timer.tracked_frames(), 3);
        assert!(timer.avg_frame_time().is_some());
    }

    #[test]
    fn report_waits_for_the_interval() {
        let mut timer = FrameTimer::new(None, 4)
            .with_report_interval(Duration::from_secs(3600));
        timer.start_frame();
        assert!(timer.poll_report().is_none());
    }

    #[test]
    fn zero_target_fps_disables_the_limit() {
        let mut timer = FrameTimer::new(Some(0), 4);
        timer.start_frame();
        let before = Instant::now();
        timer.sleep_to_limit();
        assert!(Instant::now() - before < Duration::from_millis(100));
    }
}
