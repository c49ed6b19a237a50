mod frame_timer;

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// A simulation loop will generally run as fast as it possibly can. That is
/// useful for benchmarking the solver, but an interactive session only needs
/// to keep pace with the display. The frame timer records when recent frames
/// started so the loop can report a smoothed FPS figure at a fixed interval
/// and, when a target frame rate is set, sleep away the rest of each frame.
pub struct FrameTimer {
    frames_to_track: usize,
    frame_starts: VecDeque<Instant>,
    target_duration: Option<Duration>,
    report_interval: Duration,
    last_report: Instant,
}
