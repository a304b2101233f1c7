//! Running statistics over the metric records of one session.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::record::MetricRecord;

/// Number of most recent speed observations averaged by `average_speed`
pub const SPEED_WINDOW: usize = 50;

/// Point-in-time summary of the aggregated statistics
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
    pub elapsed_seconds: f64,
    pub average_fps: f64,
    pub average_speed: f64,
    pub cumulative_missed_packets: u64,
    /// Correlation key back to raw log lines
    pub wall_timestamp: String,
}

impl AggregateSnapshot {
    /// Status bar text shown while monitoring
    pub fn status_line(&self) -> String {
        format!(
            "Monitoring... Avg FPS: {:.2}, Avg Speed: {:.2}x, Missed Packets: {}",
            self.average_fps, self.average_speed, self.cumulative_missed_packets
        )
    }
}

#[derive(Debug, Default)]
struct StatsState {
    fps_count: u64,
    fps_sum: f64,
    speed_window: VecDeque<f64>,
    missed_packets: u64,
}

impl StatsState {
    fn average_fps(&self) -> f64 {
        if self.fps_count > 0 {
            self.fps_sum / self.fps_count as f64
        } else {
            0.0
        }
    }

    fn average_speed(&self) -> f64 {
        if self.speed_window.is_empty() {
            0.0
        } else {
            self.speed_window.iter().sum::<f64>() / self.speed_window.len() as f64
        }
    }
}

/// Folds metric records into running and windowed statistics.
///
/// All state sits behind one mutex: `update` from the ingestion thread and
/// `snapshot` from the timer never observe a half-applied record.
#[derive(Debug)]
pub struct StatsAggregator {
    state: Mutex<StatsState>,
    window: usize,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::with_window(SPEED_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            state: Mutex::new(StatsState {
                speed_window: VecDeque::with_capacity(window),
                ..Default::default()
            }),
            window: window.max(1),
        }
    }

    pub fn update(&self, record: &MetricRecord) {
        let mut state = self.state.lock();

        if let Some(fps) = record.fps() {
            state.fps_count += 1;
            state.fps_sum += fps;
        }

        if let Some(speed) = record.speed() {
            if state.speed_window.len() >= self.window {
                state.speed_window.pop_front();
            }
            state.speed_window.push_back(speed);
        }

        if let Some(missed) = record.missed_packets() {
            state.missed_packets = state.missed_packets.saturating_add(missed);
        }
    }

    pub fn snapshot(&self, elapsed_seconds: f64, wall_timestamp: String) -> AggregateSnapshot {
        let state = self.state.lock();
        AggregateSnapshot {
            elapsed_seconds,
            average_fps: state.average_fps(),
            average_speed: state.average_speed(),
            cumulative_missed_packets: state.missed_packets,
            wall_timestamp,
        }
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.fps_count = 0;
        state.fps_sum = 0.0;
        state.speed_window.clear();
        state.missed_packets = 0;
    }

    pub fn fps_count(&self) -> u64 {
        self.state.lock().fps_count
    }

    pub fn fps_sum(&self) -> f64 {
        self.state.lock().fps_sum
    }

    pub fn speed_window_len(&self) -> usize {
        self.state.lock().speed_window.len()
    }

    pub fn cumulative_missed_packets(&self) -> u64 {
        self.state.lock().missed_packets
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
