use super::stats::AggregateSnapshot;

/// Which aggregate a trend is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMetric {
    AverageFps,
    AverageSpeed,
    MissedPackets,
}

impl SeriesMetric {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesMetric::AverageFps => "Avg FPS",
            SeriesMetric::AverageSpeed => "Avg Speed",
            SeriesMetric::MissedPackets => "Missed Packets",
        }
    }

    fn value(&self, snapshot: &AggregateSnapshot) -> f64 {
        match self {
            SeriesMetric::AverageFps => snapshot.average_fps,
            SeriesMetric::AverageSpeed => snapshot.average_speed,
            SeriesMetric::MissedPackets => snapshot.cumulative_missed_packets as f64,
        }
    }
}

/// Least-squares line `value = slope * elapsed + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    pub fn at(&self, elapsed_seconds: f64) -> f64 {
        self.slope * elapsed_seconds + self.intercept
    }
}

/// Append-only series of snapshots, strictly increasing in elapsed time
#[derive(Debug, Clone, Default)]
pub struct SnapshotSeries {
    points: Vec<AggregateSnapshot>,
}

impl SnapshotSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Returns false (and drops it) if its elapsed time
    /// does not come strictly after the last point.
    pub fn push(&mut self, snapshot: AggregateSnapshot) -> bool {
        if let Some(last) = self.points.last() {
            if snapshot.elapsed_seconds <= last.elapsed_seconds {
                log::trace!(
                    "Dropping out-of-order snapshot at {:.3}s (last {:.3}s)",
                    snapshot.elapsed_seconds,
                    last.elapsed_seconds
                );
                return false;
            }
        }
        self.points.push(snapshot);
        true
    }

    pub fn points(&self) -> &[AggregateSnapshot] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&AggregateSnapshot> {
        self.points.last()
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }

    pub fn find_by_timestamp(&self, wall_timestamp: &str) -> Option<&AggregateSnapshot> {
        self.points
            .iter()
            .find(|p| p.wall_timestamp == wall_timestamp)
    }

    /// Linear fit of `metric` over elapsed time; needs at least two points
    pub fn trend(&self, metric: SeriesMetric) -> Option<Trend> {
        if self.points.len() < 2 {
            return None;
        }

        let n = self.points.len() as f64;
        let mean_x = self.points.iter().map(|p| p.elapsed_seconds).sum::<f64>() / n;
        let mean_y = self.points.iter().map(|p| metric.value(p)).sum::<f64>() / n;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for p in &self.points {
            let dx = p.elapsed_seconds - mean_x;
            sxy += dx * (metric.value(p) - mean_y);
            sxx += dx * dx;
        }

        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Trend {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }
}
