//! Monitoring session: supervisor, ingestion worker and snapshot timer.
//!
//! A session owns a small Tokio runtime. The probe's stderr is read on a
//! blocking worker (`spawn_blocking`), the periodic snapshot is an async task,
//! and both publish to one unbounded channel so they never wait on the
//! consumer. Memory use therefore grows if the consumer stops reading.

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};

use crate::error::{MonitorError, Result};

use super::config::MonitorConfig;
use super::csv_log::{CsvLogWriter, RecordSink};
use super::events::{MonitorEvent, RawLine};
use super::executable::{resolve_executable, DEFAULT_PROBE};
use super::history::SnapshotSeries;
use super::parser;
use super::record::format_wall_clock;
use super::stats::StatsAggregator;
use super::supervisor::{ProbeProcess, SupervisorOptions};

pub type EventSender = mpsc::UnboundedSender<MonitorEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<MonitorEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    /// Launch failed; reported, then the session returns to Idle
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::Stopping => "Stopping",
            SessionState::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub snapshot_period: Duration,
    pub supervisor: SupervisorOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            snapshot_period: Duration::from_secs(1),
            supervisor: SupervisorOptions::default(),
        }
    }
}

/// State shared between the session handle and its background work
#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<SessionState>>,
    events: EventSender,
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        *self.state.lock() = next;
        log::debug!("Session state -> {}", next.as_str());
        let _ = self.events.send(MonitorEvent::StateChanged(next));
    }

    /// Move `from` -> `to` only if the session is still in `from`
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        drop(state);
        log::debug!("Session state -> {}", to.as_str());
        let _ = self.events.send(MonitorEvent::StateChanged(to));
        true
    }

    fn diagnostic(&self, message: String) {
        let _ = self.events.send(MonitorEvent::Diagnostic {
            timestamp: format_wall_clock(&Local::now()),
            message,
        });
    }
}

/// What the ingestion loop needs per line
pub struct IngestContext {
    aggregator: Arc<StatsAggregator>,
    writer: Box<dyn RecordSink>,
    events: EventSender,
    stop_requested: Arc<AtomicBool>,
}

impl IngestContext {
    pub fn new<S>(aggregator: Arc<StatsAggregator>, writer: S, events: EventSender) -> Self
    where
        S: RecordSink + 'static,
    {
        Self {
            aggregator,
            writer: Box::new(writer),
            events,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_requested)
    }

    pub fn close(self) -> Result<()> {
        self.writer.close()
    }
}

/// Parse, aggregate, persist and publish each line until the source ends or
/// a stop is requested. Returns the number of lines processed.
///
/// A persistence failure aborts the loop; lines already published stay valid.
pub fn ingest_lines<I>(lines: I, ctx: &mut IngestContext) -> Result<u64>
where
    I: IntoIterator<Item = String>,
{
    let mut processed = 0;

    for line in lines {
        if ctx.stop_requested.load(Ordering::Relaxed) {
            log::debug!("Stop requested, leaving ingestion loop");
            break;
        }

        let record = parser::parse(&line);
        ctx.aggregator.update(&record);
        ctx.writer.append(&record)?;

        let raw = RawLine::new(
            record.observed_at().wall_string(),
            record.raw_line().to_string(),
        );
        log::trace!("{}", raw);
        // A consumer that went away is not a reason to stop logging
        let _ = ctx.events.send(MonitorEvent::RawLine(raw));
        processed += 1;
    }

    Ok(processed)
}

struct ActiveSession {
    probe: Arc<Mutex<Option<ProbeProcess>>>,
    stop_requested: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    ingest: JoinHandle<()>,
    timer: JoinHandle<()>,
}

/// Supervises one probe run at a time and publishes what it observes.
///
/// # Examples
///
/// ```no_run
/// use rtspmon::core::monitor::{MonitorConfig, MonitorEvent, MonitorSession, SessionOptions};
///
/// let (mut session, mut events) = MonitorSession::new(SessionOptions::default())?;
/// session.start(&MonitorConfig::new("rtsp://camera.local/stream"))?;
///
/// while let Some(event) = events.blocking_recv() {
///     match event {
///         MonitorEvent::RawLine(line) => println!("{}", line),
///         MonitorEvent::Stopped => break,
///         _ => {}
///     }
/// }
/// session.stop();
/// # Ok::<(), rtspmon::MonitorError>(())
/// ```
pub struct MonitorSession {
    runtime: tokio::runtime::Runtime,
    options: SessionOptions,
    shared: Shared,
    aggregator: Arc<StatsAggregator>,
    series: Arc<RwLock<SnapshotSeries>>,
    active: Option<ActiveSession>,
}

impl MonitorSession {
    pub fn new(options: SessionOptions) -> Result<(Self, EventReceiver)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("rtspmon-worker")
            .build()
            .map_err(|e| MonitorError::runtime(format!("failed to build runtime: {}", e)))?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            runtime,
            options,
            shared: Shared {
                state: Arc::new(Mutex::new(SessionState::Idle)),
                events: events_tx,
            },
            aggregator: Arc::new(StatsAggregator::new()),
            series: Arc::new(RwLock::new(SnapshotSeries::new())),
            active: None,
        };

        Ok((session, events_rx))
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn aggregator(&self) -> Arc<StatsAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Copy of the snapshots taken so far in the current (or last) session
    pub fn series(&self) -> SnapshotSeries {
        self.series.read().clone()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Start monitoring, replacing any session that is still active.
    ///
    /// Errors are returned and also published as a `Diagnostic` event.
    pub fn start(&mut self, config: &MonitorConfig) -> Result<()> {
        let result = self.try_start(config);
        if let Err(err) = &result {
            let message = match err {
                MonitorError::Launch {
                    message,
                    diagnostics,
                } if !diagnostics.is_empty() => {
                    format!("Probe failed to start: {}\n{}", message, diagnostics)
                }
                other => other.to_string(),
            };
            log::error!("{}", message);
            self.shared.diagnostic(message);
        }
        result
    }

    fn try_start(&mut self, config: &MonitorConfig) -> Result<()> {
        config.validate()?;
        let extra_args = config.extra_args_tokens()?;
        let executable = resolve_executable(config.executable_path.as_deref(), DEFAULT_PROBE)?;

        self.stop();

        self.shared.set_state(SessionState::Starting);
        self.aggregator.reset();
        self.series.write().clear();

        let writer = match CsvLogWriter::open(&config.log_path) {
            Ok(writer) => writer,
            Err(err) => {
                self.fail();
                return Err(err);
            }
        };

        let started = Instant::now();

        let mut probe = match ProbeProcess::start(
            &executable,
            &config.target_url,
            &extra_args,
            &self.options.supervisor,
        ) {
            Ok(probe) => probe,
            Err(err) => {
                self.fail();
                return Err(err);
            }
        };

        let Some(lines) = probe.take_lines() else {
            self.fail();
            return Err(MonitorError::launch("probe has no diagnostic output", ""));
        };

        let probe = Arc::new(Mutex::new(Some(probe)));
        let (shutdown_tx, timer_shutdown) = broadcast::channel::<()>(1);
        let (timer_done_tx, timer_done) = oneshot::channel::<()>();

        let mut ctx = IngestContext::new(
            Arc::clone(&self.aggregator),
            writer,
            self.shared.events.clone(),
        );
        let stop_requested = ctx.stop_flag();

        self.shared.set_state(SessionState::Running);
        log::info!("Monitoring {} -> {:?}", config.target_url, config.log_path);

        let ingest = {
            let shared = self.shared.clone();
            let probe = Arc::clone(&probe);
            let shutdown_tx = shutdown_tx.clone();
            self.runtime.spawn_blocking(move || {
                run_ingestion(lines, ctx, &shared, &probe, &shutdown_tx, timer_done)
            })
        };

        let timer = self.runtime.spawn(snapshot_task(
            Arc::clone(&self.aggregator),
            Arc::clone(&self.series),
            self.shared.clone(),
            started,
            self.options.snapshot_period,
            timer_shutdown,
            timer_done_tx,
        ));

        self.active = Some(ActiveSession {
            probe,
            stop_requested,
            shutdown_tx,
            ingest,
            timer,
        });

        Ok(())
    }

    fn fail(&self) {
        self.shared.set_state(SessionState::Failed);
        self.shared.set_state(SessionState::Idle);
    }

    /// Stop the current session. Never fails; safe to call in any state.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let was_live = {
            let mut state = self.shared.state.lock();
            if matches!(*state, SessionState::Starting | SessionState::Running) {
                *state = SessionState::Stopping;
                true
            } else {
                false
            }
        };
        if was_live {
            log::info!("Stopping monitoring session");
            let _ = self
                .shared
                .events
                .send(MonitorEvent::StateChanged(SessionState::Stopping));
        }

        active.stop_requested.store(true, Ordering::Relaxed);
        let _ = active.shutdown_tx.send(());

        // Terminating the probe closes its stderr, which ends the ingestion loop
        let probe = active.probe.lock().take();
        if let Some(mut probe) = probe {
            probe.stop();
        }

        if let Err(e) = self.runtime.block_on(active.ingest) {
            log::warn!("Ingestion worker ended abnormally: {}", e);
        }
        if let Err(e) = self.runtime.block_on(active.timer) {
            log::warn!("Snapshot timer ended abnormally: {}", e);
        }

        if was_live {
            self.shared.set_state(SessionState::Idle);
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the ingestion worker: drain the probe's lines, then wind the
/// session down. `Stopped` is published only once the snapshot timer has
/// exited, so no snapshot can follow it.
fn run_ingestion<I>(
    lines: I,
    mut ctx: IngestContext,
    shared: &Shared,
    probe: &Mutex<Option<ProbeProcess>>,
    shutdown_tx: &broadcast::Sender<()>,
    timer_done: oneshot::Receiver<()>,
) where
    I: IntoIterator<Item = String>,
{
    match ingest_lines(lines, &mut ctx) {
        Ok(count) => log::info!("Probe output ended after {} lines", count),
        Err(err) => {
            log::error!("Ingestion aborted: {}", err);
            shared.diagnostic(format!("Error writing log: {}", err));
        }
    }
    if let Err(err) = ctx.close() {
        log::warn!("Failed to close log: {}", err);
    }

    let _ = shutdown_tx.send(());
    // Err means the timer task is already gone
    let _ = timer_done.blocking_recv();

    // Reap the probe if it ended on its own or the loop aborted
    let finished = probe.lock().take();
    if let Some(mut finished) = finished {
        finished.stop();
    }

    let _ = shared.events.send(MonitorEvent::Stopped);
    shared.transition(SessionState::Running, SessionState::Idle);
}

/// Publishes one snapshot per period while the session is running
async fn snapshot_task(
    aggregator: Arc<StatsAggregator>,
    series: Arc<RwLock<SnapshotSeries>>,
    shared: Shared,
    started: Instant,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    done: oneshot::Sender<()>,
) {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *shared.state.lock() != SessionState::Running {
                    break;
                }

                let elapsed = started.elapsed().as_secs_f64();
                let snapshot = aggregator.snapshot(elapsed, format_wall_clock(&Local::now()));

                let appended = series.write().push(snapshot.clone());
                if appended && shared.events.send(MonitorEvent::Snapshot(snapshot)).is_err() {
                    log::debug!("Event consumer gone, stopping snapshot timer");
                    break;
                }
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    let _ = done.send(());
}
