use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};

use crate::config::{DriverConfig, PortSettings};
use crate::error::{classify_diagnostic, PortError, Result};
use crate::event::PortEvent;
use crate::platform;

const READ_CHUNK_SIZE: usize = 1024;

/// One queued outbound write with its completion notifier.
struct WriteRequest {
    data: Bytes,
    ack: oneshot::Sender<Result<()>>,
}

/// Completion handle returned by [`SerialPort::try_write`].
#[derive(Debug)]
pub struct WriteAck {
    rx: oneshot::Receiver<Result<()>>,
}

impl WriteAck {
    /// Wait for the drain loop to deliver (or reject) the write.
    pub async fn wait(self) -> Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(PortError::Closed),
        }
    }
}

/// State shared with the driver's background tasks.
struct Shared {
    open: AtomicBool,
    healthy: AtomicBool,
    /// Epoch milliseconds of the last received chunk; 0 = never.
    last_rx_ms: AtomicU64,
    events: broadcast::Sender<PortEvent>,
}

impl Shared {
    fn emit(&self, event: PortEvent) {
        let _ = self.events.send(event);
    }

    fn note_rx(&self) {
        self.last_rx_ms.store(now_ms(), Ordering::SeqCst);
        if !self.healthy.swap(true, Ordering::SeqCst) {
            self.emit(PortEvent::HealthChanged(true));
        }
    }

    fn rx_within(&self, window: Duration) -> bool {
        let ms = self.last_rx_ms.load(Ordering::SeqCst);
        ms != 0 && now_ms().saturating_sub(ms) < window.as_millis() as u64
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Resources owned by one open session.
struct Active {
    child: Child,
    writer_tx: mpsc::Sender<WriteRequest>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// A duplex byte channel over one serial device, backed by platform
/// utilities rather than a native serial binding.
///
/// The driver exclusively owns its relay process and lock artifact for the
/// lifetime of a session. Inbound bytes surface both as [`PortEvent::Data`]
/// broadcasts and through the pull stream from [`take_reader`]; each chunk
/// is delivered exactly once to each representation, and chunks a lagging
/// pull consumer misses are not re-buffered.
///
/// [`take_reader`]: SerialPort::take_reader
pub struct SerialPort {
    path: PathBuf,
    settings: PortSettings,
    config: DriverConfig,
    shared: Arc<Shared>,
    active: Option<Active>,
    reader_rx: Option<mpsc::Receiver<Bytes>>,
}

impl SerialPort {
    pub fn new(path: impl Into<PathBuf>, settings: PortSettings, config: DriverConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            path: path.into(),
            settings,
            config,
            shared: Arc::new(Shared {
                open: AtomicBool::new(false),
                healthy: AtomicBool::new(false),
                last_rx_ms: AtomicU64::new(0),
                events,
            }),
            active: None,
            reader_rx: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// True only when open and data arrived within the silence threshold.
    pub fn is_healthy(&self) -> bool {
        self.is_open() && self.shared.rx_within(self.config.silence_threshold)
    }

    /// Subscribe to this driver's lifecycle and data events.
    pub fn events(&self) -> broadcast::Receiver<PortEvent> {
        self.shared.events.subscribe()
    }

    /// Take the pull-style inbound byte stream. Single consumer; renewed on
    /// each successful `open`.
    pub fn take_reader(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.reader_rx.take()
    }

    /// Open the port, retrying transient failures with exponential backoff
    /// (doubling from the initial delay, capped, bounded attempt count).
    /// Non-transient failures and exhausted retries report the last error.
    pub async fn open(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(PortError::AlreadyOpen);
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.spawn_session().await {
                Ok(active) => {
                    self.active = Some(active);
                    info!(path = %self.path.display(), attempt, "port open");
                    self.shared.emit(PortEvent::Opened);
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.config.max_open_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        path = %self.path.display(),
                        %err,
                        attempt,
                        ?delay,
                        "open failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(path = %self.path.display(), %err, attempt, "open failed permanently");
                    return Err(err);
                }
            }
        }
    }

    /// Enqueue an outbound write without blocking.
    ///
    /// Fails immediately with `BufferOverflow` when the FIFO is at capacity;
    /// this is the backpressure contract. The returned ack resolves once the
    /// drain loop has pushed the bytes to the device, or with `Closed` if
    /// the port shuts down first.
    pub fn try_write(&self, data: Bytes) -> Result<WriteAck> {
        let Some(active) = &self.active else {
            return Err(PortError::Closed);
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        match active.writer_tx.try_send(WriteRequest { data, ack: ack_tx }) {
            Ok(()) => Ok(WriteAck { rx: ack_rx }),
            Err(TrySendError::Full(_)) => Err(PortError::BufferOverflow {
                cap: self.config.write_queue_cap,
            }),
            Err(TrySendError::Closed(_)) => Err(PortError::Closed),
        }
    }

    /// Enqueue a write and wait for it to reach the device.
    pub async fn write(&self, data: Bytes) -> Result<()> {
        self.try_write(data)?.wait().await
    }

    /// Close the port: cancel pending writes, terminate the relay process
    /// (graceful first, forceful after the grace period), clear lock
    /// artifacts. Closing a closed port is a no-op.
    pub async fn close(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let was_open = self.shared.open.swap(false, Ordering::SeqCst);
        self.shared.healthy.store(false, Ordering::SeqCst);
        let _ = active.shutdown_tx.send(true);

        platform::terminate(&mut active.child, self.config.kill_grace).await;
        for mut task in active.tasks {
            if tokio::time::timeout(Duration::from_secs(1), &mut task)
                .await
                .is_err()
            {
                task.abort();
            }
        }

        platform::release_lock(&self.path);
        self.reader_rx = None;
        if was_open {
            info!(path = %self.path.display(), "port closed");
            self.shared.emit(PortEvent::Closed);
        }
    }

    /// One open attempt: lock check, line discipline, relay spawn, settle.
    async fn spawn_session(&mut self) -> Result<Active> {
        platform::check_lock(&self.path)?;

        if self.config.configure_line {
            let mut configure = platform::configure_command(&self.path, &self.settings)
                .ok_or(PortError::UnsupportedPlatform)?;
            let output = configure.output().await.map_err(PortError::Spawn)?;
            if !output.status.success() {
                let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
                return Err(classify_diagnostic(&self.path, &text)
                    .unwrap_or(PortError::Configure(text)));
            }
        }

        platform::claim_lock(&self.path);

        let mut command = platform::relay_command(&self.path).ok_or(PortError::UnsupportedPlatform)?;
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                platform::release_lock(&self.path);
                return Err(PortError::Spawn(err));
            }
        };

        tokio::time::sleep(self.config.settle_delay).await;
        if let Some(status) = child.try_wait()? {
            let mut text = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                let _ = stderr.read_to_string(&mut text).await;
            }
            platform::release_lock(&self.path);
            let text = text.trim().to_string();
            return Err(classify_diagnostic(&self.path, &text).unwrap_or_else(|| {
                PortError::Configure(format!("relay exited during settle ({status}): {text}"))
            }));
        }

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            platform::terminate(&mut child, self.config.kill_grace).await;
            platform::release_lock(&self.path);
            return Err(PortError::Configure("relay pipes unavailable".to_string()));
        };
        let stderr = child.stderr.take();

        // Fresh session: previous health state must not leak across opens.
        self.shared.last_rx_ms.store(0, Ordering::SeqCst);
        self.shared.healthy.store(false, Ordering::SeqCst);
        self.shared.open.store(true, Ordering::SeqCst);

        let (writer_tx, writer_rx) = mpsc::channel(self.config.write_queue_cap);
        let (data_tx, data_rx) = mpsc::channel(self.config.reader_capacity);
        let (shutdown_tx, _) = watch::channel(false);
        let mut tasks = Vec::new();

        tasks.push(self.spawn_reader(stdout, data_tx));
        if let Some(stderr) = stderr {
            tasks.push(self.spawn_stderr(stderr));
        }
        tasks.push(self.spawn_drain(stdin, writer_rx, shutdown_tx.subscribe()));
        tasks.push(self.spawn_health(shutdown_tx.subscribe()));

        self.reader_rx = Some(data_rx);
        Ok(Active {
            child,
            writer_tx,
            shutdown_tx,
            tasks,
        })
    }

    fn spawn_reader(
        &self,
        mut stdout: tokio::process::ChildStdout,
        data_tx: mpsc::Sender<Bytes>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let path = self.path.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        shared.note_rx();
                        let chunk = Bytes::copy_from_slice(&buf[..n]);
                        shared.emit(PortEvent::Data(chunk.clone()));
                        if data_tx.try_send(chunk).is_err() {
                            // Pull consumer absent or behind; the chunk went
                            // out on the event channel and is not re-queued.
                            trace!("pull stream lagging; chunk dropped from pull side");
                        }
                    }
                    Err(err) => {
                        shared.emit(PortEvent::Error(format!("read failed: {err}")));
                        break;
                    }
                }
            }
            // Spontaneous relay death; close() takes this path first when
            // the shutdown was requested.
            if shared.open.swap(false, Ordering::SeqCst) {
                shared.healthy.store(false, Ordering::SeqCst);
                let err = PortError::Disconnected { path };
                warn!(%err, "relay stream ended");
                shared.emit(PortEvent::Error(err.to_string()));
                shared.emit(PortEvent::Closed);
            }
        })
    }

    fn spawn_stderr(&self, stderr: tokio::process::ChildStderr) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let path = self.path.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let message = match classify_diagnostic(&path, &line) {
                    Some(err) => err.to_string(),
                    None => format!("device diagnostic: {line}"),
                };
                warn!(path = %path.display(), %line, "relay diagnostic");
                shared.emit(PortEvent::Error(message));
            }
        })
    }

    fn spawn_drain(
        &self,
        mut stdin: tokio::process::ChildStdin,
        mut writer_rx: mpsc::Receiver<WriteRequest>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let delay = self.config.inter_write_delay;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    req = writer_rx.recv() => {
                        let Some(req) = req else { break };
                        let result: std::io::Result<()> = async {
                            stdin.write_all(&req.data).await?;
                            stdin.flush().await
                        }
                        .await;
                        match result {
                            Ok(()) => {
                                let _ = req.ack.send(Ok(()));
                            }
                            Err(err) => {
                                shared.emit(PortEvent::Error(format!("write failed: {err}")));
                                let _ = req.ack.send(Err(PortError::Io(err)));
                            }
                        }
                        // Pace writes so the device's UART is not overrun.
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            writer_rx.close();
            while let Ok(req) = writer_rx.try_recv() {
                let _ = req.ack.send(Err(PortError::Closed));
            }
        })
    }

    fn spawn_health(&self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let silence = self.config.silence_threshold;
        let cadence = self.config.health_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // immediate first tick
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if !shared.open.load(Ordering::SeqCst) {
                            continue;
                        }
                        if !shared.rx_within(silence)
                            && shared.healthy.swap(false, Ordering::SeqCst)
                        {
                            warn!("no data within silence window; marking unhealthy");
                            shared.emit(PortEvent::HealthChanged(false));
                        }
                    }
                }
            }
        })
    }
}
