use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use thermolink_port::{DriverConfig, PortEvent, PortSettings, SerialPort};
use thermolink_protocol::FrameCarry;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{AcquireConfig, DataloggerConfig};
use crate::error::{AcquireError, Result};
use crate::store::{ChannelSnapshot, ChannelStore};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs one acquisition task per configured datalogger and funnels their
/// readings into a shared [`ChannelStore`].
///
/// Loggers fail independently. A logger whose port cannot be opened is
/// skipped with a warning; startup is fatal only when no logger at all
/// could be started.
#[derive(Debug)]
pub struct Supervisor {
    store: Arc<Mutex<ChannelStore>>,
    shutdown: watch::Sender<bool>,
    workers: Vec<(String, JoinHandle<()>)>,
}

impl Supervisor {
    pub async fn start(
        config: AcquireConfig,
        settings: PortSettings,
        driver: DriverConfig,
    ) -> Result<Self> {
        config.validate()?;
        let attempted = config.dataloggers.len();
        let store = Arc::new(Mutex::new(ChannelStore::new(
            config.default_thermocouple_type.clone(),
            config.connection_timeout(),
        )));
        let (shutdown, _) = watch::channel(false);

        // Every port opens concurrently so one device's retry backoff never
        // delays the others.
        let mut opens = tokio::task::JoinSet::new();
        for (index, logger) in config.dataloggers.into_iter().enumerate() {
            let driver = driver.clone();
            opens.spawn(async move {
                let mut port = SerialPort::new(&logger.device, settings, driver);
                let result = port.open().await;
                (index, logger, port, result)
            });
        }
        let mut opened = Vec::new();
        while let Some(joined) = opens.join_next().await {
            let Ok((index, logger, port, result)) = joined else {
                warn!("datalogger open task failed");
                continue;
            };
            match result {
                Ok(()) => opened.push((index, logger, port)),
                Err(err) => warn!(
                    logger = %logger.id,
                    device = %logger.device.display(),
                    %err,
                    "skipping datalogger, port did not open"
                ),
            }
        }
        opened.sort_by_key(|(index, _, _)| *index);

        let mut workers = Vec::new();
        for (index, logger, mut port) in opened {
            let number = index + 1;
            let Some(reader) = port.take_reader() else {
                warn!(logger = %logger.id, "skipping datalogger, no byte stream");
                port.close().await;
                continue;
            };
            let events = port.events();
            lock(&store).seed(&logger);
            info!(
                logger = %logger.id,
                device = %logger.device.display(),
                "datalogger started"
            );

            let id = logger.id.clone();
            let handle = tokio::spawn(worker(
                port,
                reader,
                events,
                logger,
                number,
                Arc::clone(&store),
                shutdown.subscribe(),
            ));
            workers.push((id, handle));
        }

        if workers.is_empty() {
            return Err(AcquireError::NoSources { attempted });
        }
        Ok(Self {
            store,
            shutdown,
            workers,
        })
    }

    /// Current per-channel state across all loggers.
    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        lock(&self.store).snapshot()
    }

    pub fn logger_connected(&self, logger_id: &str) -> bool {
        lock(&self.store).logger_connected(logger_id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop every worker and close its port.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (id, handle) in self.workers {
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!(logger = %id, "worker did not stop in time");
            }
        }
        info!("acquisition stopped");
    }
}

fn lock(store: &Mutex<ChannelStore>) -> MutexGuard<'_, ChannelStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One datalogger's acquisition loop. Parses the port's byte stream into
/// the store and forwards driver lifecycle events to the log. Runs until
/// shutdown, or until the port dies and cannot be reopened.
async fn worker(
    mut port: SerialPort,
    mut reader: mpsc::Receiver<Bytes>,
    mut events: broadcast::Receiver<PortEvent>,
    logger: DataloggerConfig,
    number: usize,
    store: Arc<Mutex<ChannelStore>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut carry = FrameCarry::new();
    let mut parse_errors: u64 = 0;
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                port.close().await;
                break;
            }
            chunk = reader.recv() => match chunk {
                Some(chunk) => {
                    for parsed in carry.feed(&chunk) {
                        match parsed {
                            Ok(reading) => lock(&store).record(&logger, number, &reading),
                            Err(err) => {
                                parse_errors += 1;
                                debug!(
                                    logger = %logger.id,
                                    %err,
                                    total = parse_errors,
                                    "frame rejected"
                                );
                            }
                        }
                    }
                }
                None => {
                    // Port died underneath us. Reopen with the driver's own
                    // retry policy; give up on this logger if that fails.
                    carry.clear();
                    port.close().await;
                    warn!(logger = %logger.id, "port lost, reopening");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        reopened = port.open() => match reopened {
                            Ok(()) => {
                                let Some(next) = port.take_reader() else {
                                    break;
                                };
                                reader = next;
                                events = port.events();
                            }
                            Err(err) => {
                                warn!(logger = %logger.id, %err, "reopen failed, giving up");
                                break;
                            }
                        }
                    }
                }
            },
            event = events.recv() => match event {
                Ok(PortEvent::Data(_)) => {}
                Ok(PortEvent::Opened) => info!(logger = %logger.id, "port opened"),
                Ok(PortEvent::Closed) => info!(logger = %logger.id, "port closed"),
                Ok(PortEvent::HealthChanged(true)) => {
                    info!(logger = %logger.id, "receiving data again")
                }
                Ok(PortEvent::HealthChanged(false)) => {
                    warn!(logger = %logger.id, "no data within the silence threshold")
                }
                Ok(PortEvent::Error(message)) => {
                    warn!(logger = %logger.id, %message, "port error")
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(logger = %logger.id, skipped, "event stream lagged")
                }
                Err(broadcast::error::RecvError::Closed) => {}
            }
        }
    }
}
