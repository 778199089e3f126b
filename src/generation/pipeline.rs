//! Generation worker thread
//!
//! A dedicated thread owns a tokio runtime. Commands come in and events go
//! out over bounded crossbeam channels; the UI thread never blocks on the
//! network.

use super::ImageGenerator;
use crate::camera::StillImage;
use crate::{CostumeError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Commands accepted by the generation worker
#[derive(Debug, Clone)]
pub enum GenerationCommand {
    /// Start a request
    Generate {
        request_id: Uuid,
        photo: StillImage,
        subject: String,
    },
    /// Drop the request; its outcome will never be delivered
    Cancel { request_id: Uuid },
    /// Stop the worker
    Shutdown,
}

/// Events emitted by the generation worker
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// The request was accepted and is in flight
    Started { request_id: Uuid },
    /// The service answered with a picture
    Completed {
        request_id: Uuid,
        image: StillImage,
        elapsed_ms: u64,
    },
    /// The request failed
    Failed { request_id: Uuid, message: String },
    /// Worker has shut down
    Shutdown,
}

/// Handle for talking to a running generation worker
pub struct GenerationHandle {
    command_tx: Sender<GenerationCommand>,
    event_rx: Receiver<GenerationEvent>,
    worker_handle: Option<JoinHandle<()>>,
}

impl GenerationHandle {
    /// Submit a request
    pub fn generate(&self, request_id: Uuid, photo: StillImage, subject: &str) -> Result<()> {
        self.command_tx
            .send(GenerationCommand::Generate {
                request_id,
                photo,
                subject: subject.to_string(),
            })
            .map_err(|e| {
                CostumeError::ChannelError(format!("Failed to send generate command: {}", e))
            })
    }

    /// Cancel a request so its outcome is discarded
    pub fn cancel(&self, request_id: Uuid) -> Result<()> {
        self.command_tx
            .send(GenerationCommand::Cancel { request_id })
            .map_err(|e| CostumeError::ChannelError(format!("Failed to send cancel command: {}", e)))
    }

    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<GenerationEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<GenerationEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let _ = self.command_tx.send(GenerationCommand::Shutdown);
        if let Some(handle) = self.worker_handle.take() {
            handle
                .join()
                .map_err(|_| CostumeError::GenerationError("Worker thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for GenerationHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("[GENERATION] {}", e);
        }
    }
}

/// Spawns the worker thread that runs generation requests
pub struct GenerationPipeline {
    generator: Arc<dyn ImageGenerator>,
    timeout: Option<Duration>,
}

impl GenerationPipeline {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start the worker thread.
    ///
    /// The worker owns a tokio runtime; each request runs the blocking
    /// generator call on the runtime's blocking pool.
    pub fn start_worker(self) -> Result<GenerationHandle> {
        let (command_tx, command_rx) = bounded::<GenerationCommand>(100);
        let (event_tx, event_rx) = bounded::<GenerationEvent>(100);

        let runtime = Runtime::new().map_err(|e| {
            CostumeError::GenerationError(format!("Failed to create tokio runtime: {}", e))
        })?;

        let generator = self.generator;
        let timeout = self.timeout;

        let worker_handle = std::thread::Builder::new()
            .name("generation-worker".to_string())
            .spawn(move || {
                runtime.block_on(worker_loop(generator, timeout, command_rx, event_tx));
                runtime.shutdown_background();
            })?;

        Ok(GenerationHandle {
            command_tx,
            event_rx,
            worker_handle: Some(worker_handle),
        })
    }
}

/// Marks an external call as running; cleared when dropped
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn worker_loop(
    generator: Arc<dyn ImageGenerator>,
    timeout: Option<Duration>,
    command_rx: Receiver<GenerationCommand>,
    event_tx: Sender<GenerationEvent>,
) {
    info!("[GENERATION] Worker started with {} backend", generator.name());

    let mut active: Option<(Uuid, tokio::task::JoinHandle<()>)> = None;
    // Aborting a task does not stop its blocking call, so the call itself
    // is tracked
    let in_flight = Arc::new(AtomicBool::new(false));

    loop {
        let command = match command_rx.recv() {
            Ok(cmd) => cmd,
            Err(_) => {
                info!("[GENERATION] Command channel closed, shutting down");
                break;
            }
        };

        match command {
            GenerationCommand::Generate {
                request_id,
                photo,
                subject,
            } => {
                if in_flight.load(Ordering::SeqCst) {
                    match &active {
                        Some((busy_id, _)) => warn!(
                            "[GENERATION] Rejecting {} while {} is in flight",
                            request_id, busy_id
                        ),
                        None => warn!(
                            "[GENERATION] Rejecting {} while a cancelled call is still running",
                            request_id
                        ),
                    }
                    let _ = event_tx.send(GenerationEvent::Failed {
                        request_id,
                        message: "A generation is already in progress.".to_string(),
                    });
                    continue;
                }

                debug!("[GENERATION] Starting request {} for {}", request_id, subject);
                if event_tx.send(GenerationEvent::Started { request_id }).is_err() {
                    error!("[GENERATION] Event channel closed");
                    break;
                }

                let task = tokio::spawn(run_request(
                    Arc::clone(&generator),
                    InFlight::acquire(&in_flight),
                    timeout,
                    request_id,
                    photo,
                    subject,
                    event_tx.clone(),
                ));
                active = Some((request_id, task));
            }

            GenerationCommand::Cancel { request_id } => match &active {
                Some((id, task)) if *id == request_id => {
                    task.abort();
                    info!("[GENERATION] Cancelled request {}", request_id);
                    active = None;
                }
                _ => debug!("[GENERATION] Cancel for unknown request {}", request_id),
            },

            GenerationCommand::Shutdown => {
                info!("[GENERATION] Shutdown requested");
                if let Some((_, task)) = active.take() {
                    task.abort();
                }
                let _ = event_tx.send(GenerationEvent::Shutdown);
                break;
            }
        }
    }

    info!("[GENERATION] Worker stopped");
}

async fn run_request(
    generator: Arc<dyn ImageGenerator>,
    in_flight: InFlight,
    timeout: Option<Duration>,
    request_id: Uuid,
    photo: StillImage,
    subject: String,
    event_tx: Sender<GenerationEvent>,
) {
    let started = Instant::now();
    let call = tokio::task::spawn_blocking(move || {
        let _in_flight = in_flight;
        generator.generate(&photo, &subject)
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("[GENERATION] Request {} timed out", request_id);
                let _ = event_tx.send(GenerationEvent::Failed {
                    request_id,
                    message: format!(
                        "The generation service did not answer within {} seconds.",
                        limit.as_secs_f32()
                    ),
                });
                return;
            }
        },
        None => call.await,
    };

    let event = match joined {
        Ok(Ok(image)) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(
                "[GENERATION] Request {} completed in {}ms ({} bytes)",
                request_id,
                elapsed_ms,
                image.len()
            );
            GenerationEvent::Completed {
                request_id,
                image,
                elapsed_ms,
            }
        }
        Ok(Err(e)) => {
            warn!("[GENERATION] Request {} failed: {}", request_id, e);
            GenerationEvent::Failed {
                request_id,
                message: e.user_message(),
            }
        }
        Err(e) => {
            error!("[GENERATION] Request {} task failed: {}", request_id, e);
            GenerationEvent::Failed {
                request_id,
                message: "An unknown error occurred.".to_string(),
            }
        }
    };

    if event_tx.send(event).is_err() {
        debug!("[GENERATION] Nobody is listening for request {}", request_id);
    }
}
