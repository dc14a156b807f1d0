//! Background audit writer.
//!
//! Handlers record events through an [`AuditHandle`] without waiting on
//! storage. A single [`AuditWriter`] task drains the queue into the
//! configured logger. When the queue is full new events are dropped and
//! counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use agrotrack_core::{AuditError, AuditEvent, AuditLogger};

/// Sends audit events to the writer task.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEvent>,
    dropped: Arc<AtomicU64>,
    capacity: usize,
}

impl AuditHandle {
    /// Queue an event. Never blocks.
    pub fn record(&self, event: AuditEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %event.id_hex(), "audit queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %event.id_hex(), "audit writer stopped, event dropped");
            }
        }
    }

    /// Events dropped since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Drains queued events into a logger.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEvent>,
    logger: Arc<dyn AuditLogger>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEvent>, logger: Arc<dyn AuditLogger>) -> Self {
        Self { rx, logger }
    }

    /// Run until every handle is dropped, then flush the logger.
    pub async fn run(mut self) {
        info!("audit writer started");

        while let Some(event) = self.rx.recv().await {
            debug!(id = %event.id_hex(), actor = %event.actor, "writing audit event");
            let logger = self.logger.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || logger.log(event)).await {
                warn!(error = %e, "audit write task failed");
            }
        }

        let logger = self.logger.clone();
        match tokio::task::spawn_blocking(move || logger.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to flush audit log"),
            Err(e) => warn!(error = %e, "audit flush task failed"),
        }
        info!("audit writer stopped (channel closed)");
    }
}

/// Writes each event to several loggers in order.
pub struct FanoutAuditLogger {
    loggers: Vec<Arc<dyn AuditLogger>>,
}

impl FanoutAuditLogger {
    pub fn new(loggers: Vec<Arc<dyn AuditLogger>>) -> Self {
        Self { loggers }
    }
}

impl AuditLogger for FanoutAuditLogger {
    fn log(&self, event: AuditEvent) {
        if let Some((last, rest)) = self.loggers.split_last() {
            for logger in rest {
                logger.log(event.clone());
            }
            last.log(event);
        }
    }

    fn flush(&self) -> Result<(), AuditError> {
        for logger in &self.loggers {
            logger.flush()?;
        }
        Ok(())
    }
}

/// Spawn an audit writer and return a handle for recording events.
pub fn start_writer(logger: Arc<dyn AuditLogger>, capacity: usize) -> (AuditHandle, JoinHandle<()>) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let writer = AuditWriter::new(rx, logger);

    let task = tokio::spawn(async move {
        writer.run().await;
    });

    let handle = AuditHandle {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
        capacity,
    };
    (handle, task)
}
