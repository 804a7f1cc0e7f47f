//! Graceful shutdown coordination.
//!
//! Provides signal handling and a shared controller so in-flight streams can
//! drain before the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Controller for coordinating graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    initiated: AtomicBool,
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a new shutdown controller.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
                rx,
            }),
        }
    }

    /// Whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.initiated.load(Ordering::Relaxed)
    }

    /// Subscribe to the shutdown signal.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.rx.clone()
    }

    /// Initiate shutdown, waking all subscribers.
    pub fn shutdown(&self) {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("shutdown initiated");
            let _ = self.inner.tx.send(true);
        }
    }
}

/// Wait for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
