use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation signal handed to every long-running task.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, Shutdown { rx })
}

impl Shutdown {
    /// Resolves once shutdown is triggered, or every trigger has been dropped.
    pub async fn wait(mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Triggers shutdown on SIGINT or SIGTERM.
pub async fn listen_for_shutdown(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to register SIGTERM handler");
            trigger.trigger();
            return;
        }
    };

    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = term.recv() => {},
    }

    #[cfg(not(unix))]
    let _ = ctrl_c.await;

    tracing::info!("Shutdown signal received");
    trigger.trigger();
}
