//! Process signals mapped onto a broadcast shutdown channel

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Which signal ended the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Terminate,
    Interrupt,
}

impl ShutdownSignal {
    pub fn name(self) -> &'static str {
        match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

/// Spawn the signal listener.
///
/// Every subscriber of the returned sender receives one `ShutdownSignal`
/// when SIGTERM or SIGINT (Ctrl+C off unix) arrives.
pub fn setup_signal_handlers() -> (broadcast::Sender<ShutdownSignal>, JoinHandle<()>) {
    let (shutdown_tx, _) = broadcast::channel(4);
    let notifier = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                info!(signal = signal.name(), "Shutdown requested");
                // No subscribers left just means nothing is waiting
                let _ = notifier.send(signal);
            }
            Err(e) => error!(error = %e, "Failed to install signal handlers"),
        }
    });

    (shutdown_tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_broadcast() {
        let (tx, handle) = setup_signal_handlers();
        let mut rx = tx.subscribe();

        tx.send(ShutdownSignal::Terminate).unwrap();
        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Terminate);
        handle.abort();
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(ShutdownSignal::Terminate.name(), "SIGTERM");
        assert_eq!(ShutdownSignal::Interrupt.name(), "SIGINT");
    }
}
