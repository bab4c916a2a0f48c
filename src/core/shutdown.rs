//! # Shutdown triggers.
//!
//! The supervisor stops on whichever comes first:
//! - its own [`CancellationToken`] (programmatic shutdown, tests);
//! - an OS termination signal (`SIGINT`, `SIGTERM`, `SIGQUIT` on unix; Ctrl-C elsewhere).
//!
//! If signal handlers cannot be installed the token remains the only trigger.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What ended the supervisor's wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StopReason {
    Signal,
    Requested,
}

impl StopReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            StopReason::Signal => "signal",
            StopReason::Requested => "requested",
        }
    }
}

/// Resolves once `token` is cancelled or the process receives a termination signal.
pub(crate) async fn wait_for_stop(token: &CancellationToken) -> StopReason {
    let signal = async {
        if let Err(e) = os_signal().await {
            warn!(error = %e, "cannot listen for termination signals");
            std::future::pending::<()>().await;
        }
    };

    let reason = tokio::select! {
        biased;
        _ = token.cancelled() => StopReason::Requested,
        _ = signal => StopReason::Signal,
    };
    info!(reason = reason.as_str(), "shutdown triggered");
    reason
}

#[cfg(unix)]
async fn os_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn os_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
