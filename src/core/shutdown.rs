//! # Termination signals for [`Runtime::run_until_signal`](crate::Runtime::run_until_signal).
//!
//! [`termination`] resolves with the [`ShutdownSignal`] that arrived, so the
//! runtime can record why it stopped (the `reason` of `ShutdownRequested`).
//!
//! | Platform | Listened for                                   |
//! |----------|------------------------------------------------|
//! | unix     | `SIGINT` (and Ctrl-C), `SIGTERM`, `SIGQUIT`    |
//! | other    | Ctrl-C                                         |

/// Termination signal that ended a [`Runtime::run_until_signal`](crate::Runtime::run_until_signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) enum ShutdownSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl ShutdownSignal {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "signal_interrupt",
            ShutdownSignal::Terminate => "signal_terminate",
            ShutdownSignal::Quit => "signal_quit",
        }
    }
}

/// Waits for the next termination signal.
///
/// Listeners are registered per call; `Err` means registration failed.
#[cfg(unix)]
pub(crate) async fn termination() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = quit.recv() => ShutdownSignal::Quit,
    };
    Ok(received)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn termination() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_signal() {
        assert_eq!(ShutdownSignal::Interrupt.as_label(), "signal_interrupt");
        assert_eq!(ShutdownSignal::Terminate.as_label(), "signal_terminate");
        assert_eq!(ShutdownSignal::Quit.as_label(), "signal_quit");
    }
}
