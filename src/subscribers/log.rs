//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for demos and local debugging.
//!
//! ## Example output
//! ```text
//! [emitter-starting] task="gps"
//! [value-received] task="gps" frame=1
//! [reaction-started] task="gps" generation=1
//! [reaction-replaced] task="gps" generation=1
//! [reactor-completed] task="gps" reason="cancel_signal"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn task(e: &Event) -> &str {
    e.task.as_deref().unwrap_or("-")
}

fn reason(e: &Event) -> &str {
    e.reason.as_deref().unwrap_or("-")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let n = e.attempt.unwrap_or_default();
        match e.kind {
            EventKind::EmitterStarting => println!("[emitter-starting] task={:?}", task(e)),
            EventKind::ValueReceived => println!("[value-received] task={:?} frame={n}", task(e)),
            EventKind::ValueEmitted => {
                println!("[value-emitted] task={:?} frame={n} action={:?}", task(e), reason(e))
            }
            EventKind::EmitterCancelled => println!("[emitter-cancelled] task={:?}", task(e)),
            EventKind::EmitterCompleted => {
                println!("[emitter-completed] task={:?} reason={:?}", task(e), reason(e))
            }
            EventKind::EmitterFailed => {
                println!("[emitter-failed] task={:?} err={:?}", task(e), reason(e))
            }
            EventKind::ReactorStarting => println!("[reactor-starting] task={:?}", task(e)),
            EventKind::ReactorCancelled => println!("[reactor-cancelled] task={:?}", task(e)),
            EventKind::ReactorCompleted => {
                println!("[reactor-completed] task={:?} reason={:?}", task(e), reason(e))
            }
            EventKind::CancelSignalReceived => {
                println!("[cancel-signal] task={:?} signal={:?}", task(e), reason(e))
            }
            EventKind::ReactionStarted => {
                println!("[reaction-started] task={:?} generation={n}", task(e))
            }
            EventKind::ReactionReplaced => {
                println!("[reaction-replaced] task={:?} generation={n}", task(e))
            }
            EventKind::ReactionStopped => {
                println!("[reaction-stopped] task={:?} generation={n}", task(e))
            }
            EventKind::ReactionCancelled => {
                println!("[reaction-cancelled] task={:?} generation={n}", task(e))
            }
            EventKind::ReactionFailed => println!(
                "[reaction-failed] task={:?} generation={n} err={:?}",
                task(e),
                reason(e)
            ),
            EventKind::EventIgnored => {
                println!("[event-ignored] task={:?} action={:?}", task(e), reason(e))
            }
            EventKind::DispatchLagged => {
                println!("[dispatch-lagged] task={:?} {}", task(e), reason(e))
            }
            EventKind::TaskStarting => println!("[starting] task={:?}", task(e)),
            EventKind::TaskStopped => println!("[stopped] task={:?}", task(e)),
            EventKind::TaskFailed => println!("[failed] task={:?} err={:?}", task(e), reason(e)),
            EventKind::ShutdownRequested => println!("[shutdown-requested] {}", reason(e)),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded]"),
            EventKind::SubscriberOverflow => println!(
                "[subscriber-overflow] subscriber={:?} reason={:?}",
                task(e),
                reason(e)
            ),
            EventKind::SubscriberPanicked => println!(
                "[subscriber-panicked] subscriber={} info={}",
                task(e),
                reason(e)
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
