//! # Example: one_shot_pipeline
//!
//! Waits for the first value of a callback source, reacts to it once and exits.
//! With `repeating(false)` and no cancel signal the reactor ends as soon as its
//! single reaction finishes. Every diagnostic event is printed by `LogWriter`.
//!
//! ## Flow
//! ```text
//! timer callback ──resolve("ticket-1")──► Emitter ──► Dispatcher(TICKET)
//!                                                        │
//!                                     CallbackReactor ◄──┘
//!                                        └─► lookup("ticket-1") → done → reactor completes
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example one_shot_pipeline --features logging
//! ```

use std::{sync::Arc, time::Duration};

use callvisor::{
    ActionCreator, CallbackReactor, Config, LogWriter, Reaction, Runtime, Subscribe, TaskError,
};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let rt = Runtime::builder(Config {
        grace: Duration::from_secs(2),
        ..Config::default()
    })
    .with_subscribers(subs)
    .build();

    let lookup = Reaction::new("lookup", |ticket: String, ctx: CancellationToken| async move {
        tokio::select! {
            _ = ctx.cancelled() => Err(TaskError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                println!("[lookup] {ticket} resolved");
                Ok(())
            }
        }
    });

    let reactor = CallbackReactor::builder(
        "ticket",
        rt.config().dispatcher::<String>(),
        ActionCreator::new("TICKET"),
        lookup,
    )
    .with_bus(rt.bus().clone())
    .repeating(false)
    .configure(|resolve| {
        tokio::spawn(async move {
            let mut n = 0;
            // The source keeps calling back; only the first pulled value counts.
            loop {
                n += 1;
                resolve.resolve(format!("ticket-{n}"));
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
    })
    .build()?;

    rt.spawn(Arc::new(reactor));
    rt.wait().await;

    // Flush the subscriber queues before exiting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    rt.shutdown().await?;
    Ok(())
}
