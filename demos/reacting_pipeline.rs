//! # Example: reacting_pipeline
//!
//! A callback-style sensor pushes position fixes from its own thread. A
//! [`CallbackReactor`] turns every fix into a `POSITION` action and follows the
//! latest one: each new fix cancels the reaction still busy with the previous.
//! Dispatching `STOP_TRACKING` tears the whole pipeline down; Ctrl-C (or
//! SIGTERM) shuts the runtime down first if it arrives earlier.
//!
//! ## Flow
//! ```text
//! sensor thread ──resolve(fix)──► CallbackBridge ──► Emitter ──► Dispatcher(POSITION)
//!                                                                    │
//!                                      CallbackReactor ◄─────────────┘
//!                                         ├─► fix #1 → track(#1)
//!                                         ├─► fix #2 → cancel track(#1), track(#2)
//!                                         └─► STOP_TRACKING → cancel track, cancel emitter
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example reacting_pipeline
//! cargo run --example reacting_pipeline --features logging
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use callvisor::{
    ActionCreator, CallbackReactor, Config, Reaction, Runtime, Subscribe, TaskError,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
struct Fix {
    seq: u32,
    lat: f64,
    lon: f64,
}

/// Stand-in for a platform API that only offers callbacks.
struct Sensor {
    running: Arc<AtomicBool>,
}

impl Sensor {
    fn on_fix<F>(callback: F) -> Self
    where
        F: Fn(Fix) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        thread::spawn(move || {
            let mut seq = 0;
            while flag.load(Ordering::Relaxed) {
                seq += 1;
                callback(Fix {
                    seq,
                    lat: 52.52 + f64::from(seq) * 0.001,
                    lon: 13.40,
                });
                thread::sleep(Duration::from_millis(400));
            }
        });
        Self { running }
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[allow(unused_mut)]
    let mut subs: Vec<Arc<dyn Subscribe>> = Vec::new();
    #[cfg(feature = "logging")]
    subs.push(Arc::new(callvisor::LogWriter::new()));

    let rt = Runtime::builder(Config::default()).with_subscribers(subs).build();
    let dispatcher = rt.config().dispatcher::<Fix>();

    let track = Reaction::new("track", |fix: Fix, ctx: CancellationToken| async move {
        println!("[track] following fix #{} ({:.3}, {:.3})", fix.seq, fix.lat, fix.lon);
        tokio::select! {
            _ = ctx.cancelled() => println!("[track] fix #{} superseded", fix.seq),
            _ = tokio::time::sleep(Duration::from_secs(5)) => println!("[track] fix #{} settled", fix.seq),
        }
        Ok::<_, TaskError>(())
    });

    let sensor: Arc<std::sync::Mutex<Option<Sensor>>> = Arc::default();
    let slot = sensor.clone();
    let reactor = CallbackReactor::builder("gps", dispatcher.clone(), ActionCreator::new("POSITION"), track)
        .with_bus(rt.bus().clone())
        .cancel_on("STOP_TRACKING")
        .configure(move |resolve| {
            let s = Sensor::on_fix(move |fix| {
                resolve.resolve(fix);
            });
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(s);
            }
        })
        .build()?;

    rt.spawn(Arc::new(reactor));

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        println!("[main] stop tracking");
        dispatcher.signal("STOP_TRACKING");
    });

    // Ctrl-C before the stop signal shuts the runtime down instead.
    rt.run_until_signal().await?;
    drop(sensor);
    Ok(())
}
