mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use callvisor::{
    ActionCreator, CallbackReactor, Config, Event, EventKind, Reaction, Runtime, Subscribe,
    TaskError,
};
use common::{bridge, push, settle};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<EventKind>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

struct Exploding;

#[async_trait]
impl Subscribe for Exploding {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::TaskStarting {
            panic!("subscriber bug");
        }
    }

    fn name(&self) -> &'static str {
        "exploding"
    }
}

#[tokio::test(flavor = "current_thread")]
async fn runtime_hosts_reactor_until_shutdown() {
    let recorder = Arc::new(Recorder::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let rt = Runtime::builder(Config::default()).with_subscribers(subs).build();

    let dispatcher = rt.config().dispatcher::<String>();
    let (bridge, resolver) = bridge();
    let reaction = Reaction::new("follow", |_room: String, ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, TaskError>(())
    });
    let reactor = CallbackReactor::builder("rooms", dispatcher, ActionCreator::new("ROOM"), reaction)
        .with_bridge(bridge.clone())
        .with_bus(rt.bus().clone())
        .cancel_on("LOGOUT")
        .build()
        .unwrap();

    rt.spawn(Arc::new(reactor));
    push(&bridge, &resolver, "lobby".to_string()).await;
    settle().await;
    assert_eq!(rt.alive(), vec!["rooms".to_string()]);

    rt.shutdown().await.unwrap();
    assert!(rt.alive().is_empty());
    settle().await;

    let kinds = recorder.kinds();
    for expected in [
        EventKind::TaskStarting,
        EventKind::ReactorStarting,
        EventKind::ReactionStarted,
        EventKind::ShutdownRequested,
        EventKind::ReactionCancelled,
        EventKind::ReactorCancelled,
        EventKind::TaskStopped,
        EventKind::AllStoppedWithin,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
    assert!(!kinds.contains(&EventKind::TaskFailed));
}

#[tokio::test(flavor = "current_thread")]
async fn panicking_subscriber_is_isolated() {
    let recorder = Arc::new(Recorder::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Exploding), recorder.clone()];
    let rt = Runtime::builder(Config::default()).with_subscribers(subs).build();

    rt.spawn(callvisor::TaskFn::arc("noop", |_ctx: CancellationToken| async {
        Ok::<_, TaskError>(())
    }));
    rt.wait().await;
    settle().await;

    let kinds = recorder.kinds();
    assert!(kinds.contains(&EventKind::TaskStopped));
    assert!(kinds.contains(&EventKind::SubscriberPanicked));
}
