mod common;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use callvisor::{
    ActionCreator, Bus, CallbackPipeline, ConfigError, Dispatcher, EventKind, EventSpec, TaskError,
};
use common::{bridge, count, drain, push, settle};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "current_thread")]
async fn repeating_pipeline_dispatches_frames_in_order() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let mut actions = dispatcher.subscribe();
    let (bridge, resolver) = bridge();

    let pipeline = CallbackPipeline::builder("gps", dispatcher.clone(), ActionCreator::new("GPS"))
        .with_bridge(bridge.clone())
        .cancel_on("STOP")
        .build()
        .unwrap();
    let run = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run(CancellationToken::new()).await }
    });

    for frame in [1, 2, 3] {
        push(&bridge, &resolver, frame).await;
    }
    for expected in [1, 2, 3] {
        let action = actions.recv().await.unwrap();
        assert!(action.is("GPS"));
        assert_eq!(action.payload, Some(expected));
    }

    dispatcher.signal("STOP");
    assert_eq!(run.await.unwrap(), Ok(()));
}

#[tokio::test(flavor = "current_thread")]
async fn one_shot_pipeline_emits_exactly_once() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let mut actions = dispatcher.subscribe();
    let (bridge, resolver) = bridge();

    let pipeline = CallbackPipeline::builder("once", dispatcher.clone(), ActionCreator::new("TICK"))
        .with_bridge(bridge.clone())
        .repeating(false)
        .build()
        .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });

    push(&bridge, &resolver, 5).await;
    assert_eq!(run.await.unwrap(), Ok(()));

    assert!(!bridge.is_pending());
    assert!(!resolver.resolve(6), "nobody pulls after a one-shot emission");

    assert_eq!(actions.recv().await.unwrap().payload, Some(5));
    assert!(actions.try_recv().is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn frames_without_a_waiter_are_dropped() {
    let dispatcher = Dispatcher::<&'static str>::new(16);
    let mut actions = dispatcher.subscribe();
    let (bridge, resolver) = bridge();

    assert!(!resolver.resolve("early"));

    let pipeline = CallbackPipeline::builder("late", dispatcher.clone(), EventSpec::named("LOC"))
        .with_bridge(bridge.clone())
        .repeating(false)
        .build()
        .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });

    push(&bridge, &resolver, "fresh").await;
    run.await.unwrap().unwrap();

    assert_eq!(actions.recv().await.unwrap().payload, Some("fresh"));
    assert!(actions.try_recv().is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn payload_creator_transforms_frames() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let mut actions = dispatcher.subscribe();
    let (bridge, resolver) = bridge();

    let pipeline = CallbackPipeline::builder(
        "doubler",
        dispatcher.clone(),
        ActionCreator::with_payload("DOUBLED", |n: u32| n * 2),
    )
    .with_bridge(bridge.clone())
    .repeating(false)
    .build()
    .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });

    push(&bridge, &resolver, 21).await;
    run.await.unwrap().unwrap();

    let action = actions.recv().await.unwrap();
    assert!(action.is("DOUBLED"));
    assert_eq!(action.payload, Some(42));
}

#[tokio::test(flavor = "current_thread")]
async fn dropping_every_resolver_completes_the_pipeline() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let bus = Bus::new(64);
    let mut events = bus.subscribe();
    let (bridge, resolver) = bridge();

    let pipeline = CallbackPipeline::builder("closing", dispatcher, ActionCreator::new("N"))
        .with_bridge(bridge.clone())
        .with_bus(bus)
        .build()
        .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });

    push(&bridge, &resolver, 1).await;
    settle().await;
    drop(resolver);

    assert_eq!(run.await.unwrap(), Ok(()));
    assert!(bridge.is_closed());

    let events = drain(&mut events);
    let completed = events
        .iter()
        .find(|e| e.kind == EventKind::EmitterCompleted)
        .expect("emitter completed");
    assert_eq!(completed.reason.as_deref(), Some("source_closed"));
}

#[tokio::test(flavor = "current_thread")]
async fn cancelling_the_context_reports_cancellation() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let bus = Bus::new(64);
    let mut events = bus.subscribe();
    let (bridge, _resolver) = bridge();

    let pipeline = CallbackPipeline::builder("idle", dispatcher, ActionCreator::new("N"))
        .with_bus(bus)
        .with_bridge(bridge)
        .build()
        .unwrap();

    let ctx = CancellationToken::new();
    let run = tokio::spawn({
        let ctx = ctx.clone();
        async move { pipeline.run(ctx).await }
    });
    settle().await;
    ctx.cancel();

    assert_eq!(run.await.unwrap(), Err(TaskError::Canceled));
    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::EmitterCancelled), 1);
    assert_eq!(count(&events, EventKind::EmitterCompleted), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cancel_signal_stops_a_waiting_pipeline() {
    let dispatcher = Dispatcher::<u32>::new(16);
    let (bridge, _resolver) = bridge();

    let pipeline = CallbackPipeline::builder("waiting", dispatcher.clone(), ActionCreator::new("N"))
        .with_bridge(bridge)
        .cancel_on("LOGOUT")
        .build()
        .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });
    settle().await;

    dispatcher.signal("LOGOUT");
    let res = tokio::time::timeout(Duration::from_secs(1), run).await;
    assert_eq!(res.expect("pipeline stops").unwrap(), Ok(()));
}

#[tokio::test(flavor = "current_thread")]
async fn invalid_configuration_is_rejected_before_the_configurer_runs() {
    let dispatcher = Dispatcher::<u32>::new(4);
    let configured = Arc::new(AtomicBool::new(false));

    let res = CallbackPipeline::builder("clash", dispatcher, ActionCreator::new("SAME"))
        .cancel_on("SAME")
        .configure({
            let configured = configured.clone();
            move |_r| configured.store(true, Ordering::SeqCst)
        })
        .build();

    assert!(matches!(res, Err(ConfigError::SignalCollision { .. })));
    assert!(!configured.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "current_thread")]
async fn pipeline_stays_suspended_waiting_for_the_next_frame() {
    let dispatcher = Dispatcher::<&'static str>::new(16);
    let mut actions = dispatcher.subscribe();
    let (bridge, resolver) = bridge();

    let pipeline = CallbackPipeline::builder("letters", dispatcher.clone(), EventSpec::named("LETTER"))
        .with_bridge(bridge.clone())
        .build()
        .unwrap();
    let run = tokio::spawn(async move { pipeline.run(CancellationToken::new()).await });

    push(&bridge, &resolver, "a").await;
    assert_eq!(actions.recv().await.unwrap().payload, Some("a"));
    push(&bridge, &resolver, "b").await;
    assert_eq!(actions.recv().await.unwrap().payload, Some("b"));
    settle().await;

    assert!(bridge.is_pending());
    assert!(!run.is_finished());
    run.abort();
}
