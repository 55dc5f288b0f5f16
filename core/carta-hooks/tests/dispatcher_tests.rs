use carta_hooks::hooks::{ColormapNamesHook, HistogramHook, HistogramParams, HistogramResult, Initialize, InitializeParams};
use carta_hooks::{Hook, HookDispatcher, HookError, HookId, HookPayload, HookRequest, Plugin};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a test plugin reacts to a hook.
#[derive(Clone, Copy)]
enum Behavior {
    Claim,
    Pass,
    Fail,
    Panic,
}

struct TestPlugin {
    name: String,
    hooks: Vec<HookId>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl TestPlugin {
    fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            hooks: vec![HistogramHook::ID, Initialize::ID],
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Plugin for TestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn initial_hook_list(&self) -> Vec<HookId> {
        self.hooks.clone()
    }

    fn handle_hook(&self, payload: &mut dyn HookPayload) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Pass => Ok(false),
            Behavior::Fail => anyhow::bail!("image could not be opened"),
            Behavior::Panic => panic!("plugin bug"),
            Behavior::Claim => {
                if let Some(request) = payload.downcast_mut::<HistogramHook>() {
                    let bins = request.params.bin_count;
                    request.output = Some(HistogramResult {
                        name: self.name.clone(),
                        unit: "Jy/beam".to_string(),
                        data: (0..bins).map(|i| (i as f64, 1.0)).collect(),
                    });
                }
                Ok(true)
            }
        }
    }
}

fn histogram_request() -> HookRequest<HistogramHook> {
    HookRequest::new(HistogramParams {
        bin_count: 4,
        ..HistogramParams::default()
    })
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn load_plugin_subscribes_initial_hooks() {
    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(TestPlugin::new("histogram1", Behavior::Claim)).unwrap();

    assert_eq!(dispatcher.plugin_count(), 1);
    assert_eq!(dispatcher.handler_count(HistogramHook::ID), 1);
    assert_eq!(dispatcher.handler_count(Initialize::ID), 1);
    assert_eq!(dispatcher.handler_count(ColormapNamesHook::ID), 0);
}

#[test]
fn loading_same_plugin_name_twice_fails() {
    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(TestPlugin::new("p", Behavior::Claim)).unwrap();
    let err = dispatcher.load_plugin(TestPlugin::new("p", Behavior::Pass)).unwrap_err();
    assert!(matches!(err, HookError::PluginAlreadyLoaded(name) if name == "p"));
    assert_eq!(dispatcher.plugin_names(), vec!["p".to_string()]);
}

// ── Dispatch ─────────────────────────────────────────────────────

#[test]
fn dispatch_with_no_plugins_reports_no_handler() {
    let dispatcher = HookDispatcher::new();
    let mut request = histogram_request();
    let err = dispatcher.dispatch(&mut request).unwrap_err();
    assert!(matches!(err, HookError::NoHandler(id) if id == HistogramHook::ID));
}

#[test]
fn dispatch_stops_at_first_claiming_plugin() {
    let first = TestPlugin::new("first", Behavior::Pass);
    let second = TestPlugin::new("second", Behavior::Claim);
    let third = TestPlugin::new("third", Behavior::Claim);

    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(first.clone()).unwrap();
    dispatcher.load_plugin(second.clone()).unwrap();
    dispatcher.load_plugin(third.clone()).unwrap();

    let mut request = histogram_request();
    let outcome = dispatcher.dispatch(&mut request).unwrap();

    assert_eq!(outcome.handled_by, "second");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(third.calls(), 0);
    assert_eq!(request.into_output().unwrap().name, "second");
}

#[test]
fn all_plugins_passing_reports_no_handler() {
    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(TestPlugin::new("a", Behavior::Pass)).unwrap();
    dispatcher.load_plugin(TestPlugin::new("b", Behavior::Pass)).unwrap();
    let mut request = histogram_request();
    assert!(matches!(dispatcher.dispatch(&mut request), Err(HookError::NoHandler(_))));
}

#[test]
fn failing_plugin_does_not_stop_dispatch() {
    let failing = TestPlugin::new("failing", Behavior::Fail);
    let good = TestPlugin::new("good", Behavior::Claim);
    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(failing.clone()).unwrap();
    dispatcher.load_plugin(good.clone()).unwrap();

    let mut request = histogram_request();
    let outcome = dispatcher.dispatch(&mut request).unwrap();
    assert_eq!(outcome.handled_by, "good");
    assert_eq!(failing.calls(), 1);
}

#[test]
fn panicking_plugin_is_isolated() {
    let panicking = TestPlugin::new("panicking", Behavior::Panic);
    let good = TestPlugin::new("good", Behavior::Claim);
    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(panicking.clone()).unwrap();
    dispatcher.load_plugin(good).unwrap();

    let result = dispatcher.call::<HistogramHook>(HistogramParams::default()).unwrap();
    assert_eq!(result.name, "good");
    assert_eq!(result.data.len(), 25);
    assert_eq!(panicking.calls(), 1);
}

#[test]
fn call_reports_claim_without_output() {
    struct Lazy;
    impl Plugin for Lazy {
        fn name(&self) -> &str {
            "lazy"
        }
        fn initial_hook_list(&self) -> Vec<HookId> {
            vec![ColormapNamesHook::ID]
        }
        fn handle_hook(&self, _payload: &mut dyn HookPayload) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    let mut dispatcher = HookDispatcher::new();
    dispatcher.load_plugin(Arc::new(Lazy)).unwrap();
    let err = dispatcher.call::<ColormapNamesHook>(()).unwrap_err();
    assert!(matches!(err, HookError::EmptyResult { plugin, .. } if plugin == "lazy"));
}

/// Writes into the payload, then reacts per `outcome`.
struct Writer {
    name: &'static str,
    written: Option<&'static str>,
    outcome: Behavior,
}

impl Plugin for Writer {
    fn name(&self) -> &str {
        self.name
    }

    fn initial_hook_list(&self) -> Vec<HookId> {
        vec![HistogramHook::ID, ColormapNamesHook::ID]
    }

    fn handle_hook(&self, payload: &mut dyn HookPayload) -> anyhow::Result<bool> {
        if let Some(written) = self.written {
            if let Some(request) = payload.downcast_mut::<HistogramHook>() {
                request.output = Some(HistogramResult {
                    name: written.to_string(),
                    ..HistogramResult::default()
                });
            } else if let Some(request) = payload.downcast_mut::<ColormapNamesHook>() {
                request.output.get_or_insert_with(Vec::new).push(written.to_string());
            }
        }
        match self.outcome {
            Behavior::Claim => Ok(true),
            Behavior::Pass => Ok(false),
            Behavior::Fail => anyhow::bail!("{} gave up midway", self.name),
            Behavior::Panic => panic!("{} crashed midway", self.name),
        }
    }
}

#[test]
fn failed_plugin_output_does_not_leak_into_result() {
    for outcome in [Behavior::Fail, Behavior::Panic] {
        let mut dispatcher = HookDispatcher::new();
        dispatcher
            .load_plugin(Arc::new(Writer { name: "broken", written: Some("partial"), outcome }))
            .unwrap();
        dispatcher
            .load_plugin(Arc::new(Writer { name: "claims-only", written: None, outcome: Behavior::Claim }))
            .unwrap();

        let err = dispatcher.call::<HistogramHook>(HistogramParams::default()).unwrap_err();
        assert!(matches!(err, HookError::EmptyResult { plugin, .. } if plugin == "claims-only"));
    }
}

#[test]
fn broadcast_keeps_earlier_output_when_a_plugin_fails() {
    let mut dispatcher = HookDispatcher::new();
    dispatcher
        .load_plugin(Arc::new(Writer { name: "heat", written: Some("Heat"), outcome: Behavior::Claim }))
        .unwrap();
    dispatcher
        .load_plugin(Arc::new(Writer { name: "broken", written: Some("partial"), outcome: Behavior::Fail }))
        .unwrap();
    dispatcher
        .load_plugin(Arc::new(Writer { name: "jet", written: Some("Jet"), outcome: Behavior::Claim }))
        .unwrap();

    let mut request = HookRequest::<ColormapNamesHook>::new(());
    assert_eq!(dispatcher.broadcast(&mut request), 2);
    assert_eq!(request.into_output().unwrap(), vec!["Heat".to_string(), "Jet".to_string()]);
}

#[test]
fn broadcast_reaches_every_subscriber() {
    let a = TestPlugin::new("a", Behavior::Claim);
    let b = TestPlugin::new("b", Behavior::Pass);
    let c = TestPlugin::new("c", Behavior::Claim);
    let mut dispatcher = HookDispatcher::new();
    for plugin in [a.clone(), b.clone(), c.clone()] {
        dispatcher.load_plugin(plugin).unwrap();
    }

    let mut request = HookRequest::<Initialize>::new(InitializeParams {
        plugin_names: dispatcher.plugin_names(),
    });
    assert_eq!(dispatcher.broadcast(&mut request), 2);
    assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
}

// ── Payload capability queries ───────────────────────────────────

#[test]
fn downcast_to_wrong_hook_returns_none() {
    let mut request = histogram_request();
    let payload: &mut dyn HookPayload = &mut request;
    assert!(payload.is::<HistogramHook>());
    assert!(!payload.is::<ColormapNamesHook>());
    assert!(payload.downcast_mut::<ColormapNamesHook>().is_none());
    assert_eq!(payload.downcast_ref::<HistogramHook>().unwrap().params.bin_count, 4);
    assert_eq!(payload.hook_id(), HistogramHook::ID);
}

#[test]
fn hook_id_display_is_name() {
    assert_eq!(HistogramHook::ID.to_string(), "HistogramHook");
    assert_eq!(serde_json::to_string(&Initialize::ID).unwrap(), "\"Initialize\"");
}
