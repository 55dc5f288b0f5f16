use carta_hooks::HookDispatcher;
use carta_object::{ObjectRegistry, RegistryConfig};
use carta_server::connector;
use carta_state::StateSink;
use carta_sync::{EventLoop, SyncBridge, SyncMessage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

/// Runs a full session over `input` and returns every line written back.
async fn run_session(input: &str, setup: impl FnOnce(&mut ObjectRegistry)) -> Vec<Value> {
    let bridge = Arc::new(SyncBridge::new(64));
    let sink: Arc<dyn StateSink> = bridge.clone();
    let mut registry =
        ObjectRegistry::new(RegistryConfig::default(), Arc::new(HookDispatcher::new()), sink).unwrap();
    carta_data::initialize(&mut registry);
    setup(&mut registry);
    let (event_loop, handle) = EventLoop::new(registry, 8);
    let task = tokio::spawn(event_loop.run());

    let mut output = Vec::new();
    connector::serve(handle.clone(), bridge, input.as_bytes(), &mut output)
        .await
        .unwrap();
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn of_type<'a>(messages: &'a [Value], kind: &str) -> Vec<&'a Value> {
    messages.iter().filter(|m| m["type"] == kind).collect()
}

fn create_colormap(registry: &mut ObjectRegistry) {
    registry.create(carta_data::Colormap::CLASS_NAME).unwrap();
}

#[tokio::test]
async fn session_starts_with_hello() {
    let messages = run_session("", |_| {}).await;
    assert_eq!(messages[0]["type"], "hello");
    assert_eq!(messages[0]["version"], 1);
    assert!(serde_json::from_value::<SyncMessage>(messages[0].clone()).is_ok());
}

#[tokio::test]
async fn command_reply_follows_its_state_update() {
    let input = r#"{"type":"command","id":5,"path":"/CartaObjects/c1","command":"setColormap","params":"name:Hot"}
"#;
    let messages = run_session(input, create_colormap).await;

    let update = messages
        .iter()
        .position(|m| m["type"] == "stateUpdate" && m["owner"] == "/CartaObjects/c1")
        .unwrap();
    let reply = messages.iter().position(|m| m["type"] == "commandResult").unwrap();
    assert!(update < reply);
    assert_eq!(messages[update]["changes"][0]["value"], "Hot");
    assert_eq!(messages[reply]["id"], 5);
    assert_eq!(messages[reply]["result"], "");
}

#[tokio::test]
async fn link_and_snapshot_requests_are_answered() {
    let input = concat!(
        r#"{"type":"link","host":"/CartaObjects/c1","target":"/CartaObjects/c5"}"#,
        "\n",
        r#"{"type":"snapshotRequest","view":"layout"}"#,
        "\n",
    );
    let messages = run_session(input, |registry| {
        create_colormap(registry);
        registry.create(carta_data::Controller::CLASS_NAME).unwrap();
    })
    .await;

    let links = of_type(&messages, "linkResult");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["changed"], true);

    let snapshots = of_type(&messages, "snapshot");
    assert_eq!(snapshots[0]["document"]["/CartaObjects/c1"]["links"], json!(["/CartaObjects/c5"]));
}

#[tokio::test]
async fn bad_requests_get_error_replies() {
    let input = concat!(
        "not json\n",
        "\n",
        r#"{"type":"hello","version":1,"sessionId":"0191d6f4-6b4e-7cc3-9d3b-1a2b3c4d5e6f"}"#,
        "\n",
        r#"{"type":"link","host":"/CartaObjects/c1","target":"/CartaObjects/c99"}"#,
        "\n",
    );
    let messages = run_session(input, create_colormap).await;

    let errors = of_type(&messages, "error");
    assert_eq!(errors.len(), 3);
    assert!(errors[0]["message"].as_str().unwrap().starts_with("malformed request"));
    assert!(errors[1]["message"].as_str().unwrap().contains("hello"));
}
