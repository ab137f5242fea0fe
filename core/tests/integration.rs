//! Full node lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through `UreqTransport`, so request building,
//! transport and response decoding are checked together.

use mock_server::{AppState, Tree};
use workflowy_core::{
    ClientConfig, ErrorKind, LayoutMode, UpdateNode, UreqTransport, WorkflowyClient, ROOT_NODE_ID,
};

const API_KEY: &str = "integration-key";

/// Spawn the mock server and return its `/api/v1` base URL.
fn start_server(tree: Tree) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, AppState::new(API_KEY, tree)).await
        })
        .unwrap();
    });

    format!("http://{addr}/api/v1")
}

fn client(base_url: &str, api_key: &str) -> WorkflowyClient<UreqTransport> {
    WorkflowyClient::with_config(
        ClientConfig::new(api_key).with_base_url(base_url),
        UreqTransport::new(),
    )
}

#[test]
fn root_of_empty_tree() {
    let base_url = start_server(Tree::new());
    let client = client(&base_url, API_KEY);

    let root = client.nodes().get_root().unwrap();
    assert_eq!(root.id, ROOT_NODE_ID);
    assert_eq!(root.name, "Root");
    assert_eq!(root.note, None);
    assert!(root.children.is_empty());

    let targets = client.targets().list().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].key, "home");
}

#[test]
fn node_lifecycle() {
    let base_url = start_server(Tree::new().with_target("inbox", "system", "Inbox"));
    let client = client(&base_url, API_KEY);
    let nodes = client.nodes();

    // Step 1: targets include the seeded inbox.
    let targets = client.targets().list().unwrap();
    let inbox = targets.iter().find(|t| t.key == "inbox").unwrap();
    assert_eq!(inbox.kind, "system");
    assert_eq!(inbox.node_name, "Inbox");

    // Step 2: the inbox key resolves to its node; the home key points at the
    // root, which has no detail record, so its name is synthesized.
    let inbox_node = nodes.get("inbox").unwrap();
    assert_eq!(inbox_node.name, "Inbox");
    assert!(inbox_node.children.is_empty());
    let home = nodes.get("home").unwrap();
    assert_eq!(home.id, "home");
    assert_eq!(home.name, "Home");
    assert_eq!(home.child_named("Inbox").map(|n| n.name.as_str()), Some("Inbox"));

    // Step 3: create, follow-up fetch returns the stored node.
    let milk = nodes.create("inbox", "Buy milk", 0, None).unwrap();
    assert_eq!(milk.name, "Buy milk");
    assert_eq!(milk.note, None);
    assert!(!milk.is_completed);

    // Step 4: priority decides placement.
    let bread = nodes.create("inbox", "Buy bread", 3, Some("wholegrain")).unwrap();
    assert_eq!(bread.note.as_deref(), Some("wholegrain"));
    let eggs = nodes.create("inbox", "Buy eggs", 0, None).unwrap();
    let names: Vec<_> = nodes
        .get("inbox")
        .unwrap()
        .children
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Buy eggs", "Buy milk", "Buy bread"]);

    // Step 5: update.
    let update = UpdateNode {
        name: Some("Buy oat milk".to_string()),
        layout_mode: Some(LayoutMode::Todo),
        ..UpdateNode::default()
    };
    let updated = nodes.update(&milk.id, &update).unwrap();
    assert_eq!(updated.id, milk.id);
    assert_eq!(updated.name, "Buy oat milk");
    assert_eq!(updated.layout_mode, Some(LayoutMode::Todo));

    // Step 6: check / uncheck.
    let checked = nodes.check(&milk.id).unwrap();
    assert!(checked.is_completed);
    assert!(checked.completed_at.is_some());
    let unchecked = nodes.uncheck(&milk.id).unwrap();
    assert!(!unchecked.is_completed);
    assert!(unchecked.completed_at.is_none());

    // Step 7: children nest.
    let sub = nodes.create(&bread.id, "Sliced", 0, None).unwrap();
    let bread_node = nodes.get(&bread.id).unwrap();
    assert_eq!(bread_node.name, "Buy bread");
    assert_eq!(bread_node.children[0].id, sub.id);

    // Step 8: delete.
    nodes.delete(&eggs.id).unwrap();
    let err = nodes.get(&eggs.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = nodes.delete(&eggs.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(nodes.get("inbox").unwrap().children.len(), 2);
}

#[test]
fn update_of_unknown_node_reports_server_message() {
    let base_url = start_server(Tree::new());
    let client = client(&base_url, API_KEY);

    let err = client
        .nodes()
        .update("bad-id", &UpdateNode { name: Some("x".to_string()), ..UpdateNode::default() })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), "Node not found");
}

#[test]
fn validation_and_auth_failures_are_classified() {
    let base_url = start_server(Tree::new());

    let err = client(&base_url, API_KEY)
        .nodes()
        .create(ROOT_NODE_ID, "", 0, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "`name` is required");

    let err = client(&base_url, "wrong-key").targets().list().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.message(), "Unauthorized");
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/api/v1"), API_KEY)
        .targets()
        .list()
        .unwrap_err();
    assert!(matches!(err, workflowy_core::ApiError::Transport(_)));
    assert_eq!(err.kind(), ErrorKind::Client);
}
