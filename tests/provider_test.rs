//! Integration tests for the task lifecycle coordinator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use preview_bridge::config::BridgeConfig;
use preview_bridge::task::definition::{ServerMsg, ServerStartedStatus, TaskDefinition};
use preview_bridge::task::{LocalTaskHost, ServerTaskProvider, VERBOSE_ARG};
use preview_bridge::telemetry::{self, MemorySink, TelemetrySender};
use preview_bridge::workspace::{WorkspaceKey, WorkspaceRegistry};

fn provider(workspaces: Arc<WorkspaceRegistry>) -> ServerTaskProvider {
    ServerTaskProvider::new(
        &BridgeConfig::default(),
        workspaces,
        TelemetrySender::disabled(),
    )
}

fn verbose_args() -> Vec<String> {
    vec![VERBOSE_ARG.to_string()]
}

#[tokio::test]
async fn global_task_pair_when_no_workspace_open() {
    let provider = provider(Arc::new(WorkspaceRegistry::new()));
    let tasks = provider.provide_tasks();

    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().any(|t| t.definition.is_verbose()));
    assert!(tasks.iter().any(|t| t.definition.args.is_empty()));
    assert!(tasks.iter().all(|t| t.definition.workspace_path.is_empty()));
    assert!(tasks.iter().all(|t| t.scope == WorkspaceKey::Global));
}

#[tokio::test]
async fn two_variants_per_workspace_memoized_until_invalidated() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    registry.add(tmp.path().join("a"));
    let provider = provider(Arc::clone(&registry));

    assert_eq!(provider.provide_tasks().len(), 2);

    // Memoized: a workspace added later is invisible until invalidation.
    registry.add(tmp.path().join("b"));
    assert_eq!(provider.provide_tasks().len(), 2);

    provider.invalidate_tasks();
    assert_eq!(provider.provide_tasks().len(), 4);
}

#[tokio::test]
async fn resolve_task_rederives_workspace_from_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    let folder = registry.add(tmp.path());
    let provider = provider(Arc::clone(&registry));

    let def = TaskDefinition::new(vec![], tmp.path().display().to_string());
    let task = provider.resolve_task(&def);
    assert_eq!(task.scope, folder.key());

    let unknown = TaskDefinition::new(vec![], "/not/a/workspace");
    assert_eq!(provider.resolve_task(&unknown).scope, WorkspaceKey::Global);

    let global = TaskDefinition::new(vec![], "");
    assert_eq!(provider.resolve_task(&global).scope, WorkspaceKey::Global);
}

#[tokio::test]
async fn execution_reuses_running_terminal() {
    let provider = provider(Arc::new(WorkspaceRegistry::new()));
    let def = TaskDefinition::new(vec![], "");

    let first = provider.execute_task(&def);
    assert!(first.running());
    assert!(provider.is_running());

    let second = provider.execute_task(&def);
    assert!(
        Arc::ptr_eq(&first, &second),
        "re-execution while running must reuse the terminal"
    );
}

#[tokio::test]
async fn close_request_removes_terminal_and_forwards_event() {
    let provider = provider(Arc::new(WorkspaceRegistry::new()));
    let closed = Arc::new(Mutex::new(Vec::new()));
    let closed2 = Arc::clone(&closed);
    let _sub = provider.on_request_to_close_server(move |ws| closed2.lock().unwrap().push(ws.clone()));

    let def = TaskDefinition::new(vec![], "");
    let first = provider.execute_task(&def);
    first.request_close();

    assert_eq!(*closed.lock().unwrap(), vec![WorkspaceKey::Global]);
    assert!(!provider.is_running());

    // The key is absent now; a new execution builds a fresh terminal.
    let second = provider.execute_task(&def);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn open_request_is_forwarded() {
    let provider = provider(Arc::new(WorkspaceRegistry::new()));
    let opened = Arc::new(Mutex::new(Vec::new()));
    let opened2 = Arc::clone(&opened);
    let _sub = provider.on_request_to_open_server(move |ws| opened2.lock().unwrap().push(ws.clone()));

    provider.execute_task(&TaskDefinition::new(vec![], ""));
    assert_eq!(*opened.lock().unwrap(), vec![WorkspaceKey::Global]);
}

#[tokio::test]
async fn notifications_without_running_terminal_are_noops() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    let folder = registry.add(tmp.path());
    let provider = provider(Arc::clone(&registry));

    // A running terminal exists for the global key only; it observes nothing
    // when notifications target the workspace without one.
    let terminal = provider.execute_task(&TaskDefinition::new(verbose_args(), ""));
    let lines = Arc::new(Mutex::new(Vec::new()));
    let lines2 = Arc::clone(&lines);
    let _sub = terminal.on_output(move |l| lines2.lock().unwrap().push(l.clone()));

    let other = folder.key();
    provider.server_stop(true, &other);
    provider.server_started(
        &Url::parse("http://127.0.0.1:8080").unwrap(),
        ServerStartedStatus::JustStarted,
        &other,
    );
    provider.send_server_info_to_terminal(
        &ServerMsg {
            method: "GET".to_string(),
            url: "/".to_string(),
            status: Some(200),
        },
        &other,
    );

    assert!(lines.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notifications_reach_the_running_terminal() {
    let provider = provider(Arc::new(WorkspaceRegistry::new()));
    let terminal = provider.execute_task(&TaskDefinition::new(verbose_args(), ""));
    let lines = Arc::new(Mutex::new(Vec::new()));
    let lines2 = Arc::clone(&lines);
    let _sub = terminal.on_output(move |l| lines2.lock().unwrap().push(l.clone()));

    let key = WorkspaceKey::Global;
    provider.server_started(
        &Url::parse("http://127.0.0.1:8080").unwrap(),
        ServerStartedStatus::JustStarted,
        &key,
    );
    provider.send_server_info_to_terminal(
        &ServerMsg {
            method: "GET".to_string(),
            url: "/index.html".to_string(),
            status: Some(200),
        },
        &key,
    );
    provider.server_stop(false, &key);
    provider.server_stop(true, &key);

    let captured = lines.lock().unwrap().clone();
    assert!(captured.iter().any(|l| l.contains("http://127.0.0.1:8080")));
    assert!(captured.iter().any(|l| l.contains("GET /index.html | 200")));
    assert!(captured.iter().any(|l| l.contains("will stop")));
    assert!(captured.iter().any(|l| l.contains("Server stopped.")));

    // Stopped terminal no longer receives anything.
    assert!(!provider.is_running());
    let before = lines.lock().unwrap().len();
    provider.server_stop(true, &key);
    assert_eq!(lines.lock().unwrap().len(), before);
}

#[tokio::test]
async fn ext_run_task_executes_first_match() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    let folder = registry.add(tmp.path());
    let provider = Arc::new(provider(Arc::clone(&registry)));
    let host = LocalTaskHost::new(Arc::clone(&provider));

    provider.ext_run_task(false, &folder.key(), &host).await;
    assert!(provider.is_running());
}

#[tokio::test]
async fn ext_run_task_no_match_is_silent() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    registry.add(tmp.path());
    let provider = Arc::new(provider(Arc::clone(&registry)));
    let host = LocalTaskHost::new(Arc::clone(&provider));

    // All provided tasks are workspace-scoped; the global key matches none.
    provider.ext_run_task(false, &WorkspaceKey::Global, &host).await;
    assert!(!provider.is_running());
}

#[tokio::test]
async fn ext_run_task_records_telemetry_unconditionally() {
    let sink = Arc::new(MemorySink::new());
    let sender = telemetry::spawn_with_interval(Arc::<MemorySink>::clone(&sink), Duration::from_millis(20));
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(WorkspaceRegistry::new());
    registry.add(tmp.path());
    let provider = Arc::new(ServerTaskProvider::new(
        &BridgeConfig::default(),
        Arc::clone(&registry),
        sender,
    ));
    let host = LocalTaskHost::new(Arc::clone(&provider));

    // Even a no-match run reports usage.
    provider.ext_run_task(true, &WorkspaceKey::Global, &host).await;
    provider.ext_run_task(true, &WorkspaceKey::Global, &host).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| e.event == "tasks.terminal.startFromExtension"));
}
