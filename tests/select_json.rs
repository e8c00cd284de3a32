use anyhow::Result;
use ecosystem_importer::document::Document;
use ecosystem_importer::ecosystem::{EcosystemSettings, IMPORT_IDNAME, SELECT_JSON_IDNAME};
use ecosystem_importer::file_browser::{FileBrowser, FileBrowserOutcome, FileBrowserRequest};
use ecosystem_importer::operators::OperatorStatus;
use ecosystem_importer::{EcosystemPlugin, EditorHost};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

/// Browser whose answers are queued up front; `open` requests are recorded for inspection.
#[derive(Clone, Default)]
struct ScriptedBrowser {
    state: Rc<RefCell<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    requests: Vec<FileBrowserRequest>,
    answers: VecDeque<FileBrowserOutcome>,
    open: bool,
}

impl ScriptedBrowser {
    fn answer(&self, outcome: FileBrowserOutcome) {
        self.state.borrow_mut().answers.push_back(outcome);
    }

    fn requests(&self) -> Vec<FileBrowserRequest> {
        self.state.borrow().requests.clone()
    }
}

impl FileBrowser for ScriptedBrowser {
    fn open(&mut self, request: FileBrowserRequest) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request);
        state.open = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<FileBrowserOutcome> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return None;
        }
        let outcome = state.answers.pop_front()?;
        state.open = false;
        Some(outcome)
    }
}

fn host_with_browser() -> (EditorHost, ScriptedBrowser) {
    let browser = ScriptedBrowser::default();
    let mut host = EditorHost::with_file_browser(Document::new(), Box::new(browser.clone()));
    host.register_plugin(Box::new(EcosystemPlugin::default())).expect("plugin should register");
    (host, browser)
}

fn settings(host: &EditorHost) -> EcosystemSettings {
    EcosystemSettings::load(host.document()).expect("settings are registered")
}

#[test]
fn invoke_waits_for_browser_then_stores_path() {
    let (mut host, browser) = host_with_browser();

    let status = host.invoke_operator(SELECT_JSON_IDNAME).expect("invoke");
    assert_eq!(status, OperatorStatus::RunningModal);
    assert_eq!(host.pending_modal(), Some(SELECT_JSON_IDNAME));
    let requests = browser.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].filter.as_ref().map(|f| f.extensions.clone()), Some(vec!["json".to_string()]));

    assert_eq!(host.poll_modal(), None, "browser still open");
    assert_eq!(settings(&host).json_path, "");

    let chosen = std::env::temp_dir().join("ecosystem.json");
    browser.answer(FileBrowserOutcome::Selected(chosen.clone()));
    assert_eq!(host.poll_modal(), Some(OperatorStatus::Finished));
    assert_eq!(host.pending_modal(), None);
    assert_eq!(settings(&host).json_path, chosen.display().to_string());
}

#[test]
fn cancelling_the_browser_changes_nothing() {
    let (mut host, browser) = host_with_browser();
    let previous = EcosystemSettings { json_path: "/data/old.json".to_string(), base_object: String::new() };
    previous.store(host.document_mut()).expect("store");

    host.invoke_operator(SELECT_JSON_IDNAME).expect("invoke");
    browser.answer(FileBrowserOutcome::Cancelled);
    assert_eq!(host.poll_modal(), Some(OperatorStatus::Cancelled));
    assert_eq!(settings(&host), previous);
    assert!(host.reports().entries().is_empty());
}

#[test]
fn relative_selection_is_made_absolute() {
    let (mut host, browser) = host_with_browser();
    host.invoke_operator(SELECT_JSON_IDNAME).expect("invoke");
    browser.answer(FileBrowserOutcome::Selected(PathBuf::from("points/ecosystem.json")));
    host.poll_modal();

    let stored = PathBuf::from(settings(&host).json_path);
    assert!(stored.is_absolute());
    assert!(stored.ends_with("points/ecosystem.json"));
}

#[test]
fn other_operators_wait_while_browser_is_open() {
    let (mut host, browser) = host_with_browser();
    host.invoke_operator(SELECT_JSON_IDNAME).expect("invoke");
    assert!(host.invoke_operator(IMPORT_IDNAME).is_err());

    browser.answer(FileBrowserOutcome::Cancelled);
    host.poll_modal();
    assert!(host.invoke_operator(IMPORT_IDNAME).is_ok());
}

#[test]
fn execute_without_a_file_is_cancelled() {
    let (mut host, _browser) = host_with_browser();
    assert_eq!(host.execute_operator(SELECT_JSON_IDNAME).expect("execute"), OperatorStatus::Cancelled);
    assert_eq!(settings(&host).json_path, "");
}

#[test]
fn default_browser_cancels_headless_selection() {
    let mut host = EditorHost::new(Document::new());
    host.register_plugin(Box::new(EcosystemPlugin::default())).expect("plugin should register");
    assert_eq!(host.invoke_operator(SELECT_JSON_IDNAME).expect("invoke"), OperatorStatus::RunningModal);
    assert_eq!(host.poll_modal(), Some(OperatorStatus::Cancelled));
    assert_eq!(host.pending_modal(), None);
}
