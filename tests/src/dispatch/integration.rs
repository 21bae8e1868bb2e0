//! Full dispatch flows: registry bootstrap, auto-provisioning, typed
//! inputs and outputs, and the command adapter swapped for a scripted
//! double so no real process ever runs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sixkit_common::config::{ConfigValue, PluginConfig};
use sixkit_common::error::KitError;
use sixkit_common::model::{AddressSet, PluginKind};
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest, Input, Output, ScannerRef};
use sixkit_core::exec::{CommandSpec, Exec, ExecOutput};
use sixkit_core::registry::Registry;

/// Command adapter double.
///
/// zmap6 invocations (recognized by their target-file argument) answer
/// with a CSV marking the configured alive addresses; `pyenv root` gets
/// a path; everything else succeeds silently. Every command is recorded.
struct ScriptedExec {
    alive: HashSet<String>,
    log: Mutex<Vec<String>>,
    zmap6_calls: AtomicU64,
}

impl ScriptedExec {
    fn new(alive: &[&str]) -> Self {
        Self {
            alive: alive.iter().map(|a| a.to_string()).collect(),
            log: Mutex::new(Vec::new()),
            zmap6_calls: AtomicU64::new(0),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Exec for ScriptedExec {
    fn run(&self, spec: &CommandSpec) -> anyhow::Result<ExecOutput> {
        let display = spec.display();
        self.log.lock().unwrap().push(display.clone());

        let target_file = spec
            .args
            .iter()
            .find_map(|arg| arg.strip_prefix("--ipv6-target-file="));

        let stdout = match target_file {
            Some(path) => {
                self.zmap6_calls.fetch_add(1, Ordering::Relaxed);
                let raw = std::fs::read_to_string(path)?;
                let mut csv = String::from("saddr,classification,success,repeat,cooldown\n");
                for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    if self.alive.contains(line) {
                        csv.push_str(&format!("{line},echo_reply,1,0,0\n"));
                    } else {
                        csv.push_str(&format!("{line},,0,0,0\n"));
                    }
                }
                csv
            }
            None if display == "pyenv root" => "/opt/pyenv\n".to_string(),
            None => String::new(),
        };

        Ok(ExecOutput {
            status: 0,
            stdout,
            stderr: String::new(),
        })
    }
}

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    sixkit_plugins::register_builtins(&mut registry).unwrap();
    Arc::new(registry)
}

fn dispatcher(workdir: &Path, exec: Arc<ScriptedExec>) -> Dispatcher {
    Dispatcher::new(registry(), workdir.to_path_buf()).with_exec(exec)
}

fn exploded(addr: &str) -> String {
    sixkit_common::address::explode(&addr.parse().unwrap())
}

#[tokio::test]
async fn sixgen_trains_and_generates_through_the_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = dispatcher(dir.path(), Arc::new(ScriptedExec::new(&[])));

    let seeds = AddressSet::new(
        "seeds",
        vec![
            exploded("2001:db8::1"),
            exploded("2001:db8::2"),
            exploded("2001:db8::a"),
        ],
    );

    let result = dispatcher
        .execute(
            ExecuteRequest::new(PluginKind::TgaStatic, "sixgen", Action::Train)
                .with_input(Input::Addresses(seeds)),
        )
        .await
        .unwrap();
    let Output::Model(handle) = result else {
        panic!("train must yield a model handle");
    };
    assert_eq!(handle.plugin, "sixgen");
    assert!(handle.artifact.exists());

    // auto-provisioning left the ready marker behind
    let marker = dir
        .path()
        .join("tga-static")
        .join("sixgen")
        .join("env")
        .join(".ready");
    assert!(marker.exists());

    let result = dispatcher
        .execute(
            ExecuteRequest::new(
                PluginKind::TgaStatic,
                "sixgen",
                Action::Generate { count: 12 },
            )
            .with_input(Input::Model(handle)),
        )
        .await
        .unwrap();
    let Output::Addresses(set) = result else {
        panic!("generate must yield addresses");
    };

    assert_eq!(set.len(), 12);
    let distinct: HashSet<_> = set.addresses.iter().collect();
    assert_eq!(distinct.len(), 12);
}

#[tokio::test]
async fn scan_results_feed_the_analyzer() {
    let dir = tempfile::tempdir().unwrap();
    let alive = exploded("2001:db8::1");
    let exec = Arc::new(ScriptedExec::new(&[alive.as_str()]));
    let dispatcher = dispatcher(dir.path(), exec);

    let targets = AddressSet::new(
        "targets",
        vec![alive.clone(), exploded("2001:db8::2"), exploded("2001:db8::3")],
    );
    let result = dispatcher
        .execute(
            ExecuteRequest::new(PluginKind::Scan, "zmap6-icmp-echo", Action::Scan)
                .with_input(Input::Addresses(targets)),
        )
        .await
        .unwrap();
    let Output::Results(results) = result else {
        panic!("scan must yield results");
    };
    assert_eq!(results.results.len(), 3);
    assert_eq!(
        results
            .results
            .iter()
            .filter(|r| r.status == "responsive")
            .count(),
        1
    );

    let result = dispatcher
        .execute(
            ExecuteRequest::new(PluginKind::Analyze, "status-summary", Action::Analyze)
                .with_input(Input::Results(results)),
        )
        .await
        .unwrap();
    let Output::Report(report) = result else {
        panic!("analyze must yield a report");
    };
    assert_eq!(report.source_scan_results_count, 3);
    assert_eq!(report.details["by_status"]["responsive"], 1);
    assert_eq!(report.details["by_status"]["unresponsive"], 2);
}

#[tokio::test]
async fn empty_scan_input_never_reaches_the_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let exec = Arc::new(ScriptedExec::new(&[]));
    let dispatcher = dispatcher(dir.path(), exec.clone());

    let result = dispatcher
        .execute(
            ExecuteRequest::new(PluginKind::Scan, "zmap6-icmp-echo", Action::Scan)
                .with_input(Input::Addresses(AddressSet::new("empty", Vec::new()))),
        )
        .await
        .unwrap();

    let Output::Results(results) = result else {
        panic!("scan must yield results");
    };
    assert!(results.results.is_empty());
    assert!(results.scan_name.is_some());
    assert_eq!(exec.zmap6_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn det_discovers_through_a_borrowed_scanner() {
    let dir = tempfile::tempdir().unwrap();
    let seed = exploded("2001:db8::10");
    let neighbor = exploded("2001:db8::13");
    let exec = Arc::new(ScriptedExec::new(&[seed.as_str(), neighbor.as_str()]));
    let dispatcher = dispatcher(dir.path(), exec.clone());

    let result = dispatcher
        .execute(
            ExecuteRequest::new(
                PluginKind::TgaDynamic,
                "det",
                Action::Discover { budget: 100 },
            )
            .with_input(Input::Addresses(AddressSet::new(
                "seeds",
                vec![seed.clone()],
            )))
            .with_scanner(ScannerRef {
                name: "zmap6-icmp-echo".to_string(),
                config: PluginConfig::new(),
            }),
        )
        .await
        .unwrap();

    let Output::Addresses(set) = result else {
        panic!("discover must yield addresses");
    };
    assert!(set.addresses.contains(&seed));
    assert!(set.addresses.contains(&neighbor));
    assert!(exec.zmap6_calls.load(Ordering::Relaxed) >= 1);
}

#[tokio::test]
async fn unknown_plugin_fails_clean() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("work");
    let dispatcher = dispatcher(&workdir, Arc::new(ScriptedExec::new(&[])));

    let err = dispatcher
        .execute(ExecuteRequest::new(
            PluginKind::TgaStatic,
            "NoSuchTGA",
            Action::Train,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, KitError::UnknownPlugin { .. }));
    assert!(!workdir.exists());
}

#[tokio::test]
async fn entropy_ip_provisioning_runs_once_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let exec = Arc::new(ScriptedExec::new(&[]));
    let dispatcher = dispatcher(dir.path(), exec.clone());

    let request = || {
        ExecuteRequest::new(PluginKind::TgaStatic, "entropy-ip", Action::Setup).with_config(
            PluginConfig::new().with(
                "repo-url",
                ConfigValue::Str("https://example.org/entropy-ip.git".to_string()),
            ),
        )
    };

    dispatcher.execute(request()).await.unwrap();
    let after_first = exec.commands().len();
    assert!(after_first >= 5);

    // a second invocation gets a fresh instance, but the ready marker
    // short-circuits provisioning
    dispatcher.execute(request()).await.unwrap();
    assert_eq!(exec.commands().len(), after_first);
}

#[tokio::test]
async fn missing_required_config_fails_before_construction() {
    let dir = tempfile::tempdir().unwrap();
    let exec = Arc::new(ScriptedExec::new(&[]));
    let dispatcher = dispatcher(dir.path(), exec.clone());

    let err = dispatcher
        .execute(
            ExecuteRequest::new(PluginKind::Scan, "zmap6-tcp-syn", Action::Scan)
                .with_input(Input::Addresses(AddressSet::new("t", vec!["::1".into()]))),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KitError::ConfigValidation(_)));
    assert!(exec.commands().is_empty());
}
