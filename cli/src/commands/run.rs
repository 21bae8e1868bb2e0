use std::path::{Path, PathBuf};

use anyhow::Context;

use sixkit_common::address::read_seed_file;
use sixkit_common::model::{AddressSet, PluginKind, ScanResultSet};
use sixkit_common::success;
use sixkit_core::dispatch::{Action, Dispatcher, ExecuteRequest, Input, Output, ScannerRef};

use crate::commands::{PluginArgs, parse_config};
use crate::terminal::print;

/// `run` covers every kind whose primary action takes no model handle:
/// datasets download, scanners scan, dynamic TGAs discover and analyzers
/// analyze. Static TGAs go through `train` and `generate` instead.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    dispatcher: &Dispatcher,
    plugin: PluginArgs,
    seeds: Option<PathBuf>,
    input: Option<PathBuf>,
    limit: Option<u64>,
    scanner: Option<String>,
    scanner_set: Vec<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = parse_config(&plugin.set)?;

    match plugin.kind {
        PluginKind::Dataset => {
            let result = dispatcher
                .execute(
                    ExecuteRequest::new(plugin.kind, &plugin.name, Action::Download)
                        .with_config(config),
                )
                .await?;
            let Output::Addresses(set) = result else {
                anyhow::bail!("download did not produce addresses");
            };
            print::emit_addresses(&set, output.as_deref())?;
            success!("downloaded {} addresses", set.len());
        }
        PluginKind::Scan => {
            let targets = load_addresses(seeds.as_deref(), "scan")?;
            let result = dispatcher
                .execute(
                    ExecuteRequest::new(plugin.kind, &plugin.name, Action::Scan)
                        .with_config(config)
                        .with_input(Input::Addresses(targets)),
                )
                .await?;
            let Output::Results(results) = result else {
                anyhow::bail!("scan did not produce results");
            };
            print::emit_json(&results, output.as_deref())?;
            success!("scan finished with {} results", results.results.len());
        }
        PluginKind::TgaDynamic => {
            let seed_set = load_addresses(seeds.as_deref(), "discover")?;
            let budget =
                limit.context("discover requires --limit to bound the probe budget")?;
            let scanner_name =
                scanner.context("discover requires --scanner <name> of a scan plugin")?;
            let scanner_config = parse_config(&scanner_set)?;

            let result = dispatcher
                .execute(
                    ExecuteRequest::new(plugin.kind, &plugin.name, Action::Discover { budget })
                        .with_config(config)
                        .with_input(Input::Addresses(seed_set))
                        .with_scanner(ScannerRef {
                            name: scanner_name,
                            config: scanner_config,
                        }),
                )
                .await?;
            let Output::Addresses(set) = result else {
                anyhow::bail!("discover did not produce addresses");
            };
            print::emit_addresses(&set, output.as_deref())?;
            success!(
                "discovered {} addresses within a budget of {budget} probes",
                set.len()
            );
        }
        PluginKind::Analyze => {
            let path = input.context("analyze requires --input <scan results JSON>")?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let results: ScanResultSet = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a scan result set", path.display()))?;

            let result = dispatcher
                .execute(
                    ExecuteRequest::new(plugin.kind, &plugin.name, Action::Analyze)
                        .with_config(config)
                        .with_input(Input::Results(results)),
                )
                .await?;
            let Output::Report(report) = result else {
                anyhow::bail!("analyze did not produce a report");
            };
            print::emit_json(&report, output.as_deref())?;
            success!("{}", report.summary);
        }
        PluginKind::TgaStatic => {
            anyhow::bail!("static TGAs are driven with the train and generate commands");
        }
    }

    Ok(())
}

fn load_addresses(path: Option<&Path>, action: &str) -> anyhow::Result<AddressSet> {
    let path = path.with_context(|| format!("{action} requires --seeds <path>"))?;
    let addresses = read_seed_file(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("seeds")
        .to_string();
    Ok(AddressSet {
        name,
        description: Some(format!("addresses loaded from {}", path.display())),
        addresses,
    })
}
