//! # zmap6 Scanners
//!
//! Wraps the zmap6 binary as the probing backend. The wrapper owns
//! argument construction, target-file handling and CSV parsing; probe
//! specifics (ICMPv6 echo vs. TCP SYN) and the status mapping differ per
//! plugin. Results are read from zmap6's CSV output on stdout.

use async_trait::async_trait;
use chrono::Utc;
use std::io::Write;

use sixkit_common::config::{ParamKind, ParamSpec, PluginConfig};
use sixkit_common::error::{KitError, KitResult};
use sixkit_common::event::LogLevel;
use sixkit_common::model::{
    AddressSet, Descriptor, PluginKind, ScanResult, ScanResultSet,
};
use sixkit_core::capability::{PluginInstance, Scan};
use sixkit_core::exec::CommandSpec;
use sixkit_core::plugin::{EnvState, LifecycleState, Plugin, PluginContext};
use sixkit_core::registry::PluginSpec;

const OUTPUT_FIELDS: &str = "saddr,classification,success,repeat,cooldown";
const ICMPV6_ECHO_REQUEST_TYPE: u16 = 128;

const COMMON_PARAMS: [ParamSpec; 4] = [
    ParamSpec::optional("zmap6-path", ParamKind::Str, "path to the zmap6 binary"),
    ParamSpec::optional("rate", ParamKind::Int, "packets per second"),
    ParamSpec::optional("bandwidth", ParamKind::Str, "bandwidth cap, e.g. 10M"),
    ParamSpec::optional("cooldown", ParamKind::Int, "seconds to wait for late responses"),
];

const ICMP_PARAMS: &[ParamSpec] = &COMMON_PARAMS;

const TCP_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("port", ParamKind::Int, "target TCP port"),
    COMMON_PARAMS[0],
    COMMON_PARAMS[1],
    COMMON_PARAMS[2],
    COMMON_PARAMS[3],
];

pub fn icmp_echo_spec() -> PluginSpec {
    PluginSpec {
        descriptor: descriptor(&Probe::IcmpEcho),
        params: ICMP_PARAMS,
        factory: icmp_echo_factory,
    }
}

pub fn tcp_syn_spec() -> PluginSpec {
    PluginSpec {
        descriptor: descriptor(&Probe::TcpSyn { port: 0 }),
        params: TCP_PARAMS,
        factory: tcp_syn_factory,
    }
}

fn icmp_echo_factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    Ok(PluginInstance::Scan(Box::new(Zmap6Scanner::new(
        Probe::IcmpEcho,
        config,
    ))))
}

fn tcp_syn_factory(config: &PluginConfig) -> KitResult<PluginInstance> {
    let port = config
        .get_int("port")
        .ok_or_else(|| KitError::ConfigValidation("missing required parameter 'port'".into()))?;
    let port = u16::try_from(port).map_err(|_| {
        KitError::ConfigValidation(format!("port {port} is outside the 1-65535 range"))
    })?;
    if port == 0 {
        return Err(KitError::ConfigValidation(
            "port 0 is not scannable".to_string(),
        ));
    }
    Ok(PluginInstance::Scan(Box::new(Zmap6Scanner::new(
        Probe::TcpSyn { port },
        config,
    ))))
}

fn descriptor(probe: &Probe) -> Descriptor {
    match probe {
        Probe::IcmpEcho => Descriptor::new(
            PluginKind::Scan,
            "zmap6-icmp-echo",
            "0.1.0",
            "ICMPv6 echo-request scan via zmap6.",
        ),
        Probe::TcpSyn { .. } => Descriptor::new(
            PluginKind::Scan,
            "zmap6-tcp-syn",
            "0.1.0",
            "TCP SYN scan of one port via zmap6.",
        ),
    }
}

/// Probe module selection plus its status mapping.
#[derive(Debug, Clone, Copy)]
enum Probe {
    IcmpEcho,
    TcpSyn { port: u16 },
}

impl Probe {
    fn plugin_name(&self) -> &'static str {
        match self {
            Probe::IcmpEcho => "zmap6-icmp-echo",
            Probe::TcpSyn { .. } => "zmap6-tcp-syn",
        }
    }

    fn protocol(&self) -> &'static str {
        match self {
            Probe::IcmpEcho => "icmpv6",
            Probe::TcpSyn { .. } => "tcp",
        }
    }

    /// Target port, or the ICMP type for typeless probes.
    fn port_or_type(&self) -> u16 {
        match self {
            Probe::IcmpEcho => ICMPV6_ECHO_REQUEST_TYPE,
            Probe::TcpSyn { port } => *port,
        }
    }

    fn probe_args(&self) -> Vec<String> {
        match self {
            Probe::IcmpEcho => vec!["--probe-module=icmp6_echoscan".to_string()],
            Probe::TcpSyn { port } => vec!["-p".to_string(), port.to_string()],
        }
    }

    fn scan_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.plugin_name(),
            self.protocol(),
            self.port_or_type()
        )
    }

    fn map_status(&self, success: &str, classification: &str) -> String {
        let responsive = success.trim() == "1";
        let classification = classification.trim().to_ascii_lowercase();

        match self {
            Probe::IcmpEcho => {
                if !responsive {
                    "unresponsive".to_string()
                } else if classification == "echo_reply" {
                    "responsive".to_string()
                } else if classification.is_empty() {
                    "responsive_other".to_string()
                } else {
                    format!("responsive_other_{classification}")
                }
            }
            Probe::TcpSyn { .. } => {
                if !responsive {
                    "filtered".to_string()
                } else if classification == "synack" {
                    "open".to_string()
                } else if classification == "rst" {
                    "closed".to_string()
                } else if classification.is_empty() {
                    "responsive_other".to_string()
                } else {
                    format!("responsive_other_{classification}")
                }
            }
        }
    }
}

struct Zmap6Scanner {
    descriptor: Descriptor,
    env: EnvState,
    probe: Probe,
    zmap6_path: String,
    rate: Option<i64>,
    bandwidth: Option<String>,
    cooldown: Option<i64>,
}

impl Zmap6Scanner {
    fn new(probe: Probe, config: &PluginConfig) -> Self {
        Self {
            descriptor: descriptor(&probe),
            env: EnvState::new(),
            probe,
            zmap6_path: config
                .get_str("zmap6-path")
                .unwrap_or_else(|| "zmap6".to_string()),
            rate: config.get_int("rate"),
            bandwidth: config.get_str("bandwidth").filter(|s| !s.is_empty()),
            cooldown: config.get_int("cooldown"),
        }
    }

    fn command(&self, target_file: &std::path::Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.zmap6_path);
        if let Some(rate) = self.rate {
            spec = spec.args(["-r".to_string(), rate.to_string()]);
        }
        if let Some(bandwidth) = &self.bandwidth {
            spec = spec.args(["-B".to_string(), bandwidth.clone()]);
        }
        if let Some(cooldown) = self.cooldown {
            spec = spec.args(["-c".to_string(), cooldown.to_string()]);
        }
        spec.args(self.probe.probe_args()).args([
            format!("--ipv6-target-file={}", target_file.display()),
            format!("-f{OUTPUT_FIELDS}"),
            "--output-filter=".to_string(),
        ])
    }

    fn parse_csv(&self, raw: &str) -> Vec<ScanResult> {
        let mut results = Vec::new();
        let mut columns: Vec<&str> = OUTPUT_FIELDS.split(',').collect();

        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if idx == 0 && fields.contains(&"saddr") {
                columns = fields;
                continue;
            }

            let field = |name: &str| -> &str {
                columns
                    .iter()
                    .position(|c| *c == name)
                    .and_then(|i| fields.get(i).copied())
                    .unwrap_or("")
            };

            let address = field("saddr");
            if address.is_empty() {
                continue;
            }

            results.push(ScanResult {
                address: address.to_string(),
                port: self.probe.port_or_type(),
                protocol: self.probe.protocol().to_string(),
                status: self.probe.map_status(field("success"), field("classification")),
                timestamp: Utc::now(),
                banner: None,
            });
        }
        results
    }
}

#[async_trait]
impl Plugin for Zmap6Scanner {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn state(&self) -> LifecycleState {
        self.env.current()
    }

    async fn setup(&mut self, ctx: &PluginContext) -> KitResult<()> {
        if self.env.already_provisioned(&ctx.workspace) {
            return Ok(());
        }
        // No environment of its own; zmap6 is expected on the host.
        ctx.workspace
            .mark_provisioned()
            .map_err(KitError::setup_failed)?;
        self.env.mark_ready();
        Ok(())
    }

    async fn clean(&mut self, ctx: &PluginContext) -> KitResult<()> {
        ctx.workspace.clear()?;
        self.env.reset();
        Ok(())
    }
}

#[async_trait]
impl Scan for Zmap6Scanner {
    async fn scan(&mut self, ctx: &PluginContext, targets: &AddressSet) -> KitResult<ScanResultSet> {
        let name = self.probe.plugin_name();

        // Empty input short-circuits without touching the adapter.
        if targets.is_empty() {
            ctx.events
                .on_log(LogLevel::Info, &format!("{name}: no addresses to scan"));
            return Ok(ScanResultSet::named(&self.probe.scan_name()));
        }

        self.env.begin(LifecycleState::Busy)?;

        let run = || -> anyhow::Result<ScanResultSet> {
            let mut target_file = tempfile::NamedTempFile::new()?;
            for addr in &targets.addresses {
                writeln!(target_file, "{addr}")?;
            }
            target_file.flush()?;

            let command = self.command(target_file.path());
            tracing::info!(command = %command.display(), targets = targets.len(), "starting zmap6");

            let output = ctx.exec.run(&command)?;
            output.require_success("zmap6")?;

            let results = self.parse_csv(&output.stdout);
            ctx.events.on_log(
                LogLevel::Info,
                &format!("{name}: scan complete, {} results", results.len()),
            );

            Ok(ScanResultSet {
                results,
                scan_name: Some(self.probe.scan_name()),
            })
        };

        let outcome =
            run().map_err(|err| KitError::execution(PluginKind::Scan, name, "scan", err));
        self.env.finish();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sixkit_common::config::ConfigValue;
    use sixkit_common::event::{CancelToken, NullSink};
    use sixkit_core::exec::{Exec, ExecOutput};
    use sixkit_core::workspace::Workspace;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Adapter double that returns canned CSV and counts invocations.
    struct CannedExec {
        stdout: String,
        calls: AtomicU64,
    }

    impl CannedExec {
        fn new(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                calls: AtomicU64::new(0),
            }
        }
    }

    impl Exec for CannedExec {
        fn run(&self, _spec: &CommandSpec) -> anyhow::Result<ExecOutput> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(ExecOutput {
                status: 0,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn context(root: &std::path::Path, exec: Arc<dyn Exec>) -> PluginContext {
        PluginContext::new(
            Workspace::new(root.to_path_buf()),
            Arc::new(NullSink),
            CancelToken::new(),
            exec,
        )
    }

    fn ready_scanner(probe: Probe, config: &PluginConfig) -> Zmap6Scanner {
        let mut scanner = Zmap6Scanner::new(probe, config);
        scanner.env.mark_ready();
        scanner
    }

    #[tokio::test]
    async fn empty_input_returns_named_empty_set_without_exec() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Arc::new(CannedExec::new(""));
        let ctx = context(dir.path(), exec.clone());

        let mut scanner = ready_scanner(Probe::IcmpEcho, &PluginConfig::new());
        let set = scanner
            .scan(&ctx, &AddressSet::new("empty", Vec::new()))
            .await
            .unwrap();

        assert!(set.results.is_empty());
        assert_eq!(set.scan_name.as_deref(), Some("zmap6-icmp-echo_icmpv6_128"));
        assert_eq!(exec.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn csv_rows_map_to_probe_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "saddr,classification,success,repeat,cooldown\n\
                   2001:db8::1,synack,1,0,0\n\
                   2001:db8::2,rst,1,0,0\n\
                   2001:db8::3,,0,0,0\n";
        let exec = Arc::new(CannedExec::new(csv));
        let ctx = context(dir.path(), exec);

        let config = PluginConfig::new().with("port", ConfigValue::Int(443));
        let mut scanner = ready_scanner(Probe::TcpSyn { port: 443 }, &config);
        let set = scanner
            .scan(
                &ctx,
                &AddressSet::new(
                    "targets",
                    vec![
                        "2001:db8::1".to_string(),
                        "2001:db8::2".to_string(),
                        "2001:db8::3".to_string(),
                    ],
                ),
            )
            .await
            .unwrap();

        let statuses: Vec<&str> = set.results.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["open", "closed", "filtered"]);
        assert!(set.results.iter().all(|r| r.port == 443 && r.protocol == "tcp"));
    }

    #[test]
    fn icmp_status_mapping_matches_the_probe() {
        let probe = Probe::IcmpEcho;
        assert_eq!(probe.map_status("1", "echo_reply"), "responsive");
        assert_eq!(probe.map_status("0", "timxceed"), "unresponsive");
        assert_eq!(probe.map_status("1", "unreach"), "responsive_other_unreach");
    }

    #[test]
    fn tcp_port_validation_happens_in_the_factory() {
        let err = tcp_syn_factory(&PluginConfig::new().with("port", ConfigValue::Int(70000)))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, KitError::ConfigValidation(_)));

        let err = tcp_syn_factory(&PluginConfig::new().with("port", ConfigValue::Int(0)))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, KitError::ConfigValidation(_)));
    }
}
