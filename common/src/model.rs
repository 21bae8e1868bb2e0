//! # Core Data Models
//!
//! The value types exchanged between plugins, the dispatcher and the CLI.
//!
//! These are deliberately dumb: no behavior beyond construction helpers and
//! serialization. An [`AddressSet`] may contain duplicates unless the
//! operation that produced it promises otherwise.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The capability families a plugin can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    Dataset,
    Scan,
    TgaStatic,
    TgaDynamic,
    Analyze,
}

impl PluginKind {
    pub const ALL: [PluginKind; 5] = [
        PluginKind::Dataset,
        PluginKind::Scan,
        PluginKind::TgaStatic,
        PluginKind::TgaDynamic,
        PluginKind::Analyze,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Dataset => "dataset",
            PluginKind::Scan => "scan",
            PluginKind::TgaStatic => "tga-static",
            PluginKind::TgaDynamic => "tga-dynamic",
            PluginKind::Analyze => "analyze",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dataset" => Ok(PluginKind::Dataset),
            "scan" => Ok(PluginKind::Scan),
            "tga-static" => Ok(PluginKind::TgaStatic),
            "tga-dynamic" => Ok(PluginKind::TgaDynamic),
            "analyze" => Ok(PluginKind::Analyze),
            other => Err(format!("unknown plugin kind: {other}")),
        }
    }
}

/// Identity card of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub kind: PluginKind,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Descriptor {
    pub fn new(kind: PluginKind, name: &str, version: &str, description: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            version: version.to_string(),
            description: Some(description.to_string()),
        }
    }
}

/// A named collection of IPv6 addresses in textual form.
///
/// Producers decide the spelling (exploded or compressed); nothing here
/// canonicalizes. Two spellings of the same address are two entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSet {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl AddressSet {
    pub fn new(name: &str, addresses: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            addresses,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Outcome of probing a single address.
///
/// `status` is a backend-defined string such as `open`/`closed`/`filtered`
/// for TCP probes or `responsive`/`unresponsive` for ICMPv6 echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub address: String,
    pub port: u16,
    pub protocol: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

/// Ordered collection of [`ScanResult`]s produced by one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResultSet {
    #[serde(default)]
    pub results: Vec<ScanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_name: Option<String>,
}

impl ScanResultSet {
    pub fn named(scan_name: &str) -> Self {
        Self {
            results: Vec::new(),
            scan_name: Some(scan_name.to_string()),
        }
    }
}

/// Output of an analysis plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    pub source_scan_results_count: u64,
}

/// Opaque reference to a training artifact.
///
/// Returned by `train`, handed back to `generate`. The `plugin` field lets
/// a generator reject handles produced by a different backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub plugin: String,
    pub artifact: PathBuf,
}

impl ModelHandle {
    pub fn new(plugin: &str, artifact: PathBuf) -> Self {
        Self {
            plugin: plugin.to_string(),
            artifact,
        }
    }
}
