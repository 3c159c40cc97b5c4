//! JSON inventory rendering.
//!
//! The field names and their order are the compatibility surface consumed
//! by downstream tooling; keep them stable.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

use crate::ledger::ScanLedger;
use crate::model::EndpointDescriptor;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub timestamp: String,
    pub scanned_jars: usize,
    pub controllers: usize,
    pub api_count: usize,
    pub apis: Vec<ApiEntry>,
}

#[derive(Debug, Serialize)]
pub struct ApiEntry {
    pub path: String,
    pub methods: Vec<String>,
    pub parameters: IndexMap<String, String>,
    pub source: SourceRef,
}

#[derive(Debug, Serialize)]
pub struct SourceRef {
    pub class: String,
    pub method: String,
}

impl ScanReport {
    pub fn new(descriptors: Vec<EndpointDescriptor>, ledger: &ScanLedger) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            scanned_jars: ledger.containers_scanned(),
            controllers: ledger.routable_units(),
            api_count: descriptors.len(),
            apis: descriptors.into_iter().map(ApiEntry::from).collect(),
        }
    }
}

impl From<EndpointDescriptor> for ApiEntry {
    fn from(descriptor: EndpointDescriptor) -> Self {
        Self {
            path: descriptor.path,
            methods: descriptor.methods,
            parameters: descriptor.parameters,
            source: SourceRef {
                class: descriptor.source_class,
                method: descriptor.source_method,
            },
        }
    }
}

pub fn write_report(report: &ScanReport, output: Option<&Path>, compact: bool) -> Result<()> {
    let content = if compact {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("无法写入结果文件: {}", path.display()))?;
        }
        None => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_descriptor() -> EndpointDescriptor {
        let mut parameters = IndexMap::new();
        parameters.insert("id".to_string(), "path".to_string());
        parameters.insert("verbose".to_string(), "boolean".to_string());
        EndpointDescriptor {
            path: "/api/users/{id}".to_string(),
            methods: vec!["GET".to_string()],
            parameters,
            source_class: "com.example.UserController".to_string(),
            source_method: "getUser".to_string(),
        }
    }

    #[test]
    fn report_keeps_the_compatibility_field_order() {
        let ledger = ScanLedger::new();
        let report = ScanReport::new(vec![sample_descriptor()], &ledger);
        let json = serde_json::to_string(&report).unwrap();

        let timestamp = json.find("\"timestamp\"").unwrap();
        let scanned = json.find("\"scannedJars\"").unwrap();
        let controllers = json.find("\"controllers\"").unwrap();
        let api_count = json.find("\"apiCount\"").unwrap();
        let apis = json.find("\"apis\"").unwrap();
        assert!(timestamp < scanned);
        assert!(scanned < controllers);
        assert!(controllers < api_count);
        assert!(api_count < apis);
    }

    #[test]
    fn api_entries_carry_source_and_ordered_parameters() {
        let ledger = ScanLedger::new();
        ledger.mark_container("app.jar");
        ledger.record_routable_unit();
        let report = ScanReport::new(vec![sample_descriptor()], &ledger);

        let value: Value = serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
        assert_eq!(value["scannedJars"], Value::from(1));
        assert_eq!(value["controllers"], Value::from(1));
        assert_eq!(value["apiCount"], Value::from(1));

        let api = &value["apis"][0];
        assert_eq!(api["path"], Value::from("/api/users/{id}"));
        assert_eq!(api["methods"][0], Value::from("GET"));
        assert_eq!(api["parameters"]["id"], Value::from("path"));
        assert_eq!(api["source"]["class"], Value::from("com.example.UserController"));
        assert_eq!(api["source"]["method"], Value::from("getUser"));

        // parameter insertion order survives serialization
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.find("\"id\"").unwrap() < json.find("\"verbose\"").unwrap());
    }
}
