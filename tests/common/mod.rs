//! Shared fixtures: temp paths, jar writers, a process runner, and a small
//! class-file encoder so tests can synthesize real class bytes without a
//! Java toolchain.

use serde_json::Value;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;

pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "endpoint_finder_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

pub fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn run_json(bin: &str, args: &[&str]) -> anyhow::Result<Value> {
    let out = Command::new(bin).args(args).output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[derive(Debug, Clone)]
pub enum Elem {
    Str(String),
    StrArray(Vec<String>),
    EnumArray(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct Ann {
    pub type_desc: String,
    pub elements: Vec<(String, Elem)>,
}

impl Ann {
    pub fn marker(type_desc: &str) -> Self {
        Self {
            type_desc: type_desc.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: Elem) -> Self {
        self.elements.push((name.to_string(), value));
        self
    }
}

pub const ACC_PUBLIC: u16 = 0x0001;

/// Encodes just enough of the class-file format for the scanner to decode:
/// constant pool, one class entry, runtime-visible annotations on the class,
/// its methods, and their parameters.
pub struct ClassBytesBuilder {
    pool_bytes: Vec<u8>,
    pool_slots: u16,
    utf8_cache: HashMap<String, u16>,
    access_flags: u16,
    this_class: u16,
    class_annotations: Vec<Vec<u8>>,
    methods: Vec<EncodedMethod>,
    annotations_attr: u16,
    parameter_annotations_attr: u16,
}

struct EncodedMethod {
    access_flags: u16,
    name: u16,
    descriptor: u16,
    annotations: Vec<Vec<u8>>,
    parameter_annotations: Vec<Vec<Vec<u8>>>,
}

impl ClassBytesBuilder {
    /// `binary_name` uses slash form, e.g. `com/example/UserController`.
    pub fn new(binary_name: &str) -> Self {
        let mut builder = Self {
            pool_bytes: Vec::new(),
            pool_slots: 0,
            utf8_cache: HashMap::new(),
            access_flags: 0x0021, // ACC_PUBLIC | ACC_SUPER
            this_class: 0,
            class_annotations: Vec::new(),
            methods: Vec::new(),
            annotations_attr: 0,
            parameter_annotations_attr: 0,
        };
        let name_index = builder.utf8(binary_name);
        builder.this_class = builder.class_entry(name_index);
        builder.annotations_attr = builder.utf8("RuntimeVisibleAnnotations");
        builder.parameter_annotations_attr = builder.utf8("RuntimeVisibleParameterAnnotations");
        builder
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8_cache.get(value) {
            return *index;
        }
        self.pool_bytes.push(1);
        put_u16(&mut self.pool_bytes, value.len() as u16);
        self.pool_bytes.extend_from_slice(value.as_bytes());
        self.pool_slots += 1;
        self.utf8_cache.insert(value.to_string(), self.pool_slots);
        self.pool_slots
    }

    fn class_entry(&mut self, name_index: u16) -> u16 {
        self.pool_bytes.push(7);
        put_u16(&mut self.pool_bytes, name_index);
        self.pool_slots += 1;
        self.pool_slots
    }

    pub fn annotate_class(&mut self, ann: &Ann) {
        let encoded = self.encode_annotation(ann);
        self.class_annotations.push(encoded);
    }

    pub fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        annotations: &[Ann],
        parameter_annotations: &[Vec<Ann>],
    ) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let annotations = annotations
            .iter()
            .map(|ann| self.encode_annotation(ann))
            .collect();
        let parameter_annotations = parameter_annotations
            .iter()
            .map(|entries| {
                entries
                    .iter()
                    .map(|ann| self.encode_annotation(ann))
                    .collect()
            })
            .collect();
        self.methods.push(EncodedMethod {
            access_flags,
            name,
            descriptor,
            annotations,
            parameter_annotations,
        });
    }

    fn encode_annotation(&mut self, ann: &Ann) -> Vec<u8> {
        let mut out = Vec::new();
        let type_index = self.utf8(&ann.type_desc);
        put_u16(&mut out, type_index);
        put_u16(&mut out, ann.elements.len() as u16);
        for (name, value) in &ann.elements {
            let name_index = self.utf8(name);
            put_u16(&mut out, name_index);
            self.encode_element(&mut out, value);
        }
        out
    }

    fn encode_element(&mut self, out: &mut Vec<u8>, value: &Elem) {
        match value {
            Elem::Str(s) => {
                out.push(b's');
                let index = self.utf8(s);
                put_u16(out, index);
            }
            Elem::StrArray(items) => {
                out.push(b'[');
                put_u16(out, items.len() as u16);
                for item in items {
                    out.push(b's');
                    let index = self.utf8(item);
                    put_u16(out, index);
                }
            }
            Elem::EnumArray(items) => {
                out.push(b'[');
                put_u16(out, items.len() as u16);
                for (type_desc, name) in items {
                    out.push(b'e');
                    let type_index = self.utf8(type_desc);
                    let name_index = self.utf8(name);
                    put_u16(out, type_index);
                    put_u16(out, name_index);
                }
            }
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        put_u16(&mut out, 0); // minor
        put_u16(&mut out, 52); // major (Java 8)
        put_u16(&mut out, self.pool_slots + 1);
        out.extend_from_slice(&self.pool_bytes);
        put_u16(&mut out, self.access_flags);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, 0); // super_class
        put_u16(&mut out, 0); // interfaces
        put_u16(&mut out, 0); // fields

        put_u16(&mut out, self.methods.len() as u16);
        for method in &self.methods {
            put_u16(&mut out, method.access_flags);
            put_u16(&mut out, method.name);
            put_u16(&mut out, method.descriptor);
            let mut attr_count = 0u16;
            if !method.annotations.is_empty() {
                attr_count += 1;
            }
            if !method.parameter_annotations.is_empty() {
                attr_count += 1;
            }
            put_u16(&mut out, attr_count);
            if !method.annotations.is_empty() {
                let payload = annotation_table(&method.annotations);
                put_attribute(&mut out, self.annotations_attr, &payload);
            }
            if !method.parameter_annotations.is_empty() {
                let mut payload = Vec::new();
                payload.push(method.parameter_annotations.len() as u8);
                for entries in &method.parameter_annotations {
                    put_u16(&mut payload, entries.len() as u16);
                    for encoded in entries {
                        payload.extend_from_slice(encoded);
                    }
                }
                put_attribute(&mut out, self.parameter_annotations_attr, &payload);
            }
        }

        if self.class_annotations.is_empty() {
            put_u16(&mut out, 0);
        } else {
            put_u16(&mut out, 1);
            let payload = annotation_table(&self.class_annotations);
            put_attribute(&mut out, self.annotations_attr, &payload);
        }

        out
    }
}

fn annotation_table(annotations: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    put_u16(&mut payload, annotations.len() as u16);
    for encoded in annotations {
        payload.extend_from_slice(encoded);
    }
    payload
}

fn put_attribute(out: &mut Vec<u8>, name_index: u16, payload: &[u8]) {
    put_u16(out, name_index);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
