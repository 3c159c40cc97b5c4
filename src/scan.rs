//! Container traversal: directories, flat jars, and Spring-Boot fat jars.
//!
//! Roots are walked sequentially in the order given, so "first discovery
//! wins" follows classpath precedence. Each container yields a batch of
//! deduplicated `ClassResource` values; parsing and synthesis of a batch
//! fan out across a rayon iterator, which preserves index order on collect.
//!
//! Every failure below a root is recoverable: unreadable entries, corrupt
//! nested archives, and malformed classes are logged and skipped.

use ignore::WalkBuilder;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::read::ZipFile;

use crate::error::ScanError;
use crate::extract;
use crate::ledger::ScanLedger;
use crate::model::{ClassResource, EndpointDescriptor};
use crate::synth;

/// Platform/runtime namespaces and bytecode-tooling support namespaces that
/// are never candidate classes.
pub const DENY_PREFIXES: [&str; 5] = [
    "java.",
    "javax.",
    "sun.",
    "com.sun.",
    "org.objectweb.asm.",
];

const CLASS_SUFFIX: &str = ".class";
const JAR_SUFFIX: &str = ".jar";
const FAT_CLASSES_PREFIX: &str = "BOOT-INF/classes/";
const FAT_LIB_PREFIX: &str = "BOOT-INF/lib/";

/// The known fat-jar layout is two levels deep; anything beyond this is a
/// pathological archive and gets skipped.
const MAX_NESTING: usize = 4;

pub struct Scanner<'a> {
    ledger: &'a ScanLedger,
    deny: Vec<String>,
    deadline: Option<Instant>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        ledger: &'a ScanLedger,
        extra_excludes: &[String],
        deadline: Option<Instant>,
    ) -> Self {
        let mut deny: Vec<String> = DENY_PREFIXES.iter().map(|p| (*p).to_string()).collect();
        deny.extend(extra_excludes.iter().cloned());
        Self {
            ledger,
            deny,
            deadline,
        }
    }

    /// Walks every root in order and returns the synthesized descriptors.
    /// Always completes; failures only show up in the diagnostic log.
    pub fn scan_roots(&self, roots: &[PathBuf]) -> Vec<EndpointDescriptor> {
        let mut descriptors = Vec::new();
        for root in roots {
            if self.deadline_expired() {
                warn!("deadline reached, emitting partial results");
                break;
            }
            if root.is_dir() {
                self.scan_directory(root, &mut descriptors);
            } else {
                self.scan_archive_file(root, &mut descriptors);
            }
        }
        descriptors
    }

    fn scan_directory(&self, root: &Path, out: &mut Vec<EndpointDescriptor>) {
        let mut resources = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("unreadable entry under {}: {err}", root.display());
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "class") {
                continue;
            }
            let Some(qualified) = directory_class_name(root, path) else {
                continue;
            };
            if !self.admit(&qualified) {
                continue;
            }
            match std::fs::read(path) {
                Ok(bytes) => resources.push(ClassResource {
                    qualified_name: qualified,
                    bytes,
                    origin: path.display().to_string(),
                }),
                Err(err) => warn!(
                    "{}",
                    ScanError::UnreadableResource {
                        origin: path.display().to_string(),
                        reason: err.to_string(),
                    }
                ),
            }
        }

        self.process_batch(resources, out);
    }

    fn scan_archive_file(&self, path: &Path, out: &mut Vec<EndpointDescriptor>) {
        let origin = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        if !self.ledger.mark_container(&origin) {
            debug!("container already walked: {origin}");
            return;
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                warn!(
                    "{}",
                    ScanError::UnreadableResource {
                        origin,
                        reason: err.to_string(),
                    }
                );
                return;
            }
        };
        // SAFETY: The file is opened read-only and remains valid for the
        // lifetime of the mmap. The mmap is dropped before the file.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(err) => {
                warn!(
                    "{}",
                    ScanError::UnreadableResource {
                        origin,
                        reason: err.to_string(),
                    }
                );
                return;
            }
        };
        let mut archive = match ZipArchive::new(Cursor::new(&mmap[..])) {
            Ok(archive) => archive,
            Err(err) => {
                warn!(
                    "{}",
                    ScanError::MalformedContainer {
                        origin,
                        reason: err.to_string(),
                    }
                );
                return;
            }
        };

        let mut resources = Vec::new();
        self.walk_archive(&mut archive, &origin, 0, &mut resources);
        self.process_batch(resources, out);
    }

    /// One pass over an archive: plain class entries, the fat-jar classes
    /// prefix, and nested library jars, which are opened in memory and
    /// walked recursively.
    fn walk_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        origin: &str,
        depth: usize,
        resources: &mut Vec<ClassResource>,
    ) {
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        "{}",
                        ScanError::UnreadableResource {
                            origin: format!("{origin}!#{index}"),
                            reason: err.to_string(),
                        }
                    );
                    continue;
                }
            };
            let name = entry.name().to_string();

            if name.ends_with(CLASS_SUFFIX) {
                let relative = name.strip_prefix(FAT_CLASSES_PREFIX).unwrap_or(&name);
                let qualified = relative
                    .trim_end_matches(CLASS_SUFFIX)
                    .replace(['/', '\\'], ".");
                if !self.admit(&qualified) {
                    continue;
                }
                match read_entry(&mut entry) {
                    Ok(bytes) => resources.push(ClassResource {
                        qualified_name: qualified,
                        bytes,
                        origin: format!("{origin}!{name}"),
                    }),
                    Err(err) => warn!(
                        "{}",
                        ScanError::UnreadableResource {
                            origin: format!("{origin}!{name}"),
                            reason: err.to_string(),
                        }
                    ),
                }
            } else if name.starts_with(FAT_LIB_PREFIX) && name.ends_with(JAR_SUFFIX) {
                if depth >= MAX_NESTING {
                    warn!("archive nested too deeply, skipping {origin}!{name}");
                    continue;
                }
                if self.deadline_expired() {
                    warn!("deadline reached inside {origin}, emitting partial results");
                    return;
                }
                let nested_origin = format!("{origin}!{name}");
                if !self.ledger.mark_container(&nested_origin) {
                    continue;
                }
                let bytes = match read_entry(&mut entry) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(
                            "{}",
                            ScanError::UnreadableResource {
                                origin: nested_origin,
                                reason: err.to_string(),
                            }
                        );
                        continue;
                    }
                };
                drop(entry);
                match ZipArchive::new(Cursor::new(bytes)) {
                    Ok(mut nested) => {
                        self.walk_archive(&mut nested, &nested_origin, depth + 1, resources);
                    }
                    Err(err) => warn!(
                        "{}",
                        ScanError::MalformedContainer {
                            origin: nested_origin,
                            reason: err.to_string(),
                        }
                    ),
                }
            }
        }
    }

    /// Deny-list filter plus ledger test-and-set; false means skip silently.
    fn admit(&self, qualified_name: &str) -> bool {
        if self
            .deny
            .iter()
            .any(|prefix| qualified_name.starts_with(prefix.as_str()))
        {
            debug!("filtered by namespace deny-list: {qualified_name}");
            return false;
        }
        if !self.ledger.mark_class(qualified_name) {
            debug!("duplicate class skipped: {qualified_name}");
            return false;
        }
        true
    }

    fn process_batch(&self, resources: Vec<ClassResource>, out: &mut Vec<EndpointDescriptor>) {
        if resources.is_empty() {
            return;
        }
        let batches: Vec<Vec<EndpointDescriptor>> = resources
            .par_iter()
            .map(|resource| match extract::extract_metadata(resource) {
                Ok(metadata) => {
                    if metadata.is_routable {
                        self.ledger.record_routable_unit();
                        debug!("routable unit: {}", metadata.qualified_name);
                    }
                    let endpoints = synth::synthesize(&metadata);
                    self.ledger.record_endpoints(endpoints.len());
                    endpoints
                }
                Err(err) => {
                    warn!("skipping class from {}: {err}", resource.origin);
                    Vec::new()
                }
            })
            .collect();
        out.extend(batches.into_iter().flatten());
    }

    fn deadline_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

fn directory_class_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let relative = relative.to_string_lossy().replace('\\', "/");
    let stem = relative.strip_suffix(CLASS_SUFFIX)?;
    Some(stem.replace('/', "."))
}

fn read_entry(entry: &mut ZipFile<'_>) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}
