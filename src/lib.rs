//! # endpoint-finder
//!
//! Discovers web-API endpoints declared inside compiled JVM artifacts
//! without executing application logic: class resources are pulled out of
//! directories, jars, and nested fat-jar layouts, their annotation metadata
//! is decoded straight from the class-file binary format, and one endpoint
//! descriptor is synthesized per qualifying handler method.
//!
//! ## Architecture
//!
//! - **scan**: container traversal across directories, flat jars, and
//!   Spring-Boot fat jars, with dedup and namespace filtering
//! - **classfile**: minimal class-file decoder (constant pool, methods,
//!   annotation attributes)
//! - **extract**: marker catalog matching and per-class metadata extraction
//! - **synth**: endpoint synthesis (verb defaulting, path composition,
//!   parameter assembly)
//! - **ledger**: scan-wide dedup bookkeeping and summary counters
//! - **report**: JSON inventory rendering
//! - **model**: data types flowing between the stages
//! - **error**: recoverable scan failure taxonomy
//! - **cli**: command-line interface

pub mod classfile;
pub mod cli;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod model;
pub mod report;
pub mod scan;
pub mod synth;
