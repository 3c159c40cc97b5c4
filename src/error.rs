use thiserror::Error;

/// Recoverable failures raised while walking containers and parsing classes.
///
/// Every variant is handled at the point of detection: the offending
/// resource is logged and skipped, and the walk continues. None of these
/// aborts a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unreadable resource {origin}: {reason}")]
    UnreadableResource { origin: String, reason: String },

    #[error("malformed container {origin}: {reason}")]
    MalformedContainer { origin: String, reason: String },

    #[error("malformed class {name}: {reason}")]
    MalformedClass { name: String, reason: String },

    #[error("unrecognized descriptor fragment '{fragment}' in {descriptor}")]
    UnrecognizedDescriptor { descriptor: String, fragment: char },
}
