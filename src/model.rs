use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;

/// One compiled class pulled out of a root location, held only for the
/// duration of parsing.
#[derive(Debug, Clone)]
pub struct ClassResource {
    pub qualified_name: String,
    pub bytes: Vec<u8>,
    pub origin: String,
}

/// Routing-relevant metadata extracted from a single class.
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub qualified_name: String,
    pub is_routable: bool,
    pub base_path: String,
    pub class_verbs: IndexSet<String>,
    pub methods: Vec<MethodMetadata>,
}

/// One public method carrying at least one recognized HTTP-mapping marker.
///
/// `bound_positions` records which positional parameters carried a role
/// marker, so descriptor-inferred fallbacks never shadow explicit bindings.
#[derive(Debug, Clone)]
pub struct MethodMetadata {
    pub name: String,
    pub verbs: IndexSet<String>,
    pub path: String,
    pub bindings: IndexMap<String, String>,
    pub bound_positions: BTreeSet<usize>,
    pub descriptor: String,
}

/// The unit of output: one discovered route.
///
/// `path` and `methods` are always non-empty once synthesized.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    pub path: String,
    pub methods: Vec<String>,
    pub parameters: IndexMap<String, String>,
    pub source_class: String,
    pub source_method: String,
}
