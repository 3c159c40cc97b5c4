//! Marker catalog matching and per-class metadata extraction.
//!
//! Runs flat passes over a decoded class file: one over the class-level
//! annotations (routable-unit detection, base path, class-level verbs) and
//! one over each public method (mapping markers, path literals, parameter
//! role bindings). Annotation descriptors are matched exactly against the
//! enumerated catalog below; anything else is ignored.

use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;
use tracing::debug;

use crate::classfile::{self, Annotation, ElementValue, MethodInfo};
use crate::error::ScanError;
use crate::model::{ClassMetadata, ClassResource, MethodMetadata};

const ROUTABLE_MARKERS: [&str; 2] = [
    "Lorg/springframework/stereotype/Controller;",
    "Lorg/springframework/web/bind/annotation/RestController;",
];

const BASE_MAPPING_MARKER: &str = "Lorg/springframework/web/bind/annotation/RequestMapping;";

const VERB_MARKERS: [(&str, &str); 5] = [
    ("Lorg/springframework/web/bind/annotation/GetMapping;", "GET"),
    ("Lorg/springframework/web/bind/annotation/PostMapping;", "POST"),
    ("Lorg/springframework/web/bind/annotation/PutMapping;", "PUT"),
    (
        "Lorg/springframework/web/bind/annotation/DeleteMapping;",
        "DELETE",
    ),
    (
        "Lorg/springframework/web/bind/annotation/PatchMapping;",
        "PATCH",
    ),
];

const PARAMETER_ROLE_MARKERS: [(&str, &str); 4] = [
    (
        "Lorg/springframework/web/bind/annotation/RequestParam;",
        "query",
    ),
    (
        "Lorg/springframework/web/bind/annotation/PathVariable;",
        "path",
    ),
    (
        "Lorg/springframework/web/bind/annotation/RequestBody;",
        "body",
    ),
    (
        "Lorg/springframework/web/bind/annotation/RequestHeader;",
        "header",
    ),
];

const VERB_ENUM_DESCRIPTOR: &str = "Lorg/springframework/web/bind/annotation/RequestMethod;";

const KNOWN_VERBS: [&str; 8] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "TRACE",
];

/// Parses one class and extracts its routing metadata.
///
/// Non-routable classes come back with an empty method list; the annotation
/// reader never visits their methods. Structural failures surface as
/// `MalformedClass`, which callers treat as skip-and-continue.
pub fn extract_metadata(resource: &ClassResource) -> Result<ClassMetadata, ScanError> {
    let class = classfile::decode(&resource.bytes).map_err(|err| ScanError::MalformedClass {
        name: resource.qualified_name.clone(),
        reason: err.to_string(),
    })?;

    let mut metadata = ClassMetadata {
        qualified_name: resource.qualified_name.clone(),
        is_routable: false,
        base_path: String::new(),
        class_verbs: IndexSet::new(),
        methods: Vec::new(),
    };

    for annotation in &class.annotations {
        if ROUTABLE_MARKERS.contains(&annotation.type_descriptor.as_str()) {
            metadata.is_routable = true;
        }
        if annotation.type_descriptor == BASE_MAPPING_MARKER {
            if let Some(path) = path_argument(annotation) {
                metadata.base_path = path;
            }
            collect_verbs(annotation, &mut metadata.class_verbs);
        }
    }

    if !metadata.is_routable {
        return Ok(metadata);
    }

    for method in &class.methods {
        if !method.is_public() {
            continue;
        }
        if let Some(extracted) = extract_method(method) {
            metadata.methods.push(extracted);
        }
    }

    Ok(metadata)
}

/// Returns metadata for a method carrying at least one recognized
/// HTTP-mapping marker, or `None` if the method is unmapped.
fn extract_method(method: &MethodInfo) -> Option<MethodMetadata> {
    let mut verbs = IndexSet::new();
    let mut path = String::new();
    let mut mapped = false;

    for annotation in &method.annotations {
        if let Some(verb) = verb_marker(&annotation.type_descriptor) {
            mapped = true;
            verbs.insert(verb.to_string());
            if let Some(literal) = path_argument(annotation) {
                path = literal;
            }
        } else if annotation.type_descriptor == BASE_MAPPING_MARKER {
            mapped = true;
            if let Some(literal) = path_argument(annotation) {
                path = literal;
            }
            collect_verbs(annotation, &mut verbs);
        }
    }

    if !mapped {
        return None;
    }

    let (bindings, bound_positions) = parameter_bindings(&method.parameter_annotations);

    Some(MethodMetadata {
        name: method.name.clone(),
        verbs,
        path,
        bindings,
        bound_positions,
        descriptor: method.descriptor.clone(),
    })
}

fn verb_marker(descriptor: &str) -> Option<&'static str> {
    VERB_MARKERS
        .iter()
        .find(|(marker, _)| *marker == descriptor)
        .map(|(_, verb)| *verb)
}

fn role_marker(descriptor: &str) -> Option<&'static str> {
    PARAMETER_ROLE_MARKERS
        .iter()
        .find(|(marker, _)| *marker == descriptor)
        .map(|(_, role)| *role)
}

/// The path argument lives under `value` or `path`, as a single literal or
/// as the first element of a literal array.
fn path_argument(annotation: &Annotation) -> Option<String> {
    for (name, value) in &annotation.elements {
        if name != "value" && name != "path" {
            continue;
        }
        match value {
            ElementValue::Const(literal) => return Some(literal.clone()),
            ElementValue::Array(items) => {
                if let Some(ElementValue::Const(literal)) = items.first() {
                    return Some(literal.clone());
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_verbs(annotation: &Annotation, out: &mut IndexSet<String>) {
    for (name, value) in &annotation.elements {
        if name != "method" {
            continue;
        }
        match value {
            ElementValue::Array(items) => {
                for item in items {
                    push_verb(item, out);
                }
            }
            other => push_verb(other, out),
        }
    }
}

fn push_verb(value: &ElementValue, out: &mut IndexSet<String>) {
    if let ElementValue::EnumConst {
        type_descriptor,
        const_name,
    } = value
        && type_descriptor == VERB_ENUM_DESCRIPTOR
        && KNOWN_VERBS.contains(&const_name.as_str())
    {
        out.insert(const_name.clone());
    }
}

fn parameter_bindings(
    tables: &[Vec<Annotation>],
) -> (IndexMap<String, String>, BTreeSet<usize>) {
    let mut bindings = IndexMap::new();
    let mut bound_positions = BTreeSet::new();

    for (index, annotations) in tables.iter().enumerate() {
        for annotation in annotations {
            let Some(role) = role_marker(&annotation.type_descriptor) else {
                continue;
            };
            let name =
                explicit_name(annotation).unwrap_or_else(|| format!("param{index}"));
            bindings.insert(name, role.to_string());
            bound_positions.insert(index);
        }
    }

    (bindings, bound_positions)
}

fn explicit_name(annotation: &Annotation) -> Option<String> {
    for (name, value) in &annotation.elements {
        if (name == "value" || name == "name")
            && let ElementValue::Const(literal) = value
        {
            return Some(literal.clone());
        }
    }
    None
}

/// Walks a method descriptor between its parentheses and infers one type
/// name per positional parameter: `L<name>;` resolves to the simple class
/// name, `[` to "array" (consuming the element type), single letters to the
/// primitive kinds. A character outside the grammar skips that single
/// parameter and the walk continues.
pub fn infer_parameter_types(descriptor: &str) -> Vec<String> {
    let Some(open) = descriptor.find('(') else {
        return Vec::new();
    };
    let Some(close) = descriptor[open..].find(')').map(|i| open + i) else {
        return Vec::new();
    };
    let params = &descriptor[open + 1..close];

    let mut types = Vec::new();
    let bytes = params.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'L' => match params[i..].find(';') {
                Some(semi) => {
                    types.push(simple_class_name(&params[i + 1..i + semi]));
                    i += semi + 1;
                }
                None => {
                    debug!(
                        "{}",
                        ScanError::UnrecognizedDescriptor {
                            descriptor: descriptor.to_string(),
                            fragment: 'L',
                        }
                    );
                    break;
                }
            },
            b'[' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] == b'[' {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'L' {
                    match params[j..].find(';') {
                        Some(semi) => j += semi + 1,
                        None => {
                            debug!(
                                "{}",
                                ScanError::UnrecognizedDescriptor {
                                    descriptor: descriptor.to_string(),
                                    fragment: '[',
                                }
                            );
                            break;
                        }
                    }
                } else {
                    j += 1;
                }
                types.push("array".to_string());
                i = j;
            }
            b'I' => {
                types.push("int".to_string());
                i += 1;
            }
            b'J' => {
                types.push("long".to_string());
                i += 1;
            }
            b'D' => {
                types.push("double".to_string());
                i += 1;
            }
            b'F' => {
                types.push("float".to_string());
                i += 1;
            }
            b'Z' => {
                types.push("boolean".to_string());
                i += 1;
            }
            b'C' => {
                types.push("char".to_string());
                i += 1;
            }
            b'B' => {
                types.push("byte".to_string());
                i += 1;
            }
            b'S' => {
                types.push("short".to_string());
                i += 1;
            }
            other => {
                debug!(
                    "{}",
                    ScanError::UnrecognizedDescriptor {
                        descriptor: descriptor.to_string(),
                        fragment: other as char,
                    }
                );
                i += 1;
            }
        }
    }

    types
}

fn simple_class_name(binary_name: &str) -> String {
    binary_name
        .rsplit(['/', '.'])
        .next()
        .unwrap_or(binary_name)
        .to_string()
}
