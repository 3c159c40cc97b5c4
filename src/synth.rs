//! Endpoint synthesis: defaulting and inheritance over extracted metadata.
//!
//! Each mapped method becomes exactly one descriptor. Verbs fall back from
//! method to class to GET; paths are slash-normalized and, when empty,
//! derived from the class and method names; explicit parameter bindings
//! always win over descriptor-inferred fallbacks.

use crate::extract::infer_parameter_types;
use crate::model::{ClassMetadata, EndpointDescriptor, MethodMetadata};

const DEFAULT_VERB: &str = "GET";

const UNIT_SUFFIXES: [&str; 3] = ["Controller", "Resource", "Endpoint"];

/// Method names that already denote a collection, so the fallback path gets
/// no extra segment for them.
const LIST_LIKE_NAMES: [&str; 4] = ["index", "list", "getAll", "findAll"];

pub fn synthesize(class: &ClassMetadata) -> Vec<EndpointDescriptor> {
    class
        .methods
        .iter()
        .map(|method| synthesize_method(class, method))
        .collect()
}

fn synthesize_method(class: &ClassMetadata, method: &MethodMetadata) -> EndpointDescriptor {
    let mut methods: Vec<String> = method.verbs.iter().cloned().collect();
    if methods.is_empty() {
        methods = class.class_verbs.iter().cloned().collect();
    }
    if methods.is_empty() {
        methods.push(DEFAULT_VERB.to_string());
    }

    let mut path = combine_paths(&class.base_path, &method.path);
    if path.is_empty() {
        path = fallback_path(&class.qualified_name, &method.name);
    }

    let mut parameters = method.bindings.clone();
    for (index, inferred) in infer_parameter_types(&method.descriptor).iter().enumerate() {
        if method.bound_positions.contains(&index) {
            continue;
        }
        let key = format!("param{index}");
        if !parameters.contains_key(&key) {
            parameters.insert(key, inferred.clone());
        }
    }

    EndpointDescriptor {
        path,
        methods,
        parameters,
        source_class: class.qualified_name.clone(),
        source_method: method.name.clone(),
    }
}

/// Joins two path fragments with exactly one separating slash. Either side
/// may be empty.
pub fn combine_paths(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn fallback_path(qualified_name: &str, method_name: &str) -> String {
    let simple = qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(qualified_name);
    let stripped = UNIT_SUFFIXES
        .iter()
        .find_map(|suffix| simple.strip_suffix(suffix))
        .unwrap_or(simple);

    let base = format!("/{}", camel_to_kebab(stripped));
    if LIST_LIKE_NAMES.contains(&method_name) {
        base
    } else {
        combine_paths(&base, &camel_to_kebab(method_name))
    }
}

/// `getUserById` → `get-user-by-id`. The first character is lowercased
/// without a leading hyphen.
fn camel_to_kebab(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for (index, c) in input.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
