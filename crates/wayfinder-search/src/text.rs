//! Searchable-text construction shared by both strategies.

use wayfinder_resolver::Endpoint;

/// Flatten endpoint metadata into one space-joined string: summary,
/// description, camel-split operation id, tags, path words, and the
/// lowercase method.
pub fn searchable_text(endpoint: &Endpoint) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(summary) = &endpoint.summary {
        parts.push(summary.clone());
    }
    if let Some(description) = &endpoint.description {
        parts.push(description.clone());
    }
    if let Some(operation_id) = &endpoint.operation_id {
        parts.push(split_camel_case(operation_id));
    }
    parts.extend(endpoint.tags.iter().cloned());

    // Path template to words: /pets/{petId} -> "pets petId"
    parts.push(endpoint.path.replace(['/', '{', '}'], " "));
    parts.push(endpoint.method.to_lowercase());

    parts.join(" ")
}

/// Decompose a camel-case identifier into lowercase words. A new word
/// starts at any uppercase letter following a non-empty accumulated
/// word: "getPetById" -> "get pet by id".
pub fn split_camel_case(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in input.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            words.push(current.to_lowercase());
            current.clear();
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words.join(" ")
}
