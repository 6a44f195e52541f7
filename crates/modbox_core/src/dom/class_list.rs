//! String-based class attribute helpers.
//!
//! # Invariants
//! - A class is present when it matches `(\s|^)cls(\s|$)` in the attribute.
//! - `add_class` never duplicates a present class.
//! - `remove_class` drops the first occurrence and trims outer whitespace.

use regex::Regex;

fn class_pattern(class: &str) -> Option<Regex> {
    Regex::new(&format!(r"(\s|^){}(\s|$)", regex::escape(class))).ok()
}

/// Returns whether `class_attr` contains `class`.
pub fn has_class(class_attr: &str, class: &str) -> bool {
    if class.trim().is_empty() {
        return false;
    }
    class_pattern(class).is_some_and(|pattern| pattern.is_match(class_attr))
}

/// Returns `class_attr` with `class` appended when missing.
pub fn add_class(class_attr: &str, class: &str) -> String {
    if class.trim().is_empty() || has_class(class_attr, class) {
        return class_attr.to_string();
    }
    if class_attr.is_empty() {
        class.to_string()
    } else {
        format!("{class_attr} {class}")
    }
}

/// Returns `class_attr` with the first occurrence of `class` removed.
pub fn remove_class(class_attr: &str, class: &str) -> String {
    if !has_class(class_attr, class) {
        return class_attr.to_string();
    }
    match class_pattern(class) {
        Some(pattern) => pattern.replace(class_attr, " ").trim().to_string(),
        None => class_attr.to_string(),
    }
}
