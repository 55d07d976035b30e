//! Predicates over the binary's output

#![allow(dead_code)]

use predicates::prelude::*;

pub fn not_in_git_repo() -> impl Predicate<str> {
    predicates::str::contains("Not in a git repository")
}

/// A numbered line with exactly `text`
pub fn has_line(number: usize, text: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("{number:>3} {text}\n"))
}

pub fn has_head(text: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("Head: {text}\n"))
}

pub fn has_warning(text: &str) -> impl Predicate<str> {
    predicates::str::contains("! Warning:").and(predicates::str::contains(text.to_string()))
}

pub fn has_error(text: &str) -> impl Predicate<str> {
    predicates::str::contains("✕ Error:").and(predicates::str::contains(text.to_string()))
}
