//! Demographic placeholder substitution.

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// Shortest `[...]` span, newlines included; spans never nest.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("placeholder pattern is valid"));

/// Replace every bracketed span in `template` with `group`.
///
/// The replacement is literal: `$` in a group label is not a capture
/// reference. Templates without brackets come back unchanged and unallocated.
pub fn substitute<'a>(template: &'a str, group: &str) -> Cow<'a, str> {
    PLACEHOLDER.replace_all(template, NoExpand(group))
}

/// Number of placeholder spans in `template`.
pub fn placeholder_count(template: &str) -> usize {
    PLACEHOLDER.find_iter(template).count()
}
