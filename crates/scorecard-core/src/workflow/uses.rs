//! Parsing of step `uses:` clauses.

use std::sync::LazyLock;

use regex::Regex;

static ACTION_WITH_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@]+)@(.+)$").expect("action regex must compile"));
static CONTAINER_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^docker://([^:]+):.+$").expect("image regex must compile"));

/// A `uses:` clause split into the action name and its pin.
///
/// Container images (`docker://image:tag`) carry no commit pin, so their
/// reference is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedUses<'a> {
    pub name: &'a str,
    pub reference: &'a str,
}

pub fn parse_uses(uses: &str) -> ParsedUses<'_> {
    if let Some(captures) = ACTION_WITH_REF.captures(uses) {
        return ParsedUses {
            name: captures.get(1).map_or("", |m| m.as_str()),
            reference: captures.get(2).map_or("", |m| m.as_str()),
        };
    }
    if let Some(captures) = CONTAINER_IMAGE.captures(uses) {
        return ParsedUses {
            name: captures.get(1).map_or("", |m| m.as_str()),
            reference: "",
        };
    }
    // Unpinned action references match neither shape; the empty name will
    // never pass an allowlist.
    ParsedUses {
        name: "",
        reference: "",
    }
}
