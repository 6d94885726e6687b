//! Fixed bidirectional synonym dictionary used by the query optimizer.
//!
//! Each row is a synonym group; looking up any member returns the other
//! members, so expansion works in either direction without a second table.

const GROUPS: &[&[&str]] = &[
    &["fast", "quick", "rapid", "speedy"],
    &["big", "large", "huge"],
    &["small", "tiny", "little"],
    &["error", "bug", "fault", "defect"],
    &["search", "find", "lookup", "query"],
    &["doc", "document", "file"],
    &["fix", "repair", "patch"],
    &["start", "begin", "launch"],
    &["stop", "end", "halt", "terminate"],
    &["delete", "remove", "erase"],
    &["create", "make", "build"],
    &["update", "modify", "change"],
    &["fast", "rapid"],
];

/// Every distinct word appearing in any synonym group, used as the
/// "did you mean" dictionary for suggestion generation.
pub fn known_words() -> Vec<&'static str> {
    let mut words = Vec::new();
    for group in GROUPS {
        for w in *group {
            if !words.contains(w) {
                words.push(*w);
            }
        }
    }
    words
}

/// Returns every synonym for `token` (lowercased match, excluding the token
/// itself), or an empty vec if `token` is in no group.
pub fn synonyms_for(token: &str) -> Vec<&'static str> {
    let lower = token.to_lowercase();
    let mut out = Vec::new();
    for group in GROUPS {
        if group.iter().any(|w| *w == lower) {
            for w in *group {
                if *w != lower && !out.contains(w) {
                    out.push(*w);
                }
            }
        }
    }
    out
}
