//! Process name classification.
//!
//! Raw OS process names are noisy: daemons, XPC services, per-site renderer
//! helpers, reverse-DNS bundle identifiers. The classifier maps each raw
//! name to a canonical application identity or rejects it as system noise,
//! so that every series in the history store is keyed by a name a user would
//! recognise. Multiple raw processes collapsing to the same canonical name
//! are summed by the caller within one sampling tick.
//!
//! The classifier is a pure function over the static rule tables in
//! [`rules`] plus a snapshot of the live application registry passed in by
//! the caller.

mod rules;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use rules::{
    Rule, BUNDLE_PREFIXES, HARD_EXCLUDE, HELPER_PATTERNS, INTERACTIVE_WHITELIST, KNOWN_GAMES, NOISE_RULES,
    SYSTEM_PREFIX_RULES,
};

/// Outcome of classifying a raw process name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// System noise; the process contributes nothing to attribution.
    Excluded,
    /// A user-meaningful application, under its canonical name.
    Included(String),
}

/// Maps raw process names to canonical application identities.
#[derive(Debug, Clone)]
pub struct Classifier {
    own_process_name: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("drainwatch")
    }
}

impl Classifier {
    /// `own_process_name` is the embedding binary's process name, which is
    /// always excluded from attribution.
    pub fn new(own_process_name: impl Into<String>) -> Self {
        Self { own_process_name: own_process_name.into() }
    }

    /// Classify a raw process name against the rule tables and the given
    /// set of currently-known interactive application names.
    pub fn classify(&self, raw_name: &str, known_apps: &HashSet<String>) -> Decision {
        let name = final_path_component(raw_name);
        if name.is_empty() || self.excluded_by_rules(name) {
            return Decision::Excluded;
        }

        let collapsed = collapse_helper_name(name);
        // Collapsing can reveal another system-service name.
        if self.excluded_by_rules(&collapsed) {
            return Decision::Excluded;
        }

        if !known_apps.contains(collapsed.as_str())
            && !looks_like_user_app(&collapsed)
            && !KNOWN_GAMES.contains(collapsed.as_str())
        {
            return Decision::Excluded;
        }

        Decision::Included(collapsed)
    }

    /// Exclusion rules only, for defensive re-filtering of historical names
    /// at query time. Classification tables evolve; a name recorded last
    /// month may be recognisable as noise today.
    pub fn is_excluded_name(&self, name: &str) -> bool {
        let name = final_path_component(name);
        if self.excluded_by_rules(name) {
            return true;
        }
        self.excluded_by_rules(&collapse_helper_name(name))
    }

    fn excluded_by_rules(&self, name: &str) -> bool {
        if HARD_EXCLUDE.contains(name) || name == self.own_process_name {
            return true;
        }
        if matches_any(SYSTEM_PREFIX_RULES, name) {
            return true;
        }
        // The whitelist takes precedence over suffix-based exclusion.
        if INTERACTIVE_WHITELIST.contains(name) {
            return false;
        }
        matches_any(NOISE_RULES, name)
    }
}

fn matches_any(rules: &[Rule], name: &str) -> bool {
    rules.iter().any(|r| r.matches(name))
}

fn final_path_component(raw: &str) -> &str {
    raw.rsplit('/').next().unwrap_or(raw)
}

/// Collapse helper/child naming conventions to the parent app name.
fn collapse_helper_name(name: &str) -> String {
    let mut collapsed = name;
    for pattern in HELPER_PATTERNS {
        if let Some(stripped) = collapsed.strip_suffix(pattern) {
            collapsed = stripped;
            break;
        }
    }

    if BUNDLE_PREFIXES.iter().any(|p| collapsed.starts_with(p)) {
        if let Some(last) = collapsed.rsplit('.').next() {
            if !last.is_empty() {
                collapsed = last;
            }
        }
    }

    collapsed.to_string()
}

/// Heuristic for names that read like a user-facing application: short,
/// capitalised, free of daemon-style punctuation and bundle prefixes.
fn looks_like_user_app(name: &str) -> bool {
    let len = name.chars().count();
    if !(2..=30).contains(&len) {
        return false;
    }
    let Some(first) = name.chars().next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    if first.is_ascii_digit() {
        return false;
    }
    if name.contains('_') || name.contains('.') {
        return false;
    }
    if name.starts_with("com") || name.starts_with("org") || name.starts_with("io") {
        return false;
    }
    true
}
