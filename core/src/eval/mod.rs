pub mod combinator;
pub mod predicate;

use std::collections::HashMap;

/// State of one rule's memoized outcome within a single POC run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Declared but not yet executed (or skipped by a fail-fast abort).
    Pending,
    /// The rule's match expression evaluated to this boolean.
    Computed(bool),
}

/// Per-run memo of rule results, keyed by rule name.
///
/// Created at run start with every declared rule `Pending`, filled strictly
/// in declaration order, consumed by the combinator, and discarded when the
/// run ends. The explicit `Pending` state is what lets the combinator report
/// a reference to a never-computed rule instead of silently ignoring it.
#[derive(Debug, Default)]
pub struct RuleResults {
    results: HashMap<String, RuleOutcome>,
}

impl RuleResults {
    /// Initializes the memo with every declared rule name in `Pending` state.
    pub fn for_rules<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            results: names
                .into_iter()
                .map(|name| (name.to_string(), RuleOutcome::Pending))
                .collect(),
        }
    }

    /// Records a rule's boolean. Each rule is computed at most once per run.
    pub fn record(&mut self, name: &str, value: bool) {
        self.results
            .insert(name.to_string(), RuleOutcome::Computed(value));
    }

    pub fn get(&self, name: &str) -> Option<RuleOutcome> {
        self.results.get(name).copied()
    }

    /// All computed `(name, value)` pairs. Iteration order is unspecified;
    /// the combinator's substitution does not depend on it.
    pub fn computed(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.results.iter().filter_map(|(name, outcome)| match outcome {
            RuleOutcome::Computed(value) => Some((name.as_str(), *value)),
            RuleOutcome::Pending => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_rules_start_pending() {
        let results = RuleResults::for_rules(["r0", "r1"]);
        assert_eq!(results.get("r0"), Some(RuleOutcome::Pending));
        assert_eq!(results.get("r1"), Some(RuleOutcome::Pending));
        assert_eq!(results.get("r2"), None);
    }

    #[test]
    fn test_record_transitions_to_computed() {
        let mut results = RuleResults::for_rules(["r0"]);
        results.record("r0", true);
        assert_eq!(results.get("r0"), Some(RuleOutcome::Computed(true)));
        assert_eq!(results.computed().count(), 1);
    }
}
