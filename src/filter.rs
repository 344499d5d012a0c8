//! Action filter expressions.
//!
//! A filter expression selects which clients contribute to the aggregate
//! report. The grammar is an outer disjunction of inner conjunctions of
//! action-name literals: `PREGREET&DNSBL|HANGUP` reads as
//! `(PREGREET and DNSBL) or HANGUP`.

use ahash::AHashMap;

use crate::ActionKind;

/// Compiled action filter.
///
/// A literal is satisfied when some action whose canonical name equals or
/// starts with the literal has a nonzero count, so `NOQUEUE` selects every
/// NOQUEUE sub-classification. A conjunction emptied by malformed input
/// (`HANGUP|`, `&DNSBL`) is vacuously satisfied rather than an error.
#[derive(Debug, Clone)]
pub struct ActionFilter {
    /// `None` passes every client.
    clauses: Option<Vec<Vec<String>>>,
}

impl ActionFilter {
    /// Compile an optional filter expression.
    pub fn compile(expr: Option<&str>) -> Self {
        let clauses = expr.map(|expr| {
            expr.split('|')
                .map(|clause| {
                    clause
                        .split('&')
                        .map(str::trim)
                        .filter(|lit| !lit.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .collect()
        });
        Self { clauses }
    }

    /// A filter that passes every client.
    pub fn pass_all() -> Self {
        Self { clauses: None }
    }

    /// Evaluate the filter against a client's per-action counters.
    pub fn matches(&self, actions: &AHashMap<ActionKind, u64>) -> bool {
        match &self.clauses {
            None => true,
            Some(clauses) => clauses
                .iter()
                .any(|clause| clause.iter().all(|lit| literal_satisfied(lit, actions))),
        }
    }
}

impl Default for ActionFilter {
    fn default() -> Self {
        Self::pass_all()
    }
}

fn literal_satisfied(literal: &str, actions: &AHashMap<ActionKind, u64>) -> bool {
    actions
        .iter()
        .any(|(kind, &count)| count > 0 && kind.as_str().starts_with(literal))
}
