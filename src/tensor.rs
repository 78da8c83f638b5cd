//! Child-validity tensor
//!
//! Precomputed predicates answering "may this child hang under a parent at
//! this coordinate?". Each rule names a *partial key*, a prefix pattern over
//! parent keys, and lists which child entities it allows or denies.
//!
//! Composition:
//! - every predicate whose partial key matches the parent must accept the
//!   child (logical AND, including several rules on the same partial key)
//! - a parent no rule matches accepts any child

use crate::matrix::{Key, Pid, SEPARATOR, WILDCARD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from rule-file loading.
#[derive(Debug, Error)]
pub enum TensorError {
    #[error("failed to read rules: {0}")]
    Io(#[from] io::Error),

    #[error("invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One parent/child rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Prefix pattern over parent keys, e.g. `1:*`
    pub partial_key: Key,
    /// When present, only these child entities are legal
    #[serde(default)]
    pub allow: Option<Vec<Pid>>,
    /// Child entities that are never legal
    #[serde(default)]
    pub deny: Vec<Pid>,
}

/// Ordered rule set, already parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleConfig {
    pub fn from_json_str(json: &str) -> Result<Self, TensorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load rules from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TensorError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Legality test derived from one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildPredicate {
    allow: Option<HashSet<Pid>>,
    deny: HashSet<Pid>,
}

impl ChildPredicate {
    pub fn from_rule(rule: &Rule) -> Self {
        ChildPredicate {
            allow: rule.allow.as_ref().map(|pids| pids.iter().copied().collect()),
            deny: rule.deny.iter().copied().collect(),
        }
    }

    /// Judge a candidate child by the entity its key names
    pub fn accepts(&self, child: &Key) -> bool {
        match child.pid() {
            Some(pid) => {
                !self.deny.contains(&pid)
                    && self.allow.as_ref().is_none_or(|allow| allow.contains(&pid))
            }
            // no entity to check against an allow list
            None => self.allow.is_none(),
        }
    }
}

/// Does `partial` constrain `parent`?
///
/// Segment-wise prefix match where `*` matches any single segment. The parent
/// may have more segments than the partial key.
pub fn partial_key_matches(partial: &Key, parent: &Key) -> bool {
    let mut parent_segments = parent.as_str().split(SEPARATOR);
    partial.as_str().split(SEPARATOR).all(|want| match parent_segments.next() {
        Some(have) => want == WILDCARD || want == have,
        None => false,
    })
}

/// Partial key -> predicates, in rule insertion order.
#[derive(Clone, Debug, Default)]
pub struct ChildValidityTensor {
    predicates: IndexMap<Key, Vec<ChildPredicate>>,
}

impl ChildValidityTensor {
    /// Build predicates for every rule in `config`
    pub fn from_config(config: &RuleConfig) -> Self {
        let mut predicates: IndexMap<Key, Vec<ChildPredicate>> = IndexMap::new();
        for rule in &config.rules {
            predicates
                .entry(rule.partial_key.clone())
                .or_default()
                .push(ChildPredicate::from_rule(rule));
        }
        debug!(
            rules = config.rules.len(),
            partial_keys = predicates.len(),
            "child-validity tensor built"
        );
        ChildValidityTensor { predicates }
    }

    /// Predicates registered under exactly `partial_key`
    pub fn get(&self, partial_key: &Key) -> &[ChildPredicate] {
        self.predicates
            .get(partial_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Partial keys in rule order
    pub fn partial_keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.predicates.keys()
    }

    /// Every predicate that constrains `parent`
    pub fn predicates_for<'t>(&'t self, parent: &'t Key) -> impl Iterator<Item = &'t ChildPredicate> + 't {
        self.predicates
            .iter()
            .filter(move |(partial, _)| partial_key_matches(partial, parent))
            .flat_map(|(_, preds)| preds.iter())
    }

    /// Is `child` legal under `parent`?
    pub fn accepts(&self, parent: &Key, child: &Key) -> bool {
        self.predicates_for(parent).all(|p| p.accepts(child))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(partial: &str, allow: Option<&[u32]>, deny: &[u32]) -> Rule {
        Rule {
            partial_key: Key::new(partial),
            allow: allow.map(|a| a.iter().copied().map(Pid).collect()),
            deny: deny.iter().copied().map(Pid).collect(),
        }
    }

    #[test]
    fn partial_key_prefix_matching() {
        let parent = Key::new("1:0:1");
        assert!(partial_key_matches(&Key::new("1"), &parent));
        assert!(partial_key_matches(&Key::new("1:*"), &parent));
        assert!(partial_key_matches(&Key::new("1:0:1"), &parent));
        assert!(partial_key_matches(&Key::new("*:*:1"), &parent));
        assert!(!partial_key_matches(&Key::new("1:2"), &parent));
        assert!(!partial_key_matches(&Key::new("2:*"), &parent));
        assert!(!partial_key_matches(&Key::new("1:0:1:0"), &parent));
        assert!(!partial_key_matches(&Key::new("1"), &Key::new("10:0")));
    }

    #[test]
    fn deny_rejects_child_pid() {
        let tensor = ChildValidityTensor::from_config(&RuleConfig {
            rules: vec![rule("1:*", None, &[9])],
        });
        assert!(!tensor.accepts(&Key::new("1:0:1"), &Key::new("9:0")));
        assert!(tensor.accepts(&Key::new("1:0:1"), &Key::new("8")));
        // unrelated parent: default permit
        assert!(tensor.accepts(&Key::new("2:0"), &Key::new("9:0")));
    }

    #[test]
    fn allow_list_restricts_children() {
        let tensor = ChildValidityTensor::from_config(&RuleConfig {
            rules: vec![rule("3", Some(&[4, 5]), &[])],
        });
        assert!(tensor.accepts(&Key::new("3:1"), &Key::new("4:0")));
        assert!(!tensor.accepts(&Key::new("3:1"), &Key::new("6:0")));
        assert!(!tensor.accepts(&Key::new("3:1"), &Key::new("*:0")));
    }

    #[test]
    fn rules_on_same_partial_key_are_anded() {
        let tensor = ChildValidityTensor::from_config(&RuleConfig {
            rules: vec![rule("1", Some(&[4, 5]), &[]), rule("1", None, &[5])],
        });
        assert_eq!(tensor.len(), 1);
        assert_eq!(tensor.get(&Key::new("1")).len(), 2);
        assert!(tensor.accepts(&Key::new("1:0"), &Key::new("4")));
        assert!(!tensor.accepts(&Key::new("1:0"), &Key::new("5")));
    }

    #[test]
    fn overlapping_partial_keys_all_apply() {
        let tensor = ChildValidityTensor::from_config(&RuleConfig {
            rules: vec![rule("1", None, &[7]), rule("1:2", None, &[8])],
        });
        assert!(!tensor.accepts(&Key::new("1:2"), &Key::new("8")));
        assert!(!tensor.accepts(&Key::new("1:2"), &Key::new("7")));
        assert!(tensor.accepts(&Key::new("1:0"), &Key::new("8")));
    }

    #[test]
    fn partial_keys_keep_rule_order() {
        let tensor = ChildValidityTensor::from_config(&RuleConfig {
            rules: vec![rule("5", None, &[]), rule("1", None, &[]), rule("5", None, &[1])],
        });
        let order: Vec<_> = tensor.partial_keys().map(Key::as_str).collect();
        assert_eq!(order, vec!["5", "1"]);
    }

    #[test]
    fn rule_config_from_json() {
        let config = RuleConfig::from_json_str(
            r#"{"rules": [{"partial_key": "1:*", "deny": [9]}, {"partial_key": "2", "allow": [3]}]}"#,
        )
        .unwrap();
        assert_eq!(config.rules[0], rule("1:*", None, &[9]));
        assert_eq!(config.rules[1], rule("2", Some(&[3]), &[]));
        assert!(matches!(
            RuleConfig::from_json_str("[]"),
            Err(TensorError::Json(_))
        ));
    }

    #[test]
    fn empty_tensor_permits_everything() {
        let tensor = ChildValidityTensor::default();
        assert!(tensor.is_empty());
        assert!(tensor.accepts(&Key::new("1:0"), &Key::new("9")));
    }
}
