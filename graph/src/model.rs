//! Values read from the career graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A role together with what it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub name: String,

    /// Required skill names, sorted.
    pub skills: Vec<String>,

    /// Seniority levels, sorted.
    pub levels: Vec<String>,
}

/// A skill together with the roles that require it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub name: String,

    /// Roles requiring this skill, sorted.
    pub required_by: Vec<String>,

    /// Skills reachable through `PREREQUISITE`, sorted.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// A directed path between two roles.
///
/// `nodes` holds the names of every node on the path, endpoints included;
/// `relationships[i]` is the type of the edge from `nodes[i]` to
/// `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPath {
    pub nodes: Vec<String>,
    pub relationships: Vec<String>,
}

impl TransitionPath {
    /// The zero-hop path from a role to itself.
    pub fn trivial(role: impl Into<String>) -> Self {
        Self {
            nodes: vec![role.into()],
            relationships: Vec::new(),
        }
    }

    /// Number of relationships traversed.
    pub fn hops(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_trivial(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Iterate over `(from, relationship, to)` steps.
    pub fn steps(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.nodes
            .windows(2)
            .zip(self.relationships.iter())
            .map(|(pair, rel)| (pair[0].as_str(), rel.as_str(), pair[1].as_str()))
    }
}

/// Skill differences when moving from a current role to a target role.
///
/// The three sets are disjoint and together cover every skill of both
/// roles. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGap {
    /// Required by the target but not the current role.
    pub to_learn: BTreeSet<String>,

    /// Required by both roles.
    pub to_maintain: BTreeSet<String>,

    /// Required by the current role but not the target.
    pub to_phase_out: BTreeSet<String>,
}

impl SkillGap {
    pub fn between(current: &BTreeSet<String>, target: &BTreeSet<String>) -> Self {
        Self {
            to_learn: target.difference(current).cloned().collect(),
            to_maintain: current.intersection(target).cloned().collect(),
            to_phase_out: current.difference(target).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_learn.is_empty() && self.to_maintain.is_empty() && self.to_phase_out.is_empty()
    }
}
