//! In-memory career graph loaded from a JSON seed.
//!
//! Used when no Neo4j server is available and throughout the tests. The
//! seed describes roles with their skills and levels, skills with their
//! prerequisites, and any further relationships (typically role
//! transitions):
//!
//! ```json
//! {
//!   "roles": [{ "name": "BI Engineer", "skills": ["SQL"], "levels": ["Junior"] }],
//!   "skills": [{ "name": "Deep Learning", "prerequisites": ["Machine Learning"] }],
//!   "relationships": [{ "from": "BI Engineer", "type": "TRANSITIONS_TO", "to": "Data Engineer" }]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::model::{RoleInfo, SkillInfo, TransitionPath};
use crate::store::GraphStore;
use crate::{PREREQUISITE, REQUIRES, REQUIRES_LEVEL, REQUIRES_SKILL};

/// Node labels in the career graph.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Label {
    #[default]
    Role,
    Skill,
    Level,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSeed {
    pub name: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSeed {
    pub from: String,
    #[serde(default)]
    pub from_label: Label,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub to: String,
    #[serde(default)]
    pub to_label: Label,
}

/// Serialized form of a [`MemoryGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSeed {
    #[serde(default)]
    pub roles: Vec<RoleSeed>,
    #[serde(default)]
    pub skills: Vec<SkillSeed>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSeed>,
}

type NodeKey = (Label, String);

#[derive(Debug, Clone)]
struct Edge {
    rel_type: String,
    to: NodeKey,
}

/// A small labeled property graph held in memory.
///
/// Edges keep insertion order, so path searches are repeatable.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeSet<NodeKey>,
    outgoing: BTreeMap<NodeKey, Vec<Edge>>,
    incoming: BTreeMap<NodeKey, Vec<(String, NodeKey)>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a seed.
    pub fn from_seed(seed: GraphSeed) -> Result<Self> {
        let mut graph = Self::new();

        for role in seed.roles {
            graph.add_node(Label::Role, &role.name)?;
            for skill in &role.skills {
                graph.add_edge((Label::Role, &role.name), REQUIRES_SKILL, (Label::Skill, skill))?;
            }
            for level in &role.levels {
                graph.add_edge((Label::Role, &role.name), REQUIRES_LEVEL, (Label::Level, level))?;
            }
        }

        for skill in seed.skills {
            graph.add_node(Label::Skill, &skill.name)?;
            for prerequisite in &skill.prerequisites {
                graph.add_edge(
                    (Label::Skill, &skill.name),
                    PREREQUISITE,
                    (Label::Skill, prerequisite),
                )?;
            }
        }

        for rel in seed.relationships {
            graph.add_edge((rel.from_label, &rel.from), &rel.rel_type, (rel.to_label, &rel.to))?;
        }

        Ok(graph)
    }

    /// Read a seed file and build the graph from it.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let seed: GraphSeed = serde_json::from_str(&content)?;
        let graph = Self::from_seed(seed)?;
        info!(
            "Loaded career graph from {} ({} nodes)",
            path.display(),
            graph.nodes.len()
        );
        Ok(graph)
    }

    pub fn add_node(&mut self, label: Label, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(GraphError::InvalidSeed(format!("{label:?} with an empty name")));
        }
        self.nodes.insert((label, name.to_string()));
        Ok(())
    }

    /// Add a directed edge, creating missing endpoints.
    pub fn add_edge(
        &mut self,
        from: (Label, &str),
        rel_type: &str,
        to: (Label, &str),
    ) -> Result<()> {
        if rel_type.trim().is_empty() {
            return Err(GraphError::InvalidSeed(format!(
                "relationship from {} without a type",
                from.1
            )));
        }
        self.add_node(from.0, from.1)?;
        self.add_node(to.0, to.1)?;

        let from_key = (from.0, from.1.to_string());
        let to_key = (to.0, to.1.to_string());
        self.incoming
            .entry(to_key.clone())
            .or_default()
            .push((rel_type.to_string(), from_key.clone()));
        self.outgoing.entry(from_key).or_default().push(Edge {
            rel_type: rel_type.to_string(),
            to: to_key,
        });
        Ok(())
    }

    fn has(&self, label: Label, name: &str) -> bool {
        self.nodes.contains(&(label, name.to_string()))
    }

    /// Names of `label` nodes reached from a node through `rel_types`.
    fn targets(&self, from: &NodeKey, rel_types: &[&str], label: Label) -> BTreeSet<String> {
        self.outgoing
            .get(from)
            .into_iter()
            .flatten()
            .filter(|edge| edge.to.0 == label && rel_types.contains(&edge.rel_type.as_str()))
            .map(|edge| edge.to.1.clone())
            .collect()
    }

    /// Names of `label` nodes pointing at a node through `rel_types`.
    fn sources(&self, to: &NodeKey, rel_types: &[&str], label: Label) -> BTreeSet<String> {
        self.incoming
            .get(to)
            .into_iter()
            .flatten()
            .filter(|(rel, from)| from.0 == label && rel_types.contains(&rel.as_str()))
            .map(|(_, from)| from.1.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    fn name(&self) -> &str {
        "memory"
    }

    async fn role_info(&self, role: &str) -> Result<Option<RoleInfo>> {
        if !self.has(Label::Role, role) {
            return Ok(None);
        }
        let key = (Label::Role, role.to_string());

        Ok(Some(RoleInfo {
            name: role.to_string(),
            skills: self
                .targets(&key, &[REQUIRES_SKILL, REQUIRES], Label::Skill)
                .into_iter()
                .collect(),
            levels: self
                .targets(&key, &[REQUIRES_LEVEL], Label::Level)
                .into_iter()
                .collect(),
        }))
    }

    async fn skill_info(&self, skill: &str) -> Result<Option<SkillInfo>> {
        if !self.has(Label::Skill, skill) {
            return Ok(None);
        }
        let key = (Label::Skill, skill.to_string());

        Ok(Some(SkillInfo {
            name: skill.to_string(),
            required_by: self
                .sources(&key, &[REQUIRES_SKILL, REQUIRES], Label::Role)
                .into_iter()
                .collect(),
            prerequisites: Vec::new(),
        }))
    }

    async fn role_skills(&self, role: &str) -> Result<BTreeSet<String>> {
        let key = (Label::Role, role.to_string());
        Ok(self.targets(&key, &[REQUIRES_SKILL, REQUIRES], Label::Skill))
    }

    async fn skill_prerequisites(&self, skill: &str) -> Result<Vec<String>> {
        let start = (Label::Skill, skill.to_string());
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<NodeKey> = VecDeque::from([start]);

        // Prerequisite chains may loop back on themselves.
        while let Some(node) = queue.pop_front() {
            for next in self.targets(&node, &[PREREQUISITE], Label::Skill) {
                if next != skill && seen.insert(next.clone()) {
                    queue.push_back((Label::Skill, next));
                }
            }
        }

        Ok(seen.into_iter().collect())
    }

    async fn shortest_path(
        &self,
        from_role: &str,
        to_role: &str,
        max_hops: usize,
    ) -> Result<Option<TransitionPath>> {
        if !self.has(Label::Role, from_role) || !self.has(Label::Role, to_role) {
            return Ok(None);
        }
        if from_role == to_role {
            return Ok(Some(TransitionPath::trivial(from_role)));
        }

        let start: NodeKey = (Label::Role, from_role.to_string());
        let goal: NodeKey = (Label::Role, to_role.to_string());

        let mut parents: HashMap<NodeKey, (NodeKey, String)> = HashMap::new();
        let mut queue: VecDeque<(NodeKey, usize)> = VecDeque::from([(start.clone(), 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth == max_hops {
                continue;
            }
            for edge in self.outgoing.get(&node).into_iter().flatten() {
                if edge.to == start || parents.contains_key(&edge.to) {
                    continue;
                }
                parents.insert(edge.to.clone(), (node.clone(), edge.rel_type.clone()));
                if edge.to == goal {
                    let path = rebuild_path(&parents, &start, &goal);
                    debug!("Found {}-hop path {from_role} -> {to_role}", path.hops());
                    return Ok(Some(path));
                }
                queue.push_back((edge.to.clone(), depth + 1));
            }
        }

        Ok(None)
    }
}

fn rebuild_path(
    parents: &HashMap<NodeKey, (NodeKey, String)>,
    start: &NodeKey,
    goal: &NodeKey,
) -> TransitionPath {
    let mut nodes = vec![goal.1.clone()];
    let mut relationships = Vec::new();
    let mut current = goal;

    while current != start {
        let Some((parent, rel_type)) = parents.get(current) else {
            break;
        };
        relationships.push(rel_type.clone());
        nodes.push(parent.1.clone());
        current = parent;
    }

    nodes.reverse();
    relationships.reverse();
    TransitionPath {
        nodes,
        relationships,
    }
}
