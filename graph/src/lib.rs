//! # Career Graph
//!
//! Read-only queries over the role/skill graph: what a role requires, which
//! roles need a skill, how to get from one role to another, and which skills
//! change along the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Career Graph                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CareerGraph ──► GraphStore ──┬──► Neo4jStore (HTTP + Cypher)   │
//! │       │                       └──► MemoryGraph (JSON seed)      │
//! │       ▼                                                         │
//! │  TransitionPath, SkillGap                                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nodes carry the labels `Role`, `Skill` and `Level`. A role reaches its
//! skills through `REQUIRES_SKILL` (or the older `REQUIRES`) and its levels
//! through `REQUIRES_LEVEL`; skills chain through `PREREQUISITE`. Nothing in
//! this crate writes to the graph.

pub mod career;
pub mod error;
pub mod memory;
pub mod model;
pub mod neo4j;
pub mod store;

pub use career::CareerGraph;
pub use error::{GraphError, Result};
pub use memory::{GraphSeed, Label, MemoryGraph};
pub use model::{RoleInfo, SkillGap, SkillInfo, TransitionPath};
pub use neo4j::{Neo4jConfig, Neo4jStore};
pub use store::GraphStore;

/// Relationship from a role to a skill it needs.
pub const REQUIRES_SKILL: &str = "REQUIRES_SKILL";

/// Older spelling of [`REQUIRES_SKILL`] still present in some graphs.
pub const REQUIRES: &str = "REQUIRES";

/// Relationship from a role to one of its seniority levels.
pub const REQUIRES_LEVEL: &str = "REQUIRES_LEVEL";

/// Relationship from a skill to a skill that should be learned first.
pub const PREREQUISITE: &str = "PREREQUISITE";

/// Longest transition path searched for, in relationships.
pub const DEFAULT_MAX_HOPS: usize = 5;
