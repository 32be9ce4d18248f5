//! The boundary to a graph database.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{RoleInfo, SkillInfo, TransitionPath};

/// Read-only queries a career graph backend must answer.
///
/// Every call is independent: implementations open whatever session or
/// transaction they need and release it before returning. Missing roles
/// and skills produce `Ok(None)` or an empty set, never an error.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// A role with its required skills and levels.
    async fn role_info(&self, role: &str) -> Result<Option<RoleInfo>>;

    /// A skill with the roles that require it. `prerequisites` is left
    /// empty; see [`GraphStore::skill_prerequisites`].
    async fn skill_info(&self, skill: &str) -> Result<Option<SkillInfo>>;

    /// Names of the skills a role requires.
    async fn role_skills(&self, role: &str) -> Result<BTreeSet<String>>;

    /// Every skill reachable from `skill` through `PREREQUISITE` edges.
    async fn skill_prerequisites(&self, skill: &str) -> Result<Vec<String>>;

    /// The shortest directed path from one role to another, following any
    /// relationship type, at most `max_hops` relationships long.
    async fn shortest_path(
        &self,
        from_role: &str,
        to_role: &str,
        max_hops: usize,
    ) -> Result<Option<TransitionPath>>;
}
