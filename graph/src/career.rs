//! Career questions answered on top of any [`GraphStore`].

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::model::{RoleInfo, SkillGap, SkillInfo, TransitionPath};
use crate::store::GraphStore;
use crate::DEFAULT_MAX_HOPS;

/// Career graph facade shared by the assistant and the CLI.
#[derive(Clone)]
pub struct CareerGraph {
    store: Arc<dyn GraphStore>,
    max_hops: usize,
}

impl CareerGraph {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Override the longest path searched for.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    pub async fn role_info(&self, role: &str) -> Result<Option<RoleInfo>> {
        self.store.role_info(role).await
    }

    pub async fn skill_info(&self, skill: &str) -> Result<Option<SkillInfo>> {
        self.store.skill_info(skill).await
    }

    /// Like [`CareerGraph::skill_info`], with prerequisites filled in.
    pub async fn skill_info_with_prerequisites(&self, skill: &str) -> Result<Option<SkillInfo>> {
        let Some(mut info) = self.store.skill_info(skill).await? else {
            return Ok(None);
        };
        info.prerequisites = self.store.skill_prerequisites(skill).await?;
        Ok(Some(info))
    }

    pub async fn skill_prerequisites(&self, skill: &str) -> Result<Vec<String>> {
        self.store.skill_prerequisites(skill).await
    }

    /// Shortest path between two roles, or `None` when none exists within
    /// the hop limit. A role reaches itself in zero hops.
    pub async fn transition_path(
        &self,
        from_role: &str,
        to_role: &str,
    ) -> Result<Option<TransitionPath>> {
        if from_role == to_role {
            return Ok(Some(TransitionPath::trivial(from_role)));
        }

        let path = self
            .store
            .shortest_path(from_role, to_role, self.max_hops)
            .await?;
        debug!(
            "Transition {from_role} -> {to_role}: {}",
            path.as_ref()
                .map(|p| format!("{} hops", p.hops()))
                .unwrap_or_else(|| "no path".to_string())
        );
        Ok(path)
    }

    /// Skills to learn, keep and drop when moving between two roles.
    /// Unknown roles count as requiring nothing.
    pub async fn skill_gap(&self, current_role: &str, target_role: &str) -> Result<SkillGap> {
        let current = self.store.role_skills(current_role).await?;
        let target = self.store.role_skills(target_role).await?;
        Ok(SkillGap::between(&current, &target))
    }
}

impl std::fmt::Debug for CareerGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CareerGraph")
            .field("backend", &self.store.name())
            .field("max_hops", &self.max_hops)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{GraphSeed, MemoryGraph};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn career_graph() -> CareerGraph {
        let seed: GraphSeed = serde_json::from_value(json!({
            "roles": [
                { "name": "Data Engineer", "skills": ["SQL", "Python", "ETL Processes"] },
                { "name": "Machine Learning Engineer", "skills": ["SQL", "Python", "MLOps"] }
            ],
            "skills": [
                { "name": "MLOps", "prerequisites": ["Machine Learning"] },
                { "name": "Machine Learning", "prerequisites": ["Statistics"] }
            ]
        }))
        .unwrap();
        CareerGraph::new(Arc::new(MemoryGraph::from_seed(seed).unwrap()))
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_self_transition_is_trivial() {
        let path = career_graph()
            .transition_path("Astronaut", "Astronaut")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.nodes, vec!["Astronaut"]);
        assert_eq!(path.hops(), 0);
    }

    #[tokio::test]
    async fn test_unconnected_roles_have_no_path() {
        let path = career_graph()
            .transition_path("Data Engineer", "Machine Learning Engineer")
            .await
            .unwrap();
        assert!(path.is_none());
    }

    #[tokio::test]
    async fn test_skill_gap() {
        let gap = career_graph()
            .skill_gap("Data Engineer", "Machine Learning Engineer")
            .await
            .unwrap();

        assert_eq!(gap.to_learn, set(&["MLOps"]));
        assert_eq!(gap.to_maintain, set(&["Python", "SQL"]));
        assert_eq!(gap.to_phase_out, set(&["ETL Processes"]));
    }

    #[tokio::test]
    async fn test_skill_gap_with_unknown_role() {
        let gap = career_graph()
            .skill_gap("Astronaut", "Data Engineer")
            .await
            .unwrap();
        assert_eq!(gap.to_learn, set(&["ETL Processes", "Python", "SQL"]));
        assert!(gap.to_maintain.is_empty());
    }

    #[tokio::test]
    async fn test_skill_info_with_prerequisites() {
        let info = career_graph()
            .skill_info_with_prerequisites("MLOps")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.required_by, vec!["Machine Learning Engineer"]);
        assert_eq!(info.prerequisites, vec!["Machine Learning", "Statistics"]);
    }
}
