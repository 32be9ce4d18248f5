//! Rendering graph facts about mentioned roles and skills as text.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use askcareer_graph::{CareerGraph, RoleInfo, SkillGap, SkillInfo, TransitionPath};

use crate::cache::{CacheKey, ContextCache};
use crate::error::Result;
use crate::extraction::ExtractedEntities;

/// Chooses which two mentioned roles are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairPolicy {
    /// The two roles mentioned first, whatever follows.
    #[default]
    FirstMentioned,

    /// Only when exactly two roles are mentioned.
    RequireExactlyTwo,
}

impl PairPolicy {
    /// The `(from, to)` pair for a transition section, if any.
    pub fn select<'a>(self, roles: &'a [String]) -> Option<(&'a str, &'a str)> {
        match (self, roles) {
            (Self::RequireExactlyTwo, [from, to]) => Some((from, to)),
            (Self::FirstMentioned, [from, to, ..]) => Some((from, to)),
            _ => None,
        }
    }
}

/// `Role: ...` block for one role.
pub fn format_role(info: &RoleInfo) -> String {
    let mut lines = vec![format!("Role: {}", info.name)];
    if !info.levels.is_empty() {
        lines.push(format!("Levels: {}", info.levels.join(", ")));
    }
    if !info.skills.is_empty() {
        lines.push(format!("Skills: {}", info.skills.join(", ")));
    }
    lines.join("\n")
}

/// `Skill: ...` block for one skill.
pub fn format_skill(info: &SkillInfo) -> String {
    let mut lines = vec![format!("Skill: {}", info.name)];
    if !info.required_by.is_empty() {
        lines.push(format!("Required by Roles: {}", info.required_by.join(", ")));
    }
    if !info.prerequisites.is_empty() {
        lines.push(format!("Prerequisites: {}", info.prerequisites.join(", ")));
    }
    lines.join("\n")
}

fn push_skill_list(lines: &mut Vec<String>, title: &str, skills: &BTreeSet<String>) {
    if skills.is_empty() {
        return;
    }
    lines.push(format!("\n{title}:"));
    lines.extend(skills.iter().map(|skill| format!("- {skill}")));
}

/// Path and skill differences between two roles.
///
/// `path` is `None` when the roles are not connected within `max_hops`.
pub fn format_transition(
    from: &str,
    to: &str,
    path: Option<&TransitionPath>,
    gap: &SkillGap,
    max_hops: usize,
) -> String {
    let mut lines = vec![format!("From {from} to {to}:")];

    match path {
        Some(path) if path.is_trivial() => {
            lines.push(format!("Path: {from} (same role, no transition needed)"));
        }
        Some(path) => {
            let mut rendered = path.nodes.first().cloned().unwrap_or_default();
            for (_, rel, next) in path.steps() {
                rendered.push_str(&format!(" -[{rel}]-> {next}"));
            }
            lines.push(format!("Path: {rendered}"));
        }
        None => lines.push(format!("No transition path found within {max_hops} hops.")),
    }

    push_skill_list(&mut lines, "Skills to Learn", &gap.to_learn);
    push_skill_list(&mut lines, "Skills to Maintain", &gap.to_maintain);
    push_skill_list(&mut lines, "Skills to Phase Out", &gap.to_phase_out);
    lines.join("\n")
}

/// Builds the graph half of an answer.
#[derive(Debug, Clone)]
pub struct GraphContextBuilder {
    graph: CareerGraph,
    cache: Arc<ContextCache>,
    pair_policy: PairPolicy,
}

impl GraphContextBuilder {
    pub fn new(graph: CareerGraph, cache: Arc<ContextCache>) -> Self {
        Self {
            graph,
            cache,
            pair_policy: PairPolicy::default(),
        }
    }

    pub fn with_pair_policy(mut self, pair_policy: PairPolicy) -> Self {
        self.pair_policy = pair_policy;
        self
    }

    pub fn graph(&self) -> &CareerGraph {
        &self.graph
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Text describing the entities, or `None` when nothing was mentioned.
    ///
    /// Roles and skills missing from the graph are left out. Only the
    /// transition section is computed fresh on every call.
    pub async fn build(&self, entities: &ExtractedEntities) -> Result<Option<String>> {
        if entities.is_empty() {
            return Ok(None);
        }

        let mut context = Vec::new();

        if !entities.roles.is_empty() {
            context.push("Role Information:".to_string());
            for role in &entities.roles {
                if let Some(section) = self.role_section(role).await? {
                    context.push(section);
                }
            }
        }

        if !entities.skills.is_empty() {
            context.push("\nSkill Information:".to_string());
            for skill in &entities.skills {
                if let Some(section) = self.skill_section(skill).await? {
                    context.push(section);
                }
            }
        }

        if let Some((from, to)) = self.pair_policy.select(&entities.roles) {
            context.push("\nTransition Path:".to_string());
            context.push(self.transition_section(from, to).await?);
        }

        Ok(Some(context.join("\n")))
    }

    async fn role_section(&self, role: &str) -> Result<Option<String>> {
        let key = CacheKey::Role(role.to_string());
        if let Some(section) = self.cache.get(&key).await {
            return Ok(Some(section));
        }

        let Some(info) = self.graph.role_info(role).await? else {
            debug!("Role {role} not in graph");
            return Ok(None);
        };
        let section = format_role(&info);
        self.cache.put(key, section.clone()).await;
        Ok(Some(section))
    }

    async fn skill_section(&self, skill: &str) -> Result<Option<String>> {
        let key = CacheKey::Skill(skill.to_string());
        if let Some(section) = self.cache.get(&key).await {
            return Ok(Some(section));
        }

        let Some(info) = self.graph.skill_info_with_prerequisites(skill).await? else {
            debug!("Skill {skill} not in graph");
            return Ok(None);
        };
        let section = format_skill(&info);
        self.cache.put(key, section.clone()).await;
        Ok(Some(section))
    }

    /// Transition text between two roles, with an explicit line when no
    /// path exists.
    pub async fn transition_section(&self, from: &str, to: &str) -> Result<String> {
        let path = self.graph.transition_path(from, to).await?;
        let gap = self.graph.skill_gap(from, to).await?;
        Ok(format_transition(
            from,
            to,
            path.as_ref(),
            &gap,
            self.graph.max_hops(),
        ))
    }

    /// Transition text only for connected roles.
    pub async fn transition_report(&self, from: &str, to: &str) -> Result<Option<String>> {
        let Some(path) = self.graph.transition_path(from, to).await? else {
            return Ok(None);
        };
        let gap = self.graph.skill_gap(from, to).await?;
        Ok(Some(format_transition(
            from,
            to,
            Some(&path),
            &gap,
            self.graph.max_hops(),
        )))
    }
}
