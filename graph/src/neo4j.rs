//! Neo4j backend over the HTTP transactional endpoint.
//!
//! Each query is sent as its own auto-committed transaction to
//! `POST {uri}/db/{database}/tx/commit`, so no session outlives a call.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::model::{RoleInfo, SkillInfo, TransitionPath};
use crate::store::GraphStore;

const ROLE_INFO: &str = "\
MATCH (r:Role {name: $role})
OPTIONAL MATCH (r)-[:REQUIRES_SKILL|REQUIRES]->(s:Skill)
WITH r, collect(DISTINCT s.name) AS skills
OPTIONAL MATCH (r)-[:REQUIRES_LEVEL]->(l:Level)
RETURN r.name AS name, skills, collect(DISTINCT l.name) AS levels";

const SKILL_INFO: &str = "\
MATCH (s:Skill {name: $skill})
OPTIONAL MATCH (r:Role)-[:REQUIRES_SKILL|REQUIRES]->(s)
RETURN s.name AS name, collect(DISTINCT r.name) AS required_by";

const ROLE_SKILLS: &str = "\
MATCH (r:Role {name: $role})-[:REQUIRES_SKILL|REQUIRES]->(s:Skill)
RETURN collect(DISTINCT s.name) AS skills";

const SKILL_PREREQUISITES: &str = "\
MATCH (s:Skill {name: $skill})-[:PREREQUISITE*1..]->(p:Skill)
RETURN collect(DISTINCT p.name) AS prerequisites";

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// HTTP(S) base URI, e.g. `http://localhost:7474`.
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
}

/// The HTTP address serving the same database as a Bolt URI.
fn http_equivalent(uri: &str) -> Option<String> {
    let (scheme, rest) = uri.split_once("://")?;
    let (scheme, default_port) = match scheme {
        "bolt" | "neo4j" => ("http", "7474"),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", "7473"),
        _ => return None,
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = match authority.rsplit_once(':') {
        Some((host, "7687")) => host,
        Some(_) => return Some(format!("{scheme}://{authority}")),
        None => authority,
    };
    Some(format!("{scheme}://{host}:{default_port}"))
}

/// [`GraphStore`] backed by a Neo4j server.
pub struct Neo4jStore {
    config: Neo4jConfig,
    client: reqwest::Client,
}

impl Neo4jStore {
    /// Create a store. Only `http://` and `https://` URIs are accepted; the
    /// binary Bolt protocol is not spoken here.
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        if !(config.uri.starts_with("http://") || config.uri.starts_with("https://")) {
            let suggestion = http_equivalent(&config.uri)
                .unwrap_or_else(|| "http://localhost:7474".to_string());
            return Err(GraphError::Config(format!(
                "unsupported Neo4j URI {}: only the HTTP endpoint is supported, \
                 try {suggestion} (Bolt port 7687 maps to HTTP port 7474)",
                config.uri
            )));
        }

        Ok(Self {
            config: Neo4jConfig {
                uri: config.uri.trim_end_matches('/').to_string(),
                ..config
            },
            client: reqwest::Client::new(),
        })
    }

    fn commit_url(&self) -> String {
        format!("{}/db/{}/tx/commit", self.config.uri, self.config.database)
    }

    /// Run one statement and return its rows.
    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .client
            .post(self.commit_url())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: TxResponse = serde_json::from_str(&text).map_err(|e| {
            GraphError::InvalidResponse(format!("{status}: {e}: {}", truncate(&text, 200)))
        })?;

        if let Some(error) = parsed.errors.into_iter().next() {
            return Err(GraphError::Query {
                code: error.code,
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(GraphError::InvalidResponse(format!(
                "{status}: {}",
                truncate(&text, 200)
            )));
        }

        let rows = parsed
            .results
            .into_iter()
            .next()
            .map(|result| result.data.into_iter().map(|d| d.row).collect())
            .unwrap_or_default();
        Ok(rows)
    }

    async fn single_row(&self, statement: &str, parameters: Value) -> Result<Option<Vec<Value>>> {
        Ok(self.run(statement, parameters).await?.into_iter().next())
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn role_info(&self, role: &str) -> Result<Option<RoleInfo>> {
        debug!("Fetching role info for {role}");
        let Some(row) = self.single_row(ROLE_INFO, json!({ "role": role })).await? else {
            return Ok(None);
        };

        Ok(Some(RoleInfo {
            name: column(&row, 0)?,
            skills: names(&row, 1)?,
            levels: names(&row, 2)?,
        }))
    }

    async fn skill_info(&self, skill: &str) -> Result<Option<SkillInfo>> {
        debug!("Fetching skill info for {skill}");
        let Some(row) = self.single_row(SKILL_INFO, json!({ "skill": skill })).await? else {
            return Ok(None);
        };

        Ok(Some(SkillInfo {
            name: column(&row, 0)?,
            required_by: names(&row, 1)?,
            prerequisites: Vec::new(),
        }))
    }

    async fn role_skills(&self, role: &str) -> Result<BTreeSet<String>> {
        let row = self.single_row(ROLE_SKILLS, json!({ "role": role })).await?;
        match row {
            Some(row) => Ok(names(&row, 0)?.into_iter().collect()),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn skill_prerequisites(&self, skill: &str) -> Result<Vec<String>> {
        let row = self
            .single_row(SKILL_PREREQUISITES, json!({ "skill": skill }))
            .await?;
        match row {
            Some(row) => names(&row, 0),
            None => Ok(Vec::new()),
        }
    }

    async fn shortest_path(
        &self,
        from_role: &str,
        to_role: &str,
        max_hops: usize,
    ) -> Result<Option<TransitionPath>> {
        debug!("Searching path {from_role} -> {to_role} (max {max_hops} hops)");
        // `[*..0]` is rejected by Neo4j; match the memory backend instead.
        if max_hops == 0 {
            return Ok(None);
        }
        // Variable-length bounds cannot be parameters in Cypher.
        let statement = format!(
            "MATCH path = shortestPath(\
             (a:Role {{name: $from_role}})-[*..{max_hops}]->(b:Role {{name: $to_role}}))\n\
             RETURN [n IN nodes(path) | n.name] AS nodes, \
             [rel IN relationships(path) | type(rel)] AS relationships"
        );
        let row = self
            .single_row(
                &statement,
                json!({ "from_role": from_role, "to_role": to_role }),
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let path = TransitionPath {
            nodes: column(&row, 0)?,
            relationships: column(&row, 1)?,
        };
        if path.nodes.len() != path.relationships.len() + 1 {
            return Err(GraphError::InvalidResponse(format!(
                "path with {} nodes and {} relationships",
                path.nodes.len(),
                path.relationships.len()
            )));
        }
        Ok(Some(path))
    }
}

/// Decode one column of a row.
fn column<T: DeserializeOwned>(row: &[Value], index: usize) -> Result<T> {
    let value = row
        .get(index)
        .cloned()
        .ok_or_else(|| GraphError::InvalidResponse(format!("missing column {index}")))?;
    Ok(serde_json::from_value(value)?)
}

/// Decode a collected list of names, dropping nulls and sorting.
fn names(row: &[Value], index: usize) -> Result<Vec<String>> {
    let values: Vec<Option<String>> = column(row, index)?;
    let unique: BTreeSet<String> = values.into_iter().flatten().collect();
    Ok(unique.into_iter().collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}
