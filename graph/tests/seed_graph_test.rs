//! Integration tests against the bundled career seed.

use std::path::PathBuf;
use std::sync::Arc;

use askcareer_graph::{CareerGraph, GraphStore, MemoryGraph};
use pretty_assertions::assert_eq;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/careers.json")
}

async fn career_graph() -> CareerGraph {
    let graph = MemoryGraph::load(&fixture()).await.unwrap();
    CareerGraph::new(Arc::new(graph))
}

#[tokio::test]
async fn test_bi_to_data_engineer_is_direct() {
    let path = career_graph()
        .await
        .transition_path("BI Engineer", "Data Engineer")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(path.nodes, vec!["BI Engineer", "Data Engineer"]);
    assert_eq!(path.relationships, vec!["TRANSITIONS_TO"]);
}

#[tokio::test]
async fn test_bi_to_ml_engineer_takes_two_hops() {
    let path = career_graph()
        .await
        .transition_path("BI Engineer", "Machine Learning Engineer")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        path.nodes,
        vec!["BI Engineer", "Data Engineer", "Machine Learning Engineer"]
    );
}

#[tokio::test]
async fn test_bi_to_data_engineer_gap() {
    let gap = career_graph()
        .await
        .skill_gap("BI Engineer", "Data Engineer")
        .await
        .unwrap();

    let learn: Vec<_> = gap.to_learn.iter().map(String::as_str).collect();
    let keep: Vec<_> = gap.to_maintain.iter().map(String::as_str).collect();
    let drop: Vec<_> = gap.to_phase_out.iter().map(String::as_str).collect();
    assert_eq!(learn, vec!["Cloud Platforms", "ETL Processes", "Python"]);
    assert_eq!(keep, vec!["Data Warehousing", "SQL"]);
    assert_eq!(drop, vec!["Power BI", "Tableau"]);
}

#[tokio::test]
async fn test_deep_learning_prerequisites_are_transitive() {
    let graph = MemoryGraph::load(&fixture()).await.unwrap();
    let prereqs = graph.skill_prerequisites("Deep Learning").await.unwrap();
    assert_eq!(prereqs, vec!["Machine Learning", "Python", "Statistics"]);
}

#[tokio::test]
async fn test_missing_seed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(MemoryGraph::load(&dir.path().join("absent.json")).await.is_err());
}
