//! Configuration-driven assistant talking to mocked Neo4j and embedding
//! endpoints.

use askcareer_documents::{ChunkStore, DocumentChunk, HeaderMap};
use askcareer_retrieval::{AssistantConfig, CareerAssistant, RetrievalError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "test-embedder";

fn rows(rows: Value) -> ResponseTemplate {
    let data: Vec<Value> = rows
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|row| json!({ "row": row, "meta": [] }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "results": [{ "columns": [], "data": data }],
        "errors": []
    }))
}

async fn write_index(dir: &TempDir) {
    let mut store = ChunkStore::create(dir.path(), MODEL, 3);
    let mut headers = HeaderMap::new();
    headers.insert("Header 1".to_string(), "Data Engineer".to_string());
    store
        .insert(
            DocumentChunk::new(
                "data/roles/data_engineer.md",
                0,
                "Data engineers build pipelines.",
                headers,
            ),
            vec![1.0, 0.0, 0.0],
        )
        .unwrap();
    store
        .insert(
            DocumentChunk::new(
                "data/roles/bi_engineer.md",
                0,
                "BI engineers build dashboards.",
                HeaderMap::new(),
            ),
            vec![0.0, 1.0, 0.0],
        )
        .unwrap();
    store.save().await.unwrap();
}

fn config(server: &MockServer, index: &TempDir) -> AssistantConfig {
    AssistantConfig::from_toml_str(&format!(
        r#"
        [graph]
        uri = "{uri}"
        database = "careers"

        [embedding]
        provider = "http"
        url = "{uri}/v1"
        model = "{MODEL}"
        dimension = 3

        [retrieval]
        top_k = 1
        "#,
        uri = server.uri()
    ))
    .map(|mut config| {
        config.index.dir = index.path().to_path_buf();
        config
    })
    .unwrap()
}

#[tokio::test]
async fn test_answer_from_neo4j_and_http_embeddings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/careers/tx/commit"))
        .and(body_partial_json(json!({
            "statements": [{ "parameters": { "role": "Data Engineer" } }]
        })))
        .respond_with(rows(json!([
            ["Data Engineer", ["SQL", "Python"], ["Senior"]]
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.9, 0.1, 0.0], "index": 0 }]
        })))
        .mount(&server)
        .await;

    let index = TempDir::new().unwrap();
    write_index(&index).await;

    let mut config = config(&server, &index);
    config
        .apply_env(|key| (key == "NEO4J_PASSWORD").then(|| "secret".to_string()))
        .unwrap();
    let assistant = CareerAssistant::from_config(config).await.unwrap();
    assert_eq!(assistant.graph().backend(), "neo4j");

    let answer = assistant
        .answer_question("What does a Data Engineer do?")
        .await
        .unwrap();

    assert_eq!(
        answer.text,
        "Based on the career graph:\n\
         Role Information:\n\
         Role: Data Engineer\n\
         Levels: Senior\n\
         Skills: Python, SQL\n\
         \n\
         Additional Resources:\n\
         \n\
         Resource 1:\n\
         Source: data/roles/data_engineer.md\n\
         Content: Data engineers build pipelines...."
    );
}

#[tokio::test]
async fn test_missing_password_fails_before_connecting() {
    let server = MockServer::start().await;
    let index = TempDir::new().unwrap();

    let result = CareerAssistant::from_config(config(&server, &index)).await;

    assert!(matches!(
        result,
        Err(RetrievalError::MissingCredential(ref name)) if name == "NEO4J_PASSWORD"
    ));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_index_from_another_model_is_rejected() {
    let server = MockServer::start().await;
    let index = TempDir::new().unwrap();
    write_index(&index).await;

    let mut config = config(&server, &index);
    config.graph.password = Some("secret".to_string());
    config.embedding.model = "another-model".to_string();

    let result = CareerAssistant::from_config(config).await;
    assert!(matches!(result, Err(RetrievalError::Document(_))));
}
