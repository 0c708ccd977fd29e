//! Runs the whole ingestion against a mocked Gemini and Supabase.
//!
//! Gemini and Supabase share a single mock server; they are told apart by path.

use std::ffi::OsStr;

use clap::Parser as _;
use kbingest::{
    config::Settings,
    ingest::{Clients, ingest},
};
use kbingest_test_utils::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::MockServer;

const HEADER: &str = "Source URL: http://x\nDate modified: 2023-01-05\n---\n";

fn settings(source_dir: &std::path::Path) -> Settings {
    Settings::try_parse_from([
        OsStr::new("kbingest"),
        OsStr::new("--source-dir"),
        source_dir.as_os_str(),
    ])
    .unwrap()
}

fn clients(mock_server: &MockServer) -> Clients {
    Clients {
        gemini: gemini_client(&mock_server.uri()),
        supabase: supabase(&mock_server.uri()),
    }
}

async fn requests_to(mock_server: &MockServer, path: &str) -> usize {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}

#[test_log::test(tokio::test)]
async fn test_file_is_chunked_tagged_embedded_and_uploaded() {
    let content = format!("{HEADER}{}", "a".repeat(2500));
    let dir = knowledge_dir(&[("deposits.txt", content.as_str())]);

    let mock_server = MockServer::start().await;
    mock_chat_completions(&mock_server, "Sure: ['deposit', 'tenancy']").await;
    mock_embeddings(&mock_server).await;
    mock_supabase_insert(&mock_server).await;

    let stats = ingest(&settings(dir.path()), clients(&mock_server))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.files, 1);
    assert_eq!(stats.failed_files, 0);
    assert_eq!(stats.stored_nodes, 3);

    let rows = inserted_rows(&mock_server).await;
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row["source_url"], "http://x");
        assert_eq!(row["priority_date"], "2023-01-05");
        assert_eq!(row["keywords"], json!(["deposit", "tenancy"]));
        assert_eq!(row["embedding"].as_array().unwrap().len(), EMBEDDING_SIZE);
    }
    assert_eq!(rows[0]["content"], "a".repeat(1000));
    assert!(!rows[0]["content"].as_str().unwrap().contains("Source URL"));

    assert_eq!(requests_to(&mock_server, "/chat/completions").await, 3);
    assert_eq!(requests_to(&mock_server, "/embeddings").await, 3);
}

#[test_log::test(tokio::test)]
async fn test_prose_file_is_split_into_overlapping_chunks() {
    let body: String = (1..60)
        .map(|n| format!("Rule {n}: the landlord protects the deposit in time. "))
        .collect::<String>()
        .chars()
        .take(2500)
        .collect();
    let content = format!("{HEADER}{body}");
    let dir = knowledge_dir(&[("deposits.txt", content.as_str())]);

    let mock_server = MockServer::start().await;
    mock_chat_completions(&mock_server, "['deposit']").await;
    mock_embeddings(&mock_server).await;
    mock_supabase_insert(&mock_server).await;

    let stats = ingest(&settings(dir.path()), clients(&mock_server))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.stored_nodes, 3);

    let rows = inserted_rows(&mock_server).await;
    let chunks: Vec<&str> = rows
        .iter()
        .map(|row| row["content"].as_str().unwrap())
        .collect();
    assert_eq!(chunks.len(), 3);

    for row in &rows {
        assert_eq!(row["source_url"], "http://x");
        assert_eq!(row["priority_date"], "2023-01-05");
    }
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 1000);
        assert!(!chunk.contains("Source URL"));
    }
    assert!(chunks[0].starts_with("Rule 1:"));
    assert!(body.trim_end().ends_with(chunks[2].trim_end()));

    // Each chunk starts inside the previous one
    for pair in chunks.windows(2) {
        let head: String = pair[1].chars().take(30).collect();
        assert!(pair[0].contains(&head), "{head:?} not in previous chunk");
    }
}

#[test_log::test(tokio::test)]
async fn test_empty_folder_uploads_nothing() {
    let dir = knowledge_dir(&[("notes.md", "not a knowledge file")]);

    let mock_server = MockServer::start().await;

    let stats = ingest(&settings(dir.path()), clients(&mock_server))
        .await
        .unwrap();

    assert!(stats.is_none());
    assert!(
        mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_folder_is_a_clean_exit() {
    let dir = knowledge_dir(&[]);

    let mock_server = MockServer::start().await;

    let stats = ingest(
        &settings(&dir.path().join("knowledge_source")),
        clients(&mock_server),
    )
    .await
    .unwrap();

    assert!(stats.is_none());
}

#[test_log::test(tokio::test)]
async fn test_embedding_failure_skips_rest_of_file_only() {
    let content = format!("{HEADER}{}", "a".repeat(2500));
    let dir = knowledge_dir(&[
        ("a.txt", content.as_str()),
        ("b.txt", "Source URL: http://y\n---\nShort tenancy note."),
    ]);

    let mock_server = MockServer::start().await;
    mock_chat_completions(&mock_server, "['tenancy']").await;
    mock_embeddings_with(&mock_server, EmbeddingsResponder::failing_on(2)).await;
    mock_supabase_insert(&mock_server).await;

    let stats = ingest(&settings(dir.path()), clients(&mock_server))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.files, 2);
    assert_eq!(stats.failed_files, 1);
    assert_eq!(stats.stored_nodes, 2);

    let rows = inserted_rows(&mock_server).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["content"], "a".repeat(1000));
    assert_eq!(rows[1]["content"], "Short tenancy note.");
    assert_eq!(rows[1]["source_url"], "http://y");
    assert_eq!(rows[1]["priority_date"], serde_json::Value::Null);

    // Chunk 3 of a.txt is never embedded
    assert_eq!(requests_to(&mock_server, "/embeddings").await, 3);
}

#[test_log::test(tokio::test)]
async fn test_keyword_failure_still_uploads_chunk() {
    let content = format!("{HEADER}Deposits are protected.");
    let dir = knowledge_dir(&[("a.txt", content.as_str())]);

    let mock_server = MockServer::start().await;
    mock_chat_completions(&mock_server, "I cannot help with that.").await;
    mock_embeddings(&mock_server).await;
    mock_supabase_insert(&mock_server).await;

    let stats = ingest(&settings(dir.path()), clients(&mock_server))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.stored_nodes, 1);
    let rows = inserted_rows(&mock_server).await;
    assert_eq!(rows[0]["keywords"], json!([]));
    assert_eq!(rows[0]["content"], "Deposits are protected.");
}
