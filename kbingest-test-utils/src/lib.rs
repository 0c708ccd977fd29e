#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use temp_dir::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use kbingest_integrations as integrations;

/// Dimension of the vectors returned by [`mock_embeddings`].
pub const EMBEDDING_SIZE: usize = 8;

pub fn gemini_client(mock_server_uri: &str) -> integrations::gemini::Gemini {
    integrations::gemini::Gemini::builder()
        .config(
            integrations::gemini::GeminiConfig::default()
                .with_api_key("test-gemini-key")
                .with_api_base(mock_server_uri),
        )
        .with_default_models()
        .build()
        .expect("Can create Gemini client.")
}

pub fn supabase(mock_server_uri: &str) -> integrations::supabase::Supabase {
    integrations::supabase::Supabase::builder()
        .url(mock_server_uri)
        .key("test-supabase-key")
        .build()
        .expect("Can create Supabase client.")
}

/// Creates a knowledge folder holding the given `(file name, content)` pairs.
pub fn knowledge_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs_err::write(dir.child(name), content).unwrap();
    }
    dir
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_677_652_288,
        "model": integrations::gemini::DEFAULT_PROMPT_MODEL,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content,
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }
    })
}

/// Mock chat completions endpoint, answering every prompt with `reply`.
pub async fn mock_chat_completions(mock_server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(reply)))
        .mount(mock_server)
        .await;
}

/// Answers embedding requests with one vector per input, failing the `fail_on`th request
/// (1-based) with a server error.
pub struct EmbeddingsResponder {
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl EmbeddingsResponder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(call),
        }
    }
}

impl Default for EmbeddingsResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Respond for EmbeddingsResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "Request payload is invalid",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            }));
        }

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let inputs = match &body["input"] {
            serde_json::Value::Array(inputs) => inputs.len(),
            _ => 1,
        };

        #[allow(clippy::cast_precision_loss)]
        let data = (0..inputs)
            .map(|i| {
                json!({
                    "object": "embedding",
                    "embedding": vec![call as f32 / 10.0; EMBEDDING_SIZE],
                    "index": i
                })
            })
            .collect::<Vec<_>>();

        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": data,
            "model": integrations::gemini::DEFAULT_EMBED_MODEL,
            "usage": {
                "prompt_tokens": 8,
                "total_tokens": 8
            }
        }))
    }
}

/// Mock embeddings endpoint, returning one vector per input.
pub async fn mock_embeddings(mock_server: &MockServer) {
    mock_embeddings_with(mock_server, EmbeddingsResponder::new()).await;
}

pub async fn mock_embeddings_with(mock_server: &MockServer, responder: EmbeddingsResponder) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(responder)
        .mount(mock_server)
        .await;
}

/// Mock Supabase insert endpoint for the `documents` table.
pub async fn mock_supabase_insert(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/documents"))
        .respond_with(ResponseTemplate::new(201))
        .mount(mock_server)
        .await;
}

/// Rows received by the mocked Supabase insert endpoint, in arrival order.
pub async fn inserted_rows(mock_server: &MockServer) -> Vec<serde_json::Value> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/rest/v1/documents")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}
