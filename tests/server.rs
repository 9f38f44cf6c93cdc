//! HTTP API tests against an in-process server on an ephemeral port.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

use smartdoc::config::{Config, GatewayConfig};
use smartdoc::extract::{create_engine, Extractor};
use smartdoc::gateway::{Gateway, GatewayError, GenerateOptions, GenerativeProvider};
use smartdoc::server::{router, AppState};

/// Replies with a fixed text and remembers every prompt.
struct CannedProvider {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerativeProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, GatewayError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Fails every request as a timed-out call.
struct TimeoutProvider;

#[async_trait]
impl GenerativeProvider for TimeoutProvider {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, GatewayError> {
        Err(GatewayError::Timeout)
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.ocr.engine = "disabled".to_string();
    config.gateway.provider = "disabled".to_string();
    config
}

async fn spawn_server(config: Config, gateway: Gateway) -> String {
    let extractor = Extractor::new(create_engine(&config.ocr));
    let state = AppState::new(config, extractor, gateway);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_default() -> String {
    let config = test_config();
    let gateway = Gateway::from_config(&config.gateway).unwrap();
    spawn_server(config, gateway).await
}

async fn spawn_with_reply(reply: &str) -> (String, Arc<CannedProvider>) {
    let provider = Arc::new(CannedProvider {
        reply: reply.to_string(),
        prompts: Mutex::new(Vec::new()),
    });
    let config = test_config();
    let gateway = Gateway::new(provider.clone(), &GatewayConfig::default());
    (spawn_server(config, gateway).await, provider)
}

fn docx(paragraph: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            paragraph
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn part(name: &str, mime: &str, bytes: Vec<u8>) -> Part {
    Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str(mime)
        .unwrap()
}

async fn upload(base: &str, form: Form) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/documents", base))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let base = spawn_default().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn upload_read_search_and_remove() {
    let base = spawn_default().await;
    let client = reqwest::Client::new();

    let form = Form::new()
        .part(
            "files",
            part(
                "guide.txt",
                "text/plain",
                b"# Guide\n\nRust is fast.\n\n* safe\n* fast\n".to_vec(),
            ),
        )
        .part(
            "files",
            part("broken.pdf", "application/pdf", b"%PDF-1.7 garbage".to_vec()),
        )
        .part(
            "files",
            part(
                "memo.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                docx("Rust memo"),
            ),
        );
    let resp = upload(&base, form).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let documents = body["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(body["failures"][0]["name"], "broken.pdf");
    assert_eq!(body["failures"][0]["kind"], "CORRUPTED_FILE");
    let id = documents[0]["id"].as_str().unwrap().to_string();
    assert_eq!(documents[0]["stats"]["pages"], 1);

    let list: Value = client
        .get(format!("{}/api/documents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["documents"].as_array().unwrap().len(), 2);

    let doc: Value = client
        .get(format!("{}/api/documents/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["name"], "guide.txt");
    assert!(doc["content"].as_str().unwrap().starts_with("# Guide"));

    let page: Value = client
        .get(format!("{}/api/documents/{}/pages/1", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["pages"], 1);
    assert_eq!(
        page["sections"],
        json!([
            { "kind": "heading", "level": 1, "text": "Guide" },
            { "kind": "paragraph", "text": "Rust is fast." },
            { "kind": "list", "items": ["safe", "fast"] }
        ])
    );

    let resp = client
        .get(format!("{}/api/documents/{}/pages/2", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let found: Value = client
        .get(format!("{}/api/documents/{}/search?q=FAST", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["total"], 2);
    assert_eq!(found["matches"][0]["text"], "fast");

    let exact: Value = client
        .get(format!(
            "{}/api/documents/{}/search?q=FAST&case_sensitive=true",
            base, id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exact["total"], 0);

    let resp = client
        .delete(format!("{}/api/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .delete(format!("{}/api/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "conflict");

    let resp = client
        .get(format!("{}/api/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");
}

#[tokio::test]
async fn single_unsupported_file_is_415() {
    let base = spawn_default().await;
    let form = Form::new().part("file", part("data.zip", "application/zip", vec![1, 2, 3]));
    let resp = upload(&base, form).await;
    assert_eq!(resp.status(), 415);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "unsupported_format");
    assert_eq!(err["error"]["message"], "Unsupported file type: application/zip");
}

#[tokio::test]
async fn single_oversized_file_is_413() {
    let mut config = test_config();
    config.limits.max_file_bytes = 8;
    let gateway = Gateway::from_config(&config.gateway).unwrap();
    let base = spawn_server(config, gateway).await;

    let form = Form::new().part("file", part("big.txt", "text/plain", vec![b'x'; 64]));
    let resp = upload(&base, form).await;
    assert_eq!(resp.status(), 413);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "payload_too_large");
    assert_eq!(err["error"]["message"], "File size exceeds 8 bytes limit");
}

#[tokio::test]
async fn too_many_files_is_bad_request() {
    let mut config = test_config();
    config.limits.max_batch_files = 1;
    let gateway = Gateway::from_config(&config.gateway).unwrap();
    let base = spawn_server(config, gateway).await;

    let form = Form::new()
        .part("files", part("a.txt", "text/plain", b"a".to_vec()))
        .part("files", part("b.txt", "text/plain", b"b".to_vec()));
    let resp = upload(&base, form).await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["message"], "Maximum 1 files allowed");
}

#[tokio::test]
async fn upload_without_files_is_bad_request() {
    let base = spawn_default().await;
    let form = Form::new().text("note", "no file here");
    let resp = upload(&base, form).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn disabled_gateway_is_503() {
    let base = spawn_default().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/summarize", base))
        .json(&json!({ "text": "Some document text." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "gateway_disabled");
}

#[tokio::test]
async fn gateway_tasks_round_trip() {
    let (base, provider) = spawn_with_reply("1. What is Rust?\n\n2. Who uses it?").await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/ai-qna/generate-questions", base))
        .json(&json!({ "documentText": "Rust is a language.", "numQuestions": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["questions"], json!(["What is Rust?", "Who uses it?"]));

    let body: Value = client
        .post(format!("{}/api/ai-qna/ask-question", base))
        .json(&json!({ "documentText": "Rust is a language.", "question": "What is Rust?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["answer"].as_str().unwrap().contains("What is Rust?"));

    let body: Value = client
        .post(format!("{}/api/ai/explain", base))
        .json(&json!({ "fullText": "A contract clause about liability.", "promptType": "LEGAL_TRANSLATION" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["analysis"].is_string());

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("A contract clause about liability."));
}

#[tokio::test]
async fn gateway_validation_is_400() {
    let (base, provider) = spawn_with_reply("unused").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/ai/explain", base))
        .json(&json!({ "fullText": "   tiny   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/api/ai-qna/generate-questions", base))
        .json(&json!({ "documentText": "text", "numQuestions": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn insights_return_parsed_json() {
    let (base, _) = spawn_with_reply("Here you go:\n{\"documentType\": \"article\"}\nThanks").await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/insight-mirror/analyze", base))
        .json(&json!({ "text": "An article about search engines." }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "documentType": "article" }));
}

#[tokio::test]
async fn unparseable_insights_are_502() {
    let (base, _) = spawn_with_reply("I cannot do that.").await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/insight-mirror/analyze", base))
        .json(&json!({ "text": "Some text." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "gateway_error");
    assert!(err["error"]["details"].is_string());
}

#[tokio::test]
async fn gateway_timeout_is_504() {
    let gateway = Gateway::new(Arc::new(TimeoutProvider), &GatewayConfig::default());
    let base = spawn_server(test_config(), gateway).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/summarize", base))
        .json(&json!({ "text": "Some document text." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "gateway_timeout");
}
