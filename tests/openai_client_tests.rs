//! Integration tests for the OpenAI-compatible client.
//!
//! Each test starts an axum server on an ephemeral port that imitates the
//! `/v1/models` and streamed `/v1/chat/completions` endpoints.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use lmchat::{
    ChatRequest, ChatSession, ConnectUseCase, DomainError, Endpoint, InferenceClient,
    ListModelsUseCase, ModelParameters, OpenAiCompatClient, OpenAiCompatClientFactory, Role,
    SendMessageUseCase, WireMessage,
};

struct MockServer {
    models_status: StatusCode,
    chat_status: StatusCode,
    /// Response body pieces, sent as separate chunks.
    body: Vec<Vec<u8>>,
    requests: Mutex<Vec<Value>>,
    auth_headers: Mutex<Vec<Option<String>>>,
}

impl MockServer {
    fn streaming(body: Vec<Vec<u8>>) -> Self {
        Self {
            models_status: StatusCode::OK,
            chat_status: StatusCode::OK,
            body,
            requests: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
        }
    }
}

fn frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"id": "chatcmpl-1", "object": "chat.completion.chunk",
               "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]})
    )
}

/// Splits a body into `pieces` roughly equal byte ranges, ignoring UTF-8
/// boundaries on purpose.
fn split_bytes(body: &str, pieces: usize) -> Vec<Vec<u8>> {
    let bytes = body.as_bytes();
    let size = bytes.len().div_ceil(pieces).max(1);
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

async fn models(State(state): State<Arc<MockServer>>, headers: HeaderMap) -> Response {
    record_auth(&state, &headers);
    if state.models_status != StatusCode::OK {
        return state.models_status.into_response();
    }
    Json(json!({
        "object": "list",
        "data": [
            {"id": "lmstudio-community/qwen2.5-7b-instruct", "object": "model", "owned_by": "organization_owner"},
            {"id": "llama-3.2-1b", "object": "model", "owned_by": "organization_owner"}
        ]
    }))
    .into_response()
}

async fn chat(
    State(state): State<Arc<MockServer>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    state.requests.lock().unwrap().push(request);
    if state.chat_status != StatusCode::OK {
        return (state.chat_status, "model not loaded").into_response();
    }

    let pieces = state.body.clone();
    let stream = futures_util::stream::iter(pieces.into_iter().map(Ok::<_, Infallible>));
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(stream))
        .unwrap()
}

fn record_auth(state: &MockServer, headers: &HeaderMap) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth_headers.lock().unwrap().push(auth);
}

async fn spawn_server(state: Arc<MockServer>) -> Endpoint {
    let app = Router::new()
        .route("/v1/models", get(models))
        .route("/v1/chat/completions", post(chat))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    Endpoint::parse(&format!("http://{addr}/")).expect("endpoint")
}

fn user_request(text: &str) -> ChatRequest {
    ChatRequest::new("llama-3.2-1b", vec![WireMessage::new(Role::User, text)])
}

#[tokio::test]
async fn test_connection_succeeds_against_running_server() {
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![]))).await;
    let client = OpenAiCompatClient::new(&endpoint, None);

    assert!(client.test_connection().await);
}

#[tokio::test]
async fn test_connection_fails_on_error_status() {
    let mut server = MockServer::streaming(vec![]);
    server.models_status = StatusCode::INTERNAL_SERVER_ERROR;
    let endpoint = spawn_server(Arc::new(server)).await;
    let client = OpenAiCompatClient::new(&endpoint, None);

    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connection_fails_when_nothing_listens() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let endpoint = Endpoint::parse(&format!("http://{addr}")).unwrap();
    let client = OpenAiCompatClient::new(&endpoint, None);

    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connect_use_case_over_http() {
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![]))).await;
    let connect = ConnectUseCase::new(Arc::new(OpenAiCompatClientFactory::new(None)));

    let connection = connect.execute(&format!("  {endpoint}/  ")).await.unwrap();

    assert_eq!(connection.endpoint, endpoint);
}

#[tokio::test]
async fn test_list_models_derives_display_names() {
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![]))).await;
    let use_case = ListModelsUseCase::new(Arc::new(OpenAiCompatClient::new(&endpoint, None)));

    let models = use_case.execute().await.unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id(), "llama-3.2-1b");
    assert_eq!(models[1].id(), "lmstudio-community/qwen2.5-7b-instruct");
    assert_eq!(models[1].name(), "qwen2.5-7b-instruct");
}

#[tokio::test]
async fn test_chat_streams_fragments_split_across_chunks() {
    let body = format!(
        "{}{}{}data: [DONE]\n\n",
        frame("Grüße"),
        frame(" from "),
        frame("the 🦀")
    );
    let server = Arc::new(MockServer::streaming(split_bytes(&body, 23)));
    let endpoint = spawn_server(server.clone()).await;
    let client = OpenAiCompatClient::new(&endpoint, None);
    let mut fragments = Vec::new();

    let reply = client
        .chat(&user_request("hi"), &mut |c: &str| fragments.push(c.to_string()))
        .await
        .unwrap();

    assert_eq!(reply, "Grüße from the 🦀");
    assert_eq!(fragments, vec!["Grüße", " from ", "the 🦀"]);
}

#[tokio::test]
async fn test_chat_sends_streaming_request_body() {
    let server = Arc::new(MockServer::streaming(vec![b"data: [DONE]\n\n".to_vec()]));
    let endpoint = spawn_server(server.clone()).await;
    let client = OpenAiCompatClient::new(&endpoint, Some("secret".to_string()));
    let request = user_request("hello")
        .with_parameters(ModelParameters::default().with_temperature(0.5));

    client.chat(&request, &mut |_: &str| {}).await.unwrap();

    let requests = server.requests.lock().unwrap();
    assert_eq!(
        requests[0],
        json!({
            "model": "llama-3.2-1b",
            "messages": [{"role": "user", "content": "hello"}],
            "stream": true,
            "temperature": 0.5
        })
    );
    let auth = server.auth_headers.lock().unwrap();
    assert_eq!(auth[0].as_deref(), Some("Bearer secret"));
}

#[tokio::test]
async fn test_chat_skips_malformed_frames() {
    let body = format!("{}data: {{\"choices\": [\n\n{}data: [DONE]\n\n", frame("a"), frame("b"));
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![body.into_bytes()]))).await;
    let client = OpenAiCompatClient::new(&endpoint, None);

    let reply = client.chat(&user_request("x"), &mut |_: &str| {}).await.unwrap();

    assert_eq!(reply, "ab");
}

#[tokio::test]
async fn test_chat_without_done_marker_still_completes() {
    let body = format!("{}{}", frame("no "), frame("terminator").trim_end());
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![body.into_bytes()]))).await;
    let client = OpenAiCompatClient::new(&endpoint, None);

    let reply = client.chat(&user_request("x"), &mut |_: &str| {}).await.unwrap();

    assert_eq!(reply, "no terminator");
}

#[tokio::test]
async fn test_chat_error_status_is_api_error() {
    let mut server = MockServer::streaming(vec![]);
    server.chat_status = StatusCode::BAD_REQUEST;
    let endpoint = spawn_server(Arc::new(server)).await;
    let client = OpenAiCompatClient::new(&endpoint, None);

    let err = client
        .chat(&user_request("x"), &mut |_: &str| {})
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::ApiError { status: 400, .. }));
    assert_eq!(err.user_message(), "Failed to get response from API");
}

#[tokio::test]
async fn test_chat_server_error_frame_stops_stream() {
    let body = format!(
        "{}data: {{\"error\": {{\"message\": \"context length exceeded\"}}}}\n\n{}",
        frame("partial"),
        frame("ignored")
    );
    let endpoint = spawn_server(Arc::new(MockServer::streaming(vec![body.into_bytes()]))).await;
    let client = OpenAiCompatClient::new(&endpoint, None);
    let mut fragments = Vec::new();

    let err = client
        .chat(&user_request("x"), &mut |c: &str| fragments.push(c.to_string()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("context length exceeded"));
    assert_eq!(fragments, vec!["partial"]);
}

#[tokio::test]
async fn test_send_message_use_case_end_to_end() {
    let body = format!("{}{}data: [DONE]\n\n", frame("Four"), frame("."));
    let server = Arc::new(MockServer::streaming(split_bytes(&body, 5)));
    let endpoint = spawn_server(server.clone()).await;
    let client: Arc<dyn InferenceClient> = Arc::new(OpenAiCompatClient::new(&endpoint, None));

    let mut session = ChatSession::new().with_system_prompt("Answer tersely.");
    ListModelsUseCase::new(client.clone())
        .load_into(&mut session)
        .await
        .unwrap();
    let use_case = SendMessageUseCase::new(client);
    let mut streamed = String::new();

    use_case
        .execute(&mut session, "What is 2 + 2?", &mut |c: &str| streamed.push_str(c))
        .await
        .unwrap();

    assert_eq!(streamed, "Four.");
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content(), "Four.");
    assert_eq!(session.conversation().title(), "What is 2 + 2?");

    let requests = server.requests.lock().unwrap();
    assert_eq!(requests[0]["model"], "llama-3.2-1b");
    assert_eq!(requests[0]["messages"][0]["role"], "system");
    assert_eq!(requests[0]["messages"][1]["content"], "What is 2 + 2?");
}
