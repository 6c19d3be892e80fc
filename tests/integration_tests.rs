//! Integration tests for the LUNA client.
//!
//! Each test starts a throwaway axum server on a loopback port that answers
//! the way the LUNA backend does, then drives the library over real sockets.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::net::TcpListener;

use luna::chat::{ChatSession, ExchangeState, Renderer};
use luna::store::{ActiveChatStore, MemoryStore};
use luna::view::RenderedMessage;
use luna::{
    Backend, ChatRequest, EditRequest, LunaClient, MessageId, ServerId, Settings, StreamRecord,
};

/// One field of a multipart form.
#[derive(Debug, Clone)]
struct FormField {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FormField {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// A request as the server saw it.
#[derive(Debug, Clone, Default)]
struct Seen {
    path: String,
    body: String,
    fields: Vec<FormField>,
}

impl Seen {
    fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(log: &Log, path: &str, body: String, fields: Vec<FormField>) {
    log.lock().unwrap().push(Seen {
        path: path.to_string(),
        body,
        fields,
    });
}

async fn read_form(mut multipart: Multipart) -> Vec<FormField> {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap_or_default();
        fields.push(FormField {
            name,
            filename,
            content_type,
            data,
        });
    }
    fields
}

fn json(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn event(record: &str) -> Result<String, Infallible> {
    Ok(format!("data: {record}\n\n"))
}

/// A `text/event-stream` reply carrying `records`.
fn events(records: &[&'static str]) -> Response {
    let records: Vec<_> = records.iter().map(|record| event(record)).collect();
    let body = Body::from_stream(stream::iter(records));
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn chat(State(log): State<Log>, multipart: Multipart) -> Response {
    let fields = read_form(multipart).await;
    record(&log, "/chat", String::new(), fields);
    events(&[
        r#"{"chat_id":"c42","user_message_id":7}"#,
        r#"{"chunk":"Hel"}"#,
        r#"{"chunk":"lo, "}"#,
        r#"{"chunk":"friend"}"#,
        r#"{"is_new_chat":true}"#,
    ])
}

async fn edit(State(log): State<Log>, body: String) -> Response {
    let missing = body.contains("\"missing\"");
    record(&log, "/edit", body, Vec::new());
    if missing {
        json(StatusCode::NOT_FOUND, r#"{"error":"Message not found"}"#)
    } else {
        events(&[r#"{"chunk":"Edited "}"#, r#"{"chunk":"reply"}"#])
    }
}

async fn history() -> Response {
    json(
        StatusCode::OK,
        r#"[{"id":"c42","title":"Greeting","pinned":true,"last_updated":1700000000000},
            {"id":"c1","title":"Older","pinned":false,"last_updated":1600000000000}]"#,
    )
}

async fn get_chat(Path(chat_id): Path<String>) -> Response {
    match chat_id.as_str() {
        "c42" => json(
            StatusCode::OK,
            r#"[{"role":"user","parts":["Hello"],"id":7},
                {"role":"model","parts":["Hello, friend"],"id":8}]"#,
        ),
        _ => json(StatusCode::OK, "null"),
    }
}

async fn generate_title(State(log): State<Log>, body: String) -> Response {
    record(&log, "/generate_title", body, Vec::new());
    json(StatusCode::OK, r#"{"success":true,"title":"Greeting"}"#)
}

async fn success() -> Response {
    json(StatusCode::OK, r#"{"status":"success"}"#)
}

async fn get_settings() -> Response {
    json(
        StatusCode::OK,
        r#"{"personality":"","nickname":"Sam","occupation":"pilot","interests":"","custom_instructions":""}"#,
    )
}

async fn save_settings(State(log): State<Log>, body: String) -> Response {
    record(&log, "/save_settings", body, Vec::new());
    success().await
}

async fn translate_voice(State(log): State<Log>, multipart: Multipart) -> Response {
    let fields = read_form(multipart).await;
    record(&log, "/translate_voice", String::new(), fields);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "audio/mpeg")],
        &b"ID3translated"[..],
    )
        .into_response()
}

async fn session_login() -> Response {
    json(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid token"}"#)
}

async fn fallback() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain")],
        "boom",
    )
        .into_response()
}

async fn listen(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start the mock backend.  Returns its base URL and the requests it saw.
async fn serve() -> (String, Log) {
    let log = Log::default();
    let app = Router::new()
        .route("/chat", post(chat))
        .route("/edit", post(edit))
        .route("/history", get(history))
        .route("/get_chat/{chat_id}", get(get_chat))
        .route("/generate_title", post(generate_title))
        .route("/rename_chat", post(success))
        .route("/delete_chat", post(success))
        .route("/get_settings", get(get_settings))
        .route("/save_settings", post(save_settings))
        .route("/translate_voice", post(translate_voice))
        .route("/session_login", post(session_login))
        .fallback(fallback)
        .with_state(Arc::clone(&log));
    (listen(app).await, log)
}

/// Start a backend whose `/chat` sends one chunk every `gap`, `count` times,
/// and then either ends or stalls forever.
async fn serve_paced(count: usize, gap: Duration, stall: bool) -> String {
    let app = Router::new().route(
        "/chat",
        post(move |_multipart: Multipart| async move {
            let chunks = stream::iter(0..count).then(move |i| async move {
                tokio::time::sleep(gap).await;
                event(&format!(r#"{{"chunk":"{i}"}}"#))
            });
            let body = if stall {
                Body::from_stream(chunks.chain(stream::pending()))
            } else {
                Body::from_stream(chunks)
            };
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body)
        }),
    );
    listen(app).await
}

fn requests(log: &Log, path: &str) -> Vec<Seen> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|request| request.path == path)
        .cloned()
        .collect()
}

#[derive(Default)]
struct Transcript {
    text: String,
    errors: Vec<String>,
    finished: Vec<String>,
}

impl Renderer for Transcript {
    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, _info: &str) {}

    fn finish_response(&mut self, message: &RenderedMessage) {
        self.finished.push(message.text.clone());
    }

    fn print_message(&mut self, _index: usize, _message: &RenderedMessage) {}
}

/// An `ActiveChatStore` whose contents the test can still read.
#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<MemoryStore>>);

impl ActiveChatStore for SharedStore {
    fn load(&self) -> luna::Result<Option<String>> {
        self.0.lock().unwrap().load()
    }

    fn save(&mut self, chat_id: &str) -> luna::Result<()> {
        self.0.lock().unwrap().save(chat_id)
    }

    fn clear(&mut self) -> luna::Result<()> {
        self.0.lock().unwrap().clear()
    }
}

#[tokio::test]
async fn chat_request_is_multipart_and_streams_records() {
    let (base_url, seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();

    let stream = client.chat(ChatRequest::new("Hello")).await.unwrap();
    let records: Vec<StreamRecord> = stream.map(|record| record.unwrap()).collect().await;
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].chat_id(), Some("c42"));
    assert_eq!(records[0].user_message_id, Some(ServerId::Number(7)));
    assert!(records[4].is_new_chat);

    let chat = &requests(&seen, "/chat")[0];
    assert_eq!(chat.field("message").unwrap().text(), "Hello");
    assert!(chat.field("chat_id").is_none());
    assert!(chat.field("file").is_none());
}

#[tokio::test]
async fn session_round_trip_over_http() {
    let (base_url, seen) = serve().await;
    let backend: Arc<dyn Backend> = Arc::new(LunaClient::new(&base_url).unwrap());
    let store = SharedStore::default();
    let mut session = ChatSession::new(backend, Box::new(store.clone()));
    let mut transcript = Transcript::default();

    let outcome = session.send("Hello", None, &mut transcript).await;
    assert!(outcome.is_completed());
    assert_eq!(session.state(), ExchangeState::Settled);
    assert_eq!(session.current_chat_id(), Some("c42"));
    assert_eq!(store.load().unwrap().as_deref(), Some("c42"));
    assert_eq!(transcript.text, "Hello, friend");
    assert_eq!(transcript.finished, vec!["Hello, friend".to_string()]);

    let messages = session.view().messages();
    assert_eq!(messages[0].id, MessageId::Assigned(ServerId::Number(7)));
    assert_eq!(messages[1].rendered, "Hello, friend");

    // The sidebar comes from /history, pinned first.
    let ids: Vec<&str> = session
        .history()
        .items()
        .iter()
        .map(|item| item.id.as_str())
        .collect();
    assert_eq!(ids, vec!["c42", "c1"]);
    assert!(session.history().item("c42").unwrap().active);

    let update = session.next_title_update().await.unwrap();
    assert_eq!(update.title, "Greeting");
    assert_eq!(requests(&seen, "/generate_title").len(), 1);
    assert!(
        requests(&seen, "/generate_title")[0]
            .body
            .contains("\"chat_id\":\"c42\"")
    );

    // Edit the first message; the server id is echoed back as a number.
    let target = MessageId::Assigned(ServerId::Number(7));
    let outcome = session.edit(&target, "Hi again", &mut transcript).await;
    assert!(outcome.is_completed());
    let edit = &requests(&seen, "/edit")[0];
    assert!(edit.body.contains("\"message_id\":7"));
    assert!(edit.body.contains("\"new_text\":\"Hi again\""));
    let messages = session.view().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "Edited reply");
}

#[tokio::test]
async fn loading_a_chat_and_unknown_chat() {
    let (base_url, _seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();

    let messages = client.get_chat("c42").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), "Hello, friend");

    let messages = client.get_chat("gone").await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn edit_of_unknown_message_is_not_found() {
    let (base_url, _seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();
    let request = EditRequest {
        chat_id: "c42".to_string(),
        message_id: ServerId::Text("missing".to_string()),
        new_text: "x".to_string(),
    };
    let err = match client.edit(request).await {
        Ok(_) => panic!("edit should fail"),
        Err(err) => err,
    };
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Message not found");
}

#[tokio::test]
async fn settings_are_normalized_and_saved() {
    let (base_url, seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();

    let settings = client.get_settings().await.unwrap();
    assert_eq!(settings.personality, "Default");
    assert_eq!(settings.nickname, "Sam");

    let status = client
        .save_settings(&Settings {
            nickname: "Sammy".to_string(),
            ..settings
        })
        .await
        .unwrap();
    assert!(status.is_success());
    assert!(
        requests(&seen, "/save_settings")[0]
            .body
            .contains("\"nickname\":\"Sammy\"")
    );
}

#[tokio::test]
async fn translate_voice_returns_audio() {
    let (base_url, seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();

    let audio = client
        .translate_voice(Bytes::from_static(b"RIFFfakeWAVE"), "es")
        .await
        .unwrap();
    assert_eq!(audio.content_type, "audio/mpeg");
    assert_eq!(audio.extension(), "mp3");
    assert_eq!(&audio.bytes[..], b"ID3translated");

    let upload = &requests(&seen, "/translate_voice")[0];
    let audio_data = upload.field("audio_data").unwrap();
    assert_eq!(audio_data.filename.as_deref(), Some("recording.wav"));
    assert_eq!(audio_data.content_type.as_deref(), Some("audio/wav"));
    assert_eq!(&audio_data.data[..], b"RIFFfakeWAVE");
    assert_eq!(upload.field("language").unwrap().text(), "es");
}

#[tokio::test]
async fn error_statuses_map_to_variants() {
    let (base_url, _seen) = serve().await;
    let client = LunaClient::new(&base_url).unwrap();

    let err = client.session_login("bad-token").await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.message(), "Invalid token");

    client.rename_chat("c42", "x").await.unwrap();
    client.delete_chat("c1").await.unwrap();

    // Unrouted paths answer 500 with a body that is not JSON.
    let err = client.pin_chat("c42", true).await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.message(), "Server error: 500");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = LunaClient::new(&format!("http://{addr}")).unwrap();
    let err = client.history().await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn long_streams_outlast_the_request_timeout() {
    let base_url = serve_paced(6, Duration::from_millis(400), false).await;
    let client = LunaClient::with_options(&base_url, Some(Duration::from_secs(1))).unwrap();

    let stream = client.chat(ChatRequest::new("Hello")).await.unwrap();
    let records: Vec<StreamRecord> = stream.map(|record| record.unwrap()).collect().await;
    let text: String = records.iter().filter_map(StreamRecord::text).collect();
    assert_eq!(text, "012345");
}

#[tokio::test]
async fn stalled_stream_ends_with_a_timeout() {
    let base_url = serve_paced(1, Duration::ZERO, true).await;
    let client = LunaClient::with_options(&base_url, Some(Duration::from_millis(300))).unwrap();

    let stream = client.chat(ChatRequest::new("Hello")).await.unwrap();
    let records: Vec<_> = stream.collect().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].as_ref().unwrap().text(), Some("0"));
    assert!(records[1].as_ref().unwrap_err().is_timeout());
}
