use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{
    ChatRequest, ChatSummary, DeleteRequest, EditRequest, PinRequest, RenameRequest, SaveStatus,
    SessionLoginRequest, Settings, StoredMessage, StreamRecord, TitleRequest, TitleResponse,
    TranslatedAudio,
};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";
/// Request timeout used when none is configured.
///
/// Plain requests must finish within it.  Streamed replies must produce
/// their headers within it, and then may run for as long as records keep
/// arriving less than this far apart.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Lower bound on the timeout for `/translate_voice`, which transcribes,
/// translates, and synthesizes in one request.
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(120);

/// A stream of decoded records from `/chat` or `/edit`.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<StreamRecord>> + Send>>;

/// The HTTP surface of the LUNA backend.
///
/// [`LunaClient`] is the production implementation.  The UI components only
/// depend on this trait so they can be driven by a scripted backend in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange an identity token for a session cookie.
    async fn session_login(&self, id_token: &str) -> Result<()>;
    /// Start a new exchange.
    async fn chat(&self, request: ChatRequest) -> Result<RecordStream>;
    /// Replace a user message and regenerate the reply.
    async fn edit(&self, request: EditRequest) -> Result<RecordStream>;
    /// List conversations, pinned first, most recent first.
    async fn history(&self) -> Result<Vec<ChatSummary>>;
    /// Fetch the messages of a conversation.
    async fn get_chat(&self, chat_id: &str) -> Result<Vec<StoredMessage>>;
    /// Ask the backend to title a conversation.
    async fn generate_title(&self, chat_id: &str) -> Result<TitleResponse>;
    async fn rename_chat(&self, chat_id: &str, new_title: &str) -> Result<()>;
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;
    async fn pin_chat(&self, chat_id: &str, pin_status: bool) -> Result<()>;
    async fn get_settings(&self) -> Result<Settings>;
    async fn save_settings(&self, settings: &Settings) -> Result<SaveStatus>;
    /// Upload recorded audio and return the translated speech.
    async fn translate_voice(&self, audio: Bytes, language: &str) -> Result<TranslatedAudio>;
}

/// Client for the LUNA backend.
///
/// The session cookie set by `/session_login` is kept in the client's cookie
/// store and sent with every subsequent request.
#[derive(Debug, Clone)]
pub struct LunaClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl LunaClient {
    /// Create a new client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The backend's base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout, also the idle limit between streamed records.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(endpoint, "sending request");
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(endpoint, error = %e, "request failed");
                return Err(if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else {
                    Error::from(e)
                });
            }
        };

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(endpoint, error = %err, "backend returned an error");
            return Err(err);
        }
        Ok(response)
    }

    /// Process error responses and convert to our Error type.
    ///
    /// The backend reports failures as `{"error": "..."}`; when the body
    /// carries no such field the message is `Server error: <status>`.
    async fn process_error_response(response: Response) -> Error {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let status_code = response.status().as_u16();
        let error_message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorResponse>(&body).ok())
            .and_then(|body| body.error)
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| format!("Server error: {status_code}"));

        match status_code {
            400 => Error::bad_request(error_message, None),
            401 => Error::authentication(error_message),
            404 => Error::not_found(error_message, None),
            408 => Error::timeout(error_message, None),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message),
            _ => Error::api(status_code, error_message),
        }
    }

    /// Send a request whose reply is streamed.
    ///
    /// No total deadline applies; the headers must arrive within the timeout.
    async fn execute_streaming(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<RecordStream> {
        let response = tokio::time::timeout(self.timeout, self.execute(endpoint, request))
            .await
            .map_err(|_| {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(endpoint, "no response headers before the timeout");
                Error::timeout(
                    format!("No response from {endpoint} within {:?}", self.timeout),
                    Some(self.timeout.as_secs_f64()),
                )
            })??;
        Ok(self.stream_records(response))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = self.execute(path, request).await?;
        response.json::<T>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    async fn post_json<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.endpoint(path)?;
        let request = self.client.post(url).timeout(self.timeout).json(body);
        self.execute(path, request).await
    }

    /// Decode a streamed reply, ending it with a timeout error if the
    /// backend goes quiet for longer than the timeout.
    fn stream_records(&self, response: Response) -> RecordStream {
        let idle = self.timeout;
        let records: RecordStream = Box::pin(process_sse(response.bytes_stream()));
        Box::pin(stream::unfold(Some(records), move |records| async move {
            let mut records = records?;
            match tokio::time::timeout(idle, records.next()).await {
                Ok(Some(record)) => Some((record, Some(records))),
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!(?idle, "stream went idle");
                    let err = Error::timeout(
                        format!("No data from stream within {idle:?}"),
                        Some(idle.as_secs_f64()),
                    );
                    Some((Err(err), None))
                }
            }
        }))
    }
}

#[async_trait]
impl Backend for LunaClient {
    async fn session_login(&self, id_token: &str) -> Result<()> {
        let body = SessionLoginRequest {
            id_token: id_token.to_string(),
        };
        self.post_json("session_login", &body).await?;
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<RecordStream> {
        let url = self.endpoint("chat")?;
        let form = request.into_form()?;
        let request = self
            .client
            .post(url)
            .header(header::ACCEPT, HeaderValue::from_static("text/event-stream"))
            .multipart(form);
        self.execute_streaming("chat", request).await
    }

    async fn edit(&self, request: EditRequest) -> Result<RecordStream> {
        let url = self.endpoint("edit")?;
        let request = self
            .client
            .post(url)
            .header(header::ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&request);
        self.execute_streaming("edit", request).await
    }

    async fn history(&self) -> Result<Vec<ChatSummary>> {
        self.get_json("history").await
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let mut url = self.endpoint("get_chat/")?;
        url.path_segments_mut()
            .map_err(|_| Error::url("base URL cannot carry a path", None))?
            .pop_if_empty()
            .push(chat_id);
        let request = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        let response = self.execute("get_chat", request).await?;
        // An unknown conversation comes back as `null`.
        let messages = response
            .json::<Option<Vec<StoredMessage>>>()
            .await
            .map_err(|e| {
                Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
            })?;
        Ok(messages.unwrap_or_default())
    }

    async fn generate_title(&self, chat_id: &str) -> Result<TitleResponse> {
        let body = TitleRequest {
            chat_id: chat_id.to_string(),
        };
        let response = self.post_json("generate_title", &body).await?;
        response.json::<TitleResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    async fn rename_chat(&self, chat_id: &str, new_title: &str) -> Result<()> {
        let body = RenameRequest {
            chat_id: chat_id.to_string(),
            new_title: new_title.to_string(),
        };
        self.post_json("rename_chat", &body).await?;
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let body = DeleteRequest {
            chat_id: chat_id.to_string(),
        };
        self.post_json("delete_chat", &body).await?;
        Ok(())
    }

    async fn pin_chat(&self, chat_id: &str, pin_status: bool) -> Result<()> {
        let body = PinRequest {
            chat_id: chat_id.to_string(),
            pin_status,
        };
        self.post_json("pin_chat", &body).await?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings> {
        let settings: Settings = self.get_json("get_settings").await?;
        Ok(settings.normalized())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<SaveStatus> {
        let response = self.post_json("save_settings", settings).await?;
        response.json::<SaveStatus>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    async fn translate_voice(&self, audio: Bytes, language: &str) -> Result<TranslatedAudio> {
        let url = self.endpoint("translate_voice")?;
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("audio_data", part)
            .text("language", language.to_string());
        let request = self
            .client
            .post(url)
            .timeout(self.timeout.max(TRANSLATE_TIMEOUT))
            .multipart(form);
        let response = self.execute("translate_voice", request).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?;
        Ok(TranslatedAudio::new(bytes, content_type))
    }
}
