//! In-memory doubles for the backend, the identity provider, and the terminal.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::client::{Backend, RecordStream};
use crate::error::{Error, Result};
use crate::identity::IdentityProvider;
use crate::render::Renderer;
use crate::types::{
    ChatRequest, ChatSummary, EditRequest, SaveStatus, Settings, StoredMessage, StreamRecord,
    TitleResponse, TranslatedAudio,
};
use crate::view::RenderedMessage;

/// A request the fake backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SessionLogin(String),
    Chat {
        message: String,
        chat_id: Option<String>,
        file: Option<String>,
    },
    Edit(EditRequest),
    History,
    GetChat(String),
    GenerateTitle(String),
    Rename { chat_id: String, new_title: String },
    Delete(String),
    Pin { chat_id: String, pin_status: bool },
    GetSettings,
    SaveSettings(Settings),
    Translate { audio: Vec<u8>, language: String },
}

struct FakeState {
    calls: Vec<Call>,
    chats: Vec<ChatSummary>,
    messages: HashMap<String, Vec<StoredMessage>>,
    titles: HashMap<String, String>,
    streams: VecDeque<Vec<Result<StreamRecord>>>,
    settings: Settings,
    save_status: SaveStatus,
    fail_next: Option<Error>,
    fail_session_login: Option<Error>,
    session_tokens: Vec<String>,
}

/// A scripted backend.  Every method records a [`Call`] first.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                chats: Vec::new(),
                messages: HashMap::new(),
                titles: HashMap::new(),
                streams: VecDeque::new(),
                settings: Settings::default(),
                save_status: SaveStatus {
                    status: Some("success".to_string()),
                },
                fail_next: None,
                fail_session_login: None,
                session_tokens: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Record `call` and fail it if a failure is queued.
    fn enter(&self, call: Call) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    pub fn add_chat(&self, summary: ChatSummary, messages: Vec<StoredMessage>) {
        let mut state = self.lock();
        state.messages.insert(summary.id.clone(), messages);
        state.chats.push(summary);
    }

    /// Queue the records returned by the next `chat` or `edit`.
    pub fn push_stream(&self, records: Vec<Result<StreamRecord>>) {
        self.lock().streams.push_back(records);
    }

    /// Title returned by `generate_title` for `chat_id`.
    pub fn set_title(&self, chat_id: &str, title: &str) {
        self.lock()
            .titles
            .insert(chat_id.to_string(), title.to_string());
    }

    pub fn set_settings(&self, settings: Settings) {
        self.lock().settings = settings;
    }

    pub fn set_save_status(&self, status: SaveStatus) {
        self.lock().save_status = status;
    }

    /// Fail the next call, whatever endpoint it hits.
    pub fn fail_next(&self, err: Error) {
        self.lock().fail_next = Some(err);
    }

    pub fn fail_session_login(&self, err: Error) {
        self.lock().fail_session_login = Some(err);
    }

    pub fn session_tokens(&self) -> Vec<String> {
        self.lock().session_tokens.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn next_stream(state: &mut FakeState) -> RecordStream {
        let records = state.streams.pop_front().unwrap_or_default();
        for record in records.iter().flatten() {
            if let Some(chat_id) = record.chat_id()
                && !state.chats.iter().any(|chat| chat.id == chat_id)
            {
                state.chats.push(ChatSummary::new(chat_id, "New Chat", false));
            }
        }
        Box::pin(stream::iter(records))
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn session_login(&self, id_token: &str) -> Result<()> {
        let mut state = self.enter(Call::SessionLogin(id_token.to_string()))?;
        if let Some(err) = state.fail_session_login.take() {
            return Err(err);
        }
        state.session_tokens.push(id_token.to_string());
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<RecordStream> {
        let mut state = self.enter(Call::Chat {
            message: request.message,
            chat_id: request.chat_id,
            file: request.file.map(|file| file.filename),
        })?;
        Ok(Self::next_stream(&mut state))
    }

    async fn edit(&self, request: EditRequest) -> Result<RecordStream> {
        let mut state = self.enter(Call::Edit(request))?;
        Ok(Self::next_stream(&mut state))
    }

    async fn history(&self) -> Result<Vec<ChatSummary>> {
        let state = self.enter(Call::History)?;
        let mut chats = state.chats.clone();
        chats.sort_by(|a, b| {
            (b.pinned, b.last_updated).cmp(&(a.pinned, a.last_updated))
        });
        Ok(chats)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let state = self.enter(Call::GetChat(chat_id.to_string()))?;
        Ok(state.messages.get(chat_id).cloned().unwrap_or_default())
    }

    async fn generate_title(&self, chat_id: &str) -> Result<TitleResponse> {
        let state = self.enter(Call::GenerateTitle(chat_id.to_string()))?;
        Ok(match state.titles.get(chat_id) {
            Some(title) => TitleResponse {
                success: true,
                title: Some(title.clone()),
            },
            None => TitleResponse::default(),
        })
    }

    async fn rename_chat(&self, chat_id: &str, new_title: &str) -> Result<()> {
        let mut state = self.enter(Call::Rename {
            chat_id: chat_id.to_string(),
            new_title: new_title.to_string(),
        })?;
        if let Some(chat) = state.chats.iter_mut().find(|chat| chat.id == chat_id) {
            chat.title = new_title.to_string();
        }
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let mut state = self.enter(Call::Delete(chat_id.to_string()))?;
        state.chats.retain(|chat| chat.id != chat_id);
        state.messages.remove(chat_id);
        Ok(())
    }

    async fn pin_chat(&self, chat_id: &str, pin_status: bool) -> Result<()> {
        let mut state = self.enter(Call::Pin {
            chat_id: chat_id.to_string(),
            pin_status,
        })?;
        if let Some(chat) = state.chats.iter_mut().find(|chat| chat.id == chat_id) {
            chat.pinned = pin_status;
        }
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings> {
        let state = self.enter(Call::GetSettings)?;
        Ok(state.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<SaveStatus> {
        let mut state = self.enter(Call::SaveSettings(settings.clone()))?;
        if state.save_status.is_success() {
            state.settings = settings.clone();
        }
        Ok(state.save_status.clone())
    }

    async fn translate_voice(&self, audio: Bytes, language: &str) -> Result<TranslatedAudio> {
        let _state = self.enter(Call::Translate {
            audio: audio.to_vec(),
            language: language.to_string(),
        })?;
        Ok(TranslatedAudio::new(
            Bytes::from_static(b"ID3fake"),
            "audio/mpeg",
        ))
    }
}

/// An identity provider that either always accepts or always rejects.
pub struct FakeIdentity {
    outcome: std::result::Result<String, String>,
}

impl FakeIdentity {
    pub fn accepting(token: &str) -> Self {
        Self {
            outcome: Ok(token.to_string()),
        }
    }

    pub fn rejecting(code: &str) -> Self {
        Self {
            outcome: Err(code.to_string()),
        }
    }

    fn answer(&self) -> Result<String> {
        match &self.outcome {
            Ok(token) => Ok(token.clone()),
            Err(code) => Err(Error::identity_provider(code.clone(), "rejected")),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<String> {
        self.answer()
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<String> {
        self.answer()
    }
}

/// A renderer that remembers what it was asked to draw.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub chunks: Vec<String>,
    pub errors: Vec<String>,
    pub infos: Vec<String>,
    pub started: usize,
    pub finished: usize,
    pub printed: usize,
}

impl RecordingRenderer {
    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

impl Renderer for RecordingRenderer {
    fn start_response(&mut self) {
        self.started += 1;
    }

    fn print_text(&mut self, text: &str) {
        self.chunks.push(text.to_string());
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn finish_response(&mut self, _message: &RenderedMessage) {
        self.finished += 1;
    }

    fn print_message(&mut self, _index: usize, _message: &RenderedMessage) {
        self.printed += 1;
    }
}
