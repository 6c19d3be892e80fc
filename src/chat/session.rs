//! Core chat session management.
//!
//! [`ChatSession`] owns the identity of the active conversation and the view
//! of its messages.  Each exchange with the backend walks
//! `Idle → Sending → Streaming → Settled`; the session is `&mut` for the whole
//! exchange, so a second send cannot start while one is in flight.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::client::{Backend, RecordStream};
use crate::error::{Error, Result};
use crate::history::{Confirm, HistoryAction, HistoryCommand, HistoryPanel, HistoryTarget, RenameKey};
use crate::markdown::{MarkdownFormatter, Passthrough, with_cursor};
use crate::observability::{EXCHANGE_DURATION, EXCHANGE_FAILURES, EXCHANGES};
use crate::render::Renderer;
use crate::store::ActiveChatStore;
use crate::types::{Attachment, ChatRequest, EditRequest, MessageId, Role, StoredMessage};
use crate::view::{ChatView, FileView, RenderedMessage, Sender, affordances_for, random_prompt};

use super::compose::{ComposeAction, ComposeKey, ComposeState};

/// Bubble shown when a send fails before or during streaming.
pub const SEND_FAILED: &str = "Sorry, an error occurred.";
/// Bubble shown when an edit fails before or during streaming.
pub const EDIT_FAILED: &str = "Sorry, an error occurred during edit.";

/// Where the current exchange is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    Streaming,
    Settled,
}

/// How an exchange ended.
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// Nothing was sent.
    Ignored,
    /// The reply streamed to completion.
    Completed,
    /// The stream carried an error record; its message was rendered inline.
    ServerError(String),
    /// The request or the stream failed; a generic bubble was rendered.
    Failed(Error),
}

/// Outcome of [`ChatSession::send`].
pub type SendOutcome = ExchangeOutcome;

impl ExchangeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed)
    }
}

/// A generated title for a conversation, delivered by the background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleUpdate {
    pub chat_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeKind {
    /// A new user message, sitting at `pending` in the view until the server
    /// assigns its id.
    Send { pending: usize },
    Edit,
}

impl ExchangeKind {
    fn failure_text(self) -> &'static str {
        match self {
            ExchangeKind::Send { .. } => SEND_FAILED,
            ExchangeKind::Edit => EDIT_FAILED,
        }
    }
}

/// A chat session that manages the active conversation and its view.
pub struct ChatSession {
    backend: Arc<dyn Backend>,
    store: Box<dyn ActiveChatStore>,
    formatter: Box<dyn MarkdownFormatter>,
    current_chat_id: Option<String>,
    view: ChatView,
    history: HistoryPanel,
    compose: ComposeState,
    state: ExchangeState,
    titles_tx: mpsc::UnboundedSender<TitleUpdate>,
    titles_rx: mpsc::UnboundedReceiver<TitleUpdate>,
}

impl ChatSession {
    /// Creates a new session showing the welcome state.
    pub fn new(backend: Arc<dyn Backend>, store: Box<dyn ActiveChatStore>) -> Self {
        Self::with_formatter(backend, store, Box::new(Passthrough))
    }

    /// Creates a new session with a custom markdown formatter.
    pub fn with_formatter(
        backend: Arc<dyn Backend>,
        store: Box<dyn ActiveChatStore>,
        formatter: Box<dyn MarkdownFormatter>,
    ) -> Self {
        let (titles_tx, titles_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            store,
            formatter,
            current_chat_id: None,
            view: ChatView::welcome(random_prompt()),
            history: HistoryPanel::new(),
            compose: ComposeState::new(),
            state: ExchangeState::Idle,
            titles_tx,
            titles_rx,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    pub fn history(&self) -> &HistoryPanel {
        &self.history
    }

    pub fn compose(&self) -> &ComposeState {
        &self.compose
    }

    pub fn compose_mut(&mut self) -> &mut ComposeState {
        &mut self.compose
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Load the conversation list and reopen the conversation that was active
    /// when the session last ran.
    pub async fn resume(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        self.refresh_history().await;
        let saved = match self.store.load() {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(error = %err, "could not read active chat");
                None
            }
        };
        match saved {
            Some(chat_id) => self.load_chat(&chat_id, renderer).await,
            None => Ok(()),
        }
    }

    /// Handle a key in the compose area, sending on a plain Enter.
    pub async fn compose_key(
        &mut self,
        key: ComposeKey,
        shift: bool,
        renderer: &mut dyn Renderer,
    ) -> Option<SendOutcome> {
        match self.compose.key(key, shift) {
            ComposeAction::Submit => Some(self.submit(renderer).await),
            ComposeAction::Edited => None,
        }
    }

    /// Send whatever is in the compose area.
    pub async fn submit(&mut self, renderer: &mut dyn Renderer) -> SendOutcome {
        if self.compose.is_blank() {
            return ExchangeOutcome::Ignored;
        }
        let (text, attachment) = self.compose.take();
        self.send(&text, attachment, renderer).await
    }

    /// Send a user message and stream the reply.
    ///
    /// The text is trimmed.  With neither text nor attachment nothing is sent.
    pub async fn send(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
        renderer: &mut dyn Renderer,
    ) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return ExchangeOutcome::Ignored;
        }

        self.state = ExchangeState::Sending;
        let file = attachment.as_ref().map(|attachment| FileView {
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            image: attachment.data_url(),
        });
        let pending = self.view.push(
            RenderedMessage::new(MessageId::TempUser, Sender::User, text, text).with_file(file),
        );

        let request = ChatRequest {
            message: text.to_string(),
            chat_id: self.current_chat_id.clone(),
            file: attachment,
        };
        tracing::debug!(chat_id = ?request.chat_id, "sending message");
        let stream = self.backend.chat(request).await;
        self.run_exchange(ExchangeKind::Send { pending }, stream, renderer).await
    }

    /// Replace the text of a user message and regenerate everything after it.
    ///
    /// Ignored if the trimmed text is empty, no conversation is active, or the
    /// message has no server id.
    pub async fn edit(
        &mut self,
        message_id: &MessageId,
        new_text: &str,
        renderer: &mut dyn Renderer,
    ) -> ExchangeOutcome {
        let new_text = new_text.trim();
        let Some(chat_id) = self.current_chat_id.clone() else {
            return ExchangeOutcome::Ignored;
        };
        let Some(server_id) = message_id.server_id().cloned() else {
            return ExchangeOutcome::Ignored;
        };
        if new_text.is_empty() {
            return ExchangeOutcome::Ignored;
        }
        let Some(index) = self.view.find(message_id) else {
            return ExchangeOutcome::Ignored;
        };
        if self
            .view
            .get(index)
            .is_none_or(|message| message.sender != Sender::User)
        {
            return ExchangeOutcome::Ignored;
        }

        self.state = ExchangeState::Sending;
        self.view.truncate_after(index);
        if let Some(message) = self.view.get_mut(index) {
            message.text = new_text.to_string();
            message.rendered = new_text.to_string();
        }

        let request = EditRequest {
            chat_id,
            message_id: server_id,
            new_text: new_text.to_string(),
        };
        tracing::debug!(chat_id = %request.chat_id, message_id = %request.message_id, "editing message");
        let stream = self.backend.edit(request).await;
        self.run_exchange(ExchangeKind::Edit, stream, renderer).await
    }

    async fn run_exchange(
        &mut self,
        kind: ExchangeKind,
        stream: Result<RecordStream>,
        renderer: &mut dyn Renderer,
    ) -> ExchangeOutcome {
        EXCHANGES.click();
        let start = Instant::now();
        let outcome = match stream {
            Ok(stream) => self.stream_reply(kind, stream, renderer).await,
            Err(err) => self.fail(kind, err, None, renderer),
        };
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());
        outcome
    }

    async fn stream_reply(
        &mut self,
        kind: ExchangeKind,
        mut stream: RecordStream,
        renderer: &mut dyn Renderer,
    ) -> ExchangeOutcome {
        self.state = ExchangeState::Streaming;
        let mut buffer = String::new();
        let mut reply: Option<usize> = None;
        let mut pending = match kind {
            ExchangeKind::Send { pending } => Some(pending),
            ExchangeKind::Edit => None,
        };

        while let Some(record) = stream.next().await {
            let record = match record {
                Ok(record) => record,
                Err(err) => return self.fail(kind, err, reply.map(|i| (i, buffer)), renderer),
            };

            if let Some(message) = record.error_message() {
                EXCHANGE_FAILURES.click();
                tracing::warn!(error = message, "server reported an error mid-stream");
                if let Some(index) = reply {
                    self.settle_partial(index, &buffer);
                }
                let text = format!("Error: {message}");
                renderer.print_error(&text);
                self.view.push(RenderedMessage::new(
                    MessageId::Error,
                    Sender::Assistant,
                    text.clone(),
                    self.formatter.format(&text),
                ));
                self.state = ExchangeState::Idle;
                return ExchangeOutcome::ServerError(message.to_string());
            }

            if let Some(chat_id) = record.chat_id() {
                self.set_current_chat(chat_id);
                if let Some(user_message_id) = &record.user_message_id
                    && let Some(index) = pending.take()
                {
                    self.view
                        .assign_id(index, MessageId::Assigned(user_message_id.clone()));
                }
            }

            if let Some(chunk) = record.text() {
                buffer.push_str(chunk);
                let rendered = with_cursor(self.formatter.as_ref(), &buffer);
                match reply.and_then(|index| self.view.get_mut(index)) {
                    Some(message) => {
                        message.text.clone_from(&buffer);
                        message.rendered = rendered;
                    }
                    None => {
                        renderer.start_response();
                        let mut message = RenderedMessage::new(
                            MessageId::TempAssistant,
                            Sender::Assistant,
                            buffer.clone(),
                            rendered,
                        );
                        message.streaming = true;
                        reply = Some(self.view.push(message));
                    }
                }
                renderer.print_text(chunk);
            }

            if record.is_new_chat {
                self.refresh_history().await;
                if let Some(chat_id) = self.current_chat_id.clone() {
                    self.history.set_active(Some(&chat_id));
                    self.spawn_title_generation(chat_id);
                }
            }
        }

        if let Some(index) = reply {
            if let Some(message) = self.view.get_mut(index) {
                message.rendered = self.formatter.format(&buffer);
                message.streaming = false;
                message.affordances = affordances_for(&buffer);
            }
            self.view.mark_latest(index);
            if let Some(message) = self.view.get(index) {
                renderer.finish_response(message);
            }
            self.refresh_history().await;
        }
        self.state = ExchangeState::Settled;
        ExchangeOutcome::Completed
    }

    /// Drop the cursor from a reply that stopped early.
    fn settle_partial(&mut self, index: usize, buffer: &str) {
        if let Some(message) = self.view.get_mut(index) {
            message.rendered = self.formatter.format(buffer);
            message.streaming = false;
        }
    }

    fn fail(
        &mut self,
        kind: ExchangeKind,
        err: Error,
        partial: Option<(usize, String)>,
        renderer: &mut dyn Renderer,
    ) -> ExchangeOutcome {
        EXCHANGE_FAILURES.click();
        tracing::warn!(error = %err, ?kind, "exchange failed");
        if let Some((index, buffer)) = partial {
            self.settle_partial(index, &buffer);
        }
        let text = kind.failure_text();
        renderer.print_error(text);
        self.view.push(RenderedMessage::new(
            MessageId::Error,
            Sender::Assistant,
            text,
            self.formatter.format(text),
        ));
        self.state = ExchangeState::Idle;
        ExchangeOutcome::Failed(err)
    }

    fn set_current_chat(&mut self, chat_id: &str) {
        if self.current_chat_id.as_deref() != Some(chat_id) {
            self.current_chat_id = Some(chat_id.to_string());
        }
        if let Err(err) = self.store.save(chat_id) {
            tracing::warn!(error = %err, "could not persist active chat");
        }
    }

    /// Show a stored conversation.
    ///
    /// Does nothing if that conversation is already on screen.  An empty
    /// conversation shows the welcome state but stays active.
    pub async fn load_chat(&mut self, chat_id: &str, renderer: &mut dyn Renderer) -> Result<()> {
        if chat_id.is_empty() {
            return Ok(());
        }
        if self.current_chat_id.as_deref() == Some(chat_id) && !self.view.is_empty() {
            return Ok(());
        }
        self.set_current_chat(chat_id);

        let messages = match self.backend.get_chat(chat_id).await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(chat_id, error = %err, "could not load chat");
                return Err(err);
            }
        };
        self.view.clear();
        if messages.is_empty() {
            self.view.show_welcome(random_prompt());
        } else {
            for message in &messages {
                let rendered = self.rendered_from_store(message);
                self.view.push(rendered);
            }
            if let Some(index) = self.view.last_assistant() {
                self.view.mark_latest(index);
            }
            for (index, message) in self.view.messages().iter().enumerate() {
                renderer.print_message(index, message);
            }
        }
        self.history.set_active(Some(chat_id));
        self.state = ExchangeState::Idle;
        Ok(())
    }

    fn rendered_from_store(&self, message: &StoredMessage) -> RenderedMessage {
        let text = message.text();
        let id = match &message.id {
            Some(id) => MessageId::Assigned(id.clone()),
            None => MessageId::Error,
        };
        let file = message.file.as_ref().map(|file| FileView {
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
            image: if file.is_image() {
                message.image.clone()
            } else {
                None
            },
        });
        let mut rendered = match message.role {
            Role::User => RenderedMessage::new(id, Sender::User, text, text),
            Role::Assistant => {
                let mut rendered =
                    RenderedMessage::new(id, Sender::Assistant, text, self.formatter.format(text));
                rendered.affordances = affordances_for(text);
                rendered
            }
        };
        rendered.file = file;
        rendered
    }

    /// Forget the active conversation and show the welcome state.
    pub fn start_new_chat(&mut self) {
        self.current_chat_id = None;
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "could not clear active chat");
        }
        self.view.show_welcome(random_prompt());
        self.history.set_active(None);
        self.compose = ComposeState::new();
        self.state = ExchangeState::Idle;
    }

    /// Reload the conversation list.  Failures are logged and the old list
    /// stays.
    pub async fn refresh_history(&mut self) {
        let active = self.current_chat_id.clone();
        if let Err(err) = self
            .history
            .refresh(self.backend.as_ref(), active.as_deref())
            .await
        {
            tracing::warn!(error = %err, "could not load chat history");
        }
    }

    /// Ask the backend for a title in the background.  The result arrives
    /// through [`ChatSession::apply_title_updates`].
    pub fn spawn_title_generation(&self, chat_id: String) {
        let backend = Arc::clone(&self.backend);
        let titles = self.titles_tx.clone();
        tokio::spawn(async move {
            match backend.generate_title(&chat_id).await {
                Ok(response) => {
                    if let Some(title) = response.generated_title() {
                        let _ = titles.send(TitleUpdate {
                            chat_id,
                            title: title.to_string(),
                        });
                    }
                }
                Err(err) => {
                    tracing::debug!(chat_id, error = %err, "title generation failed");
                }
            }
        });
    }

    /// Apply every title that has arrived.  Returns how many were applied.
    pub fn apply_title_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.titles_rx.try_recv() {
            if self.history.set_title(&update.chat_id, &update.title) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next title and apply it.
    pub async fn next_title_update(&mut self) -> Option<TitleUpdate> {
        let update = self.titles_rx.recv().await?;
        self.history.set_title(&update.chat_id, &update.title);
        Some(update)
    }

    /// Resolve a click on the conversation list and carry it out.
    ///
    /// Rename only opens the inline editor; finish it with
    /// [`ChatSession::rename_key`].
    pub async fn history_click(
        &mut self,
        hits: &[HistoryTarget],
        confirm: &mut dyn Confirm,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<HistoryCommand>> {
        let Some(command) = self.history.click(hits) else {
            return Ok(None);
        };
        match &command {
            HistoryCommand::Navigate(chat_id) => self.load_chat(chat_id, renderer).await?,
            HistoryCommand::Action(chat_id, HistoryAction::Pin) => self.toggle_pin(chat_id).await?,
            HistoryCommand::Action(chat_id, HistoryAction::Rename) => {
                self.history.begin_rename(chat_id);
            }
            HistoryCommand::Action(chat_id, HistoryAction::Delete) => {
                self.delete_chat(chat_id, confirm).await?;
            }
        }
        Ok(Some(command))
    }

    /// Open the inline rename editor with `title` typed in.
    pub fn begin_rename(&mut self, chat_id: &str, title: &str) -> bool {
        if !self.history.begin_rename(chat_id) {
            return false;
        }
        self.history.set_rename_value(title);
        true
    }

    /// Forward a key to the rename editor.
    pub async fn rename_key(&mut self, key: RenameKey) -> Result<Option<String>> {
        self.history.rename_key(self.backend.as_ref(), key).await
    }

    /// Delete a conversation after confirmation.  Deleting the active
    /// conversation starts a new one.
    pub async fn delete_chat(&mut self, chat_id: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        let deleted = self
            .history
            .delete(self.backend.as_ref(), chat_id, confirm)
            .await?;
        if deleted && self.current_chat_id.as_deref() == Some(chat_id) {
            self.start_new_chat();
        }
        Ok(deleted)
    }

    /// Flip a conversation's pinned flag.
    pub async fn toggle_pin(&mut self, chat_id: &str) -> Result<()> {
        let active = self.current_chat_id.clone();
        self.history
            .toggle_pin(self.backend.as_ref(), chat_id, active.as_deref())
            .await
    }
}
