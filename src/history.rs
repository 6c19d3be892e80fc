//! The conversation list in the sidebar.
//!
//! The list is always rebuilt from `GET /history`; local edits (rename, delete,
//! background titles) patch the rows in place until the next rebuild.

use crate::client::Backend;
use crate::error::Result;
use crate::types::ChatSummary;

/// Prompt shown before deleting a conversation.
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this chat?";

/// A row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub id: String,
    pub title: String,
    pub pinned: bool,
    pub active: bool,
    /// Last modification time as RFC 3339, when the server sent one.
    pub last_updated: Option<String>,
}

/// A row control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Pin,
    Rename,
    Delete,
}

/// Something under the pointer when the list is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryTarget {
    /// The row body.
    Row(String),
    /// One of the row's controls.
    Action(String, HistoryAction),
}

/// What a click on the list resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    Navigate(String),
    Action(String, HistoryAction),
}

/// Keys understood by the inline rename editor.  `Blur` is focus leaving the
/// editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKey {
    Enter,
    Escape,
    Blur,
}

/// The inline rename editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEditor {
    pub chat_id: String,
    pub original: String,
    pub value: String,
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryPanel {
    items: Vec<HistoryItem>,
    editor: Option<RenameEditor>,
}

impl HistoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn item(&self, chat_id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == chat_id)
    }

    pub fn active(&self) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.active)
    }

    pub fn editor(&self) -> Option<&RenameEditor> {
        self.editor.as_ref()
    }

    /// Fetch the list and rebuild every row.
    pub async fn refresh(&mut self, backend: &dyn Backend, active: Option<&str>) -> Result<()> {
        let summaries = backend.history().await?;
        self.rebuild(summaries, active);
        Ok(())
    }

    /// Replace every row with `summaries`, keeping server order.
    pub fn rebuild(&mut self, summaries: Vec<ChatSummary>, active: Option<&str>) {
        self.items = summaries
            .into_iter()
            .map(|summary| HistoryItem {
                active: active == Some(summary.id.as_str()),
                last_updated: summary.last_updated_rfc3339(),
                id: summary.id,
                title: summary.title,
                pinned: summary.pinned,
            })
            .collect();
        if let Some(editor) = &self.editor
            && self.item(&editor.chat_id).is_none()
        {
            self.editor = None;
        }
    }

    /// Mark the row for `chat_id` active and every other row inactive.
    pub fn set_active(&mut self, chat_id: Option<&str>) {
        for item in &mut self.items {
            item.active = chat_id == Some(item.id.as_str());
        }
    }

    /// Resolve a click.  `hits` lists everything under the pointer; a control
    /// wins over the row that contains it.
    pub fn click(&self, hits: &[HistoryTarget]) -> Option<HistoryCommand> {
        let action = hits.iter().find_map(|hit| match hit {
            HistoryTarget::Action(id, action) => Some(HistoryCommand::Action(id.clone(), *action)),
            HistoryTarget::Row(_) => None,
        });
        action.or_else(|| {
            hits.iter().find_map(|hit| match hit {
                HistoryTarget::Row(id) => Some(HistoryCommand::Navigate(id.clone())),
                HistoryTarget::Action(..) => None,
            })
        })
    }

    /// Replace a row's title.  Returns false if no row has that id.
    pub fn set_title(&mut self, chat_id: &str, title: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == chat_id) {
            Some(item) => {
                item.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Open the inline editor on a row, seeded with its current title.
    pub fn begin_rename(&mut self, chat_id: &str) -> bool {
        let Some(item) = self.item(chat_id) else {
            return false;
        };
        self.editor = Some(RenameEditor {
            chat_id: item.id.clone(),
            original: item.title.clone(),
            value: item.title.clone(),
        });
        true
    }

    /// Replace the text in the rename editor.
    pub fn set_rename_value(&mut self, value: impl Into<String>) {
        if let Some(editor) = &mut self.editor {
            editor.value = value.into();
        }
    }

    /// Handle a key in the rename editor.
    ///
    /// `Enter` and `Blur` save a trimmed, non-empty, changed title and return
    /// it.  `Escape` or an unchanged title closes the editor without a request.
    /// A failed request leaves the original title in place.
    pub async fn rename_key(
        &mut self,
        backend: &dyn Backend,
        key: RenameKey,
    ) -> Result<Option<String>> {
        let Some(editor) = self.editor.take() else {
            return Ok(None);
        };
        if key == RenameKey::Escape {
            return Ok(None);
        }
        let new_title = editor.value.trim();
        if new_title.is_empty() || new_title == editor.original {
            return Ok(None);
        }
        backend.rename_chat(&editor.chat_id, new_title).await?;
        self.set_title(&editor.chat_id, new_title);
        Ok(Some(new_title.to_string()))
    }

    /// Delete a conversation after confirmation.  Returns true if it was
    /// deleted.
    pub async fn delete(
        &mut self,
        backend: &dyn Backend,
        chat_id: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }
        backend.delete_chat(chat_id).await?;
        self.items.retain(|item| item.id != chat_id);
        if self
            .editor
            .as_ref()
            .is_some_and(|editor| editor.chat_id == chat_id)
        {
            self.editor = None;
        }
        Ok(true)
    }

    /// Flip a conversation's pinned flag and reload the list.
    pub async fn toggle_pin(
        &mut self,
        backend: &dyn Backend,
        chat_id: &str,
        active: Option<&str>,
    ) -> Result<()> {
        let pinned = self.item(chat_id).is_some_and(|item| item.pinned);
        backend.pin_chat(chat_id, !pinned).await?;
        self.refresh(backend, active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeBackend};

    fn seeded() -> FakeBackend {
        let backend = FakeBackend::new();
        backend.add_chat(ChatSummary::new("a", "Alpha", false).with_last_updated(10), vec![]);
        backend.add_chat(ChatSummary::new("b", "Beta", false).with_last_updated(20), vec![]);
        backend.add_chat(ChatSummary::new("c", "Gamma", true).with_last_updated(5), vec![]);
        backend
    }

    fn ids(panel: &HistoryPanel) -> Vec<&str> {
        panel.items().iter().map(|item| item.id.as_str()).collect()
    }

    #[tokio::test]
    async fn refresh_keeps_server_order_and_marks_active() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, Some("a")).await.unwrap();
        assert_eq!(ids(&panel), vec!["c", "b", "a"]);
        assert_eq!(panel.active().unwrap().id, "a");
        panel.set_active(None);
        assert!(panel.active().is_none());
    }

    #[test]
    fn rows_carry_modification_time() {
        let mut panel = HistoryPanel::new();
        panel.rebuild(
            vec![
                ChatSummary::new("a", "Alpha", false).with_last_updated(86_400_000),
                ChatSummary::new("b", "Beta", false),
            ],
            None,
        );
        assert_eq!(
            panel.item("a").unwrap().last_updated.as_deref(),
            Some("1970-01-02T00:00:00Z")
        );
        assert_eq!(panel.item("b").unwrap().last_updated, None);
    }

    #[test]
    fn controls_win_over_rows() {
        let panel = HistoryPanel::new();
        let hits = vec![
            HistoryTarget::Row("a".to_string()),
            HistoryTarget::Action("a".to_string(), HistoryAction::Delete),
        ];
        assert_eq!(
            panel.click(&hits),
            Some(HistoryCommand::Action("a".to_string(), HistoryAction::Delete))
        );
        assert_eq!(
            panel.click(&[HistoryTarget::Row("b".to_string())]),
            Some(HistoryCommand::Navigate("b".to_string()))
        );
        assert_eq!(panel.click(&[]), None);
    }

    #[tokio::test]
    async fn rename_saves_trimmed_changed_titles() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, None).await.unwrap();

        assert!(panel.begin_rename("a"));
        panel.set_rename_value("  Trip plans ");
        let saved = panel.rename_key(&backend, RenameKey::Enter).await.unwrap();
        assert_eq!(saved.as_deref(), Some("Trip plans"));
        assert_eq!(panel.item("a").unwrap().title, "Trip plans");
        assert!(panel.editor().is_none());
        assert!(backend.calls().contains(&Call::Rename {
            chat_id: "a".to_string(),
            new_title: "Trip plans".to_string()
        }));
    }

    #[tokio::test]
    async fn escape_and_unchanged_titles_send_nothing() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, None).await.unwrap();
        let before = backend.calls().len();

        panel.begin_rename("b");
        panel.set_rename_value("Something else");
        assert_eq!(panel.rename_key(&backend, RenameKey::Escape).await.unwrap(), None);
        assert_eq!(panel.item("b").unwrap().title, "Beta");

        panel.begin_rename("b");
        panel.set_rename_value(" Beta ");
        assert_eq!(panel.rename_key(&backend, RenameKey::Blur).await.unwrap(), None);

        panel.begin_rename("b");
        panel.set_rename_value("   ");
        assert_eq!(panel.rename_key(&backend, RenameKey::Enter).await.unwrap(), None);
        assert_eq!(backend.calls().len(), before);
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, None).await.unwrap();

        let mut refuse = |_: &str| false;
        assert!(!panel.delete(&backend, "a", &mut refuse).await.unwrap());
        assert!(panel.item("a").is_some());

        let mut prompts = Vec::new();
        let mut accept = |prompt: &str| {
            prompts.push(prompt.to_string());
            true
        };
        assert!(panel.delete(&backend, "a", &mut accept).await.unwrap());
        assert!(panel.item("a").is_none());
        assert_eq!(prompts, vec![DELETE_PROMPT.to_string()]);
        assert!(backend.calls().contains(&Call::Delete("a".to_string())));
    }

    #[tokio::test]
    async fn pinning_twice_restores_order() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, None).await.unwrap();
        let original = panel.items().to_vec();

        panel.toggle_pin(&backend, "a", None).await.unwrap();
        assert_eq!(ids(&panel), vec!["a", "c", "b"]);
        assert!(panel.item("a").unwrap().pinned);

        panel.toggle_pin(&backend, "a", None).await.unwrap();
        assert_eq!(panel.items(), original.as_slice());
    }

    #[tokio::test]
    async fn failed_rename_keeps_title() {
        let backend = seeded();
        let mut panel = HistoryPanel::new();
        panel.refresh(&backend, None).await.unwrap();
        backend.fail_next(crate::Error::connection("down", None));
        panel.begin_rename("a");
        panel.set_rename_value("New");
        assert!(panel.rename_key(&backend, RenameKey::Enter).await.is_err());
        assert_eq!(panel.item("a").unwrap().title, "Alpha");
    }
}
