//! The settings modal.
//!
//! Timed transitions (auto-close after a save, re-enabling the save control)
//! are deadlines checked by [`SettingsPanel::tick`], so the owner decides how
//! time advances.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::Backend;
use crate::error::{Error, Result};
use crate::types::Settings;

pub const STATUS_LOAD_FAILED: &str = "Could not load settings.";
pub const STATUS_SAVING: &str = "Saving...";
pub const STATUS_SAVED: &str = "Saved!";
pub const STATUS_SAVE_FAILED: &str = "Error saving.";

/// Delay between a successful save and the modal closing.
pub const CLOSE_DELAY: Duration = Duration::from_secs(1);
/// Delay between a save finishing and the save control coming back.
pub const RESET_DELAY: Duration = Duration::from_secs(2);

/// A field of the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Personality,
    CustomInstructions,
    Nickname,
    Occupation,
    Interests,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        SettingsField::Personality,
        SettingsField::CustomInstructions,
        SettingsField::Nickname,
        SettingsField::Occupation,
        SettingsField::Interests,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingsField::Personality => "personality",
            SettingsField::CustomInstructions => "custom_instructions",
            SettingsField::Nickname => "nickname",
            SettingsField::Occupation => "occupation",
            SettingsField::Interests => "interests",
        }
    }

    pub fn get(self, settings: &Settings) -> &str {
        match self {
            SettingsField::Personality => &settings.personality,
            SettingsField::CustomInstructions => &settings.custom_instructions,
            SettingsField::Nickname => &settings.nickname,
            SettingsField::Occupation => &settings.occupation,
            SettingsField::Interests => &settings.interests,
        }
    }

    fn slot(self, settings: &mut Settings) -> &mut String {
        match self {
            SettingsField::Personality => &mut settings.personality,
            SettingsField::CustomInstructions => &mut settings.custom_instructions,
            SettingsField::Nickname => &mut settings.nickname,
            SettingsField::Occupation => &mut settings.occupation,
            SettingsField::Interests => &mut settings.interests,
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingsField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SettingsField::ALL
            .into_iter()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| {
                Error::validation(
                    format!("unknown settings field '{s}'"),
                    Some("field".to_string()),
                )
            })
    }
}

#[derive(Debug, Clone)]
pub struct SettingsPanel {
    open: bool,
    form: Settings,
    save_visible: bool,
    save_enabled: bool,
    status: String,
    close_at: Option<Instant>,
    reset_at: Option<Instant>,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self {
            open: false,
            form: Settings::default(),
            save_visible: false,
            save_enabled: true,
            status: String::new(),
            close_at: None,
            reset_at: None,
        }
    }
}

impl SettingsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn form(&self) -> &Settings {
        &self.form
    }

    pub fn save_visible(&self) -> bool {
        self.save_visible
    }

    pub fn save_enabled(&self) -> bool {
        self.save_enabled
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Load the stored preferences and show the modal.  The modal opens even
    /// if loading fails.
    pub async fn open(&mut self, backend: &dyn Backend) {
        self.save_visible = false;
        match backend.get_settings().await {
            Ok(settings) => self.form = settings.normalized(),
            Err(err) => {
                tracing::warn!(error = %err, "could not load settings");
                self.status = STATUS_LOAD_FAILED.to_string();
            }
        }
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.status.clear();
    }

    /// A click on the dimmed area around the modal.
    pub fn backdrop_click(&mut self) {
        self.close();
    }

    /// Change a field; any edit reveals the save control.
    pub fn edit_field(&mut self, field: SettingsField, value: impl Into<String>) {
        *field.slot(&mut self.form) = value.into();
        self.save_visible = true;
    }

    /// Save the form.  Does nothing while the save control is disabled.
    pub async fn submit(&mut self, backend: &dyn Backend) -> Result<()> {
        if !self.save_enabled {
            return Ok(());
        }
        self.save_enabled = false;
        self.status = STATUS_SAVING.to_string();

        let result = backend.save_settings(&self.form.trimmed()).await;
        let now = Instant::now();
        self.reset_at = Some(now + RESET_DELAY);
        match result {
            Ok(status) if status.is_success() => {
                self.status = STATUS_SAVED.to_string();
                self.save_visible = false;
                self.close_at = Some(now + CLOSE_DELAY);
                Ok(())
            }
            Ok(status) => {
                self.status = STATUS_SAVE_FAILED.to_string();
                Err(Error::api(
                    200,
                    format!(
                        "unexpected save status: {}",
                        status.status.as_deref().unwrap_or("none")
                    ),
                ))
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not save settings");
                self.status = STATUS_SAVE_FAILED.to_string();
                Err(err)
            }
        }
    }

    /// The earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.close_at, self.reset_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply every transition whose deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.close_at.is_some_and(|at| at <= now) {
            self.close_at = None;
            self.close();
        }
        if self.reset_at.is_some_and(|at| at <= now) {
            self.reset_at = None;
            self.save_enabled = true;
            self.status.clear();
        }
    }
}
