//! Login and signup forms.

use crate::client::Backend;
use crate::error::{Error, Result};
use crate::identity::IdentityProvider;

/// Shown for any failure that did not come from the identity provider.
pub const CONNECTION_FAILURE: &str = "Could not connect to the server.";

/// Which form is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    /// Label of the submit button while idle.
    pub fn idle_label(self) -> &'static str {
        match self {
            AuthMode::Login => "Login",
            AuthMode::Signup => "Sign Up",
        }
    }

    /// Label of the submit button while a submission is in flight.
    pub fn busy_label(self) -> &'static str {
        match self {
            AuthMode::Login => "Logging In...",
            AuthMode::Signup => "Signing Up...",
        }
    }

    /// Notice shown once the session cookie is set.
    pub fn success_message(self) -> &'static str {
        match self {
            AuthMode::Login => "Login successful! Redirecting...",
            AuthMode::Signup => "Account created! Redirecting...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// The notification banner under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn icon(&self) -> char {
        match self.kind {
            NoticeKind::Success => '✓',
            NoticeKind::Error => '✗',
        }
    }
}

/// Translate an identity-provider error code into a user-facing message.
pub fn friendly_auth_message(code: &str) -> &'static str {
    match code {
        "auth/invalid-credential" | "auth/user-not-found" | "auth/wrong-password" => {
            "Invalid email or password. Please try again."
        }
        "auth/email-already-in-use" => "This email address is already in use by another account.",
        "auth/weak-password" => "The password is too weak. It must be at least 6 characters long.",
        "auth/invalid-email" => "Please enter a valid email address.",
        _ => "An unexpected error occurred. Please try again later.",
    }
}

/// The message shown for a failed submission.
pub fn failure_message(err: &Error) -> &'static str {
    match err.provider_code() {
        Some(code) => friendly_auth_message(code),
        None => CONNECTION_FAILURE,
    }
}

/// State of a login or signup form.
#[derive(Debug, Clone)]
pub struct AuthForm {
    mode: AuthMode,
    submit_label: &'static str,
    submit_enabled: bool,
    notice: Option<Notice>,
    password_visible: bool,
    signed_in: bool,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            submit_label: mode.idle_label(),
            submit_enabled: true,
            notice: None,
            password_visible: false,
            signed_in: false,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn submit_label(&self) -> &'static str {
        self.submit_label
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn password_visible(&self) -> bool {
        self.password_visible
    }

    /// True once the backend accepted the session; the caller should move on
    /// to the chat view.
    pub fn signed_in(&self) -> bool {
        self.signed_in
    }

    /// Show or hide the password characters.
    pub fn toggle_password_visibility(&mut self) {
        self.password_visible = !self.password_visible;
    }

    /// Authenticate with the provider and open a backend session.
    ///
    /// On failure the form is re-enabled and the notice explains what went
    /// wrong; the error is also returned.  On success the submit control stays
    /// disabled.  Submitting a disabled form does nothing.
    pub async fn submit(
        &mut self,
        provider: &dyn IdentityProvider,
        backend: &dyn Backend,
        email: &str,
        password: &str,
    ) -> Result<()> {
        if !self.submit_enabled {
            return Ok(());
        }
        self.submit_enabled = false;
        self.submit_label = self.mode.busy_label();

        let mode = self.mode;
        let result = async {
            let token = match mode {
                AuthMode::Login => provider.sign_in(email, password).await?,
                AuthMode::Signup => provider.sign_up(email, password).await?,
            };
            backend.session_login(&token).await
        }
        .await;

        match result {
            Ok(()) => {
                self.signed_in = true;
                self.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message: self.mode.success_message().to_string(),
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(mode = ?self.mode, error = %err, "authentication failed");
                self.notice = Some(Notice {
                    kind: NoticeKind::Error,
                    message: failure_message(&err).to_string(),
                });
                self.submit_enabled = true;
                self.submit_label = self.mode.idle_label();
                Err(err)
            }
        }
    }
}
