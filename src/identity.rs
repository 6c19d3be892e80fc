//! Third-party identity provider.
//!
//! Credentials never reach the LUNA backend.  They are exchanged with the
//! identity provider for an id token, and only that token is handed to
//! `/session_login`.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{IDENTITY_FAILURES, IDENTITY_REQUESTS};

/// Identity Toolkit REST endpoint.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

/// An email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in an existing account and return its id token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String>;
    /// Create an account and return its id token.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String>;
}

/// Firebase Authentication over the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: ReqwestClient,
    api_key: String,
    endpoint: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl FirebaseIdentity {
    /// Create a provider for the project owning `api_key`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Create a provider that talks to a different Identity Toolkit endpoint,
    /// such as the local emulator.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::validation(
                "identity provider API key is empty",
                Some("firebase_api_key".to_string()),
            ));
        }
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            api_key,
            endpoint: Url::parse(endpoint)?,
        })
    }

    async fn password_request(&self, method: &str, email: &str, password: &str) -> Result<String> {
        IDENTITY_REQUESTS.click();
        let mut url = self.endpoint.join(&format!("accounts:{method}"))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.client.post(url).json(&body).send().await.map_err(|e| {
            IDENTITY_FAILURES.click();
            Error::from(e)
        })?;

        if !response.status().is_success() {
            IDENTITY_FAILURES.click();
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            tracing::debug!(method, status, message = %message, "identity provider refused request");
            if message.is_empty() {
                return Err(Error::api(status, format!("Server error: {status}")));
            }
            return Err(Error::identity_provider(provider_code(&message), message));
        }

        let token = response.json::<TokenResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })?;
        Ok(token.id_token)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        self.password_request("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<String> {
        self.password_request("signUp", email, password).await
    }
}

/// Map an Identity Toolkit error string to the provider's `auth/...` code.
///
/// The REST API sometimes appends detail after a colon, as in
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn provider_code(rest_message: &str) -> &'static str {
    let key = rest_message.split(':').next().unwrap_or("").trim();
    match key {
        "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "EMAIL_EXISTS" => "auth/email-already-in-use",
        "WEAK_PASSWORD" => "auth/weak-password",
        "INVALID_EMAIL" => "auth/invalid-email",
        "MISSING_PASSWORD" => "auth/missing-password",
        "USER_DISABLED" => "auth/user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "OPERATION_NOT_ALLOWED" => "auth/operation-not-allowed",
        _ => "auth/internal-error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_errors_map_to_provider_codes() {
        assert_eq!(provider_code("EMAIL_NOT_FOUND"), "auth/user-not-found");
        assert_eq!(provider_code("INVALID_LOGIN_CREDENTIALS"), "auth/invalid-credential");
        assert_eq!(
            provider_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            "auth/weak-password"
        );
        assert_eq!(provider_code("SOMETHING_NEW"), "auth/internal-error");
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = FirebaseIdentity::new("").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn request_body_is_camel_case() {
        let body = PasswordRequest {
            email: "a@b.c",
            password: "secret",
            return_secure_token: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"email": "a@b.c", "password": "secret", "returnSecureToken": true})
        );
    }
}
