//! Third-party identity token verification.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Identity asserted by a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-scoped subject id.
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Provider id stored on linked accounts, e.g. `google`.
    fn provider_id(&self) -> &'static str;

    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
#[derive(Debug, Clone)]
pub struct GoogleIdentityVerifier {
    client: Client,
    tokeninfo_url: String,
    /// Expected audience; unchecked when `None`.
    client_id: Option<String>,
}

impl GoogleIdentityVerifier {
    pub fn new(client: Client, tokeninfo_url: impl Into<String>, client_id: Option<String>) -> Self {
        Self {
            client,
            tokeninfo_url: tokeninfo_url.into(),
            client_id,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    fn provider_id(&self) -> &'static str {
        "google"
    }

    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reach identity provider: {}", e.without_url()))?;

        if !response.status().is_success() {
            anyhow::bail!("Identity provider rejected the token ({})", response.status());
        }

        // The request URL carries the token; keep it out of error text.
        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed identity provider response: {}", e.without_url()))?;

        if let Some(expected) = &self.client_id {
            if info.aud.as_deref() != Some(expected.as_str()) {
                anyhow::bail!("Token audience does not match this application");
            }
        }

        match (info.sub, info.email) {
            (Some(subject), Some(email)) => Ok(VerifiedIdentity {
                subject,
                email,
                name: info.name,
                picture: info.picture,
            }),
            _ => anyhow::bail!("No email or user ID found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    const CLIENT_ID: &str = "web-client.apps.example.com";

    /// Tokeninfo stand-in keyed by the `id_token` query parameter.
    async fn tokeninfo(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let body = match params.get("id_token").map(String::as_str) {
            Some("good") => json!({
                "aud": CLIENT_ID,
                "sub": "1234",
                "email": "learner@example.com",
                "name": "Learner",
            }),
            Some("other-app") => json!({
                "aud": "someone-else.apps.example.com",
                "sub": "1234",
                "email": "learner@example.com",
            }),
            Some("no-email") => json!({ "aud": CLIENT_ID, "sub": "1234" }),
            _ => json!({}),
        };
        Json(body)
    }

    async fn spawn_tokeninfo() -> String {
        let app = Router::new().route("/tokeninfo", get(tokeninfo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}/tokeninfo")
    }

    fn verifier(url: &str, client_id: Option<&str>) -> GoogleIdentityVerifier {
        GoogleIdentityVerifier::new(Client::new(), url, client_id.map(String::from))
    }

    #[tokio::test]
    async fn test_verified_identity() {
        let url = spawn_tokeninfo().await;
        let identity = verifier(&url, Some(CLIENT_ID))
            .verify("good")
            .await
            .expect("verify");

        assert_eq!(identity.subject, "1234");
        assert_eq!(identity.email, "learner@example.com");
        assert_eq!(identity.name.as_deref(), Some("Learner"));
        assert!(identity.picture.is_none());
    }

    #[tokio::test]
    async fn test_audience_mismatch_is_rejected() {
        let url = spawn_tokeninfo().await;

        let err = verifier(&url, Some(CLIENT_ID))
            .verify("other-app")
            .await
            .expect_err("wrong audience");
        assert_eq!(err.to_string(), "Token audience does not match this application");

        // Without a configured client id the audience is not checked.
        assert!(verifier(&url, None).verify("other-app").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_email_is_rejected() {
        let url = spawn_tokeninfo().await;
        let err = verifier(&url, Some(CLIENT_ID))
            .verify("no-email")
            .await
            .expect_err("no email");
        assert_eq!(err.to_string(), "No email or user ID found");
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let err = verifier("http://127.0.0.1:1/tokeninfo", None)
            .verify("SECRET-ID-TOKEN-abc123")
            .await
            .expect_err("unreachable");
        let message = format!("{err:#}");

        assert!(message.starts_with("Failed to reach identity provider"));
        assert!(!message.contains("SECRET-ID-TOKEN-abc123"), "{message}");
        assert!(!message.contains("id_token"), "{message}");
    }
}
