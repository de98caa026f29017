//! Twilio Programmable Messaging client.

use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    parley_common::time::saturating_millis,
    parley_config::ProviderConfig,
    reqwest::{Client, Response, StatusCode, header::RETRY_AFTER},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    provider::{MessageStatus, MessagingProvider, SubmittedMessage},
};

/// Rate-limited status fetches are retried at most this many times.
const FETCH_RATE_LIMIT_MAX_RETRIES: usize = 3;

/// Wait used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Message resource as returned by the Messages API.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: MessageStatus,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// REST client for the Twilio Messages resource.
pub struct TwilioClient {
    http: Client,
    base_url: String,
    account_sid: String,
    auth_token: Secret<String>,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .finish_non_exhaustive()
    }
}

impl TwilioClient {
    /// Build a client from provider config.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.account_sid.is_empty() || config.auth_token.expose_secret().is_empty() {
            return Err(Error::not_configured(
                "provider.account_sid and provider.auth_token are required",
            ));
        }
        Ok(Self::with_client(
            Client::new(),
            &config.api_base_url,
            &config.account_sid,
            config.auth_token.clone(),
        ))
    }

    #[must_use]
    pub fn with_client(
        http: Client,
        base_url: &str,
        account_sid: &str,
        auth_token: Secret<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    fn message_url(&self, id: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages/{id}.json",
            self.base_url, self.account_sid
        )
    }

    async fn run_with_rate_limit_retry<F, Fut>(&self, id: &str, mut request: F) -> Result<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Response, reqwest::Error>>,
    {
        let mut retries = 0usize;

        loop {
            let response = request().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS
                || retries >= FETCH_RATE_LIMIT_MAX_RETRIES
            {
                return Ok(response);
            }

            let wait = retry_after(&response).unwrap_or(DEFAULT_RETRY_AFTER);
            retries += 1;
            warn!(
                message_id = id,
                retries,
                max_retries = FETCH_RATE_LIMIT_MAX_RETRIES,
                retry_after_ms = saturating_millis(wait),
                "twilio rate limited status fetch, waiting before retry"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Decode a message resource, mapping HTTP failures to [`Error::Api`].
async fn read_message(response: Response) -> Result<MessageResource> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<MessageResource>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message.unwrap_or(text),
    })
}

#[async_trait]
impl MessagingProvider for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn submit(&self, to: &str, from: &str, body: &str) -> Result<SubmittedMessage> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;
        let message = read_message(response).await?;

        debug!(
            message_id = %message.sid,
            status = %message.status,
            to,
            bytes = body.len(),
            "twilio accepted message"
        );
        Ok(SubmittedMessage {
            id: message.sid,
            status: message.status,
        })
    }

    async fn fetch(&self, id: &str) -> Result<MessageStatus> {
        let url = self.message_url(id);
        let response = self
            .run_with_rate_limit_retry(id, || {
                self.http
                    .get(&url)
                    .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
                    .send()
            })
            .await?;
        let message = read_message(response).await?;

        if let Some(code) = message.error_code {
            debug!(
                message_id = id,
                status = %message.status,
                error_code = code,
                error_message = message.error_message.as_deref().unwrap_or(""),
                "twilio reported delivery error"
            );
        }
        Ok(message.status)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    const SID: &str = "AC0123";

    fn client(server: &mockito::Server) -> TwilioClient {
        TwilioClient::with_client(
            Client::new(),
            &server.url(),
            SID,
            Secret::new("token".into()),
        )
    }

    #[tokio::test]
    async fn submit_posts_form_and_parses_resource() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC0123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".into(), "whatsapp:+15551230000".into()),
                Matcher::UrlEncoded("From".into(), "whatsapp:+14155238886".into()),
                Matcher::UrlEncoded("Body".into(), "Hi there.".into()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sid":"SM1","status":"queued"}"#)
            .create_async()
            .await;

        let submitted = client(&server)
            .submit("whatsapp:+15551230000", "whatsapp:+14155238886", "Hi there.")
            .await
            .unwrap();

        assert_eq!(submitted, SubmittedMessage {
            id: "SM1".into(),
            status: MessageStatus::Queued,
        });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/2010-04-01/Accounts/AC0123/Messages.json")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":21211,"message":"Invalid 'To' Phone Number","status":400}"#)
            .create_async()
            .await;

        let err = client(&server).submit("bad", "from", "x").await.unwrap_err();
        match err {
            Error::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(21211));
                assert!(message.contains("Invalid 'To'"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_returns_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2010-04-01/Accounts/AC0123/Messages/SM1.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sid":"SM1","status":"delivered","error_code":null}"#)
            .create_async()
            .await;

        let status = client(&server).fetch("SM1").await.unwrap();
        assert_eq!(status, MessageStatus::Delivered);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_retries_after_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/2010-04-01/Accounts/AC0123/Messages/SM1.json")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/2010-04-01/Accounts/AC0123/Messages/SM1.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sid":"SM1","status":"read"}"#)
            .create_async()
            .await;

        let status = client(&server).fetch("SM1").await.unwrap();
        assert_eq!(status, MessageStatus::Read);
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[test]
    fn from_config_requires_credentials() {
        let err = TwilioClient::from_config(&ProviderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured { .. }));
    }

    #[test]
    fn debug_hides_token() {
        let client = TwilioClient::with_client(
            Client::new(),
            "https://api.twilio.com/",
            SID,
            Secret::new("supersecret".into()),
        );
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("https://api.twilio.com\""));
    }
}
