//! Authenticated, retrying JSON client for the Localskills API.
//!
//! # Design
//! `LocalskillsClient` owns an immutable [`ClientConfig`] and one pooled
//! `reqwest::Client`; cloning it is cheap and clones share the pool. A call
//! is a strictly ordered loop: attempt, classify, back off, attempt again.
//! The request body is serialized afresh for every attempt, because a sent
//! body cannot be replayed. Both the in-flight request and the backoff sleep
//! race the caller's [`CancellationToken`], so cancellation always wins over
//! a pending retry.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::envelope::{check_status, Outcome};
use crate::error::{ApiError, AttemptFailure};
use crate::http::{HttpMethod, RawResponse};
use crate::retry::is_retryable_status;

/// Pass as the `body` argument of calls that send no payload.
pub const NO_BODY: Option<&()> = None;

#[derive(Debug, Clone)]
pub struct LocalskillsClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl LocalskillsClient {
    /// Client with the default timeout, user agent and retry policy.
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::new(base_url, api_token))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one logical request and returns the final status and body.
    ///
    /// Statuses other than 429 and 5xx are returned as-is, including 4xx;
    /// interpreting them is left to [`decode_json`](Self::decode_json).
    /// Transport failures and retryable statuses are retried per the
    /// configured [`RetryPolicy`](crate::RetryPolicy) and end in
    /// [`ApiError::RetriesExhausted`].
    #[instrument(skip(self, cancel, body))]
    pub async fn send<B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<RawResponse, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let policy = self.config.retry;
        let url = format!("{}{}", self.config.base_url, path);
        let mut retry = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let payload = body
                .map(serde_json::to_vec)
                .transpose()
                .map_err(ApiError::Serialize)?;

            debug!(attempt = retry + 1, "sending request");
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                result = self.attempt(method, &url, payload) => result,
            };

            let failure = match result {
                Ok(response) if !is_retryable_status(response.status) => return Ok(response),
                Ok(response) => AttemptFailure::Status(response.status),
                Err(err) if err.is_builder() => return Err(ApiError::Transport(err)),
                Err(err) => AttemptFailure::Transport(err),
            };

            if retry >= policy.max_retries {
                warn!(attempts = retry + 1, error = %failure, "request failed, retries exhausted");
                let last_status = match &failure {
                    AttemptFailure::Status(status) => Some(*status),
                    AttemptFailure::Transport(err) => err.status().map(|status| status.as_u16()),
                };
                return Err(ApiError::RetriesExhausted {
                    retries: policy.max_retries,
                    last_status,
                    source: failure,
                });
            }

            retry += 1;
            let delay = policy.backoff(retry);
            debug!(attempt = retry, backoff = ?delay, error = %failure, "retrying request");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Sends a request and unwraps the response envelope.
    ///
    /// Returns `Ok(None)` when the envelope reports success without `data`.
    /// An HTTP status >= 400 or `success: false` becomes [`ApiError::Api`]
    /// with the real status; a success body that is not an envelope of `T`
    /// is a hard [`ApiError::Decode`].
    pub async fn decode_json<T, B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(cancel, method, path, body).await?;
        Outcome::<T>::classify(response.status, &response.body).into_result()
    }

    /// Like [`decode_json`](Self::decode_json), but a missing `data` is an
    /// error. For endpoints that return a single object.
    pub async fn fetch<T, B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.decode_json(cancel, method, path, body)
            .await?
            .ok_or(ApiError::MissingData)
    }

    /// Collection endpoints: a missing or `null` `data` is an empty list.
    pub async fn fetch_list<T, B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self
            .decode_json::<Vec<T>, B>(cancel, method, path, body)
            .await?
            .unwrap_or_default())
    }

    /// For calls whose payload is irrelevant, such as deletes. An envelope
    /// body is still checked for `success: false`; an empty body under a
    /// status below 400 (`204 No Content`) is a success.
    pub async fn execute<B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(cancel, method, path, body).await?;
        if response.status < 400 && response.is_empty() {
            return Ok(());
        }
        Outcome::<IgnoredAny>::classify(response.status, &response.body)
            .into_result()
            .map(|_| ())
    }

    /// Status-only variant of [`execute`](Self::execute): any status below
    /// 400 succeeds and the body is never parsed.
    pub async fn expect_success<B>(
        &self,
        cancel: &CancellationToken,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(cancel, method, path, body).await?;
        check_status(response.status, &response.body)
    }

    /// One attempt. The body is read to the end so the connection goes back
    /// to the pool even when the attempt is retried.
    async fn attempt(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<RawResponse, reqwest::Error> {
        let mut request = self
            .http
            .request(method.into(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_token))
            .header(USER_AGENT, self.config.user_agent.as_str());
        if let Some(payload) = payload {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(status, "received response");
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::retry::RetryPolicy;

    const TOKEN: &str = "lsk_test123";

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
        name: String,
    }

    fn client(server: &MockServer) -> LocalskillsClient {
        client_with(ClientConfig::new(server.uri(), TOKEN))
    }

    fn client_with(config: ClientConfig) -> LocalskillsClient {
        let config = config.with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
        LocalskillsClient::with_config(config).unwrap()
    }

    fn ok_item() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"success": true, "data": {"id": "skill-1", "name": "test-skill"}}))
    }

    fn counting(
        counter: Arc<AtomicUsize>,
        failures: usize,
        failure_status: u16,
    ) -> impl Fn(&wiremock::Request) -> ResponseTemplate + Send + Sync + 'static {
        move |_req: &wiremock::Request| {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            if current < failures {
                ResponseTemplate::new(failure_status)
            } else {
                ok_item()
            }
        }
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn sends_auth_content_type_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/skills/skill-1"))
            .and(header("authorization", "Bearer lsk_test123"))
            .and(header("content-type", "application/json"))
            .and(header("user-agent", "terraform-provider-localskills"))
            .respond_with(ok_item())
            .expect(1)
            .mount(&server)
            .await;

        let item: Item = client(&server)
            .fetch(&CancellationToken::new(), HttpMethod::Get, "/api/skills/skill-1", NO_BODY)
            .await
            .unwrap();
        assert_eq!(item.id, "skill-1");
        assert_eq!(item.name, "test-skill");
    }

    #[tokio::test]
    async fn retries_429_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        Mock::given(method("GET"))
            .respond_with(counting(attempts.clone(), 2, 429))
            .mount(&server)
            .await;

        let item: Item = client(&server)
            .fetch(&CancellationToken::new(), HttpMethod::Get, "/api/skills/1", NO_BODY)
            .await
            .unwrap();
        assert_eq!(item.id, "skill-1");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries_on_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch::<Item, ()>(&CancellationToken::new(), HttpMethod::Get, "/api/skills/1", None)
            .await
            .unwrap_err();

        assert_eq!(request_count(&server).await, 4);
        match &err {
            ApiError::RetriesExhausted {
                retries,
                last_status,
                source: AttemptFailure::Status(500),
            } => {
                assert_eq!(*retries, 3);
                assert_eq!(*last_status, Some(500));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert!(err.to_string().starts_with("request failed after 3 retries"));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"success": false, "error": "invalid request: name is required"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch::<Item, _>(
                &CancellationToken::new(),
                HttpMethod::Post,
                "/api/skills",
                Some(&json!({})),
            )
            .await
            .unwrap_err();

        assert_eq!(request_count(&server).await, 1);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.message(), Some("invalid request: name is required"));
    }

    #[tokio::test]
    async fn success_false_with_200_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "operation failed"})),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        let cancel = CancellationToken::new();
        for _ in 0..2 {
            let err = client
                .fetch::<Item, ()>(&cancel, HttpMethod::Get, "/api/skills/1", None)
                .await
                .unwrap_err();
            assert_eq!(err.status(), Some(200));
            assert_eq!(err.message(), Some("operation failed"));
        }
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn body_is_reserialized_for_every_attempt() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let expected = json!({"name": "my-skill", "type": "prompt", "content": "test content"});
        Mock::given(method("POST"))
            .and(body_json(expected.clone()))
            .respond_with(counting(attempts.clone(), 1, 503))
            .mount(&server)
            .await;

        let item: Item = client(&server)
            .fetch(&CancellationToken::new(), HttpMethod::Post, "/api/skills", Some(&expected))
            .await
            .unwrap();
        assert_eq!(item.id, "skill-1");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        for request in requests {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ok_item().set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client(&server)
            .fetch::<Item, ()>(&cancel, HttpMethod::Get, "/api/skills/1", None)
            .await
            .unwrap_err();

        assert!(err.is_cancelled(), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_aborts_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri(), TOKEN)
            .with_retry(RetryPolicy::new(3, Duration::from_secs(30)));
        let client = LocalskillsClient::with_config(config).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client
            .send(&cancel, HttpMethod::Get, "/api/skills/1", NO_BODY)
            .await
            .unwrap_err();

        assert!(err.is_cancelled(), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn cancelled_token_sends_nothing() {
        let server = MockServer::start().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client(&server)
            .send(&cancel, HttpMethod::Get, "/api/skills", NO_BODY)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(request_count(&server).await, 0);
    }

    #[tokio::test]
    async fn transport_errors_are_retried_then_wrapped() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // nothing listens here any more, so connects are refused

        let config = ClientConfig::new(format!("http://{addr}"), TOKEN)
            .with_retry(RetryPolicy::new(1, Duration::from_millis(5)));
        let client = LocalskillsClient::with_config(config).unwrap();

        let err = client
            .send(&CancellationToken::new(), HttpMethod::Get, "/api/skills", NO_BODY)
            .await
            .unwrap_err();
        match &err {
            ApiError::RetriesExhausted {
                retries: 1,
                source: AttemptFailure::Transport(_),
                ..
            } => {}
            other => panic!("expected wrapped transport error, got {other:?}"),
        }
        assert!(err.to_string().starts_with("request failed after 1 retries"));
    }

    #[tokio::test]
    async fn client_timeout_is_a_retryable_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ok_item().set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri(), TOKEN)
            .with_timeout(Duration::from_millis(100))
            .with_retry(RetryPolicy::new(1, Duration::from_millis(5)));
        let client = LocalskillsClient::with_config(config).unwrap();

        let err = client
            .send(&CancellationToken::new(), HttpMethod::Get, "/api/skills/1", NO_BODY)
            .await
            .unwrap_err();
        match err {
            ApiError::RetriesExhausted {
                source: AttemptFailure::Transport(inner),
                ..
            } => assert!(inner.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn classifies_not_found_and_unauthorized() {
        let server = MockServer::start().await;
        for status in [401u16, 403, 404] {
            Mock::given(method("GET"))
                .and(path(format!("/status/{status}")))
                .respond_with(
                    ResponseTemplate::new(status)
                        .set_body_json(json!({"success": false, "error": "nope"})),
                )
                .mount(&server)
                .await;
        }

        let client = client(&server);
        let cancel = CancellationToken::new();

        let err = client
            .fetch::<Item, ()>(&cancel, HttpMethod::Get, "/status/404", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());

        for status in [401, 403] {
            let err = client
                .fetch::<Item, ()>(&cancel, HttpMethod::Get, &format!("/status/{status}"), None)
                .await
                .unwrap_err();
            assert!(err.is_unauthorized(), "{status}");
            assert!(!err.is_not_found(), "{status}");
        }
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn absent_data_is_an_empty_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = client(&server);
        let cancel = CancellationToken::new();
        let items: Vec<Item> = client
            .fetch_list(&cancel, HttpMethod::Get, "/api/skills", NO_BODY)
            .await
            .unwrap();
        assert!(items.is_empty());

        let err = client
            .fetch::<Item, ()>(&cancel, HttpMethod::Get, "/api/skills/1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingData));
    }

    #[tokio::test]
    async fn malformed_success_body_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch::<Item, ()>(&CancellationToken::new(), HttpMethod::Get, "/api/skills/1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn execute_ignores_payload() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/user/tokens/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"deleted": true}})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .execute(&CancellationToken::new(), HttpMethod::Delete, "/api/user/tokens/tok-1", NO_BODY)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn execute_accepts_empty_success_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/user/tokens/tok-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/user/tokens/tok-2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(&server);
        let cancel = CancellationToken::new();
        for token in ["tok-1", "tok-2"] {
            let path = format!("/api/user/tokens/{token}");
            client
                .execute(&cancel, HttpMethod::Delete, &path, NO_BODY)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn execute_still_rejects_success_false() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "token is in use"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .execute(&CancellationToken::new(), HttpMethod::Delete, "/api/user/tokens/tok-1", NO_BODY)
            .await
            .unwrap_err();
        assert_eq!(err.message(), Some("token is in use"));
    }

    #[tokio::test]
    async fn expect_success_ignores_body_below_400() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/skills/a"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/skills/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("deleted"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/skills/c"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"success": false, "error": "skill not found"})),
            )
            .mount(&server)
            .await;

        let client = client(&server);
        let cancel = CancellationToken::new();
        for id in ["a", "b"] {
            let path = format!("/api/skills/{id}");
            client
                .expect_success(&cancel, HttpMethod::Delete, &path, NO_BODY)
                .await
                .unwrap();
        }
        let err = client
            .expect_success(&cancel, HttpMethod::Delete, "/api/skills/c", NO_BODY)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), Some("skill not found"));
    }
}
