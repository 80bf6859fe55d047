//! REST client
//!
//! Composes HTTP requests, routes every call through the rate-limit engine,
//! and decodes responses. 429s are retried internally after the mandated
//! wait; 5xx and transport errors surface to the caller untouched and
//! without bucket mutation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult};
use chat_core::{Channel, Guild, Member, Message, Snowflake, User};

use crate::ratelimit::{RateLimitHeaders, RateLimiter};
use crate::routes::Route;
use crate::types::{ApiErrorBody, CreateMessage, EditMessage, GatewayBotInfo, GatewayInfo};

/// User agent sent with every request
const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/TechieQuokka/chat_client, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Upper bound on internal 429 retries per call
const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// The underlying HTTP client type, for callers that inject their own
pub type HttpClient = reqwest::Client;

/// Token-authenticated REST client
#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    limiter: RateLimiter,
    shutdown: CancellationToken,
}

impl RestClient {
    /// Create a client for the given API base URL
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        shutdown: CancellationToken,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ClientError::internal)?;
        Ok(Self::with_http_client(http, token, base_url, shutdown))
    }

    /// Create a client over an injected HTTP client
    ///
    /// The injected client should set its own User-Agent; requests made here
    /// add only the Authorization header.
    #[must_use]
    pub fn with_http_client(
        http: HttpClient,
        token: impl Into<String>,
        base_url: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
            limiter: RateLimiter::new(),
            shutdown,
        }
    }

    /// The rate-limit engine backing this client
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Issue a request and decode the JSON response body
    pub async fn request<T: DeserializeOwned>(
        &self,
        route: Route,
        body: Option<Value>,
    ) -> ClientResult<T> {
        let response = self.execute(&route, body).await?;
        response.json().await.map_err(ClientError::internal)
    }

    /// Issue a request and discard the response body (204-style endpoints)
    pub async fn request_empty(&self, route: Route, body: Option<Value>) -> ClientResult<()> {
        self.execute(&route, body).await.map(drop)
    }

    /// Send one call through the rate limiter, retrying only on 429
    async fn execute(&self, route: &Route, body: Option<Value>) -> ClientResult<reqwest::Response> {
        for _attempt in 0..MAX_RATE_LIMIT_RETRIES {
            let permit = self.limiter.acquire(route, &self.shutdown).await?;

            let url = format!("{}{}", self.base_url, route.path);
            let mut request = self
                .http
                .request(route.method.clone(), &url)
                .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token));
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = tokio::select! {
                () = self.shutdown.cancelled() => {
                    drop(permit);
                    return Err(ClientError::Closed);
                }
                result = request.send() => result,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    // Transport failure: no bucket mutation, no retry.
                    drop(permit);
                    return Err(ClientError::Http(err.to_string()));
                }
            };

            let status = response.status();
            let headers = RateLimitHeaders::parse(response.headers());

            if status.as_u16() == 429 {
                tracing::debug!(route = %route, global = headers.global, "Rate limited; retrying");
                self.limiter.release(permit, &headers, 429);
                continue;
            }

            if status.is_server_error() {
                // 5xx: surface as retryable, leave the bucket untouched.
                drop(permit);
                return Err(ClientError::ServerError(status.as_u16()));
            }

            self.limiter.release(permit, &headers, status.as_u16());

            if status.is_client_error() {
                let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                    code: 0,
                    message: status.to_string(),
                });
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    code: body.code,
                    message: body.message,
                });
            }

            return Ok(response);
        }

        Err(ClientError::internal(anyhow::anyhow!(
            "rate limit retries exhausted for {route}"
        )))
    }

    fn json_body(value: &impl Serialize) -> ClientResult<Value> {
        serde_json::to_value(value).map_err(ClientError::internal)
    }

    // === Gateway metadata ===

    /// Fetch the public gateway URL
    pub async fn get_gateway(&self) -> ClientResult<GatewayInfo> {
        self.request(Route::get_gateway(), None).await
    }

    /// Fetch gateway URL, recommended shard count, and identify budget
    pub async fn get_gateway_bot(&self) -> ClientResult<GatewayBotInfo> {
        self.request(Route::get_gateway_bot(), None).await
    }

    // === Channels and messages ===

    pub async fn get_channel(&self, channel_id: Snowflake) -> ClientResult<Channel> {
        self.request(Route::get_channel(channel_id), None).await
    }

    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        message: &CreateMessage,
    ) -> ClientResult<Message> {
        self.request(
            Route::create_message(channel_id),
            Some(Self::json_body(message)?),
        )
        .await
    }

    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        edit: &EditMessage,
    ) -> ClientResult<Message> {
        self.request(
            Route::edit_message(channel_id, message_id),
            Some(Self::json_body(edit)?),
        )
        .await
    }

    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> ClientResult<()> {
        self.request_empty(Route::delete_message(channel_id, message_id), None)
            .await
    }

    /// `emoji` must be URL-encoded (`name:id` for custom emoji)
    pub async fn create_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> ClientResult<()> {
        self.request_empty(Route::create_reaction(channel_id, message_id, emoji), None)
            .await
    }

    /// `emoji` must be URL-encoded (`name:id` for custom emoji)
    pub async fn delete_own_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> ClientResult<()> {
        self.request_empty(
            Route::delete_own_reaction(channel_id, message_id, emoji),
            None,
        )
        .await
    }

    // === Guilds ===

    pub async fn get_guild(&self, guild_id: Snowflake) -> ClientResult<Guild> {
        self.request(Route::get_guild(guild_id), None).await
    }

    pub async fn get_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ClientResult<Member> {
        self.request(Route::get_member(guild_id, user_id), None).await
    }

    // === Users ===

    pub async fn get_current_user(&self) -> ClientResult<User> {
        self.request(Route::get_current_user(), None).await
    }

    // === Interactions and webhooks ===

    /// Respond to an interaction received over the gateway
    pub async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: Value,
    ) -> ClientResult<()> {
        self.request_empty(
            Route::create_interaction_response(interaction_id, token),
            Some(response),
        )
        .await
    }

    /// Post a message through a webhook, returning the created message
    ///
    /// Webhook routes authenticate by token; their buckets partition on the
    /// webhook id.
    pub async fn execute_webhook(
        &self,
        webhook_id: Snowflake,
        token: &str,
        message: &CreateMessage,
    ) -> ClientResult<Message> {
        self.request(
            Route::execute_webhook(webhook_id, token),
            Some(Self::json_body(message)?),
        )
        .await
    }
}
