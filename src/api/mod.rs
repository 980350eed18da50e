use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::error::{ApiError, ApiResult};
use crate::model::{CartOrderItem, MenuItem, SessionToken, SubmittedOrder};

pub mod model;

use model::{AgentReply, CartItemRequest, OrderSubmission, SigninRequest, StatusListing};

/// The two order-placement endpoints written on checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTarget {
    Primary,
    Secondary,
}

impl SubmitTarget {
    pub const ALL: [SubmitTarget; 2] = [SubmitTarget::Primary, SubmitTarget::Secondary];

    pub fn path(&self) -> &'static str {
        match self {
            SubmitTarget::Primary => "submit",
            SubmitTarget::Secondary => "submit2",
        }
    }
}

/// Remote operations of the ordering API. Every call except sign-in carries
/// the session token.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn sign_in(&self, request: &SigninRequest) -> ApiResult<SessionToken>;

    async fn get_menu(&self, token: &str) -> ApiResult<Vec<MenuItem>>;

    async fn add_order_item(&self, token: &str, item: &CartItemRequest) -> ApiResult<()>;

    async fn get_orders(&self, token: &str) -> ApiResult<Vec<CartOrderItem>>;

    async fn delete_order(&self, token: &str, orderid: &str) -> ApiResult<()>;

    async fn delete_all_orders(&self, token: &str, useremail: &str) -> ApiResult<()>;

    async fn submit_order(
        &self,
        token: &str,
        target: SubmitTarget,
        order: &OrderSubmission,
    ) -> ApiResult<()>;

    async fn get_status(&self, token: &str) -> ApiResult<Vec<SubmittedOrder>>;

    async fn send_feedback(&self, token: &str, text: &str) -> ApiResult<()>;

    async fn call_agent(&self, token: &str, message: &str) -> ApiResult<AgentReply>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    agent_base_url: Url,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("agent_base_url", &self.agent_base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(cfg.api.user_agent.clone())
            .timeout(Duration::from_secs(cfg.api.timeout_seconds))
            .build()
            .map_err(|_| ConfigError::Invalid("could not build HTTP client"))?;
        Ok(Self::with_client(http, cfg.api.base()?, cfg.api.agent_base()?))
    }

    pub fn with_client(http: Client, base_url: Url, agent_base_url: Url) -> Self {
        Self {
            http,
            base_url,
            agent_base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to a base URL.
    pub fn endpoint(base: &Url, segments: &[&str]) -> ApiResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Request> {
        let mut builder = self.http.request(method, url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> ApiResult<String> {
        debug!(method = %request.method(), url = %redact(request.url()), "sending api request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            if status != reqwest::StatusCode::NOT_FOUND {
                warn!(%status, "api request failed");
            }
            return Err(ApiError::from_status(status, body));
        }
        Ok(body)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: reqwest::Request) -> ApiResult<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn users(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push("users");
        all.extend_from_slice(segments);
        Self::endpoint(&self.base_url, &all)
    }
}

/// URL for logs with the agent path's token segment masked.
fn redact(url: &Url) -> String {
    let mut segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    if segments.len() >= 3 && segments[segments.len() - 3] == "callAgent" {
        let last = segments.len() - 1;
        segments[last] = "[REDACTED]";
    }
    format!(
        "{}://{}/{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        segments.join("/")
    )
}

#[async_trait]
impl StorefrontApi for ApiClient {
    #[instrument(skip_all)]
    async fn sign_in(&self, request: &SigninRequest) -> ApiResult<SessionToken> {
        let url = self.users(&["signin"])?;
        let req = self.build_request(Method::POST, url, None, Some(request))?;
        let res = self.http.execute(req).await?;
        let status = res.status();
        let body = res.text().await?;
        // Any rejection here is a credential problem, not an expired session.
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip_all)]
    async fn get_menu(&self, token: &str) -> ApiResult<Vec<MenuItem>> {
        let url = self.users(&["getmenu"])?;
        let req = self.build_request::<()>(Method::GET, url, Some(token), None)?;
        self.fetch_json(req).await
    }

    #[instrument(skip_all, fields(orderid = %item.orderid))]
    async fn add_order_item(&self, token: &str, item: &CartItemRequest) -> ApiResult<()> {
        let url = self.users(&["orderitem"])?;
        let req = self.build_request(Method::POST, url, Some(token), Some(item))?;
        self.execute(req).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn get_orders(&self, token: &str) -> ApiResult<Vec<CartOrderItem>> {
        let url = self.users(&["getorders"])?;
        let req = self.build_request::<()>(Method::GET, url, Some(token), None)?;
        self.fetch_json(req).await
    }

    #[instrument(skip_all, fields(orderid = %orderid))]
    async fn delete_order(&self, token: &str, orderid: &str) -> ApiResult<()> {
        let url = self.users(&["deleteorder", orderid])?;
        let req = self.build_request::<()>(Method::DELETE, url, Some(token), None)?;
        self.execute(req).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn delete_all_orders(&self, token: &str, useremail: &str) -> ApiResult<()> {
        let url = self.users(&["deleteallorders", useremail])?;
        let req = self.build_request::<()>(Method::DELETE, url, Some(token), None)?;
        self.execute(req).await.map(|_| ())
    }

    #[instrument(skip_all, fields(target = target.path(), orderid = %order.orderid))]
    async fn submit_order(
        &self,
        token: &str,
        target: SubmitTarget,
        order: &OrderSubmission,
    ) -> ApiResult<()> {
        let url = self.users(&[target.path()])?;
        let req = self.build_request(Method::POST, url, Some(token), Some(order))?;
        self.execute(req).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn get_status(&self, token: &str) -> ApiResult<Vec<SubmittedOrder>> {
        let url = self.users(&["getstatus"])?;
        let req = self.build_request::<()>(Method::GET, url, Some(token), None)?;
        let listing: StatusListing = self.fetch_json(req).await?;
        Ok(listing.into_orders())
    }

    #[instrument(skip_all)]
    async fn send_feedback(&self, token: &str, text: &str) -> ApiResult<()> {
        let url = self.users(&["feedback", text])?;
        let req = self.build_request::<()>(Method::POST, url, Some(token), None)?;
        self.execute(req).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn call_agent(&self, token: &str, message: &str) -> ApiResult<AgentReply> {
        let url = Self::endpoint(&self.agent_base_url, &["callAgent", message, token])?;
        let req = self.build_request::<()>(Method::POST, url, None, None)?;
        self.fetch_json(req).await
    }
}
