//! Order flow: every user-facing operation, keyed by the current session.
//!
//! A 403 from any call clears the stored session. A 404 on the cart or
//! status listings means "nothing there yet" and is reported as
//! [`Outcome::Empty`], never as a failure.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::api::model::{error_detail, CartItemRequest, OrderSubmission, SigninRequest};
use crate::api::{StorefrontApi, SubmitTarget};
use crate::error::{ApiError, ApiResult, Outcome};
use crate::model::{CartOrderItem, MenuItem, OrderStatus, SessionToken, SubmittedOrder};
use crate::money;
use crate::session::SessionHolder;

pub const EMPTY_CART_MESSAGE: &str = "Please add something to your cart before placing an order!";
pub const NO_ORDERS_MESSAGE: &str = "No orders yet.";
pub const EMPTY_MENU_MESSAGE: &str = "The menu is empty right now.";
pub const FEEDBACK_EMPTY_MESSAGE: &str = "Please enter a feedback message.";
pub const AGENT_UNKNOWN_REPLY: &str = "Unknown error.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("please sign in first")]
    NotSignedIn,
    #[error("{0}")]
    Validation(&'static str),
    #[error("session expired; please sign in again")]
    SessionExpired,
    #[error("{0}")]
    SignIn(String),
    #[error("checkout stopped after {written} of {total} items: {source}")]
    PartialCheckout {
        written: usize,
        total: usize,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Details collected on the checkout form.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub customer_name: String,
    pub table_no: String,
    pub location_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub orders: Vec<SubmittedOrder>,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct Storefront {
    api: Arc<dyn StorefrontApi>,
    session: SessionHolder,
    cart: Arc<RwLock<Vec<CartOrderItem>>>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    pub fn new(api: Arc<dyn StorefrontApi>, session: SessionHolder) -> Self {
        Self {
            api,
            session,
            cart: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    /// Last cart listing seen by this client, updated by every cart mutation.
    pub async fn cached_cart(&self) -> Vec<CartOrderItem> {
        self.cart.read().await.clone()
    }

    fn require_session(&self) -> Result<SessionToken, StorefrontError> {
        self.session.current().ok_or(StorefrontError::NotSignedIn)
    }

    async fn expire_session(&self) {
        warn!("api rejected the session token; signing out");
        self.cart.write().await.clear();
        if let Err(err) = self.session.clear().await {
            error!(?err, "failed to clear expired session");
        }
    }

    /// Unwrap a mutation result, turning a 403 into a cleared session.
    async fn guard<T>(&self, result: ApiResult<T>) -> Result<T, StorefrontError> {
        match result {
            Ok(value) => Ok(value),
            Err(ApiError::Unauthorized) => {
                self.expire_session().await;
                Err(StorefrontError::SessionExpired)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Classify a listing result, turning a 403 into a cleared session.
    async fn listing<T>(&self, result: ApiResult<Vec<T>>) -> Outcome<Vec<T>> {
        let outcome = match Outcome::from_result(result) {
            Outcome::Data(items) if items.is_empty() => Outcome::Empty,
            other => other,
        };
        match &outcome {
            Outcome::Unauthorized => self.expire_session().await,
            Outcome::Failure(reason) => warn!(%reason, "listing failed"),
            _ => {}
        }
        outcome
    }

    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        useremail: &str,
        password: &str,
    ) -> Result<SessionToken, StorefrontError> {
        let useremail = useremail.trim();
        if !EMAIL_RE.is_match(useremail) {
            return Err(StorefrontError::Validation("Please enter a valid email address."));
        }
        if password.is_empty() {
            return Err(StorefrontError::Validation("Please enter your password."));
        }

        let request = SigninRequest {
            useremail: useremail.to_string(),
            password: password.to_string(),
        };
        let mut session = match self.api.sign_in(&request).await {
            Ok(session) => session,
            Err(ApiError::Status { body, .. }) => {
                let detail = error_detail(&body).unwrap_or_else(|| "Login failed".to_string());
                return Err(StorefrontError::SignIn(detail));
            }
            Err(err) => return Err(err.into()),
        };
        if session.token.trim().is_empty() {
            return Err(StorefrontError::SignIn("Login failed".to_string()));
        }
        if session.useremail.is_empty() {
            session.useremail = useremail.to_string();
        }

        self.cart.write().await.clear();
        self.session.save(session.clone()).await?;
        info!(username = %session.username, "signed in");
        Ok(session)
    }

    pub async fn sign_out(&self) -> Result<(), StorefrontError> {
        self.cart.write().await.clear();
        self.session.clear().await?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn menu(&self) -> Outcome<Vec<MenuItem>> {
        let Some(session) = self.session.current() else {
            return Outcome::Unauthorized;
        };
        let result = self.api.get_menu(&session.token).await;
        self.listing(result).await
    }

    /// Put `quantity` of a menu item in the cart under a fresh order id.
    #[instrument(skip_all, fields(item = item.id, quantity = quantity))]
    pub async fn add_to_cart(
        &self,
        item: &MenuItem,
        quantity: u32,
    ) -> Result<CartOrderItem, StorefrontError> {
        if quantity == 0 {
            return Err(StorefrontError::Validation("Quantity must be at least 1."));
        }
        let session = self.require_session()?;
        let request = CartItemRequest {
            name: item.title.clone(),
            description: item.description.clone(),
            price: item.price.clone(),
            quantity,
            useremail: session.useremail.clone(),
            orderid: new_order_id(),
        };
        let result = self.api.add_order_item(&session.token, &request).await;
        self.guard(result).await?;

        // The server assigns the line id; `cart()` picks it up on refresh.
        let added = CartOrderItem {
            id: 0,
            orderid: request.orderid,
            name: request.name,
            description: request.description,
            price: request.price,
            quantity: request.quantity,
        };
        self.cart.write().await.push(added.clone());
        info!(orderid = %added.orderid, "added to cart");
        Ok(added)
    }

    #[instrument(skip_all)]
    pub async fn cart(&self) -> Outcome<Vec<CartOrderItem>> {
        let Some(session) = self.session.current() else {
            return Outcome::Unauthorized;
        };
        let result = self.api.get_orders(&session.token).await;
        let outcome = self.listing(result).await;
        match &outcome {
            Outcome::Data(items) => *self.cart.write().await = items.clone(),
            Outcome::Empty | Outcome::Unauthorized => self.cart.write().await.clear(),
            Outcome::Failure(_) => {}
        }
        outcome
    }

    #[instrument(skip_all, fields(orderid = %orderid))]
    pub async fn remove_from_cart(&self, orderid: &str) -> Result<(), StorefrontError> {
        let session = self.require_session()?;
        let result = self.api.delete_order(&session.token, orderid).await;
        self.guard(result).await?;
        self.cart.write().await.retain(|item| item.orderid != orderid);
        Ok(())
    }

    /// Submit every cart item, then empty the cart.
    ///
    /// Each item is written to both order endpoints in turn, one item at a
    /// time. The two writes are independent: when one fails the call stops
    /// and reports how many items were fully written, leaving the cart as is.
    #[instrument(skip_all)]
    pub async fn checkout(&self, form: &CheckoutForm) -> Result<CheckoutReceipt, StorefrontError> {
        let session = self.require_session()?;
        let customer_name = form.customer_name.trim();
        if customer_name.is_empty() {
            return Err(StorefrontError::Validation("Please enter your name."));
        }
        let table_no = form.table_no.trim();
        if table_no.is_empty() {
            return Err(StorefrontError::Validation("Please enter your table number."));
        }

        let items = match self.api.get_orders(&session.token).await {
            Err(ApiError::NotFound) => Vec::new(),
            other => self.guard(other).await?,
        };
        if items.is_empty() {
            self.cart.write().await.clear();
            return Err(StorefrontError::Validation(EMPTY_CART_MESSAGE));
        }

        let mut orders = Vec::with_capacity(items.len());
        for (written, item) in items.iter().enumerate() {
            let submission = OrderSubmission {
                name: customer_name.to_string(),
                table_no: table_no.to_string(),
                useremail: session.useremail.clone(),
                item_name: item.name.clone(),
                item_description: item.description.clone(),
                price: item.price.clone(),
                quantity: item.quantity,
                orderid: item.orderid.clone(),
                total: money::line_total(&item.price, item.quantity),
                location_name: form.location_name.trim().to_string(),
                status: OrderStatus::Pending,
            };
            for target in SubmitTarget::ALL {
                if let Err(source) = self.api.submit_order(&session.token, target, &submission).await {
                    warn!(
                        orderid = %item.orderid,
                        target = target.path(),
                        written,
                        "order submission failed; stopping checkout"
                    );
                    if matches!(source, ApiError::Unauthorized) {
                        self.expire_session().await;
                    }
                    return Err(StorefrontError::PartialCheckout {
                        written,
                        total: items.len(),
                        source,
                    });
                }
            }
            orders.push(submission.into_submitted());
        }

        let result = self
            .api
            .delete_all_orders(&session.token, &session.useremail)
            .await;
        self.guard(result).await?;
        self.cart.write().await.clear();

        let total = money::cart_total(&items);
        info!(items = orders.len(), total = %total, "checkout complete");
        Ok(CheckoutReceipt { orders, total })
    }

    #[instrument(skip_all)]
    pub async fn order_status(&self) -> Outcome<Vec<SubmittedOrder>> {
        let Some(session) = self.session.current() else {
            return Outcome::Unauthorized;
        };
        let result = self.api.get_status(&session.token).await;
        self.listing(result).await
    }

    #[instrument(skip_all)]
    pub async fn submit_feedback(&self, text: &str) -> Result<(), StorefrontError> {
        if text.trim().is_empty() {
            return Err(StorefrontError::Validation(FEEDBACK_EMPTY_MESSAGE));
        }
        let session = self.require_session()?;
        let result = self.api.send_feedback(&session.token, text).await;
        self.guard(result).await?;
        info!("feedback submitted");
        Ok(())
    }

    /// Ask the support agent; returns the agent's reply text.
    #[instrument(skip_all)]
    pub async fn ask_agent(&self, message: &str) -> Result<String, StorefrontError> {
        if message.trim().is_empty() {
            return Err(StorefrontError::Validation("Please type a message."));
        }
        let session = self.require_session()?;
        let result = self.api.call_agent(&session.token, message).await;
        let reply = self.guard(result).await?;
        Ok(reply
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| AGENT_UNKNOWN_REPLY.to_string()))
    }
}

/// Client-side order identifier: a v4 UUID in its 32-character hex form.
pub fn new_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}
