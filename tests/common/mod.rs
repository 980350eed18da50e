#![allow(dead_code)]

use async_trait::async_trait;
use bistro::api::model::{AgentReply, CartItemRequest, OrderSubmission, SigninRequest};
use bistro::api::{StorefrontApi, SubmitTarget};
use bistro::error::{ApiError, ApiResult};
use bistro::model::{CartOrderItem, MenuItem, OrderStatus, SessionToken, SubmittedOrder};
use bistro::session::{MemoryStorage, SessionHolder};
use bistro::storefront::Storefront;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SignIn(String),
    GetMenu(String),
    AddOrderItem(CartItemRequest),
    GetOrders(String),
    DeleteOrder(String),
    DeleteAllOrders(String),
    Submit(SubmitTarget, OrderSubmission),
    GetStatus(String),
    Feedback(String),
    CallAgent(String),
}

/// Fake API that records every call and answers from per-operation queues.
/// Empty queues fall back to a successful default.
#[derive(Clone, Default)]
pub struct RecordingApi {
    calls: Arc<Mutex<Vec<Call>>>,
    sign_in: Arc<Mutex<VecDeque<ApiResult<SessionToken>>>>,
    menu: Arc<Mutex<VecDeque<ApiResult<Vec<MenuItem>>>>>,
    orders: Arc<Mutex<VecDeque<ApiResult<Vec<CartOrderItem>>>>>,
    status: Arc<Mutex<VecDeque<ApiResult<Vec<SubmittedOrder>>>>>,
    mutations: Arc<Mutex<VecDeque<ApiResult<()>>>>,
    agent: Arc<Mutex<VecDeque<ApiResult<AgentReply>>>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_sign_in(&self, r: ApiResult<SessionToken>) {
        self.sign_in.lock().await.push_back(r);
    }

    pub async fn push_menu(&self, r: ApiResult<Vec<MenuItem>>) {
        self.menu.lock().await.push_back(r);
    }

    pub async fn push_orders(&self, r: ApiResult<Vec<CartOrderItem>>) {
        self.orders.lock().await.push_back(r);
    }

    pub async fn push_status(&self, r: ApiResult<Vec<SubmittedOrder>>) {
        self.status.lock().await.push_back(r);
    }

    /// Queue the answer for the next add/delete/submit/feedback call.
    pub async fn push_mutation(&self, r: ApiResult<()>) {
        self.mutations.lock().await.push_back(r);
    }

    pub async fn push_agent(&self, r: ApiResult<AgentReply>) {
        self.agent.lock().await.push_back(r);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn status_calls(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, Call::GetStatus(_)))
            .count()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn next_mutation(&self) -> ApiResult<()> {
        self.mutations.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl StorefrontApi for RecordingApi {
    async fn sign_in(&self, request: &SigninRequest) -> ApiResult<SessionToken> {
        self.record(Call::SignIn(request.useremail.clone())).await;
        self.sign_in
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(session()))
    }

    async fn get_menu(&self, token: &str) -> ApiResult<Vec<MenuItem>> {
        self.record(Call::GetMenu(token.to_string())).await;
        self.menu
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(vec![menu_item(1, "Masala Dosa", "9.99")]))
    }

    async fn add_order_item(&self, _token: &str, item: &CartItemRequest) -> ApiResult<()> {
        self.record(Call::AddOrderItem(item.clone())).await;
        self.next_mutation().await
    }

    async fn get_orders(&self, token: &str) -> ApiResult<Vec<CartOrderItem>> {
        self.record(Call::GetOrders(token.to_string())).await;
        self.orders
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(ApiError::NotFound))
    }

    async fn delete_order(&self, _token: &str, orderid: &str) -> ApiResult<()> {
        self.record(Call::DeleteOrder(orderid.to_string())).await;
        self.next_mutation().await
    }

    async fn delete_all_orders(&self, _token: &str, useremail: &str) -> ApiResult<()> {
        self.record(Call::DeleteAllOrders(useremail.to_string()))
            .await;
        self.next_mutation().await
    }

    async fn submit_order(
        &self,
        _token: &str,
        target: SubmitTarget,
        order: &OrderSubmission,
    ) -> ApiResult<()> {
        self.record(Call::Submit(target, order.clone())).await;
        self.next_mutation().await
    }

    async fn get_status(&self, token: &str) -> ApiResult<Vec<SubmittedOrder>> {
        self.record(Call::GetStatus(token.to_string())).await;
        self.status
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(vec![submitted("ord-1", OrderStatus::Pending)]))
    }

    async fn send_feedback(&self, _token: &str, text: &str) -> ApiResult<()> {
        self.record(Call::Feedback(text.to_string())).await;
        self.next_mutation().await
    }

    async fn call_agent(&self, _token: &str, message: &str) -> ApiResult<AgentReply> {
        self.record(Call::CallAgent(message.to_string())).await;
        self.agent.lock().await.pop_front().unwrap_or_else(|| {
            Ok(AgentReply {
                message: Some("How can I help?".into()),
            })
        })
    }
}

pub fn session() -> SessionToken {
    SessionToken {
        token: "tok-123".into(),
        username: "Asha".into(),
        useremail: "asha@example.com".into(),
    }
}

pub fn menu_item(id: i64, title: &str, price: &str) -> MenuItem {
    MenuItem {
        id,
        title: title.into(),
        description: format!("{} from the kitchen", title),
        price: price.into(),
        image: String::new(),
        rating: 4,
    }
}

pub fn cart_item(orderid: &str, name: &str, price: &str, quantity: u32) -> CartOrderItem {
    CartOrderItem {
        id: 1,
        orderid: orderid.into(),
        name: name.into(),
        description: format!("{} description", name),
        price: price.into(),
        quantity,
    }
}

pub fn submitted(orderid: &str, status: OrderStatus) -> SubmittedOrder {
    SubmittedOrder {
        orderid: orderid.into(),
        name: "Asha".into(),
        table_no: "4".into(),
        useremail: "asha@example.com".into(),
        item_name: "Masala Dosa".into(),
        item_description: String::new(),
        price: "9.99".into(),
        quantity: 1,
        total: Decimal::new(999, 2),
        location_name: String::new(),
        status,
    }
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".into(),
    }
}

/// Storefront over the fake API with in-memory session storage.
pub async fn storefront(api: &RecordingApi, signed_in: bool) -> Storefront {
    let holder = SessionHolder::open(MemoryStorage::default()).await.unwrap();
    if signed_in {
        holder.save(session()).await.unwrap();
    }
    Storefront::new(Arc::new(api.clone()), holder)
}
