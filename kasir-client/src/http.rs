//! HTTP client for the catalog and order services

use crate::service::{CatalogService, OrderService};
use crate::{ClientConfig, ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::ServiceErrorBody;
use shared::models::{
    CancelReceipt, CreateOrderRequest, HistoryQuery, Order, OrderPage, PaymentReceipt,
    PendingOrders, Product, ProductList, ProductQuery,
};
use shared::order::OrderStatus;
use std::time::Duration;
use uuid::Uuid;

/// HTTP client for making requests to the backend services
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ClientError::TransientNetwork(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Make a GET request
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = request.send().await?;
        Self::handle_response(response, None).await
    }

    /// Make a GET request with query parameters
    async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        let response = request.send().await?;
        Self::handle_response(response, None).await
    }

    /// Make a POST request with JSON body
    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        Self::handle_response(response, None).await
    }

    /// Make a POST request without body on behalf of one order
    async fn post_order_action<T: DeserializeOwned>(&self, id: Uuid, action: &str) -> ClientResult<T> {
        let path = format!("orders/{id}/{action}");
        let request = self.authorize(self.client.post(self.url(&path)));
        let response = request.send().await?;
        Self::handle_response(response, Some(id)).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        order_id: Option<Uuid>,
    ) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(error_from_status(status, &text, order_id));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(error = %e, "Undecodable response body");
            ClientError::InvalidResponse(e.to_string())
        })
    }
}

/// Server refusal text: the body's `detail`, else `message`/`error`, else raw
fn error_message(text: &str) -> String {
    serde_json::from_str::<ServiceErrorBody>(text)
        .ok()
        .and_then(ServiceErrorBody::into_message)
        .unwrap_or_else(|| text.trim().to_string())
}

/// Terminal status named in a conflict message ("Order is already PAID")
fn status_in_message(message: &str) -> Option<OrderStatus> {
    message
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_uppercase()))
        .filter_map(|word| word.parse::<OrderStatus>().ok())
        .find(OrderStatus::is_terminal)
}

fn error_from_status(status: StatusCode, text: &str, order_id: Option<Uuid>) -> ClientError {
    let message = error_message(text);
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        // The service answers 400 for actions on finalized orders
        StatusCode::CONFLICT | StatusCode::BAD_REQUEST => match (order_id, status_in_message(&message)) {
            (Some(order_id), Some(final_status)) => ClientError::Conflict {
                order_id,
                status: final_status,
                message,
            },
            _ => ClientError::Rejected {
                status: status.as_u16(),
                message,
            },
        },
        _ => ClientError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl CatalogService for HttpClient {
    async fn list_products(&self, query: &ProductQuery) -> ClientResult<ProductList> {
        self.get_query("products/", query).await
    }

    async fn get_by_barcode(&self, code: &str) -> ClientResult<Product> {
        let path = format!("products/barcode/{}", code.trim());
        self.get_json(&path).await
    }
}

#[async_trait]
impl OrderService for HttpClient {
    async fn create(&self, request: &CreateOrderRequest) -> ClientResult<Order> {
        self.post_json("orders/", request).await
    }

    async fn get(&self, id: Uuid) -> ClientResult<Order> {
        self.get_json(&format!("orders/{id}")).await
    }

    async fn get_pending(&self) -> ClientResult<PendingOrders> {
        self.get_json("orders/pending").await
    }

    async fn get_paid(&self, page: u32, page_size: u32) -> ClientResult<OrderPage> {
        self.get_query("orders/paid", &[("page", page), ("page_size", page_size)])
            .await
    }

    async fn pay(&self, id: Uuid) -> ClientResult<PaymentReceipt> {
        self.post_order_action(id, "pay").await
    }

    async fn cancel(&self, id: Uuid) -> ClientResult<CancelReceipt> {
        self.post_order_action(id, "cancel").await
    }

    async fn get_history(&self, query: &HistoryQuery) -> ClientResult<OrderPage> {
        self.get_query("orders/history/all", query).await
    }
}
