//! Payment endpoints under `/api/payment/v1`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{EventId, OrderId, PaymentId, TicketNumber, TransactionStatus};
use payments::{CreateIntent, OrderDetail, PageMeta, PaymentStatusView, PaymentSummary};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, RequestUser};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_PAGE_SIZE: u64 = 10;

// -- Request types --

#[derive(Deserialize)]
pub struct SaveRequest {
    pub ticket_number: String,
    pub event_id: String,
    /// Bank code such as `bca` or `permata`.
    pub payment_type: String,
}

#[derive(Deserialize)]
pub struct PaymentIdQuery {
    pub payment_id: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

// -- Response types --

/// Success wrapper shared by every payment endpoint.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> Envelope<T> {
    fn new(data: T, message: &'static str) -> Self {
        Self {
            data,
            message,
            meta: None,
        }
    }
}

#[derive(Serialize)]
pub struct SavedPayment {
    pub payment_id: PaymentId,
    pub transaction_status: TransactionStatus,
}

#[derive(Serialize)]
pub struct FinalizedResponse {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, ApiError> {
    raw.trim()
        .parse::<PaymentId>()
        .map_err(|_| ApiError::BadRequest(format!("invalid payment id: {raw}")))
}

fn required(field: &str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}

// -- Handlers --

/// POST /api/payment/v1/save
pub async fn save(
    State(state): State<Arc<AppState>>,
    RequestUser(user_id): RequestUser,
    ApiJson(req): ApiJson<SaveRequest>,
) -> Result<(StatusCode, Json<Envelope<SavedPayment>>), ApiError> {
    let cmd = CreateIntent {
        ticket_number: TicketNumber::new(required("ticket_number", req.ticket_number)?),
        event_id: EventId::new(required("event_id", req.event_id)?),
        user_id,
        bank: req.payment_type,
    };

    let created = state.intents.create(cmd).await?;
    let data = SavedPayment {
        payment_id: created.payment_id,
        transaction_status: created.transaction_status,
    };
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(data, "payment created")),
    ))
}

/// GET /api/payment/v1/status?payment_id=
pub async fn status(
    State(state): State<Arc<AppState>>,
    _user: RequestUser,
    ApiQuery(query): ApiQuery<PaymentIdQuery>,
) -> Result<Json<Envelope<PaymentStatusView>>, ApiError> {
    let payment_id = parse_payment_id(&query.payment_id)?;
    let view = state.queries.payment_status(payment_id).await?;
    Ok(Json(Envelope::new(view, "payment status")))
}

/// GET /api/payment/v1/order-status?payment_id=
pub async fn order_status(
    State(state): State<Arc<AppState>>,
    RequestUser(user_id): RequestUser,
    ApiQuery(query): ApiQuery<PaymentIdQuery>,
) -> Result<Json<Envelope<OrderDetail>>, ApiError> {
    let payment_id = parse_payment_id(&query.payment_id)?;
    let detail = state.queries.order_detail(payment_id, &user_id).await?;
    Ok(Json(Envelope::new(detail, "order detail")))
}

/// GET /api/payment/v1/list?page=&size=
pub async fn list(
    State(state): State<Arc<AppState>>,
    RequestUser(user_id): RequestUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Envelope<Vec<PaymentSummary>>>, ApiError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);
    let found = state.queries.list(&user_id, page, size).await?;
    Ok(Json(Envelope {
        data: found.items,
        message: "payment list",
        meta: Some(found.meta),
    }))
}

/// GET /api/payment/v1/callback/{payment_id}
///
/// Invoked by the gateway redirect or a manual confirm; carries no user.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<String>,
) -> Result<Json<Envelope<FinalizedResponse>>, ApiError> {
    let payment_id = parse_payment_id(&payment_id)?;
    let finalized = state.finalizer.finalize(payment_id).await?;
    Ok(Json(Envelope::new(
        FinalizedResponse {
            order_id: finalized.order_id,
            payment_id: finalized.payment_id,
        },
        "order created",
    )))
}
