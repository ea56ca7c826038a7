use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::analysis::ReceiptAnalyzer;
use super::domain::{
    BulkReviewRequest, PaymentCodeRequest, ReceiptId, ReceiptUpload, ReviewRequest,
};
use super::listing::ReceiptQuery;
use super::repository::PortalRepository;
use super::service::{PortalService, PortalServiceError};

const DEFAULT_ACTIVITY_LIMIT: usize = 10;

type SharedService<R, A> = State<Arc<PortalService<R, A>>>;

/// Router builder exposing the student and admin endpoints.
pub fn portal_router<R, A>(service: Arc<PortalService<R, A>>) -> Router
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    Router::new()
        .route("/api/payment-codes", post(generate_code_handler::<R, A>))
        .route("/api/payment-codes/:code", get(code_details_handler::<R, A>))
        .route(
            "/api/payment-codes/:code/verify",
            get(verify_code_handler::<R, A>),
        )
        .route(
            "/api/receipts",
            post(submit_receipt_handler::<R, A>).get(list_receipts_handler::<R, A>),
        )
        .route(
            "/api/receipts/bulk-update",
            post(bulk_update_handler::<R, A>),
        )
        .route(
            "/api/receipts/reference/:reference_id",
            get(receipt_by_reference_handler::<R, A>),
        )
        .route(
            "/api/receipts/:id",
            get(receipt_handler::<R, A>).patch(review_handler::<R, A>),
        )
        .route("/api/dashboard/metrics", get(metrics_handler::<R, A>))
        .route("/api/dashboard/activities", get(activities_handler::<R, A>))
        .with_state(service)
}

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

fn failure(error: PortalServiceError) -> Response {
    let status = match &error {
        PortalServiceError::Validation(_) | PortalServiceError::ExpiredPaymentCode => {
            StatusCode::BAD_REQUEST
        }
        PortalServiceError::UnknownPaymentCode | PortalServiceError::UnknownReceipt => {
            StatusCode::NOT_FOUND
        }
        PortalServiceError::DuplicateReceipt => StatusCode::CONFLICT,
        PortalServiceError::CodeLifetimeOutOfRange { .. } | PortalServiceError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        PortalServiceError::Validation(errors) => json!({
            "success": false,
            "error": error.to_string(),
            "errors": errors.violations(),
        }),
        _ => json!({
            "success": false,
            "error": error.to_string(),
        }),
    };

    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, PortalServiceError>) -> Response {
    match result {
        Ok(data) => success(status, data),
        Err(error) => failure(error),
    }
}

pub(crate) async fn generate_code_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(request): Json<PaymentCodeRequest>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::CREATED, service.generate_code(request, Utc::now()))
}

pub(crate) async fn code_details_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(code): Path<String>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.code_details(&code))
}

pub(crate) async fn verify_code_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(code): Path<String>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.verify_code(&code, Utc::now()))
}

pub(crate) async fn submit_receipt_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(upload): Json<ReceiptUpload>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    let result = service
        .submit_receipt(upload, Utc::now())
        .map(|record| record.submission_view());
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn list_receipts_handler<R, A>(
    State(service): SharedService<R, A>,
    Query(query): Query<ReceiptQuery>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.list_receipts(&query))
}

pub(crate) async fn receipt_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(id): Path<String>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.receipt(&ReceiptId(id)))
}

pub(crate) async fn receipt_by_reference_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(reference_id): Path<String>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.receipt_by_reference(&reference_id))
}

pub(crate) async fn review_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(
        StatusCode::OK,
        service.review_receipt(&ReceiptId(id), request, Utc::now()),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateView<T> {
    updated_count: usize,
    receipts: Vec<T>,
}

pub(crate) async fn bulk_update_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(request): Json<BulkReviewRequest>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    let result = service
        .bulk_review(request, Utc::now())
        .map(|receipts| BulkUpdateView {
            updated_count: receipts.len(),
            receipts,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn metrics_handler<R, A>(State(service): SharedService<R, A>) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    respond(StatusCode::OK, service.metrics())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActivityQuery {
    limit: Option<usize>,
}

pub(crate) async fn activities_handler<R, A>(
    State(service): SharedService<R, A>,
    Query(query): Query<ActivityQuery>,
) -> Response
where
    R: PortalRepository + 'static,
    A: ReceiptAnalyzer + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    respond(StatusCode::OK, service.recent_activity(limit))
}
