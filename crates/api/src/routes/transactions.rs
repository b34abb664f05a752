//! Transaction reversal routes.
//!
//! Deleting a transaction reverses every balance, party and category change
//! it made before the record is removed.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde_json::json;
use tracing::{error, warn};

use safar_core::reversal::ReversalError;
use safar_shared::AppError;

use crate::AppState;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/{transaction_id}", delete(delete_transaction))
        .route(
            "/transactions/{transaction_id}/reversal",
            get(preview_reversal),
        )
}

/// DELETE `/transactions/{transaction_id}`
///
/// Reverses and deletes a transaction addressed by id or transaction code.
async fn delete_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Response {
    match state.engine.reverse_and_delete(&transaction_id).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Transaction deleted successfully",
                "reversal": report
            })),
        )
            .into_response(),
        Err(e) => reversal_error(&transaction_id, e),
    }
}

/// GET `/transactions/{transaction_id}/reversal`
///
/// Returns the deltas a delete would apply, without applying them.
async fn preview_reversal(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Response {
    match state.engine.preview(&transaction_id).await {
        Ok(plan) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": plan
            })),
        )
            .into_response(),
        Err(e) => reversal_error(&transaction_id, e),
    }
}

fn reversal_error(transaction_id: &str, err: ReversalError) -> Response {
    if err.status_code() >= 500 {
        error!(transaction_id, error = %err, "Transaction reversal failed");
    } else {
        warn!(transaction_id, error = %err, "Transaction reversal rejected");
    }

    let code = err.error_code();
    let app_error = AppError::from(err);
    let status =
        StatusCode::from_u16(app_error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(json!({
            "success": false,
            "error": code,
            "message": app_error.message()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use safar_core::reversal::{
        FailPoint, LedgerAccount, MemoryStore, ReversalEngine, TransactionKind, TransactionRecord,
    };
    use tower::ServiceExt;

    use crate::create_router;

    fn app(store: &MemoryStore) -> Router {
        create_router(AppState {
            engine: Arc::new(ReversalEngine::new(Arc::new(store.clone()))),
        })
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn seeded() -> (MemoryStore, TransactionRecord, LedgerAccount) {
        let store = MemoryStore::new();
        let account = LedgerAccount::with_opening_balance("Bank", dec!(1000));
        let tx = TransactionRecord::new(TransactionKind::Credit, dec!(200))
            .with_code("TRX-API-1")
            .with_target_account(account.id);
        store.insert_account(account.clone()).await;
        store.insert_transaction(tx.clone()).await;
        (store, tx, account)
    }

    #[tokio::test]
    async fn test_delete_returns_success() {
        let (store, tx, account) = seeded().await;

        let (status, json) = send(
            app(&store),
            "DELETE",
            &format!("/api/v1/transactions/{}", tx.id),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["reversal"]["transaction_code"], "TRX-API-1");
        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(800));
    }

    #[tokio::test]
    async fn test_delete_by_code() {
        let (store, tx, _) = seeded().await;

        let (status, _) = send(app(&store), "DELETE", "/api/v1/transactions/TRX-API-1").await;

        assert_eq!(status, StatusCode::OK);
        assert!(store.transaction(tx.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_twice_returns_not_found() {
        let (store, tx, _) = seeded().await;
        let uri = format!("/api/v1/transactions/{}", tx.id);

        send(app(&store), "DELETE", &uri).await;
        let (status, json) = send(app(&store), "DELETE", &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Transaction not found");
        assert_eq!(json["error"], "TRANSACTION_NOT_FOUND");
    }

    #[rstest]
    #[case("/api/v1/transactions/TRX%20BAD")]
    #[case("/api/v1/transactions/TRX;1")]
    #[tokio::test]
    async fn test_delete_malformed_id_returns_bad_request(#[case] uri: &str) {
        let (store, _, _) = seeded().await;

        let (status, json) = send(app(&store), "DELETE", uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "INVALID_TRANSACTION_ID");
    }

    #[tokio::test]
    async fn test_storage_failure_returns_500_with_message() {
        let (store, tx, account) = seeded().await;
        let failing = store.clone().fail_at(FailPoint::DeleteTransaction);

        let (status, json) = send(
            app(&failing),
            "DELETE",
            &format!("/api/v1/transactions/{}", tx.id),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .contains("DeleteTransaction")
        );
        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(1000));
        assert!(store.transaction(tx.id).await.is_some());
    }

    #[tokio::test]
    async fn test_preview_returns_plan_without_deleting() {
        let (store, tx, account) = seeded().await;

        let (status, json) = send(
            app(&store),
            "GET",
            "/api/v1/transactions/TRX-API-1/reversal",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["kind"], "credit");
        assert_eq!(json["data"]["accounts"][0]["delta"], "-200");
        assert!(store.transaction(tx.id).await.is_some());
        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(1000));
    }

    #[tokio::test]
    async fn test_health() {
        let store = MemoryStore::new();

        let (status, json) = send(app(&store), "GET", "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["family_recompute"], "advisory");
    }
}
