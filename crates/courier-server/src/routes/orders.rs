use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use courier_core::order::NewOrder;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/orders: validate, store, mirror and start progress.
pub async fn create_order(
    State(app): State<AppState>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let Json(body) = payload.map_err(AppError::rejected)?;
    let order = body.into_order(Utc::now())?;
    app.orders.insert(order.clone())?;
    tracing::info!(order_id = %order.id, sender = %order.sender_name, "order placed");

    match app.mirror.order_created(&order).await {
        Ok(Some(external)) => {
            app.orders
                .update(&order.id, &mut |o| o.external_ref = Some(external.clone()))?;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(order_id = %order.id, mirror = app.mirror.name(), error = %e, "order not mirrored");
        }
    }

    app.progress.schedule(&order.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "order": {
                "id": order.id,
                "status": order.status,
            }
        })),
    ))
}

/// GET /api/orders/{id}: full order snapshot.
pub async fn get_order(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = app
        .orders
        .get(&id)
        .ok_or_else(|| AppError::order_not_found(&id))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "order": order,
    })))
}
