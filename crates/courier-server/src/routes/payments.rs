use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use courier_core::payment::{status_from_gateway, Payment};
use courier_core::types::{PaymentMethod, PaymentStatus};
use courier_core::CourierError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::gateway::CheckoutRequest;
use crate::ledger;
use crate::state::AppState;

const CONFIRMATION_PAGE: &str = "/order-confirmation.html";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeBody {
    order_id: Option<String>,
    amount: Option<Value>,
    payment_method: Option<String>,
}

/// Amount as posted by a form: a JSON number or a numeric string.
fn parse_amount(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// POST /api/payment/initialize: open a gateway checkout for an order.
pub async fn initialize(
    State(app): State<AppState>,
    payload: Result<Json<InitializeBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload.map_err(AppError::rejected)?;
    let (Some(order_id), Some(raw_amount), Some(method)) = (
        non_blank(body.order_id),
        body.amount.filter(|a| !a.is_null()),
        non_blank(body.payment_method),
    ) else {
        return Err(AppError::bad_request(
            "Missing required fields: orderId, amount, or paymentMethod",
        ));
    };
    let amount = parse_amount(&raw_amount)
        .ok_or_else(|| AppError::bad_request("amount must be a positive number"))?;

    if app.orders.get(&order_id).is_none() {
        return Err(AppError::order_not_found(&order_id));
    }
    let method: PaymentMethod = method.parse()?;

    let request = CheckoutRequest {
        order_id: order_id.clone(),
        amount,
        currency: app.config.payments.currency.clone(),
        return_url: app.callback_url("/api/paypal/capture"),
        cancel_url: app.callback_url("/api/paypal/cancel"),
    };
    let checkout = app.gateway.create_order(&request).await?;

    let payment = Payment::pending(
        &checkout.id,
        &order_id,
        method,
        amount,
        &request.currency,
        json!({
            "gateway": app.gateway.name(),
            "gateway_status": checkout.status,
        }),
    );
    app.payments.insert(payment.clone())?;
    ledger::sync_order(&*app.payments, &*app.orders, &payment);
    tracing::info!(order_id = %order_id, reference = %checkout.id, amount, "payment initialized");

    Ok(Json(json!({
        "success": true,
        "paymentId": checkout.id,
        "approvalUrl": checkout.approval_url,
    })))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    token: Option<String>,
    #[serde(rename = "PayerID")]
    payer_id: Option<String>,
}

fn confirmation(order_id: &str, status: &str) -> Redirect {
    Redirect::to(&format!(
        "{CONFIRMATION_PAGE}?orderId={order_id}&status={status}"
    ))
}

fn callback_token(q: CallbackQuery) -> Result<(String, Option<String>), AppError> {
    let token = non_blank(q.token).ok_or_else(|| AppError::bad_request("Missing payment token"))?;
    Ok((token, non_blank(q.payer_id)))
}

/// GET /api/paypal/capture: payer approved; capture and redirect.
pub async fn capture(
    State(app): State<AppState>,
    Query(q): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let (token, payer_id) = callback_token(q)?;
    let payment = app
        .payments
        .get(&token)
        .ok_or_else(|| CourierError::PaymentNotFound(token.clone()))?;

    let captured = app.gateway.capture(&token).await?;
    let status = if captured.status == "COMPLETED" {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Processing
    };
    let details = json!({
        "gateway": app.gateway.name(),
        "gateway_status": captured.status,
        "payer_id": payer_id,
        "capture": captured.raw,
    });
    let updated = ledger::record_status(
        &*app.payments,
        &*app.orders,
        &token,
        status,
        Some(details),
    )?;
    Ok(confirmation(&payment.order_id, updated.status.as_str()))
}

/// GET /api/paypal/cancel: payer backed out.
pub async fn cancel(
    State(app): State<AppState>,
    Query(q): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    let (token, _) = callback_token(q)?;
    let payment = ledger::record_status(
        &*app.payments,
        &*app.orders,
        &token,
        PaymentStatus::Cancelled,
        None,
    )?;
    Ok(confirmation(&payment.order_id, "cancelled"))
}

fn payment_json(p: &Payment) -> Value {
    json!({
        "paymentStatus": p.status,
        "paymentMethod": p.method,
        "paymentReference": p.reference,
        "amount": p.amount,
        "currency": p.currency,
        "createdAt": p.created_at,
        "updatedAt": p.updated_at,
    })
}

/// GET /api/payment/status/{order_id}: latest payment, else the order's own
/// payment fields.
pub async fn status(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if let Some(p) = app.payments.latest_for_order(&order_id) {
        let mut body = payment_json(&p);
        body["success"] = json!(true);
        return Ok(Json(body));
    }
    let order = app
        .orders
        .get(&order_id)
        .ok_or_else(|| AppError::order_not_found(&order_id))?;
    Ok(Json(json!({
        "success": true,
        "paymentStatus": order.payment_status.map(|s| s.as_str()).unwrap_or("Unpaid"),
        "paymentMethod": order.payment_method,
        "paymentReference": null,
    })))
}

/// GET /api/payment/history/{order_id}: every payment attempt, newest first.
pub async fn history(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Json<Value> {
    Json(json!({
        "success": true,
        "payments": app.payments.for_order(&order_id),
    }))
}

/// GET /api/payment/check/{order_id}: poll the gateway for an open payment.
pub async fn check(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let payment = match app.payments.latest_for_order(&order_id) {
        Some(p) => p,
        None if app.orders.get(&order_id).is_none() => {
            return Err(AppError::order_not_found(&order_id))
        }
        None => return Err(CourierError::PaymentNotFound(order_id).into()),
    };

    if !payment.status.is_open() {
        return Ok(Json(json!({
            "success": true,
            "paymentStatus": payment.status,
            "changed": false,
        })));
    }

    let remote = app.gateway.order_details(&payment.reference).await?;
    let mapped = status_from_gateway(&remote.status).filter(|s| *s != payment.status);
    let current = match mapped {
        Some(next) => {
            let mut details = payment.details.clone();
            if let Value::Object(map) = &mut details {
                map.insert("gateway_status".into(), json!(remote.status));
            }
            ledger::record_status(
                &*app.payments,
                &*app.orders,
                &payment.reference,
                next,
                Some(details),
            )?
            .status
        }
        None => payment.status,
    };

    Ok(Json(json!({
        "success": true,
        "paymentStatus": current,
        "gatewayStatus": remote.status,
        "changed": mapped.is_some(),
    })))
}
