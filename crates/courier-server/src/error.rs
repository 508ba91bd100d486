use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::CourierError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Handlers return `Result<_, AppError>` and use `?` on anything that
/// converts into `anyhow::Error`; the status code is picked by downcasting
/// to `CourierError`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CourierError::InvalidRequest(msg.into()).into())
    }

    /// A JSON body axum could not read, reported as a 400 in the usual envelope.
    pub fn rejected(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }

    /// Construct a 404 Not Found error for an order id.
    pub fn order_not_found(id: impl Into<String>) -> Self {
        Self(CourierError::OrderNotFound(id.into()).into())
    }
}

fn status_for(err: &CourierError) -> StatusCode {
    match err {
        CourierError::OrderNotFound(_)
        | CourierError::PaymentNotFound(_)
        | CourierError::RiderNotFound(_)
        | CourierError::AttachmentNotFound(_) => StatusCode::NOT_FOUND,
        CourierError::MissingFields(_)
        | CourierError::InvalidRequest(_)
        | CourierError::InvalidStatus(_)
        | CourierError::InvalidPaymentStatus(_)
        | CourierError::UnsupportedPaymentMethod(_)
        | CourierError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
        CourierError::SignatureMismatch => StatusCode::UNAUTHORIZED,
        CourierError::NoRiderAvailable(_) | CourierError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        CourierError::Gateway(_) | CourierError::Storage(_) | CourierError::Mirror(_) => {
            StatusCode::BAD_GATEWAY
        }
        CourierError::Config(_)
        | CourierError::Io(_)
        | CourierError::Yaml(_)
        | CourierError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Some(err) = self.0.downcast_ref::<CourierError>() else {
            tracing::error!(error = %format!("{:#}", self.0), "unhandled request error");
            let body = serde_json::json!({ "success": false, "error": self.0.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
        };

        let status = status_for(err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }

        let mut body = serde_json::json!({ "success": false, "error": err.to_string() });
        if let CourierError::MissingFields(fields) = err {
            body["details"] = serde_json::json!(fields);
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn order_not_found_maps_to_404() {
        let response = AppError::order_not_found("JS-1-AAAA").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn payment_not_found_maps_to_404() {
        let err = AppError(CourierError::PaymentNotFound("PAY-1".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn attachment_not_found_maps_to_404() {
        let err = AppError(CourierError::AttachmentNotFound("a.png".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsupported_method_maps_to_400() {
        let err = AppError(CourierError::UnsupportedPaymentMethod("Stripe".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_request_constructor_maps_to_400() {
        let response = AppError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn signature_mismatch_maps_to_401() {
        let err = AppError(CourierError::SignatureMismatch.into());
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn no_rider_maps_to_409() {
        let err = AppError(CourierError::NoRiderAvailable("JS-1-AAAA".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn gateway_failure_maps_to_502() {
        let err = AppError(CourierError::Gateway("HTTP 500".into()).into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn io_error_maps_to_500() {
        let io_err = std::io::Error::other("disk full");
        let err = AppError(CourierError::Io(io_err).into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_courier_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_fields_body_lists_details() {
        let err = AppError(
            CourierError::MissingFields(vec!["senderName".into(), "itemSize".into()]).into(),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["details"], serde_json::json!(["senderName", "itemSize"]));
    }

    #[tokio::test]
    async fn body_carries_error_message() {
        let body = body_json(AppError::order_not_found("X-1").into_response()).await;
        assert_eq!(body["error"], "order not found: X-1");
    }
}
