use super::{CheckoutRequest, GatewayOrder, PaymentGateway};
use courier_core::config::PayPalConfig;
use courier_core::{CourierError, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};

/// PayPal Orders v2 client. Every call fetches a fresh client-credentials
/// token.
pub struct PayPalGateway {
    client: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    brand_name: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn gateway_err(e: reqwest::Error) -> CourierError {
    CourierError::Gateway(e.to_string())
}

impl PayPalGateway {
    pub fn new(client: reqwest::Client, cfg: &PayPalConfig) -> Result<Self> {
        let (Some(id), Some(secret)) = (cfg.client_id.as_ref(), cfg.client_secret.as_ref()) else {
            return Err(CourierError::Config(
                "paypal gateway needs client_id and client_secret".into(),
            ));
        };
        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            client_id: id.clone(),
            client_secret: secret.clone(),
            brand_name: cfg.brand_name.clone(),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(gateway_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Gateway(format!(
                "authentication failed: HTTP {status}: {text}"
            )));
        }
        let token: TokenResponse = resp.json().await.map_err(gateway_err)?;
        Ok(token.access_token)
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value> {
        let token = self.access_token().await?;
        let mut req = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(gateway_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Gateway(format!("{path}: HTTP {status}: {text}")));
        }
        resp.json().await.map_err(gateway_err)
    }
}

/// Pull the id, status and payer approval link out of an Orders v2 body.
pub fn parse_order(raw: Value) -> Result<GatewayOrder> {
    let id = raw["id"]
        .as_str()
        .ok_or_else(|| CourierError::Gateway("response has no order id".into()))?
        .to_string();
    let status = raw["status"].as_str().unwrap_or("UNKNOWN").to_string();
    let approval_url = raw["links"].as_array().and_then(|links| {
        links
            .iter()
            .find(|l| matches!(l["rel"].as_str(), Some("approve" | "payer-action")))
            .and_then(|l| l["href"].as_str())
            .map(str::to_string)
    });
    Ok(GatewayOrder {
        id,
        status,
        approval_url,
        raw,
    })
}

#[async_trait::async_trait]
impl PaymentGateway for PayPalGateway {
    fn name(&self) -> &'static str {
        "paypal"
    }

    async fn create_order(&self, request: &CheckoutRequest) -> Result<GatewayOrder> {
        let payload = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.order_id,
                "custom_id": request.order_id,
                "amount": {
                    "currency_code": request.currency,
                    "value": format!("{:.2}", request.amount),
                },
                "description": format!("{} order #{}", self.brand_name, request.order_id),
            }],
            "application_context": {
                "brand_name": self.brand_name,
                "landing_page": "NO_PREFERENCE",
                "shipping_preference": "NO_SHIPPING",
                "user_action": "PAY_NOW",
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            }
        });
        let raw = self
            .call(reqwest::Method::POST, "/v2/checkout/orders", Some(payload))
            .await?;
        parse_order(raw)
    }

    async fn capture(&self, reference: &str) -> Result<GatewayOrder> {
        let raw = self
            .call(
                reqwest::Method::POST,
                &format!("/v2/checkout/orders/{reference}/capture"),
                Some(json!({})),
            )
            .await?;
        parse_order(raw)
    }

    async fn order_details(&self, reference: &str) -> Result<GatewayOrder> {
        let raw = self
            .call(
                reqwest::Method::GET,
                &format!("/v2/checkout/orders/{reference}"),
                None,
            )
            .await?;
        parse_order(raw)
    }
}
