use crate::error::ApiError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Client for the payment gateway's order API. Credentials are server-held
/// and never appear in responses or error messages.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

impl GatewayClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    /// Opens an order at the gateway. `amount_minor` is the total in the
    /// gateway's minor currency unit and must already be validated > 0 by
    /// the caller. `notes` carries opaque reconciliation metadata.
    pub async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<GatewayOrder, ApiError> {
        let url = format!("{}/v1/orders", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
                "notes": notes,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "gateway order request failed");
                ApiError::upstream("payment gateway unreachable")
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!(status = %status, "gateway rejected order creation");
            return Err(ApiError::upstream("payment gateway rejected the order"));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "gateway order response invalid json");
            ApiError::upstream("payment gateway returned an invalid response")
        })
    }

    /// Checks the gateway's settlement attestation: an HMAC-SHA256 over
    /// `order_id|payment_id` issued with the shared key secret. This is the
    /// only code path that may treat a payment as settled.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        supplied: &str,
    ) -> bool {
        verify_payment_signature(&self.key_secret, order_id, payment_id, supplied)
    }
}

pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    let msg = format!("{order_id}|{payment_id}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(msg.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    supplied: &str,
) -> bool {
    let expect = payment_signature(secret, order_id, payment_id);
    expect
        .as_bytes()
        .ct_eq(supplied.trim().as_bytes())
        .unwrap_u8()
        == 1
}
