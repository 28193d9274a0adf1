use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::app_error::{AppError, AppResult};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signature timestamps older or newer than this are rejected.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", self.secret_key));
        format!("Basic {}", encoded)
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(
        &self,
        email: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> AppResult<StripeCustomer> {
        let mut params: Vec<(String, String)> = vec![("email".to_string(), email.to_string())];

        if let Some(meta) = metadata {
            for (key, value) in meta {
                params.push((format!("metadata[{}]", key), value));
            }
        }

        let response = self
            .client
            .post(format!("{}/customers", STRIPE_API_BASE))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    pub async fn get_or_create_customer(
        &self,
        email: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> AppResult<StripeCustomer> {
        // Search for existing customer by email
        let response = self
            .client
            .get(format!("{}/customers", STRIPE_API_BASE))
            .header("Authorization", self.auth_header())
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        let list: StripeCustomerList = self.handle_response(response).await?;
        if let Some(customer) = list.data.into_iter().next() {
            return Ok(customer);
        }

        self.create_customer(email, metadata).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
        client_reference_id: Option<&str>,
    ) -> AppResult<StripeCheckoutSession> {
        let mut params: Vec<(String, String)> = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        if let Some(ref_id) = client_reference_id {
            params.push(("client_reference_id".to_string(), ref_id.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Customer Portal
    // ========================================================================

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<StripePortalSession> {
        let params = vec![("customer", customer_id), ("return_url", return_url)];

        let response = self
            .client
            .post(format!("{}/billing_portal/sessions", STRIPE_API_BASE))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    /// Authenticate a webhook delivery against the shared webhook secret.
    ///
    /// The header carries `t=<unix_ts>,v1=<hex_hmac>,...`; the MAC is
    /// HMAC-SHA256 over `"{t}.{raw_body}"`. Pure check, no side effects;
    /// any failure means the request is rejected without touching state.
    pub fn verify_webhook_signature(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
    ) -> AppResult<()> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let kv: Vec<&str> = part.splitn(2, '=').collect();
            if kv.len() != 2 {
                continue;
            }
            match kv[0] {
                "t" => timestamp = Some(kv[1]),
                "v1" => signatures.push(kv[1]),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::InvalidInput("Missing timestamp in signature".into()))?;

        if signatures.is_empty() {
            return Err(AppError::InvalidInput("Missing signature".into()));
        }

        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("HMAC error".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        for sig in signatures {
            if constant_time_compare(sig, &expected) {
                let ts: i64 = timestamp
                    .parse()
                    .map_err(|_| AppError::InvalidInput("Invalid timestamp".into()))?;
                let now = chrono::Utc::now().timestamp();
                if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
                    return Err(AppError::InvalidInput("Timestamp too old".into()));
                }
                return Ok(());
            }
        }

        Err(AppError::InvalidInput("Invalid signature".into()))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::InvalidInput(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Internal(format!(
                "Stripe API error: {} - {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerList {
    pub data: Vec<StripeCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}
