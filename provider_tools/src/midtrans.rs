use std::{str::FromStr, sync::Arc};

use admission_engine::{
    helpers::parse_gateway_time,
    traits::{ChargeRequest, ChargeResult, GatewayError, PaymentGateway},
    PaymentNotification,
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::{json, Value};

use crate::{config::MidtransConfig, helpers::hex_digest, ProviderApiError};

/// The payment methods the gateway can charge, and how the applicant pays each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeMethod {
    /// Bank transfer to a virtual account at the named bank
    BankTransfer(&'static str),
    /// Permata virtual account
    Permata,
    /// Mandiri bill payment (`echannel`)
    Mandiri,
    /// GoPay deeplink
    Gopay,
    /// QRIS code
    Qris,
}

impl FromStr for ChargeMethod {
    type Err = ProviderApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bca" => Ok(Self::BankTransfer("bca")),
            "bni" => Ok(Self::BankTransfer("bni")),
            "bri" => Ok(Self::BankTransfer("bri")),
            "cimb" => Ok(Self::BankTransfer("cimb")),
            "permata" => Ok(Self::Permata),
            "mandiri" | "echannel" => Ok(Self::Mandiri),
            "gopay" => Ok(Self::Gopay),
            "qris" => Ok(Self::Qris),
            other => Err(ProviderApiError::UnsupportedPaymentMethod(other.to_string())),
        }
    }
}

impl ChargeMethod {
    /// The method-specific part of the charge request body.
    fn decorate(&self, body: &mut Value) {
        match self {
            Self::BankTransfer(bank) => {
                body["payment_type"] = json!("bank_transfer");
                body["bank_transfer"] = json!({ "bank": bank });
            },
            Self::Permata => body["payment_type"] = json!("permata"),
            Self::Mandiri => {
                body["payment_type"] = json!("echannel");
                body["echannel"] = json!({ "bill_info1": "Payment:", "bill_info2": "School admission" });
            },
            Self::Gopay => body["payment_type"] = json!("gopay"),
            Self::Qris => body["payment_type"] = json!("qris"),
        }
    }

    /// Pulls out what the applicant pays with: a virtual account number, a bill key, or a QR/deeplink URL.
    pub fn payment_code(&self, response: &Value) -> Result<String, ProviderApiError> {
        let code = match self {
            Self::BankTransfer(_) => response["va_numbers"][0]["va_number"].as_str(),
            Self::Permata => response["permata_va_number"].as_str(),
            Self::Mandiri => response["bill_key"].as_str(),
            Self::Gopay => action_url(response, "deeplink-redirect").or_else(|| action_url(response, "generate-qr-code")),
            Self::Qris => action_url(response, "generate-qr-code"),
        };
        code.map(String::from).ok_or_else(|| ProviderApiError::MissingField(format!("a payment code for {self:?}")))
    }
}

fn action_url<'a>(response: &'a Value, name: &str) -> Option<&'a str> {
    response["actions"].as_array()?.iter().find(|a| a["name"] == name).and_then(|a| a["url"].as_str())
}

/// `sha512(order_id + status_code + gross_amount + server_key)`, hex encoded.
pub fn notification_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    hex_digest(&format!("{order_id}{status_code}{gross_amount}{server_key}"))
}

#[derive(Clone)]
pub struct MidtransClient {
    config: MidtransConfig,
    client: Arc<Client>,
}

impl MidtransClient {
    pub fn new(config: MidtransConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(3);
        let auth = format!("Basic {}", base64::encode(format!("{}:", config.server_key.reveal())));
        let val = HeaderValue::from_str(&auth).map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// The charge request body for the gateway's core API.
    pub fn charge_body(&self, method: ChargeMethod, request: &ChargeRequest) -> Value {
        let items = request
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                json!({ "id": (i + 1).to_string(), "name": item.item_name, "price": item.item_price, "quantity": 1 })
            })
            .collect::<Vec<_>>();
        let mut body = json!({
            "transaction_details": { "order_id": request.invoice, "gross_amount": request.total },
            "item_details": items,
            "custom_expiry": { "expiry_duration": self.config.expiry_minutes, "unit": "minute" },
        });
        method.decorate(&mut body);
        body
    }

    pub async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderApiError> {
        let method = request.payment_method.parse::<ChargeMethod>()?;
        let body = self.charge_body(method, request);
        trace!("💳️ Sending charge for {}: {body}", request.invoice);
        let response = self
            .client
            .post(self.url("/v2/charge"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        let status = response.status();
        let result = response.json::<Value>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
        trace!("💳️ Charge response for {}: {result}", request.invoice);
        if !status.is_success() {
            let message = result["status_message"].as_str().unwrap_or("no message").to_string();
            return Err(ProviderApiError::QueryError { status: status.as_u16(), message });
        }
        parse_charge_response(method, &result)
    }

    pub fn verify(&self, notification: &PaymentNotification) -> bool {
        if !self.config.verify_signature {
            return true;
        }
        let Some(signature) = notification.signature_key.as_deref() else {
            return false;
        };
        let expected = notification_signature(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            self.config.server_key.reveal(),
        );
        expected.eq_ignore_ascii_case(signature)
    }
}

/// The gateway answers with HTTP 200 even when it refuses a charge; the real outcome is in `status_code`.
fn parse_charge_response(method: ChargeMethod, result: &Value) -> Result<ChargeResult, ProviderApiError> {
    let status_code = result["status_code"].as_str().unwrap_or_default();
    if !matches!(status_code, "200" | "201") {
        let message = result["status_message"].as_str().unwrap_or("no message").to_string();
        return Err(ProviderApiError::QueryError { status: status_code.parse().unwrap_or(0), message });
    }
    let payment_code = method.payment_code(result)?;
    let transaction_time = result["transaction_time"]
        .as_str()
        .and_then(parse_gateway_time)
        .ok_or_else(|| ProviderApiError::MissingField("transaction_time".into()))?;
    let expiry = result["expiry_time"].as_str().and_then(parse_gateway_time);
    Ok(ChargeResult { payment_code, transaction_time, expiry })
}

impl From<ProviderApiError> for GatewayError {
    fn from(e: ProviderApiError) -> Self {
        match e {
            ProviderApiError::UnsupportedPaymentMethod(m) => GatewayError::UnsupportedMethod(m),
            ProviderApiError::QueryError { .. } => GatewayError::Rejected(e.to_string()),
            ProviderApiError::RestRequestError(_) | ProviderApiError::Initialization(_) => {
                GatewayError::Unavailable(e.to_string())
            },
            _ => GatewayError::InvalidResponse(e.to_string()),
        }
    }
}

impl PaymentGateway for MidtransClient {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        let result = self.create_charge(&request).await.map_err(|e| {
            warn!("💳️ Charge for {} failed. {e}", request.invoice);
            GatewayError::from(e)
        })?;
        debug!("💳️ Charge for {} created. Payment code {}", request.invoice, result.payment_code);
        Ok(result)
    }

    fn verify_notification(&self, notification: &PaymentNotification) -> bool {
        self.verify(notification)
    }
}
