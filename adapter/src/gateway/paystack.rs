use std::time::Duration;

use async_trait::async_trait;
use kernel::{
    model::payment::{InitializeTransaction, TransactionInitialization, TransactionVerification},
    repository::payment::PaymentGateway,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    config::PaymentConfig,
    error::{AppError, AppResult},
};

// ゲートウェイは最小通貨単位（kobo）でやり取りする
const MINOR_UNITS: i64 = 100;

/// HTTP client for the Paystack transaction API.
pub struct PaystackClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::UpstreamError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> AppResult<T> {
        let resp = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(upstream)?;
        let status = resp.status();
        let body = resp.text().await.map_err(upstream)?;
        if !status.is_success() {
            tracing::warn!(%status, "payment gateway rejected the request");
            return Err(AppError::UpstreamError(gateway_message(&body).unwrap_or_else(
                || format!("payment gateway responded with {status}"),
            )));
        }
        serde_json::from_str(&body).map_err(|e| AppError::UpstreamError(e.to_string()))
    }
}

fn upstream(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamError("payment gateway timed out".into())
    } else {
        AppError::UpstreamError(e.to_string())
    }
}

fn to_minor_units(amount: i64) -> AppResult<i64> {
    amount
        .checked_mul(MINOR_UNITS)
        .ok_or_else(|| AppError::InvalidInput(format!("amount {amount} is out of range")))
}

fn gateway_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|error| error.message)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Deserialize)]
struct VerifyData {
    id: Option<serde_json::Value>,
    reference: String,
    status: String,
    amount: i64,
    currency: Option<String>,
}

impl From<VerifyData> for TransactionVerification {
    fn from(value: VerifyData) -> Self {
        let VerifyData {
            id,
            reference,
            status,
            amount,
            currency,
        } = value;
        TransactionVerification {
            reference,
            status,
            amount: amount / MINOR_UNITS,
            currency,
            // ID は数値で返ってくるが、文字列として扱う
            transaction_id: id.map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        event: InitializeTransaction,
    ) -> AppResult<TransactionInitialization> {
        let body = InitializeBody {
            email: &event.email,
            amount: to_minor_units(event.amount)?,
            reference: event.reference.as_deref(),
            callback_url: event.callback_url.as_deref(),
        };
        let envelope: Envelope<InitializeData> = self
            .send(self.http.post(self.url("/transaction/initialize")).json(&body))
            .await?;
        let InitializeData {
            authorization_url,
            access_code,
            reference,
        } = envelope.data;
        Ok(TransactionInitialization {
            authorization_url,
            access_code,
            reference,
        })
    }

    async fn verify(&self, reference: String) -> AppResult<TransactionVerification> {
        let envelope: Envelope<VerifyData> = self
            .send(
                self.http
                    .get(self.url(&format!("/transaction/verify/{reference}"))),
            )
            .await?;
        Ok(envelope.data.into())
    }

    async fn fetch_transaction(&self, transaction_id: String) -> AppResult<serde_json::Value> {
        self.send(self.http.get(self.url(&format!("/transaction/{transaction_id}"))))
            .await
    }

    async fn list_transactions(&self) -> AppResult<serde_json::Value> {
        self.send(self.http.get(self.url("/transaction"))).await
    }
}
