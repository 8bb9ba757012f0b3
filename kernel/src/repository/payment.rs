use crate::model::{
    booking::Booking,
    payment::{
        ConfirmPayment, InitializeTransaction, PaymentTicket, RequestPayment,
        TransactionInitialization, TransactionVerification,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    // tx_ref が未採番なら採番して保存する。採番済みなら同じ値を返す
    async fn request_payment(&self, event: RequestPayment) -> AppResult<PaymentTicket>;
    // tx_ref と取引 ID を検証して確定し、領収書番号を採番する
    async fn confirm_payment(&self, event: ConfirmPayment) -> AppResult<Booking>;
}

/// External payment processor. Every call is bounded by a timeout and
/// failures surface as `AppError::UpstreamError`.
#[mockall::automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, event: InitializeTransaction)
        -> AppResult<TransactionInitialization>;
    async fn verify(&self, reference: String) -> AppResult<TransactionVerification>;
    async fn fetch_transaction(&self, transaction_id: String) -> AppResult<serde_json::Value>;
    async fn list_transactions(&self) -> AppResult<serde_json::Value>;
}
