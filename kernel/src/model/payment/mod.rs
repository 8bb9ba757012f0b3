use crate::model::{
    booking::{Booking, BookingStatus},
    id::{BookingId, UserId},
    user::BookingUser,
};
use derive_new::new;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

const TX_REF_LEN: usize = 24;
const TX_REF_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Opaque reference that ties a booking to a payment-processor session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value = (0..TX_REF_LEN)
            .map(|_| TX_REF_CHARSET[rng.gen_range(0..TX_REF_CHARSET.len())] as char)
            .collect();
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TxRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<TxRef> for String {
    fn from(value: TxRef) -> Self {
        value.0
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(new, Debug)]
pub struct RequestPayment {
    pub booking_id: BookingId,
    pub requested_by: UserId,
}

#[derive(new, Debug)]
pub struct ConfirmPayment {
    pub booking_id: BookingId,
    pub requested_by: UserId,
    pub tx_ref: String,
    pub transaction_id: String,
}

// 決済開始に必要な情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTicket {
    pub booking_id: BookingId,
    pub tx_ref: TxRef,
    pub amount: i64,
    pub customer: BookingUser,
    pub space_name: String,
}

// 所有者以外には予約の存在自体を見せない
pub fn ensure_payable(booking: &Booking, requested_by: UserId) -> AppResult<()> {
    if !booking.is_owned_by(requested_by) {
        return Err(AppError::EntityNotFound(format!(
            "Booking ({}) not found",
            booking.booking_id
        )));
    }
    if booking.status != BookingStatus::Pending {
        return Err(AppError::UnprocessableEntity(format!(
            "Booking ({}) is not pending",
            booking.booking_id
        )));
    }
    Ok(())
}

pub fn ensure_confirmable(booking: &Booking, event: &ConfirmPayment) -> AppResult<()> {
    ensure_payable(booking, event.requested_by)?;
    if event.transaction_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "transaction id must not be empty".into(),
        ));
    }
    match &booking.tx_ref {
        Some(tx_ref) if tx_ref.as_str() == event.tx_ref => Ok(()),
        Some(_) => Err(AppError::TransactionMismatch(
            "tx_ref does not match this booking".into(),
        )),
        None => Err(AppError::TransactionMismatch(
            "payment has not been initialized for this booking".into(),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct InitializeTransaction {
    pub email: String,
    pub amount: i64,
    pub reference: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInitialization {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionVerification {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
}

impl TransactionVerification {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }

    pub fn ensure_covers(&self, total_cost: i64) -> AppResult<()> {
        if !self.is_successful() {
            return Err(AppError::TransactionMismatch(format!(
                "payment {} has status {}",
                self.reference, self.status
            )));
        }
        if self.amount < total_cost {
            return Err(AppError::TransactionMismatch(format!(
                "payment {} covers {} of {}",
                self.reference, self.amount, total_cost
            )));
        }
        Ok(())
    }
}
