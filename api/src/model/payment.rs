use garde::Validate;
use kernel::model::{
    id::BookingId,
    payment::{
        InitializeTransaction, PaymentTicket, TransactionInitialization, TransactionVerification,
    },
};
use serde::{Deserialize, Serialize};
use shared::config::PaymentConfig;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[garde(length(min = 1))]
    pub tx_ref: String,
    #[garde(length(min = 1))]
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCustomer {
    pub email: String,
    pub name: String,
}

// クライアントの決済ウィジェットにそのまま渡す内容
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadResponse {
    pub booking_id: BookingId,
    pub tx_ref: String,
    pub amount: i64,
    pub currency: String,
    pub customer: PaymentCustomer,
    pub title: String,
    pub description: String,
    pub callback_url: Option<String>,
}

impl PaymentPayloadResponse {
    pub fn new(ticket: PaymentTicket, config: &PaymentConfig) -> Self {
        let PaymentTicket {
            booking_id,
            tx_ref,
            amount,
            customer,
            space_name,
        } = ticket;
        Self {
            booking_id,
            tx_ref: tx_ref.into(),
            amount,
            currency: config.currency.clone(),
            customer: PaymentCustomer {
                email: customer.email,
                name: customer.user_name,
            },
            title: config.title.clone(),
            description: format!("Payment for booking {space_name}"),
            callback_url: config.callback_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    #[garde(email)]
    pub email: String,
    #[garde(range(min = 1, max = 10_000_000_000))]
    pub amount: i64,
    #[garde(length(min = 1))]
    pub reference: Option<String>,
    #[garde(skip)]
    pub callback_url: Option<String>,
}

impl From<InitializePaymentRequest> for InitializeTransaction {
    fn from(value: InitializePaymentRequest) -> Self {
        let InitializePaymentRequest {
            email,
            amount,
            reference,
            callback_url,
        } = value;
        Self {
            email,
            amount,
            reference,
            callback_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitializationResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

impl From<TransactionInitialization> for PaymentInitializationResponse {
    fn from(value: TransactionInitialization) -> Self {
        let TransactionInitialization {
            authorization_url,
            access_code,
            reference,
        } = value;
        Self {
            authorization_url,
            access_code,
            reference,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationResponse {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
}

impl From<TransactionVerification> for PaymentVerificationResponse {
    fn from(value: TransactionVerification) -> Self {
        let TransactionVerification {
            reference,
            status,
            amount,
            currency,
            transaction_id,
        } = value;
        Self {
            reference,
            status,
            amount,
            currency,
            transaction_id,
        }
    }
}
