use axum::{
    extract::{Path, State},
    Json,
};
use garde::Validate;
use kernel::model::{
    id::BookingId,
    payment::{ConfirmPayment, InitializeTransaction, RequestPayment},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        booking::BookingResponse,
        payment::{
            ConfirmPaymentRequest, InitializePaymentRequest, PaymentInitializationResponse,
            PaymentPayloadResponse, PaymentVerificationResponse,
        },
    },
};

// 同じ予約に対しては何度呼んでも同じ tx_ref を返す
pub async fn request_payment(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaymentPayloadResponse>> {
    let ticket = registry
        .payment_repository()
        .request_payment(RequestPayment::new(booking_id, user.id()))
        .await?;

    Ok(Json(PaymentPayloadResponse::new(
        ticket,
        &registry.payment_config(),
    )))
}

pub async fn confirm_payment(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<BookingResponse>> {
    req.validate(&())?;

    // ゲートウェイへの問い合わせは DB のトランザクションの外で行う
    if registry.payment_config().verify_on_confirm {
        verify_with_gateway(&registry, &user, booking_id, &req.tx_ref).await?;
    }

    let event = ConfirmPayment::new(booking_id, user.id(), req.tx_ref, req.transaction_id);
    registry
        .payment_repository()
        .confirm_payment(event)
        .await
        .map(BookingResponse::from)
        .map(Json)
}

async fn verify_with_gateway(
    registry: &AppRegistry,
    user: &AuthorizedUser,
    booking_id: BookingId,
    tx_ref: &str,
) -> AppResult<()> {
    let booking = registry
        .booking_repository()
        .find_by_id(booking_id)
        .await?
        .filter(|booking| booking.is_owned_by(user.id()))
        .ok_or_else(|| AppError::EntityNotFound(format!("Booking ({booking_id}) not found")))?;

    let verification = registry.payment_gateway().verify(tx_ref.to_string()).await?;
    verification.ensure_covers(booking.total_cost)
}

pub async fn initialize_payment(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<InitializePaymentRequest>,
) -> AppResult<Json<PaymentInitializationResponse>> {
    req.validate(&())?;

    let mut event = InitializeTransaction::from(req);
    if event.callback_url.is_none() {
        event.callback_url = registry.payment_config().callback_url;
    }

    registry
        .payment_gateway()
        .initialize(event)
        .await
        .map(PaymentInitializationResponse::from)
        .map(Json)
}

pub async fn verify_payment(
    _user: AuthorizedUser,
    Path(reference): Path<String>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaymentVerificationResponse>> {
    registry
        .payment_gateway()
        .verify(reference)
        .await
        .map(PaymentVerificationResponse::from)
        .map(Json)
}

pub async fn show_transaction(
    _user: AuthorizedUser,
    Path(transaction_id): Path<String>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<serde_json::Value>> {
    registry
        .payment_gateway()
        .fetch_transaction(transaction_id)
        .await
        .map(Json)
}

pub async fn show_transaction_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<serde_json::Value>> {
    registry
        .payment_gateway()
        .list_transactions()
        .await
        .map(Json)
}
