use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        booking::Booking,
        id::BookingId,
        payment::{
            ensure_confirmable, ensure_payable, ConfirmPayment, PaymentTicket, RequestPayment,
            TxRef,
        },
    },
    repository::payment::PaymentRepository,
};
use shared::error::{AppError, AppResult};

use crate::{
    database::{
        commit_error, lock_for_update, map_unique_violation, storage_error, ConnectionPool,
        LockScope,
    },
    repository::{
        booking::{fetch_booking, lock_booking},
        receipt::assign_receipt,
    },
};

#[derive(new)]
pub struct PaymentRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl PaymentRepository for PaymentRepositoryImpl {
    async fn request_payment(&self, event: RequestPayment) -> AppResult<PaymentTicket> {
        let mut tx = self.db.begin().await?;

        let booking = lock_booking(&mut tx, event.booking_id).await?;
        ensure_payable(&booking, event.requested_by)?;

        // 一度発行した tx_ref は使い回す
        let tx_ref = match booking.tx_ref.clone() {
            Some(tx_ref) => tx_ref,
            None => {
                let tx_ref = TxRef::generate();
                sqlx::query("UPDATE bookings SET tx_ref = $2 WHERE booking_id = $1")
                    .bind(booking.booking_id)
                    .bind(tx_ref.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_error("request_payment", booking.booking_id))?;
                tx_ref
            }
        };

        tx.commit().await.map_err(commit_error("request_payment", booking.booking_id))?;

        let Booking {
            booking_id,
            user,
            space,
            total_cost,
            ..
        } = booking;

        Ok(PaymentTicket {
            booking_id,
            tx_ref,
            amount: total_cost,
            customer: user,
            space_name: space.name,
        })
    }

    async fn confirm_payment(&self, event: ConfirmPayment) -> AppResult<Booking> {
        let mut tx = self.db.begin().await?;

        let booking = lock_booking(&mut tx, event.booking_id).await?;
        ensure_confirmable(&booking, &event)?;

        // 同じ外部取引 ID を複数の予約に紐付けない
        lock_for_update(&mut tx, LockScope::TransactionId, &event.transaction_id).await?;
        let used_by: Option<BookingId> = sqlx::query_scalar(
            r#"
                SELECT booking_id FROM bookings
                WHERE transaction_id = $1 AND booking_id <> $2
            "#,
        )
        .bind(&event.transaction_id)
        .bind(booking.booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error("confirm_payment", booking.booking_id))?;

        if used_by.is_some() {
            return Err(AppError::Conflict(format!(
                "Duplicate transaction: {} is already recorded",
                event.transaction_id
            )));
        }

        sqlx::query(
            r#"
                UPDATE bookings SET
                    status = 'confirmed',
                    transaction_id = $2
                WHERE booking_id = $1
            "#,
        )
        .bind(booking.booking_id)
        .bind(&event.transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                format!("Duplicate transaction: {} is already recorded", event.transaction_id),
            )
        })?;

        let receipt_id = assign_receipt(&mut tx, booking.booking_id, booking.created_at).await?;
        let confirmed = fetch_booking(&mut tx, booking.booking_id).await?;

        tx.commit().await.map_err(commit_error("confirm_payment", booking.booking_id))?;

        tracing::info!(
            booking_id = %confirmed.booking_id,
            %receipt_id,
            "payment confirmed"
        );

        Ok(confirmed)
    }
}
