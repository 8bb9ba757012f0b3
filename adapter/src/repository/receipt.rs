use kernel::model::{booking::receipt::ReceiptId, id::BookingId};
use shared::error::{AppError, AppResult};
use chrono::Datelike;
use sqlx::{
    types::chrono::{DateTime, Utc},
    Postgres, Transaction,
};

use crate::database::{map_unique_violation, storage_error};

// 予約作成日の年ごとに連番の領収書番号を振る。
// カウンタ行の更新ロックはトランザクション終了まで保持されるため、
// 同じ年の採番は直列化される。予約が削除されてもカウンタは戻らない。
pub(crate) async fn assign_receipt(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: BookingId,
    created_at: DateTime<Utc>,
) -> AppResult<ReceiptId> {
    let year = created_at.year();

    let sequence: i32 = sqlx::query_scalar(
        r#"
            INSERT INTO receipt_counters (year, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (year)
            DO UPDATE SET last_sequence = receipt_counters.last_sequence + 1
            RETURNING last_sequence
        "#,
    )
    .bind(year)
    .fetch_one(&mut **tx)
    .await
    .map_err(storage_error("assign_receipt", booking_id))?;

    let sequence =
        u32::try_from(sequence).map_err(|e| AppError::ConversionEntityError(e.to_string()))?;
    let receipt_id = ReceiptId::new(year, sequence);

    let res = sqlx::query(
        r#"
            UPDATE bookings SET receipt_id = $2
            WHERE booking_id = $1 AND receipt_id IS NULL
        "#,
    )
    .bind(booking_id)
    .bind(receipt_id.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| map_unique_violation(e, format!("Receipt ({receipt_id}) already issued")))?;

    if res.rows_affected() < 1 {
        return Err(AppError::UnprocessableEntity(format!(
            "Booking ({booking_id}) already has a receipt"
        )));
    }

    tracing::info!(
        %booking_id,
        %receipt_id,
        sequence = receipt_id.sequence(),
        "receipt issued"
    );

    Ok(receipt_id)
}
