use kernel::model::{
    booking::{Booking, BookingSpace, BookingStatus, TakenSlot},
    id::{BookingId, SpaceId, UserId},
    user::BookingUser,
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};
use std::str::FromStr;

// bookings に users と spaces を結合した行
#[derive(sqlx::FromRow)]
pub struct BookingRow {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub space_id: SpaceId,
    pub space_name: String,
    pub hourly_rate: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub purpose: String,
    pub total_cost: i64,
    pub tx_ref: Option<String>,
    pub transaction_id: Option<String>,
    pub receipt_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(value: BookingRow) -> Result<Self, Self::Error> {
        let BookingRow {
            booking_id,
            user_id,
            user_name,
            email,
            space_id,
            space_name,
            hourly_rate,
            start_time,
            end_time,
            status,
            purpose,
            total_cost,
            tx_ref,
            transaction_id,
            receipt_id,
            created_at,
        } = value;
        Ok(Booking {
            booking_id,
            user: BookingUser {
                user_id,
                user_name,
                email,
            },
            space: BookingSpace {
                space_id,
                name: space_name,
                hourly_rate,
            },
            start_time,
            end_time,
            status: BookingStatus::from_str(&status)
                .map_err(|e| AppError::ConversionEntityError(e.to_string()))?,
            purpose,
            total_cost,
            tx_ref: tx_ref.map(Into::into),
            transaction_id,
            receipt_id: receipt_id.map(|r| r.parse()).transpose()?,
            created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct TakenSlotRow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<TakenSlotRow> for TakenSlot {
    fn from(value: TakenSlotRow) -> Self {
        let TakenSlotRow {
            start_time,
            end_time,
        } = value;
        TakenSlot {
            start_time,
            end_time,
        }
    }
}

// 重複チェックで見つかった既存予約の時間帯
#[derive(sqlx::FromRow)]
pub struct OverlapRow {
    pub booking_id: BookingId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
