use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    booking::{
        event::UpdateBooking, receipt::ReceiptId, Booking, BookingSpace, BookingStatus, TakenSlot,
    },
    id::{BookingId, SpaceId},
    list::ListOptions,
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

use super::user::BookingUserResponse;

const DEFAULT_LIMIT: i64 = 10;

// 想定外の状態文字列は予約台帳に届く前にここで弾く
pub fn parse_status(value: &str) -> AppResult<BookingStatus> {
    BookingStatus::from_str(value)
        .map_err(|_| AppError::InvalidInput(format!("invalid booking status: {value}")))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[garde(skip)]
    pub space_id: SpaceId,
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
    #[garde(length(min = 1, max = 500))]
    pub purpose: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    #[garde(skip)]
    pub start_time: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub end_time: Option<DateTime<Utc>>,
    #[garde(length(min = 1, max = 500))]
    pub purpose: Option<String>,
    #[garde(skip)]
    pub status: Option<String>,
}

impl TryFrom<UpdateBookingRequest> for UpdateBooking {
    type Error = AppError;

    fn try_from(value: UpdateBookingRequest) -> Result<Self, Self::Error> {
        let UpdateBookingRequest {
            start_time,
            end_time,
            purpose,
            status,
        } = value;
        Ok(UpdateBooking {
            start_time,
            end_time,
            purpose,
            status: status.as_deref().map(parse_status).transpose()?,
        })
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookingListQuery {
    #[garde(range(min = 0))]
    #[serde(default)]
    pub skip: i64,
    #[garde(range(min = 1, max = 100))]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl From<BookingListQuery> for ListOptions {
    fn from(value: BookingListQuery) -> Self {
        let BookingListQuery { skip, limit } = value;
        Self { skip, limit }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookingSearchQuery {
    #[garde(length(min = 1, max = 100))]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusQuery {
    pub status_sent: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsResponse {
    pub items: Vec<BookingResponse>,
}

impl From<Vec<Booking>> for BookingsResponse {
    fn from(value: Vec<Booking>) -> Self {
        Self {
            items: value.into_iter().map(BookingResponse::from).collect(),
        }
    }
}

#[derive(new)]
pub struct PaginatedBookings(Vec<Booking>, ListOptions);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedBookingResponse {
    pub skip: i64,
    pub limit: i64,
    pub items: Vec<BookingResponse>,
}

impl From<PaginatedBookings> for PaginatedBookingResponse {
    fn from(value: PaginatedBookings) -> Self {
        let PaginatedBookings(items, ListOptions { skip, limit }) = value;
        Self {
            skip,
            limit,
            items: items.into_iter().map(BookingResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSpaceResponse {
    pub space_id: SpaceId,
    pub name: String,
    pub hourly_rate: i64,
}

impl From<BookingSpace> for BookingSpaceResponse {
    fn from(value: BookingSpace) -> Self {
        let BookingSpace {
            space_id,
            name,
            hourly_rate,
        } = value;
        Self {
            space_id,
            name,
            hourly_rate,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub user: BookingUserResponse,
    pub space: BookingSpaceResponse,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub purpose: String,
    pub total_cost: i64,
    pub tx_ref: Option<String>,
    pub receipt_id: Option<ReceiptId>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(value: Booking) -> Self {
        let Booking {
            booking_id,
            user,
            space,
            start_time,
            end_time,
            status,
            purpose,
            total_cost,
            tx_ref,
            receipt_id,
            created_at,
            ..
        } = value;
        Self {
            booking_id,
            user: user.into(),
            space: space.into(),
            start_time,
            end_time,
            status,
            purpose,
            total_cost,
            tx_ref: tx_ref.map(String::from),
            receipt_id,
            created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakenSlotResponse {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<TakenSlot> for TakenSlotResponse {
    fn from(value: TakenSlot) -> Self {
        let TakenSlot {
            start_time,
            end_time,
        } = value;
        Self {
            start_time,
            end_time,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt_id: ReceiptId,
    pub booking_id: BookingId,
    pub customer: BookingUserResponse,
    pub space: BookingSpaceResponse,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub billed_hours: i64,
    pub total_cost: i64,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub purpose: String,
}

#[derive(new)]
pub struct BookingReceipt {
    booking: Booking,
    currency: String,
}

impl TryFrom<BookingReceipt> for ReceiptResponse {
    type Error = AppError;

    fn try_from(value: BookingReceipt) -> Result<Self, Self::Error> {
        let BookingReceipt { booking, currency } = value;
        let billed_hours = booking.window()?.billed_hours();
        let receipt_id = match (booking.status, booking.receipt_id) {
            (BookingStatus::Confirmed, Some(receipt_id)) => receipt_id,
            _ => {
                return Err(AppError::UnprocessableEntity(format!(
                    "Booking ({}) has not been paid",
                    booking.booking_id
                )))
            }
        };
        Ok(Self {
            receipt_id,
            booking_id: booking.booking_id,
            customer: booking.user.into(),
            space: booking.space.into(),
            start_time: booking.start_time,
            end_time: booking.end_time,
            billed_hours,
            total_cost: booking.total_cost,
            currency,
            transaction_id: booking.transaction_id,
            purpose: booking.purpose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(parse_status("canceled").unwrap(), BookingStatus::Canceled);
        assert!(matches!(
            parse_status("archived"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(parse_status("Confirmed").is_err());
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let query: BookingListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!((query.skip, query.limit), (0, 10));
        assert!(query.validate(&()).is_ok());

        let too_many = BookingListQuery {
            skip: 0,
            limit: 101,
        };
        assert!(too_many.validate(&()).is_err());
        let negative = BookingListQuery { skip: -1, limit: 5 };
        assert!(negative.validate(&()).is_err());
    }
}
