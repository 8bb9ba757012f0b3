use crate::model::{
    auth::Identity,
    id::{BookingId, SpaceId, UserId},
    payment::TxRef,
    user::BookingUser,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, Display, EnumString};

pub mod event;
pub mod receipt;

use receipt::ReceiptId;

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    // 重複チェックの対象になる状態
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

// [start_time, end_time) の半開区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl BookingWindow {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> AppResult<Self> {
        if start_time >= end_time {
            return Err(AppError::InvalidInput(
                "start_time must be earlier than end_time".into(),
            ));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn overlaps(&self, other: &BookingWindow) -> bool {
        other.start_time < self.end_time && other.end_time > self.start_time
    }

    // 端数の時間は切り捨てる
    pub fn billed_hours(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds() / SECONDS_PER_HOUR
    }

    pub fn total_cost(&self, hourly_rate: i64) -> AppResult<i64> {
        self.billed_hours()
            .checked_mul(hourly_rate)
            .ok_or_else(|| AppError::InvalidInput("total cost is out of range".into()))
    }
}

impl std::fmt::Display for BookingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start_time.to_rfc3339(),
            self.end_time.to_rfc3339()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSpace {
    pub space_id: SpaceId,
    pub name: String,
    pub hourly_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub booking_id: BookingId,
    pub user: BookingUser,
    pub space: BookingSpace,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub purpose: String,
    pub total_cost: i64,
    pub tx_ref: Option<TxRef>,
    pub transaction_id: Option<String>,
    pub receipt_id: Option<ReceiptId>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn window(&self) -> AppResult<BookingWindow> {
        BookingWindow::new(self.start_time, self.end_time)
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user.user_id == user_id
    }

    // 所有者もしくは管理者のみ参照・削除できる
    pub fn ensure_visible_to(&self, identity: &Identity) -> AppResult<()> {
        if self.is_owned_by(identity.user_id) || identity.is_admin() {
            Ok(())
        } else {
            Err(AppError::ForbiddenOperation)
        }
    }

    pub fn ensure_owned_by(&self, identity: &Identity) -> AppResult<()> {
        if self.is_owned_by(identity.user_id) {
            Ok(())
        } else {
            Err(AppError::ForbiddenOperation)
        }
    }
}

// 利用不可の時間帯として公開する情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakenSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
