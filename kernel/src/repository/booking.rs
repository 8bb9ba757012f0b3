use crate::model::{
    booking::{
        event::{CreateBooking, DeleteBooking, UpdateBookingStatus, UpdateBookingWithIds},
        Booking, TakenSlot,
    },
    id::{BookingId, SpaceId, UserId},
    list::ListOptions,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    // 重複チェックを行ったうえで pending の予約を作成する
    async fn create(&self, event: CreateBooking) -> AppResult<Booking>;
    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Option<Booking>>;
    async fn find_by_user_id(&self, user_id: UserId, options: ListOptions)
        -> AppResult<Vec<Booking>>;
    async fn find_all(&self, options: ListOptions) -> AppResult<Vec<Booking>>;
    // 利用目的もしくはスペース名の部分一致（大文字小文字を区別しない）
    async fn search(&self, user_id: UserId, query: String) -> AppResult<Vec<Booking>>;
    // now 以降に終わる確定済み予約の時間帯
    async fn find_taken_by_space_id(
        &self,
        space_id: SpaceId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TakenSlot>>;
    async fn update(&self, event: UpdateBookingWithIds) -> AppResult<Booking>;
    async fn update_status(&self, event: UpdateBookingStatus) -> AppResult<Booking>;
    async fn delete(&self, event: DeleteBooking) -> AppResult<()>;
    // created_before より前に作られた pending の予約を削除し、件数を返す
    async fn delete_stale_pending(&self, created_before: DateTime<Utc>) -> AppResult<u64>;
}
