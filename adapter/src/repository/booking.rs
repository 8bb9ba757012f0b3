use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        booking::{
            event::{CreateBooking, DeleteBooking, UpdateBookingStatus, UpdateBookingWithIds},
            Booking, BookingStatus, BookingWindow, TakenSlot,
        },
        id::{BookingId, SpaceId, UserId},
        list::ListOptions,
    },
    repository::booking::BookingRepository,
};
use shared::error::{AppError, AppResult};
use sqlx::{
    types::chrono::{DateTime, Utc},
    Postgres, Transaction,
};

use crate::database::{
    commit_error, lock_for_update,
    model::booking::{BookingRow, OverlapRow, TakenSlotRow},
    storage_error, ConnectionPool, LockScope,
};

// bookings に users と spaces を結合して取得する共通の SELECT 句
pub(crate) const BOOKING_SELECT: &str = r#"
    SELECT
        b.booking_id,
        b.user_id,
        u.user_name,
        u.email,
        b.space_id,
        s.name AS space_name,
        s.hourly_rate,
        b.start_time,
        b.end_time,
        b.status,
        b.purpose,
        b.total_cost,
        b.tx_ref,
        b.transaction_id,
        b.receipt_id,
        b.created_at
    FROM bookings AS b
    INNER JOIN users AS u ON b.user_id = u.user_id
    INNER JOIN spaces AS s ON b.space_id = s.space_id
"#;

#[derive(sqlx::FromRow)]
struct BookableSpaceRow {
    hourly_rate: i64,
    is_available: bool,
}

#[derive(new)]
pub struct BookingRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BookingRepository for BookingRepositoryImpl {
    async fn create(&self, event: CreateBooking) -> AppResult<Booking> {
        let mut tx = self.db.begin().await?;

        // 同じスペースへの予約作成はここで直列化される
        lock_for_update(&mut tx, LockScope::SpaceSchedule, &event.space_id.to_string()).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定のスペース ID をもつスペースが存在し、利用可能か
        // - 希望の時間帯が有効な既存予約と重なっていないか
        let total_cost = {
            let space = sqlx::query_as::<_, BookableSpaceRow>(
                r#"
                    SELECT hourly_rate, is_available
                    FROM spaces
                    WHERE space_id = $1
                "#,
            )
            .bind(event.space_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_error("create_booking", event.space_id))?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("Space ({}) not found", event.space_id))
            })?;

            if !space.is_available {
                return Err(AppError::UnprocessableEntity(format!(
                    "Space ({}) is currently unavailable",
                    event.space_id
                )));
            }

            ensure_no_overlap(&mut tx, event.space_id, &event.window, None).await?;

            event.window.total_cost(space.hourly_rate)?
        };

        let booking_id = BookingId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, user_id, space_id, start_time, end_time,
                status, purpose, total_cost)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking_id)
        .bind(event.user_id)
        .bind(event.space_id)
        .bind(event.window.start_time())
        .bind(event.window.end_time())
        .bind(BookingStatus::Pending.as_ref())
        .bind(&event.purpose)
        .bind(total_cost)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("create_booking", booking_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been created".into(),
            ));
        }

        let booking = fetch_booking(&mut tx, booking_id).await?;

        tx.commit().await.map_err(commit_error("create_booking", booking_id))?;

        tracing::info!(
            booking_id = %booking.booking_id,
            space_id = %booking.space.space_id,
            total_cost = booking.total_cost,
            "booking created"
        );

        Ok(booking)
    }

    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!("{BOOKING_SELECT} WHERE b.booking_id = $1"))
            .bind(booking_id)
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(storage_error("find_booking", booking_id))?
            .map(Booking::try_from)
            .transpose()
    }

    async fn find_by_user_id(
        &self,
        user_id: UserId,
        options: ListOptions,
    ) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            r#"
                {BOOKING_SELECT}
                WHERE b.user_id = $1
                ORDER BY b.start_time DESC
                OFFSET $2
                LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(options.skip)
        .bind(options.limit)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(storage_error("list_user_bookings", user_id))?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn find_all(&self, options: ListOptions) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            r#"
                {BOOKING_SELECT}
                ORDER BY b.created_at DESC
                OFFSET $1
                LIMIT $2
            "#
        ))
        .bind(options.skip)
        .bind(options.limit)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(storage_error("list_bookings", "all"))?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn search(&self, user_id: UserId, query: String) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            r#"
                {BOOKING_SELECT}
                WHERE b.user_id = $1
                  AND (b.purpose ILIKE $2 OR s.name ILIKE $2)
                ORDER BY b.start_time DESC
            "#
        ))
        .bind(user_id)
        .bind(like_pattern(&query))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(storage_error("search_bookings", user_id))?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }

    async fn find_taken_by_space_id(
        &self,
        space_id: SpaceId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TakenSlot>> {
        let rows: Vec<TakenSlotRow> = sqlx::query_as(
            r#"
                SELECT start_time, end_time
                FROM bookings
                WHERE space_id = $1
                  AND status = 'confirmed'
                  AND end_time > $2
                ORDER BY start_time ASC
            "#,
        )
        .bind(space_id)
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(storage_error("list_taken_slots", space_id))?;

        Ok(rows.into_iter().map(TakenSlot::from).collect())
    }

    async fn update(&self, event: UpdateBookingWithIds) -> AppResult<Booking> {
        let UpdateBookingWithIds {
            booking_id,
            requested_by,
            update,
        } = event;
        let mut tx = self.db.begin().await?;

        let current = lock_booking(&mut tx, booking_id).await?;
        let changes = update.merge(&current, &requested_by)?;

        // 時間帯が変わる場合は自分自身を除いて重複チェックをやり直す
        if changes.window_changed {
            lock_for_update(
                &mut tx,
                LockScope::SpaceSchedule,
                &current.space.space_id.to_string(),
            )
            .await?;
            ensure_no_overlap(
                &mut tx,
                current.space.space_id,
                &changes.window,
                Some(booking_id),
            )
            .await?;
        }

        sqlx::query(
            r#"
                UPDATE bookings SET
                    start_time = $2,
                    end_time = $3,
                    purpose = $4,
                    status = $5,
                    total_cost = $6
                WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .bind(changes.window.start_time())
        .bind(changes.window.end_time())
        .bind(&changes.purpose)
        .bind(changes.status.as_ref())
        .bind(changes.total_cost)
        .execute(&mut *tx)
        .await
        .map_err(storage_error("update_booking", booking_id))?;

        let booking = fetch_booking(&mut tx, booking_id).await?;

        tx.commit().await.map_err(commit_error("update_booking", booking_id))?;

        Ok(booking)
    }

    async fn update_status(&self, event: UpdateBookingStatus) -> AppResult<Booking> {
        let mut tx = self.db.begin().await?;

        let current = lock_booking(&mut tx, event.booking_id).await?;

        // キャンセル済みの予約を復活させる場合は重複しないことを確かめる
        if event.status.is_active() && !current.status.is_active() {
            lock_for_update(
                &mut tx,
                LockScope::SpaceSchedule,
                &current.space.space_id.to_string(),
            )
            .await?;
            ensure_no_overlap(
                &mut tx,
                current.space.space_id,
                &current.window()?,
                Some(current.booking_id),
            )
            .await?;
        }

        sqlx::query("UPDATE bookings SET status = $2 WHERE booking_id = $1")
            .bind(event.booking_id)
            .bind(event.status.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(storage_error("update_booking_status", event.booking_id))?;

        let booking = fetch_booking(&mut tx, event.booking_id).await?;

        tx.commit().await.map_err(commit_error("update_booking_status", event.booking_id))?;

        tracing::info!(
            booking_id = %booking.booking_id,
            from = %current.status,
            to = %booking.status,
            requested_by = %event.requested_by.user_id,
            "booking status changed"
        );

        Ok(booking)
    }

    async fn delete(&self, event: DeleteBooking) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let current = lock_booking(&mut tx, event.booking_id).await?;
        current.ensure_visible_to(&event.requested_by)?;

        let res = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(event.booking_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("delete_booking", event.booking_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been deleted".into(),
            ));
        }

        tx.commit().await.map_err(commit_error("delete_booking", event.booking_id))?;

        Ok(())
    }

    async fn delete_stale_pending(&self, created_before: DateTime<Utc>) -> AppResult<u64> {
        let res = sqlx::query(
            r#"
                DELETE FROM bookings
                WHERE status = 'pending' AND created_at < $1
            "#,
        )
        .bind(created_before)
        .execute(self.db.inner_ref())
        .await
        .map_err(storage_error("purge_stale_bookings", created_before))?;

        Ok(res.rows_affected())
    }
}

// 行ロックを取ったうえで予約を取得する
pub(crate) async fn lock_booking(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: BookingId,
) -> AppResult<Booking> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "{BOOKING_SELECT} WHERE b.booking_id = $1 FOR UPDATE OF b"
    ))
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage_error("lock_booking", booking_id))?
    .ok_or_else(|| AppError::EntityNotFound(format!("Booking ({booking_id}) not found")))?
    .try_into()
}

pub(crate) async fn fetch_booking(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: BookingId,
) -> AppResult<Booking> {
    sqlx::query_as::<_, BookingRow>(&format!("{BOOKING_SELECT} WHERE b.booking_id = $1"))
        .bind(booking_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(storage_error("fetch_booking", booking_id))?
        .try_into()
}

// 重複条件：existing.start < new.end AND existing.end > new.start
async fn ensure_no_overlap(
    tx: &mut Transaction<'_, Postgres>,
    space_id: SpaceId,
    window: &BookingWindow,
    excluding: Option<BookingId>,
) -> AppResult<()> {
    let overlap = sqlx::query_as::<_, OverlapRow>(
        r#"
            SELECT booking_id, start_time, end_time
            FROM bookings
            WHERE space_id = $1
              AND status IN ('pending', 'confirmed')
              AND start_time < $3
              AND end_time > $2
              AND ($4::UUID IS NULL OR booking_id <> $4)
            ORDER BY start_time ASC
            LIMIT 1
        "#,
    )
    .bind(space_id)
    .bind(window.start_time())
    .bind(window.end_time())
    .bind(excluding)
    .fetch_optional(&mut **tx)
    .await
    .map_err(storage_error("check_booking_overlap", space_id))?;

    match overlap {
        None => Ok(()),
        Some(existing) => {
            tracing::debug!(
                existing = %existing.booking_id,
                %space_id,
                "booking window overlaps an active booking"
            );
            Err(AppError::Conflict(format!(
                "Booking conflict: Existing booking from {} to {}",
                existing.start_time.to_rfc3339(),
                existing.end_time.to_rfc3339()
            )))
        }
    }
}

// ILIKE のワイルドカードを無効化して部分一致のパターンにする
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::{
        auth::Identity,
        booking::event::UpdateBooking,
        payment::{ConfirmPayment, RequestPayment},
        role::Role,
    };
    use kernel::repository::payment::PaymentRepository;
    use chrono::Duration;
    use sqlx::types::chrono::TimeZone;
    use std::{str::FromStr, sync::Arc};

    use crate::repository::payment::PaymentRepositoryImpl;

    const ALICE: &str = "5b4c96ac-316a-4bee-8e69-cac5eb84ff4c";
    const BOB: &str = "9582f9de-0fd1-4892-b20c-70139a7eb95b";
    const ROOM_A: &str = "0f7bd3f2-5c4e-4a5e-9d53-1f7e3f0a6a01";
    const ROOM_B: &str = "0f7bd3f2-5c4e-4a5e-9d53-1f7e3f0a6a02";

    fn user(id: &str) -> UserId {
        UserId::from_str(id).unwrap()
    }

    fn space(id: &str) -> SpaceId {
        SpaceId::from_str(id).unwrap()
    }

    fn window(start_hour: u32, end_hour: u32) -> BookingWindow {
        let day = Utc::now().date_naive() + Duration::days(7);
        let start = Utc.from_utc_datetime(&day.and_hms_opt(start_hour, 0, 0).unwrap());
        let end = Utc.from_utc_datetime(&day.and_hms_opt(end_hour, 0, 0).unwrap());
        BookingWindow::new(start, end).unwrap()
    }

    fn request(user_id: &str, space_id: &str, w: BookingWindow) -> CreateBooking {
        CreateBooking::new(user(user_id), space(space_id), w, "planning".into())
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("room"), "%room%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[sqlx::test(fixtures("common"))]
    async fn booking_and_payment_scenario(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let bookings = BookingRepositoryImpl::new(db.clone());
        let payments = PaymentRepositoryImpl::new(db);

        let first = bookings.create(request(ALICE, ROOM_A, window(10, 12))).await?;
        assert_eq!(first.total_cost, 100);
        assert_eq!(first.status, BookingStatus::Pending);

        match bookings.create(request(BOB, ROOM_A, window(11, 13))).await {
            Err(AppError::Conflict(message)) => {
                assert!(message.contains(&first.start_time.to_rfc3339()))
            }
            other => panic!("expected a conflict, got {other:?}"),
        }

        let ticket = payments
            .request_payment(RequestPayment::new(first.booking_id, user(ALICE)))
            .await?;
        let again = payments
            .request_payment(RequestPayment::new(first.booking_id, user(ALICE)))
            .await?;
        assert_eq!(ticket.tx_ref, again.tx_ref);

        let confirmed = payments
            .confirm_payment(ConfirmPayment::new(
                first.booking_id,
                user(ALICE),
                ticket.tx_ref.to_string(),
                "555".into(),
            ))
            .await?;
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(
            confirmed.receipt_id.map(|r| r.to_string()),
            Some(format!("ORD-{}-001", first.created_at.format("%Y")))
        );

        let second = bookings.create(request(BOB, ROOM_A, window(14, 15))).await?;
        let second_ticket = payments
            .request_payment(RequestPayment::new(second.booking_id, user(BOB)))
            .await?;
        let res = payments
            .confirm_payment(ConfirmPayment::new(
                second.booking_id,
                user(BOB),
                second_ticket.tx_ref.to_string(),
                "555".into(),
            ))
            .await;
        assert!(matches!(res, Err(AppError::Conflict(_))));

        let taken = bookings
            .find_taken_by_space_id(space(ROOM_A), Utc::now())
            .await?;
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].start_time, first.start_time);
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn conflicts_are_scoped_to_a_space(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let bookings = BookingRepositoryImpl::new(ConnectionPool::new(pool));
        bookings.create(request(ALICE, ROOM_A, window(10, 12))).await?;
        // 同じ時間帯でも別スペースなら予約できる
        let other = bookings.create(request(BOB, ROOM_B, window(10, 12))).await?;
        assert_eq!(other.total_cost, 200);
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn canceled_bookings_free_the_window(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let bookings = BookingRepositoryImpl::new(ConnectionPool::new(pool));
        let first = bookings.create(request(ALICE, ROOM_A, window(10, 12))).await?;
        bookings
            .update(UpdateBookingWithIds::new(
                first.booking_id,
                Identity {
                    user_id: user(ALICE),
                    role: Role::User,
                },
                UpdateBooking {
                    status: Some(BookingStatus::Canceled),
                    ..Default::default()
                },
            ))
            .await?;
        bookings.create(request(BOB, ROOM_A, window(10, 12))).await?;
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn concurrent_overlapping_creates_admit_one(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let bookings = Arc::new(BookingRepositoryImpl::new(ConnectionPool::new(pool)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bookings = bookings.clone();
                tokio::spawn(async move {
                    bookings.create(request(ALICE, ROOM_A, window(9, 11))).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => created += 1,
                Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(created, 1);
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn stale_pending_bookings_are_purged(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let bookings = BookingRepositoryImpl::new(db.clone());
        let old = bookings.create(request(ALICE, ROOM_A, window(8, 9))).await?;
        let recent = bookings.create(request(ALICE, ROOM_A, window(10, 11))).await?;

        for (booking, hours) in [(&old, 25), (&recent, 23)] {
            sqlx::query("UPDATE bookings SET created_at = $2 WHERE booking_id = $1")
                .bind(booking.booking_id)
                .bind(Utc::now() - Duration::hours(hours))
                .execute(db.inner_ref())
                .await?;
        }

        let purged = bookings
            .delete_stale_pending(Utc::now() - Duration::hours(24))
            .await?;
        assert_eq!(purged, 1);
        assert!(bookings.find_by_id(old.booking_id).await?.is_none());
        assert!(bookings.find_by_id(recent.booking_id).await?.is_some());
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn search_matches_purpose_or_space_name(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let bookings = BookingRepositoryImpl::new(ConnectionPool::new(pool));
        bookings
            .create(CreateBooking::new(
                user(ALICE),
                space(ROOM_A),
                window(10, 11),
                "Quarterly Review".into(),
            ))
            .await?;
        bookings.create(request(BOB, ROOM_B, window(10, 11))).await?;

        assert_eq!(bookings.search(user(ALICE), "quarterly".into()).await?.len(), 1);
        assert_eq!(bookings.search(user(ALICE), "room a".into()).await?.len(), 1);
        // 他人の予約は検索結果に含まれない
        assert!(bookings.search(user(ALICE), "room b".into()).await?.is_empty());
        Ok(())
    }
}
