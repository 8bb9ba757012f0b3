use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        id::SpaceId,
        space::{
            event::{CreateSpace, DeleteSpace, UpdateSpace},
            Space,
        },
    },
    repository::space::SpaceRepository,
};
use shared::error::{AppError, AppResult};

use crate::database::{
    commit_error, lock_for_update, map_unique_violation, model::space::SpaceRow, storage_error,
    ConnectionPool, LockScope,
};

const SPACE_COLUMNS: &str = r#"
    space_id, name, description, capacity, hourly_rate, is_available,
    location, amenities, image_urls, created_at
"#;

#[derive(new)]
pub struct SpaceRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl SpaceRepository for SpaceRepositoryImpl {
    async fn create(&self, event: CreateSpace) -> AppResult<Space> {
        event.validate()?;

        let space_id = SpaceId::new();
        sqlx::query_as::<_, SpaceRow>(&format!(
            r#"
                INSERT INTO spaces
                (space_id, name, description, capacity, hourly_rate,
                is_available, location, amenities, image_urls)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {SPACE_COLUMNS}
            "#
        ))
        .bind(space_id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.capacity)
        .bind(event.hourly_rate)
        .bind(event.is_available)
        .bind(&event.location)
        .bind(&event.amenities)
        .bind(&event.image_urls)
        .fetch_one(self.db.inner_ref())
        .await
        .map(Space::from)
        .map_err(|e| {
            map_unique_violation(e, format!("Space name '{}' is already used", event.name))
        })
    }

    async fn find_all(&self) -> AppResult<Vec<Space>> {
        let rows: Vec<SpaceRow> = sqlx::query_as(&format!(
            r#"
                SELECT {SPACE_COLUMNS}
                FROM spaces
                ORDER BY created_at DESC
            "#
        ))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(storage_error("list_spaces", "all"))?;

        Ok(rows.into_iter().map(Space::from).collect())
    }

    async fn find_by_id(&self, space_id: SpaceId) -> AppResult<Option<Space>> {
        let row: Option<SpaceRow> = sqlx::query_as(&format!(
            r#"
                SELECT {SPACE_COLUMNS}
                FROM spaces
                WHERE space_id = $1
            "#
        ))
        .bind(space_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(storage_error("find_space", space_id))?;

        Ok(row.map(Space::from))
    }

    async fn update(&self, event: UpdateSpace) -> AppResult<Space> {
        let mut tx = self.db.begin().await?;

        let current: Space = sqlx::query_as::<_, SpaceRow>(&format!(
            r#"
                SELECT {SPACE_COLUMNS}
                FROM spaces
                WHERE space_id = $1
                FOR UPDATE
            "#
        ))
        .bind(event.space_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error("update_space", event.space_id))?
        .map(Space::from)
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("Space ({}) not found", event.space_id))
        })?;

        let merged = event.apply(current)?;

        let updated = sqlx::query_as::<_, SpaceRow>(&format!(
            r#"
                UPDATE spaces SET
                    name = $2,
                    description = $3,
                    capacity = $4,
                    hourly_rate = $5,
                    is_available = $6,
                    location = $7,
                    amenities = $8,
                    image_urls = $9
                WHERE space_id = $1
                RETURNING {SPACE_COLUMNS}
            "#
        ))
        .bind(merged.space_id)
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(merged.capacity)
        .bind(merged.hourly_rate)
        .bind(merged.is_available)
        .bind(&merged.location)
        .bind(&merged.amenities)
        .bind(&merged.image_urls)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, format!("Space name '{}' is already used", merged.name))
        })?;

        tx.commit().await.map_err(commit_error("update_space", merged.space_id))?;

        Ok(updated.into())
    }

    async fn delete(&self, event: DeleteSpace) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // 予約の作成と直列化したうえで、有効な予約が残っていないか確かめる
        lock_for_update(&mut tx, LockScope::SpaceSchedule, &event.space_id.to_string()).await?;
        let active: i64 = sqlx::query_scalar(
            r#"
                SELECT COUNT(*)
                FROM bookings
                WHERE space_id = $1 AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(event.space_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error("delete_space", event.space_id))?;

        if active > 0 {
            return Err(AppError::Conflict(format!(
                "Space ({}) still has {} active bookings",
                event.space_id, active
            )));
        }

        let res = sqlx::query("DELETE FROM spaces WHERE space_id = $1")
            .bind(event.space_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("delete_space", event.space_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "Space ({}) not found",
                event.space_id
            )));
        }

        tx.commit().await.map_err(commit_error("delete_space", event.space_id))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::booking::BookingRepositoryImpl;
    use kernel::{
        model::{
            auth::Identity,
            booking::{
                event::{CreateBooking, UpdateBookingStatus},
                BookingStatus, BookingWindow,
            },
            id::UserId,
            role::Role,
        },
        repository::booking::BookingRepository,
    };
    use chrono::Duration;
    use sqlx::types::chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn room(name: &str) -> CreateSpace {
        CreateSpace {
            name: name.into(),
            description: Some("Test Description".into()),
            capacity: 5,
            hourly_rate: 50,
            is_available: true,
            location: "Test Address".into(),
            amenities: vec!["WiFi".into(), "Whiteboard".into()],
            image_urls: vec![],
        }
    }

    #[sqlx::test]
    async fn test_register_space(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = SpaceRepositoryImpl::new(ConnectionPool::new(pool));

        let created = repo.create(room("Test SpaceName")).await?;

        let res = repo.find_all().await?;
        assert_eq!(res.len(), 1);

        let found = repo.find_by_id(created.space_id).await?;
        let Some(Space {
            space_id,
            name,
            capacity,
            hourly_rate,
            amenities,
            ..
        }) = found
        else {
            panic!("space not found");
        };
        assert_eq!(space_id, created.space_id);
        assert_eq!(name, "Test SpaceName");
        assert_eq!(capacity, 5);
        assert_eq!(hourly_rate, 50);
        assert_eq!(amenities, vec!["WiFi".to_string(), "Whiteboard".to_string()]);
        Ok(())
    }

    #[sqlx::test]
    async fn space_names_are_unique(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = SpaceRepositoryImpl::new(ConnectionPool::new(pool));
        repo.create(room("Room A")).await?;
        let res = repo.create(room("Room A")).await;
        assert!(matches!(res, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn partial_update_keeps_other_fields(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = SpaceRepositoryImpl::new(ConnectionPool::new(pool));
        let created = repo.create(room("Room A")).await?;

        let updated = repo
            .update(UpdateSpace {
                space_id: created.space_id,
                hourly_rate: Some(75),
                is_available: Some(false),
                ..Default::default()
            })
            .await?;
        assert_eq!(updated.hourly_rate, 75);
        assert!(!updated.is_available);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.amenities, created.amenities);
        Ok(())
    }

    fn tomorrow(start_hour: u32, end_hour: u32) -> BookingWindow {
        let day = Utc::now().date_naive() + Duration::days(1);
        BookingWindow::new(
            Utc.from_utc_datetime(&day.and_hms_opt(start_hour, 0, 0).unwrap()),
            Utc.from_utc_datetime(&day.and_hms_opt(end_hour, 0, 0).unwrap()),
        )
        .unwrap()
    }

    #[sqlx::test(fixtures("common"))]
    async fn spaces_with_active_bookings_cannot_be_deleted(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let repo = SpaceRepositoryImpl::new(db.clone());
        let bookings = BookingRepositoryImpl::new(db);
        let created = repo.create(room("Room C")).await?;
        let alice = UserId::from_str("5b4c96ac-316a-4bee-8e69-cac5eb84ff4c")?;

        let booking = bookings
            .create(CreateBooking::new(
                alice,
                created.space_id,
                tomorrow(10, 11),
                "planning".into(),
            ))
            .await?;

        let res = repo
            .delete(DeleteSpace {
                space_id: created.space_id,
            })
            .await;
        assert!(matches!(res, Err(AppError::Conflict(_))));
        assert!(repo.find_by_id(created.space_id).await?.is_some());

        // キャンセル済みの予約しか残っていなければ削除できる
        bookings
            .update_status(UpdateBookingStatus::new(
                booking.booking_id,
                Identity {
                    user_id: alice,
                    role: Role::Admin,
                },
                BookingStatus::Canceled,
            ))
            .await?;
        repo.delete(DeleteSpace {
            space_id: created.space_id,
        })
        .await?;
        assert!(repo.find_by_id(created.space_id).await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures("common"))]
    async fn unavailable_spaces_reject_bookings(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let repo = SpaceRepositoryImpl::new(db.clone());
        let bookings = BookingRepositoryImpl::new(db);
        let created = repo
            .create(CreateSpace {
                is_available: false,
                ..room("Room C")
            })
            .await?;

        let res = bookings
            .create(CreateBooking::new(
                UserId::from_str("5b4c96ac-316a-4bee-8e69-cac5eb84ff4c")?,
                created.space_id,
                tomorrow(10, 11),
                "planning".into(),
            ))
            .await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));
        Ok(())
    }
}
