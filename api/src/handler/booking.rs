use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::{
    booking::{
        event::{
            CreateBooking, DeleteBooking, UpdateBooking, UpdateBookingStatus,
            UpdateBookingWithIds,
        },
        BookingWindow,
    },
    id::{BookingId, SpaceId},
    list::ListOptions,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::booking::{
        parse_status, BookingListQuery, BookingReceipt, BookingResponse, BookingSearchQuery,
        BookingStatusQuery, BookingsResponse, CreateBookingRequest, PaginatedBookingResponse,
        PaginatedBookings, ReceiptResponse, TakenSlotResponse, UpdateBookingRequest,
    },
};

pub async fn create_booking(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    req.validate(&())?;

    let window = BookingWindow::new(req.start_time, req.end_time)?;
    let event = CreateBooking::new(user.id(), req.space_id, window, req.purpose);

    let booking = registry.booking_repository().create(event).await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

pub async fn show_booking_list(
    user: AuthorizedUser,
    Query(query): Query<BookingListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedBookingResponse>> {
    query.validate(&())?;

    let options = ListOptions::from(query);
    registry
        .booking_repository()
        .find_by_user_id(user.id(), options)
        .await
        .map(|items| PaginatedBookings::new(items, options))
        .map(PaginatedBookingResponse::from)
        .map(Json)
}

pub async fn search_bookings(
    user: AuthorizedUser,
    Query(query): Query<BookingSearchQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingsResponse>> {
    query.validate(&())?;

    registry
        .booking_repository()
        .search(user.id(), query.query)
        .await
        .map(BookingsResponse::from)
        .map(Json)
}

pub async fn show_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingResponse>> {
    let booking = registry
        .booking_repository()
        .find_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound(format!("Booking ({booking_id}) not found")))?;
    booking.ensure_visible_to(&user.identity())?;

    Ok(Json(booking.into()))
}

pub async fn update_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    req.validate(&())?;

    let update = UpdateBooking::try_from(req)?;
    registry
        .booking_repository()
        .update(UpdateBookingWithIds::new(
            booking_id,
            user.identity(),
            update,
        ))
        .await
        .map(BookingResponse::from)
        .map(Json)
}

pub async fn delete_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .booking_repository()
        .delete(DeleteBooking::new(booking_id, user.identity()))
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

// 状態の強制変更は管理者のみ
pub async fn update_booking_status(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    Query(query): Query<BookingStatusQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingResponse>> {
    user.require_admin()?;
    let status = parse_status(&query.status_sent)?;

    registry
        .booking_repository()
        .update_status(UpdateBookingStatus::new(
            booking_id,
            user.identity(),
            status,
        ))
        .await
        .map(BookingResponse::from)
        .map(Json)
}

pub async fn show_taken_slots(
    Path(space_id): Path<SpaceId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<Vec<TakenSlotResponse>>> {
    registry
        .booking_repository()
        .find_taken_by_space_id(space_id, Utc::now())
        .await
        .map(|slots| slots.into_iter().map(TakenSlotResponse::from).collect())
        .map(Json)
}

pub async fn show_receipt(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReceiptResponse>> {
    let not_found = || AppError::EntityNotFound(format!("Booking ({booking_id}) not found"));
    let booking = registry
        .booking_repository()
        .find_by_id(booking_id)
        .await?
        .ok_or_else(not_found)?;
    if !booking.is_owned_by(user.id()) {
        return Err(not_found());
    }

    let currency = registry.payment_config().currency;
    ReceiptResponse::try_from(BookingReceipt::new(booking, currency)).map(Json)
}

pub async fn show_all_bookings(
    user: AuthorizedUser,
    Query(query): Query<BookingListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedBookingResponse>> {
    user.require_admin()?;
    query.validate(&())?;

    let options = ListOptions::from(query);
    registry
        .booking_repository()
        .find_all(options)
        .await
        .map(|items| PaginatedBookings::new(items, options))
        .map(PaginatedBookingResponse::from)
        .map(Json)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use kernel::{
        model::{
            auth::AccessToken,
            booking::{receipt::ReceiptId, Booking, BookingSpace, BookingStatus},
            id::UserId,
            role::Role,
            user::{BookingUser, User},
        },
        repository::booking::{BookingRepository, MockBookingRepository},
    };
    use registry::MockAppRegistryExt;
    use shared::config::PaymentConfig;
    use std::sync::Arc;

    pub(crate) fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    pub(crate) fn authorized(role: Role) -> AuthorizedUser {
        AuthorizedUser {
            access_token: AccessToken("token".into()),
            user: User {
                user_id: UserId::new(),
                user_name: "alice".into(),
                email: "alice@example.com".into(),
                role,
            },
        }
    }

    pub(crate) fn booking_of(owner: &AuthorizedUser) -> Booking {
        Booking {
            booking_id: BookingId::new(),
            user: BookingUser {
                user_id: owner.id(),
                user_name: owner.user.user_name.clone(),
                email: owner.user.email.clone(),
            },
            space: BookingSpace {
                space_id: SpaceId::new(),
                name: "Room A".into(),
                hourly_rate: 50,
            },
            start_time: at(10),
            end_time: at(12),
            status: BookingStatus::Pending,
            purpose: "planning".into(),
            total_cost: 100,
            tx_ref: None,
            transaction_id: None,
            receipt_id: None,
            created_at: at(8),
        }
    }

    pub(crate) fn payment_config() -> PaymentConfig {
        PaymentConfig {
            base_url: "http://localhost".into(),
            secret_key: "sk_test".into(),
            currency: "NGN".into(),
            callback_url: None,
            title: "ReserveMe".into(),
            timeout_secs: 5,
            verify_on_confirm: false,
        }
    }

    fn registry_with(repository: MockBookingRepository) -> AppRegistry {
        let repository: Arc<dyn BookingRepository> = Arc::new(repository);
        let mut registry = MockAppRegistryExt::new();
        registry
            .expect_booking_repository()
            .returning(move || repository.clone());
        registry.expect_payment_config().returning(payment_config);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn reversed_window_is_rejected_before_the_ledger() {
        let mut repository = MockBookingRepository::new();
        repository.expect_create().never();

        let req = CreateBookingRequest {
            space_id: SpaceId::new(),
            start_time: at(12),
            end_time: at(10),
            purpose: "planning".into(),
        };
        let res = create_booking(
            authorized(Role::User),
            State(registry_with(repository)),
            Json(req),
        )
        .await;
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn admin_can_force_a_status() {
        let admin = authorized(Role::Admin);
        let owner = authorized(Role::User);
        let mut confirmed = booking_of(&owner);
        confirmed.status = BookingStatus::Confirmed;
        let booking_id = confirmed.booking_id;

        let mut repository = MockBookingRepository::new();
        repository
            .expect_update_status()
            .withf(move |event| {
                event.booking_id == booking_id && event.status == BookingStatus::Confirmed
            })
            .times(1)
            .returning(move |_| Ok(confirmed.clone()));

        let Json(res) = update_booking_status(
            admin,
            Path(booking_id),
            Query(BookingStatusQuery {
                status_sent: "confirmed".into(),
            }),
            State(registry_with(repository)),
        )
        .await
        .unwrap();
        assert_eq!(res.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn owner_cannot_force_a_status() {
        let owner = authorized(Role::User);
        let booking_id = booking_of(&owner).booking_id;

        let mut repository = MockBookingRepository::new();
        repository.expect_update_status().never();

        let res = update_booking_status(
            owner,
            Path(booking_id),
            Query(BookingStatusQuery {
                status_sent: "confirmed".into(),
            }),
            State(registry_with(repository)),
        )
        .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));
    }

    #[tokio::test]
    async fn unknown_status_never_reaches_the_ledger() {
        let mut repository = MockBookingRepository::new();
        repository.expect_update_status().never();

        let res = update_booking_status(
            authorized(Role::Admin),
            Path(BookingId::new()),
            Query(BookingStatusQuery {
                status_sent: "archived".into(),
            }),
            State(registry_with(repository)),
        )
        .await;
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn strangers_cannot_read_a_booking() {
        let owner = authorized(Role::User);
        let booking = booking_of(&owner);
        let booking_id = booking.booking_id;

        let mut repository = MockBookingRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(booking.clone())));
        let registry = registry_with(repository);

        let res = show_booking(
            authorized(Role::User),
            Path(booking_id),
            State(registry.clone()),
        )
        .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        let res = show_booking(authorized(Role::Admin), Path(booking_id), State(registry)).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn empty_search_is_a_validation_error() {
        let mut repository = MockBookingRepository::new();
        repository.expect_search().never();

        let res = search_bookings(
            authorized(Role::User),
            Query(BookingSearchQuery {
                query: String::new(),
            }),
            State(registry_with(repository)),
        )
        .await;
        assert!(matches!(res, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn receipt_requires_a_confirmed_booking() {
        let owner = authorized(Role::User);
        let pending = booking_of(&owner);
        let booking_id = pending.booking_id;
        let mut confirmed = pending.clone();
        confirmed.status = BookingStatus::Confirmed;
        confirmed.transaction_id = Some("555".into());
        confirmed.receipt_id = Some(ReceiptId::new(2024, 1));

        let mut repository = MockBookingRepository::new();
        let mut answers = vec![confirmed, pending];
        repository
            .expect_find_by_id()
            .times(2)
            .returning(move |_| Ok(answers.pop()));
        let registry = registry_with(repository);

        let res = show_receipt(
            authorized(Role::User),
            Path(booking_id),
            State(registry.clone()),
        )
        .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        let Json(receipt) = show_receipt(owner, Path(booking_id), State(registry))
            .await
            .unwrap();
        assert_eq!(receipt.receipt_id.to_string(), "ORD-2024-001");
        assert_eq!(receipt.billed_hours, 2);
        assert_eq!(receipt.total_cost, 100);
        assert_eq!(receipt.currency, "NGN");
    }

    #[tokio::test]
    async fn pending_bookings_have_no_receipt() {
        let owner = authorized(Role::User);
        let pending = booking_of(&owner);
        let booking_id = pending.booking_id;

        let mut repository = MockBookingRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(pending.clone())));

        let res = show_receipt(owner, Path(booking_id), State(registry_with(repository))).await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));
    }
}
