use crate::model::{
    auth::Identity,
    booking::{Booking, BookingStatus, BookingWindow},
    id::{BookingId, SpaceId, UserId},
};
use chrono::{DateTime, Utc};
use derive_new::new;
use shared::error::{AppError, AppResult};

#[derive(new, Debug)]
pub struct CreateBooking {
    pub user_id: UserId,
    pub space_id: SpaceId,
    pub window: BookingWindow,
    pub purpose: String,
}

// 更新可能なフィールドだけを持つ部分更新
#[derive(Debug, Default)]
pub struct UpdateBooking {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
    pub status: Option<BookingStatus>,
}

#[derive(new, Debug)]
pub struct UpdateBookingWithIds {
    pub booking_id: BookingId,
    pub requested_by: Identity,
    pub update: UpdateBooking,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BookingChanges {
    pub window: BookingWindow,
    pub purpose: String,
    pub status: BookingStatus,
    pub total_cost: i64,
    pub window_changed: bool,
}

impl UpdateBooking {
    pub fn merge(self, current: &Booking, requested_by: &Identity) -> AppResult<BookingChanges> {
        current.ensure_owned_by(requested_by)?;

        let window = BookingWindow::new(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )?;
        let window_changed =
            window.start_time() != current.start_time || window.end_time() != current.end_time;
        if window_changed && current.status != BookingStatus::Pending {
            return Err(AppError::UnprocessableEntity(
                "only pending bookings can be rescheduled".into(),
            ));
        }

        // 所有者が自分で変更できる状態はキャンセルのみ
        let status = match self.status {
            None => current.status,
            Some(status) if status == current.status => status,
            Some(BookingStatus::Canceled) => BookingStatus::Canceled,
            Some(_) => return Err(AppError::ForbiddenOperation),
        };

        let total_cost = if window_changed {
            window.total_cost(current.space.hourly_rate)?
        } else {
            current.total_cost
        };

        Ok(BookingChanges {
            window,
            purpose: self.purpose.unwrap_or_else(|| current.purpose.clone()),
            status,
            total_cost,
            window_changed,
        })
    }
}

#[derive(new, Debug)]
pub struct UpdateBookingStatus {
    pub booking_id: BookingId,
    pub requested_by: Identity,
    pub status: BookingStatus,
}

#[derive(new, Debug)]
pub struct DeleteBooking {
    pub booking_id: BookingId,
    pub requested_by: Identity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        booking::tests::{at, booking},
        role::Role,
    };

    fn owner_identity(user_id: UserId) -> Identity {
        Identity {
            user_id,
            role: Role::User,
        }
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let owner = UserId::new();
        let current = booking(owner);
        let changes = UpdateBooking {
            purpose: Some("retro".into()),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner))
        .unwrap();

        assert_eq!(changes.purpose, "retro");
        assert_eq!(changes.window.start_time(), current.start_time);
        assert_eq!(changes.total_cost, current.total_cost);
        assert!(!changes.window_changed);
    }

    #[test]
    fn rescheduling_recomputes_cost() {
        let owner = UserId::new();
        let current = booking(owner);
        let changes = UpdateBooking {
            end_time: Some(at(14, 45)),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner))
        .unwrap();

        assert!(changes.window_changed);
        assert_eq!(changes.total_cost, 4 * 50);
    }

    #[test]
    fn rescheduling_rejects_overflowing_cost() {
        let owner = UserId::new();
        let mut current = booking(owner);
        current.space.hourly_rate = i64::MAX / 2;
        let res = UpdateBooking {
            end_time: Some(at(14, 0)),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner));
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn merged_window_must_stay_valid() {
        let owner = UserId::new();
        let current = booking(owner);
        let res = UpdateBooking {
            start_time: Some(at(13, 0)),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner));
        assert!(matches!(res, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn only_the_owner_may_update() {
        let current = booking(UserId::new());
        let admin = Identity {
            user_id: UserId::new(),
            role: Role::Admin,
        };
        let res = UpdateBooking::default().merge(&current, &admin);
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));
    }

    #[test]
    fn owner_cannot_self_confirm() {
        let owner = UserId::new();
        let current = booking(owner);
        let res = UpdateBooking {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner));
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        let canceled = UpdateBooking {
            status: Some(BookingStatus::Canceled),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner))
        .unwrap();
        assert_eq!(canceled.status, BookingStatus::Canceled);
    }

    #[test]
    fn confirmed_bookings_cannot_move() {
        let owner = UserId::new();
        let mut current = booking(owner);
        current.status = BookingStatus::Confirmed;
        let res = UpdateBooking {
            start_time: Some(at(9, 0)),
            ..Default::default()
        }
        .merge(&current, &owner_identity(owner));
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));
    }
}
