use crate::model::{auth::Identity, id::UserId, role::Role};

pub mod event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

// 予約に紐づくユーザー情報（決済時の顧客情報にも使う）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}
