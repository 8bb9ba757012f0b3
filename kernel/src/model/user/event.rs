use crate::model::{id::UserId, role::Role};
use derive_new::new;

pub struct CreateUser {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(new, Debug)]
pub struct UpdateUserProfile {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub email: Option<String>,
}

#[derive(new)]
pub struct UpdateUserPassword {
    pub user_id: UserId,
    pub current_password: String,
    pub new_password: String,
}

// 論理削除済みのアカウントをパスワード確認のうえで戻す
#[derive(new)]
pub struct ReactivateUser {
    pub email: String,
    pub password: String,
}

pub struct DeleteUser {
    pub user_id: UserId,
}
