use crate::model::{
    id::UserId,
    user::{
        event::{CreateUser, DeleteUser, ReactivateUser, UpdateUserPassword, UpdateUserProfile},
        User,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[mockall::automock]
#[async_trait]
pub trait UserRepository: Send + Sync {
    // 論理削除されたユーザーは返さない
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_all(&self) -> AppResult<Vec<User>>;
    async fn create(&self, event: CreateUser) -> AppResult<User>;
    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<User>;
    // 現在のパスワードが一致しない場合は UnauthenticatedError
    async fn update_password(&self, event: UpdateUserPassword) -> AppResult<()>;
    async fn reactivate(&self, event: ReactivateUser) -> AppResult<User>;
    async fn delete(&self, event: DeleteUser) -> AppResult<()>;
}
