use kernel::{
    model::{role::Role, user::event::CreateUser},
    repository::user::UserRepository,
};
use shared::{config::AdminSeedConfig, error::AppResult};

// 管理者アカウントがなければ作成する。既に存在する場合は何もしない
pub async fn ensure_admin(
    repository: &dyn UserRepository,
    config: &AdminSeedConfig,
) -> AppResult<bool> {
    if repository.find_by_email(&config.email).await?.is_some() {
        tracing::debug!(email = %config.email, "admin account already exists");
        return Ok(false);
    }

    let admin = repository
        .create(CreateUser {
            user_name: config.user_name.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            role: Role::Admin,
        })
        .await?;
    tracing::info!(user_id = %admin.user_id, "admin account created");
    Ok(true)
}
