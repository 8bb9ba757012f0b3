use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{
        id::UserId,
        user::{
            event::{
                CreateUser, DeleteUser, ReactivateUser, UpdateUserPassword, UpdateUserProfile,
            },
            User,
        },
    },
    repository::user::UserRepository,
};
use shared::error::{AppError, AppResult};

use crate::database::{
    commit_error, map_unique_violation,
    model::{
        auth::{UserCredentialRow, UserItem},
        user::UserRow,
    },
    storage_error, ConnectionPool,
};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role
                FROM users
                WHERE user_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(current_user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(storage_error("find_user", current_user_id))?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role
                FROM users
                WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role
                FROM users
                WHERE is_deleted = FALSE
                ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn create(&self, event: CreateUser) -> AppResult<User> {
        let user_id = UserId::new();
        let hashed_password = hash_password(&event.password)?;
        let res = sqlx::query(
            r#"
                INSERT INTO users (user_id, user_name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&event.user_name)
        .bind(&event.email)
        .bind(hashed_password)
        .bind(event.role.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(|e| map_unique_violation(e, "User name or email is already registered"))?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No user has been created".into(),
            ));
        }

        Ok(User {
            user_id,
            user_name: event.user_name,
            email: event.email,
            role: event.role,
        })
    }

    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<User> {
        // 指定のないフィールドは現在の値を残す
        let user: User = sqlx::query_as::<_, UserRow>(
            r#"
                UPDATE users SET
                    user_name = COALESCE($2, user_name),
                    email = COALESCE($3, email)
                WHERE user_id = $1 AND is_deleted = FALSE
                RETURNING user_id, user_name, email, role
            "#,
        )
        .bind(event.user_id)
        .bind(&event.user_name)
        .bind(&event.email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(|e| map_unique_violation(e, "User name or email is already registered"))?
        .ok_or_else(|| AppError::EntityNotFound("Specified user not found".into()))?
        .try_into()?;

        tracing::info!(user_id = %event.user_id, "user profile updated");

        Ok(user)
    }

    async fn update_password(&self, event: UpdateUserPassword) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let credential: UserItem = sqlx::query_as::<_, UserCredentialRow>(
            r#"
                SELECT user_id, password_hash
                FROM users
                WHERE user_id = $1 AND is_deleted = FALSE
                FOR UPDATE
            "#,
        )
        .bind(event.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error("update_password", event.user_id))?
        .map(UserItem::from)
        .ok_or_else(|| AppError::EntityNotFound("Specified user not found".into()))?;

        if !bcrypt::verify(&event.current_password, &credential.password_hash)? {
            tracing::warn!(user_id = %event.user_id, "current password did not match");
            return Err(AppError::UnauthenticatedError);
        }

        sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(event.user_id)
            .bind(hash_password(&event.new_password)?)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("update_password", event.user_id))?;

        tx.commit()
            .await
            .map_err(commit_error("update_password", event.user_id))?;

        tracing::info!(user_id = %event.user_id, "user password updated");

        Ok(())
    }

    async fn reactivate(&self, event: ReactivateUser) -> AppResult<User> {
        let mut tx = self.db.begin().await?;

        let credential: UserItem = sqlx::query_as::<_, UserCredentialRow>(
            r#"
                SELECT user_id, password_hash
                FROM users
                WHERE email = $1 AND is_deleted = TRUE
                FOR UPDATE
            "#,
        )
        .bind(&event.email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(UserItem::from)
        .ok_or_else(|| {
            AppError::EntityNotFound("User not found or account is not deactivated".into())
        })?;

        if !bcrypt::verify(&event.password, &credential.password_hash)? {
            return Err(AppError::UnauthenticatedError);
        }

        let user: User = sqlx::query_as::<_, UserRow>(
            r#"
                UPDATE users SET is_deleted = FALSE
                WHERE user_id = $1
                RETURNING user_id, user_name, email, role
            "#,
        )
        .bind(credential.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error("reactivate_user", credential.user_id))?
        .try_into()?;

        tx.commit()
            .await
            .map_err(commit_error("reactivate_user", credential.user_id))?;

        tracing::info!(user_id = %user.user_id, "user account reactivated");

        Ok(user)
    }

    async fn delete(&self, event: DeleteUser) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE users SET is_deleted = TRUE
                WHERE user_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(event.user_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(storage_error("delete_user", event.user_id))?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound("Specified user not found".into()));
        }

        Ok(())
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(AppError::from)
}
