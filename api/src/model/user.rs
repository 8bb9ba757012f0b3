use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::UserId,
    role::Role,
    user::{
        event::{CreateUser, ReactivateUser, UpdateUserPassword, UpdateUserProfile},
        BookingUser, User,
    },
};
use serde::{Deserialize, Serialize};
use strum::VariantNames;

#[derive(Debug, Serialize, Deserialize, VariantNames)]
#[strum(serialize_all = "kebab-case")]
pub enum RoleName {
    Admin,
    User,
}

impl From<Role> for RoleName {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => Self::Admin,
            Role::User => Self::User,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub items: Vec<UserResponse>,
}

impl From<Vec<User>> for UsersResponse {
    fn from(value: Vec<User>) -> Self {
        Self {
            items: value.into_iter().map(UserResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: RoleName,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        let User {
            user_id,
            user_name,
            email,
            role,
        } = value;
        Self {
            user_id,
            user_name,
            email,
            role: RoleName::from(role),
        }
    }
}

// 新規登録は一般ユーザーのみ。管理者は起動時に作成する
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[garde(length(min = 1, max = 100))]
    user_name: String,
    #[garde(email)]
    email: String,
    #[garde(length(min = 8))]
    password: String,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(value: CreateUserRequest) -> Self {
        let CreateUserRequest {
            user_name,
            email,
            password,
        } = value;
        Self {
            user_name,
            email,
            password,
            role: Role::User,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[garde(length(min = 1, max = 100))]
    user_name: Option<String>,
    #[garde(email)]
    email: Option<String>,
}

#[derive(new)]
pub struct UpdateProfileRequestWithUserId(UserId, UpdateProfileRequest);
impl From<UpdateProfileRequestWithUserId> for UpdateUserProfile {
    fn from(value: UpdateProfileRequestWithUserId) -> Self {
        let UpdateProfileRequestWithUserId(user_id, UpdateProfileRequest { user_name, email }) =
            value;
        UpdateUserProfile {
            user_id,
            user_name,
            email,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPasswordRequest {
    #[garde(length(min = 1))]
    current_password: String,
    #[garde(length(min = 8))]
    new_password: String,
}

#[derive(new)]
pub struct UpdateUserPasswordRequestWithUserId(UserId, UpdateUserPasswordRequest);
impl From<UpdateUserPasswordRequestWithUserId> for UpdateUserPassword {
    fn from(value: UpdateUserPasswordRequestWithUserId) -> Self {
        let UpdateUserPasswordRequestWithUserId(
            user_id,
            UpdateUserPasswordRequest {
                current_password,
                new_password,
            },
        ) = value;
        UpdateUserPassword {
            user_id,
            current_password,
            new_password,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactivateUserRequest {
    #[garde(email)]
    email: String,
    #[garde(length(min = 1))]
    password: String,
}

impl From<ReactivateUserRequest> for ReactivateUser {
    fn from(value: ReactivateUserRequest) -> Self {
        let ReactivateUserRequest { email, password } = value;
        ReactivateUser { email, password }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<BookingUser> for BookingUserResponse {
    fn from(value: BookingUser) -> Self {
        let BookingUser {
            user_id,
            user_name,
            email,
        } = value;
        Self {
            user_id,
            user_name,
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_fields_are_optional_but_validated() {
        let empty: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.validate(&()).is_ok());

        let bad_email: UpdateProfileRequest =
            serde_json::from_str(r#"{"email": "not-an-email"}"#).unwrap();
        assert!(bad_email.validate(&()).is_err());

        let blank_name: UpdateProfileRequest =
            serde_json::from_str(r#"{"userName": ""}"#).unwrap();
        assert!(blank_name.validate(&()).is_err());
    }

    #[test]
    fn new_password_must_be_long_enough() {
        let short: UpdateUserPasswordRequest = serde_json::from_str(
            r#"{"currentPassword": "Passw0rd", "newPassword": "short"}"#,
        )
        .unwrap();
        assert!(short.validate(&()).is_err());

        let user_id = UserId::new();
        let ok: UpdateUserPasswordRequest = serde_json::from_str(
            r#"{"currentPassword": "Passw0rd", "newPassword": "N3wPassw0rd"}"#,
        )
        .unwrap();
        assert!(ok.validate(&()).is_ok());
        let event = UpdateUserPassword::from(UpdateUserPasswordRequestWithUserId::new(user_id, ok));
        assert_eq!(event.user_id, user_id);
        assert_eq!(event.new_password, "N3wPassw0rd");
    }
}
