use crate::model::{id::UserId, role::Role};

pub mod event;

pub struct AccessToken(pub String);

// アクセストークンを検証した結果として得られる本人情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> shared::error::AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(shared::error::AppError::ForbiddenOperation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_pass_the_admin_gate() {
        let admin = Identity {
            user_id: UserId::new(),
            role: Role::Admin,
        };
        let user = Identity {
            user_id: UserId::new(),
            role: Role::User,
        };
        assert!(admin.require_admin().is_ok());
        assert!(matches!(
            user.require_admin(),
            Err(shared::error::AppError::ForbiddenOperation)
        ));
    }
}
