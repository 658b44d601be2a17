use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        user::{self, UserRole},
        User, UserModel,
    },
    errors::ServiceError,
};

/// User moderation and admin-account management.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<UserModel>, u64), ServiceError> {
        let per_page = per_page.clamp(1, 100);
        let paginator = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    /// Activate or deactivate an account. An admin may not moderate their
    /// own account. Returns (before, after) for auditing.
    #[instrument(skip(self))]
    pub async fn moderate(
        &self,
        acting_admin: Uuid,
        target_user: Uuid,
        is_active: bool,
    ) -> Result<(UserModel, UserModel), ServiceError> {
        if acting_admin == target_user {
            return Err(ServiceError::Forbidden(
                "You cannot moderate your own account".into(),
            ));
        }

        let before = User::find_by_id(target_user)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {target_user} not found")))?;

        let mut active: user::ActiveModel = before.clone().into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let after = active.update(&*self.db).await?;

        info!(%target_user, %is_active, "user moderated");
        Ok((before, after))
    }

    /// Promote an existing user to admin. Only a super-admin may do this;
    /// the check belongs to the caller's authorization layer, re-asserted
    /// here with the acting role.
    #[instrument(skip(self))]
    pub async fn grant_admin(
        &self,
        acting_role: UserRole,
        target_user: Uuid,
    ) -> Result<UserModel, ServiceError> {
        if acting_role != UserRole::SuperAdmin {
            return Err(ServiceError::Forbidden(
                "Only a super admin can create admins".into(),
            ));
        }

        let found = User::find_by_id(target_user)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {target_user} not found")))?;

        if found.role.is_admin() {
            return Err(ServiceError::Conflict("User is already an admin".into()));
        }

        let mut active: user::ActiveModel = found.into();
        active.role = Set(UserRole::Admin);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;
        info!(%target_user, "admin role granted");
        Ok(updated)
    }
}
