use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    user::{Role, User},
    WithId,
};
use refill::database::{
    Credentials, ManagerFilter, Page, Result, TokenRepo, UserRepo,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::{token, user},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub station_id: Option<String>,
    pub is_active: bool,
}

impl UserRow {
    pub fn into_with_id(self) -> WithId<User> {
        WithId::new(
            Id::new(self.id),
            User {
                name: self.name,
                email: self.email,
                // The role column carries a CHECK constraint, anything
                // that is not 'admin' is a station manager.
                role: match self.role.as_str() {
                    "admin" => Role::Admin,
                    _ => Role::StationManager,
                },
                station_id: self.station_id.map(Id::new),
                is_active: self.is_active,
            },
        )
    }

    pub fn role_to_db(role: Role) -> &'static str {
        match role {
            Role::Admin => "admin",
            Role::StationManager => "station",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CredentialsRow {
    #[sqlx(flatten)]
    pub user: UserRow,
    pub password_hash: String,
}

impl CredentialsRow {
    pub fn into_credentials(self) -> Credentials {
        Credentials {
            user: self.user.into_with_id(),
            password_hash: self.password_hash,
        }
    }
}

#[async_trait]
impl UserRepo for PgDatabaseAutocommit {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        user::get(&self.pool, id).await
    }

    async fn get_managers(
        &mut self,
        filter: &ManagerFilter,
    ) -> Result<Page<WithId<User>>> {
        let total = user::count_managers(&self.pool, filter).await?;
        let items = user::list_managers(&self.pool, filter).await?;
        Ok(Page {
            items,
            total,
            page: filter.page.page,
            per_page: filter.page.per_page,
        })
    }

    async fn insert_user(
        &mut self,
        new_user: User,
        password_hash: String,
    ) -> Result<WithId<User>> {
        user::insert(&self.pool, new_user, password_hash).await
    }

    async fn update_user(&mut self, updated: WithId<User>) -> Result<WithId<User>> {
        user::update(&self.pool, updated).await
    }

    async fn delete_user(&mut self, id: &Id<User>) -> Result<()> {
        user::delete(&self.pool, id).await
    }

    async fn credentials_by_email(&mut self, email: &str) -> Result<Credentials> {
        user::credentials_by_email(&self.pool, email).await
    }
}

#[async_trait]
impl<'a> UserRepo for PgDatabaseTransaction<'a> {
    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        user::get(&mut *self.tx, id).await
    }

    async fn get_managers(
        &mut self,
        filter: &ManagerFilter,
    ) -> Result<Page<WithId<User>>> {
        let total = user::count_managers(&mut *self.tx, filter).await?;
        let items = user::list_managers(&mut *self.tx, filter).await?;
        Ok(Page {
            items,
            total,
            page: filter.page.page,
            per_page: filter.page.per_page,
        })
    }

    async fn insert_user(
        &mut self,
        new_user: User,
        password_hash: String,
    ) -> Result<WithId<User>> {
        user::insert(&mut *self.tx, new_user, password_hash).await
    }

    async fn update_user(&mut self, updated: WithId<User>) -> Result<WithId<User>> {
        user::update(&mut *self.tx, updated).await
    }

    async fn delete_user(&mut self, id: &Id<User>) -> Result<()> {
        user::delete(&mut *self.tx, id).await
    }

    async fn credentials_by_email(&mut self, email: &str) -> Result<Credentials> {
        user::credentials_by_email(&mut *self.tx, email).await
    }
}

#[async_trait]
impl TokenRepo for PgDatabaseAutocommit {
    async fn insert_token(
        &mut self,
        owner: &Id<User>,
        token_digest: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        token::insert(&self.pool, owner, token_digest, created_at).await
    }

    async fn user_by_token_digest(
        &mut self,
        digest: &str,
    ) -> Result<WithId<User>> {
        token::user_by_digest(&self.pool, digest).await
    }

    async fn delete_token(&mut self, digest: &str) -> Result<()> {
        token::delete(&self.pool, digest).await
    }

    async fn delete_tokens_for_user(&mut self, owner: &Id<User>) -> Result<u64> {
        token::delete_for_user(&self.pool, owner).await
    }
}

#[async_trait]
impl<'a> TokenRepo for PgDatabaseTransaction<'a> {
    async fn insert_token(
        &mut self,
        owner: &Id<User>,
        token_digest: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        token::insert(&mut *self.tx, owner, token_digest, created_at).await
    }

    async fn user_by_token_digest(
        &mut self,
        digest: &str,
    ) -> Result<WithId<User>> {
        token::user_by_digest(&mut *self.tx, digest).await
    }

    async fn delete_token(&mut self, digest: &str) -> Result<()> {
        token::delete(&mut *self.tx, digest).await
    }

    async fn delete_tokens_for_user(&mut self, owner: &Id<User>) -> Result<u64> {
        token::delete_for_user(&mut *self.tx, owner).await
    }
}
