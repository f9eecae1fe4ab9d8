use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::contract::model::{
    AttrKind, Attribute, NewRecipe, NewUser, Recipe, RecipePatch, Token, User,
};

/// Write failure that the domain needs to tell apart from the rest.
#[derive(Error, Debug)]
pub enum RepoError {
    /// A unique index rejected the row.
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence port for accounts and their tokens.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>>;
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    async fn insert(&self, u: NewUser) -> Result<User, RepoError>;
    /// Update every column of an existing user (by `u.id`).
    async fn update(&self, u: &User) -> Result<(), RepoError>;
    async fn set_last_login(&self, user_id: i32, at: DateTime<Utc>) -> anyhow::Result<()>;

    async fn find_token_for_user(&self, user_id: i32) -> anyhow::Result<Option<Token>>;
    /// Conflict when the user already has a token or the key is taken.
    async fn insert_token(&self, t: &Token) -> Result<(), RepoError>;
    /// Owner of the token `key`, if any.
    async fn find_user_by_token(&self, key: &str) -> anyhow::Result<Option<User>>;
}

/// Persistence port for tags, ingredients and recipes. Every call is scoped
/// to `owner`; rows of other users are invisible.
#[async_trait]
pub trait RecipesRepository: Send + Sync {
    /// Ordered by name; `assigned_only` keeps rows linked to one of the owner's recipes.
    async fn list_attrs(
        &self,
        kind: AttrKind,
        owner: i32,
        assigned_only: bool,
    ) -> anyhow::Result<Vec<Attribute>>;
    async fn insert_attr(&self, kind: AttrKind, owner: i32, name: String)
        -> anyhow::Result<Attribute>;
    /// Subset of `ids` that exist and belong to `owner`.
    async fn owned_attr_ids(&self, kind: AttrKind, owner: i32, ids: &[i32])
        -> anyhow::Result<Vec<i32>>;

    /// Newest first.
    async fn list_recipes(&self, owner: i32) -> anyhow::Result<Vec<Recipe>>;
    async fn find_recipe(&self, owner: i32, id: i32) -> anyhow::Result<Option<Recipe>>;
    async fn insert_recipe(&self, owner: i32, r: NewRecipe) -> anyhow::Result<Recipe>;
    /// `None` when the recipe does not exist for `owner`.
    async fn update_recipe(
        &self,
        owner: i32,
        id: i32,
        patch: RecipePatch,
    ) -> anyhow::Result<Option<Recipe>>;
    /// Returns true if a row was deleted.
    async fn delete_recipe(&self, owner: i32, id: i32) -> anyhow::Result<bool>;
}
