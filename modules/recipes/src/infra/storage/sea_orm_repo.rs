//! SeaORM-backed repository implementations for the domain ports.
//!
//! Both repositories are generic over the connection, so they work on a
//! `DatabaseConnection` as well as inside a transaction.

use std::collections::{BTreeSet, HashMap};

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, SqlErr,
    TransactionTrait,
};

use crate::contract::model::{
    AttrKind, Attribute, NewRecipe, NewUser, Recipe, RecipePatch, Token, User,
};
use crate::domain::repo::{RecipesRepository, RepoError, UsersRepository};
use crate::infra::storage::entity::{
    ingredient, recipe, recipe_ingredient, recipe_tag, tag, token, user,
};
use crate::infra::storage::mapper::{cents_to_price, price_to_cents};

fn classify(err: DbErr, what: &'static str) -> RepoError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        RepoError::Conflict
    } else {
        RepoError::Other(anyhow::Error::new(err).context(what))
    }
}

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("find_by_email failed")?;
        Ok(found.map(Into::into))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("email_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, u: NewUser) -> Result<User, RepoError> {
        let m = user::ActiveModel {
            id: NotSet,
            email: Set(u.email),
            name: Set(u.name),
            password: Set(u.password_hash),
            is_active: Set(true),
            is_staff: Set(u.is_staff),
            is_superuser: Set(u.is_superuser),
            created_at: Set(u.created_at),
            last_login: Set(None),
        };
        let model = m
            .insert(&self.conn)
            .await
            .map_err(|e| classify(e, "insert user failed"))?;
        Ok(model.into())
    }

    async fn update(&self, u: &User) -> Result<(), RepoError> {
        let m = user::ActiveModel {
            id: Set(u.id),
            email: Set(u.email.clone()),
            name: Set(u.name.clone()),
            password: Set(u.password_hash.clone()),
            is_active: Set(u.is_active),
            is_staff: Set(u.is_staff),
            is_superuser: Set(u.is_superuser),
            created_at: Set(u.created_at),
            last_login: Set(u.last_login),
        };
        let _ = m
            .update(&self.conn)
            .await
            .map_err(|e| classify(e, "update user failed"))?;
        Ok(())
    }

    async fn set_last_login(&self, user_id: i32, at: DateTime<Utc>) -> anyhow::Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::LastLogin, Expr::value(Some(at)))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("set_last_login failed")?;
        Ok(())
    }

    async fn find_token_for_user(&self, user_id: i32) -> anyhow::Result<Option<Token>> {
        let found = token::Entity::find()
            .filter(token::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("find_token_for_user failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert_token(&self, t: &Token) -> Result<(), RepoError> {
        let m = token::ActiveModel {
            key: Set(t.key.clone()),
            user_id: Set(t.user_id),
            created_at: Set(t.created_at),
        };
        token::Entity::insert(m)
            .exec_without_returning(&self.conn)
            .await
            .map_err(|e| classify(e, "insert token failed"))?;
        Ok(())
    }

    async fn find_user_by_token(&self, key: &str) -> anyhow::Result<Option<User>> {
        let Some(t) = token::Entity::find_by_id(key.to_owned())
            .one(&self.conn)
            .await
            .context("find token failed")?
        else {
            return Ok(None);
        };
        self.find_by_id(t.user_id).await
    }
}

/// Column layout shared by the `tags` and `ingredients` tables and their
/// recipe link tables.
trait AttrTable: EntityTrait {
    const ID: Self::Column;
    const NAME: Self::Column;
    const OWNER: Self::Column;

    type Link: EntityTrait;
    const LINK_RECIPE: <Self::Link as EntityTrait>::Column;
    const LINK_TARGET: <Self::Link as EntityTrait>::Column;
}

impl AttrTable for tag::Entity {
    const ID: tag::Column = tag::Column::Id;
    const NAME: tag::Column = tag::Column::Name;
    const OWNER: tag::Column = tag::Column::UserId;

    type Link = recipe_tag::Entity;
    const LINK_RECIPE: recipe_tag::Column = recipe_tag::Column::RecipeId;
    const LINK_TARGET: recipe_tag::Column = recipe_tag::Column::TagId;
}

impl AttrTable for ingredient::Entity {
    const ID: ingredient::Column = ingredient::Column::Id;
    const NAME: ingredient::Column = ingredient::Column::Name;
    const OWNER: ingredient::Column = ingredient::Column::UserId;

    type Link = recipe_ingredient::Entity;
    const LINK_RECIPE: recipe_ingredient::Column = recipe_ingredient::Column::RecipeId;
    const LINK_TARGET: recipe_ingredient::Column = recipe_ingredient::Column::IngredientId;
}

fn owned_recipe_ids(owner: i32) -> SelectStatement {
    recipe::Entity::find()
        .select_only()
        .column(recipe::Column::Id)
        .filter(recipe::Column::UserId.eq(owner))
        .into_query()
}

async fn list_attrs_of<E, C>(
    conn: &C,
    owner: i32,
    assigned_only: bool,
) -> Result<Vec<Attribute>, DbErr>
where
    E: AttrTable,
    C: ConnectionTrait,
{
    let mut query = E::find()
        .select_only()
        .column(E::ID)
        .column(E::NAME)
        .filter(E::OWNER.eq(owner));

    if assigned_only {
        // IN (subquery) collapses attributes linked from several recipes.
        let linked = <E::Link as EntityTrait>::find()
            .select_only()
            .column(E::LINK_TARGET)
            .filter(E::LINK_RECIPE.in_subquery(owned_recipe_ids(owner)))
            .into_query();
        query = query.filter(E::ID.in_subquery(linked));
    }

    let rows: Vec<(i32, String)> = query
        .order_by_asc(E::NAME)
        .order_by_asc(E::ID)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Attribute { id, name })
        .collect())
}

async fn owned_ids_of<E, C>(conn: &C, owner: i32, ids: &[i32]) -> Result<Vec<i32>, DbErr>
where
    E: AttrTable,
    C: ConnectionTrait,
{
    E::find()
        .select_only()
        .column(E::ID)
        .filter(E::OWNER.eq(owner))
        .filter(E::ID.is_in(ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await
}

/// Attributes linked to each of `recipe_ids`, sorted by name.
async fn links_of<E, C>(
    conn: &C,
    recipe_ids: &[i32],
) -> Result<HashMap<i32, Vec<Attribute>>, DbErr>
where
    E: AttrTable,
    C: ConnectionTrait,
{
    let mut out: HashMap<i32, Vec<Attribute>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(out);
    }

    let pairs: Vec<(i32, i32)> = <E::Link as EntityTrait>::find()
        .select_only()
        .column(E::LINK_RECIPE)
        .column(E::LINK_TARGET)
        .filter(E::LINK_RECIPE.is_in(recipe_ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;
    if pairs.is_empty() {
        return Ok(out);
    }

    let target_ids: BTreeSet<i32> = pairs.iter().map(|(_, t)| *t).collect();
    let names: HashMap<i32, String> = E::find()
        .select_only()
        .column(E::ID)
        .column(E::NAME)
        .filter(E::ID.is_in(target_ids))
        .into_tuple::<(i32, String)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    for (recipe_id, target_id) in pairs {
        if let Some(name) = names.get(&target_id) {
            out.entry(recipe_id).or_default().push(Attribute {
                id: target_id,
                name: name.clone(),
            });
        }
    }
    for attrs in out.values_mut() {
        attrs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }
    Ok(out)
}

async fn replace_tags<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    ids: &[i32],
) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    if ids.is_empty() {
        return Ok(());
    }
    let rows = ids.iter().map(|id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*id),
    });
    recipe_tag::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn replace_ingredients<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    ids: &[i32],
) -> Result<(), DbErr> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    if ids.is_empty() {
        return Ok(());
    }
    let rows = ids.iter().map(|id| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(*id),
    });
    recipe_ingredient::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<recipe::Model>,
) -> Result<Vec<Recipe>, DbErr> {
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let mut tags = links_of::<tag::Entity, _>(conn, &ids).await?;
    let mut ingredients = links_of::<ingredient::Entity, _>(conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|r| Recipe {
            tags: tags.remove(&r.id).unwrap_or_default(),
            ingredients: ingredients.remove(&r.id).unwrap_or_default(),
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: cents_to_price(r.price_cents),
            link: r.link,
        })
        .collect())
}

fn cents(price: rust_decimal::Decimal) -> anyhow::Result<i64> {
    price_to_cents(price).with_context(|| format!("price {price} out of range"))
}

pub struct SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> RecipesRepository for SeaOrmRecipesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn list_attrs(
        &self,
        kind: AttrKind,
        owner: i32,
        assigned_only: bool,
    ) -> anyhow::Result<Vec<Attribute>> {
        let rows = match kind {
            AttrKind::Tag => {
                list_attrs_of::<tag::Entity, _>(&self.conn, owner, assigned_only).await
            }
            AttrKind::Ingredient => {
                list_attrs_of::<ingredient::Entity, _>(&self.conn, owner, assigned_only).await
            }
        };
        rows.context("list_attrs failed")
    }

    async fn insert_attr(
        &self,
        kind: AttrKind,
        owner: i32,
        name: String,
    ) -> anyhow::Result<Attribute> {
        let (id, name) = match kind {
            AttrKind::Tag => {
                let m = tag::ActiveModel {
                    id: NotSet,
                    name: Set(name),
                    user_id: Set(owner),
                }
                .insert(&self.conn)
                .await
                .context("insert tag failed")?;
                (m.id, m.name)
            }
            AttrKind::Ingredient => {
                let m = ingredient::ActiveModel {
                    id: NotSet,
                    name: Set(name),
                    user_id: Set(owner),
                }
                .insert(&self.conn)
                .await
                .context("insert ingredient failed")?;
                (m.id, m.name)
            }
        };
        Ok(Attribute { id, name })
    }

    async fn owned_attr_ids(
        &self,
        kind: AttrKind,
        owner: i32,
        ids: &[i32],
    ) -> anyhow::Result<Vec<i32>> {
        let found = match kind {
            AttrKind::Tag => owned_ids_of::<tag::Entity, _>(&self.conn, owner, ids).await,
            AttrKind::Ingredient => {
                owned_ids_of::<ingredient::Entity, _>(&self.conn, owner, ids).await
            }
        };
        found.context("owned_attr_ids failed")
    }

    async fn list_recipes(&self, owner: i32) -> anyhow::Result<Vec<Recipe>> {
        let rows = recipe::Entity::find()
            .filter(recipe::Column::UserId.eq(owner))
            .order_by_desc(recipe::Column::Id)
            .all(&self.conn)
            .await
            .context("list_recipes failed")?;
        hydrate(&self.conn, rows)
            .await
            .context("load recipe links failed")
    }

    async fn find_recipe(&self, owner: i32, id: i32) -> anyhow::Result<Option<Recipe>> {
        let Some(row) = recipe::Entity::find_by_id(id)
            .filter(recipe::Column::UserId.eq(owner))
            .one(&self.conn)
            .await
            .context("find_recipe failed")?
        else {
            return Ok(None);
        };
        let mut recipes = hydrate(&self.conn, vec![row])
            .await
            .context("load recipe links failed")?;
        Ok(recipes.pop())
    }

    async fn insert_recipe(&self, owner: i32, r: NewRecipe) -> anyhow::Result<Recipe> {
        let price_cents = cents(r.price)?;
        let txn = self.conn.begin().await.context("begin failed")?;

        let row = recipe::ActiveModel {
            id: NotSet,
            title: Set(r.title),
            time_minutes: Set(r.time_minutes),
            price_cents: Set(price_cents),
            link: Set(r.link),
            user_id: Set(owner),
        }
        .insert(&txn)
        .await
        .context("insert recipe failed")?;

        replace_tags(&txn, row.id, &r.tags)
            .await
            .context("insert recipe tags failed")?;
        replace_ingredients(&txn, row.id, &r.ingredients)
            .await
            .context("insert recipe ingredients failed")?;

        let mut recipes = hydrate(&txn, vec![row])
            .await
            .context("load recipe links failed")?;
        txn.commit().await.context("commit failed")?;

        recipes.pop().context("inserted recipe missing")
    }

    async fn update_recipe(
        &self,
        owner: i32,
        id: i32,
        patch: RecipePatch,
    ) -> anyhow::Result<Option<Recipe>> {
        let txn = self.conn.begin().await.context("begin failed")?;

        let Some(row) = recipe::Entity::find_by_id(id)
            .filter(recipe::Column::UserId.eq(owner))
            .one(&txn)
            .await
            .context("find_recipe failed")?
        else {
            return Ok(None);
        };

        let unchanged = row.clone();
        let mut am = row.into_active_model();
        if let Some(title) = patch.title {
            am.title = Set(title);
        }
        if let Some(minutes) = patch.time_minutes {
            am.time_minutes = Set(minutes);
        }
        if let Some(price) = patch.price {
            am.price_cents = Set(cents(price)?);
        }
        if let Some(link) = patch.link {
            am.link = Set(link);
        }
        let row = if am.is_changed() {
            am.update(&txn).await.context("update recipe failed")?
        } else {
            unchanged
        };

        if let Some(ref ids) = patch.tags {
            replace_tags(&txn, id, ids)
                .await
                .context("replace recipe tags failed")?;
        }
        if let Some(ref ids) = patch.ingredients {
            replace_ingredients(&txn, id, ids)
                .await
                .context("replace recipe ingredients failed")?;
        }

        let mut recipes = hydrate(&txn, vec![row])
            .await
            .context("load recipe links failed")?;
        txn.commit().await.context("commit failed")?;
        Ok(recipes.pop())
    }

    async fn delete_recipe(&self, owner: i32, id: i32) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await.context("begin failed")?;

        let owned = recipe::Entity::find_by_id(id)
            .filter(recipe::Column::UserId.eq(owner))
            .count(&txn)
            .await
            .context("find_recipe failed")?;
        if owned == 0 {
            return Ok(false);
        }

        // Link rows go first; SQLite only cascades with foreign_keys on.
        replace_tags(&txn, id, &[])
            .await
            .context("delete recipe tags failed")?;
        replace_ingredients(&txn, id, &[])
            .await
            .context("delete recipe ingredients failed")?;
        let res = recipe::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .context("delete recipe failed")?;

        txn.commit().await.context("commit failed")?;
        Ok(res.rows_affected > 0)
    }
}
