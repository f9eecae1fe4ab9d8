use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{Attribute, NewRecipe, Recipe, RecipePatch, Token, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::validation::FieldErrors;

const REQUIRED: &str = "This field is required.";

/// Public view of an account; the password never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub name: String,
}

/// Sign-up payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(min_length = 5)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenReq {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDto {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub name: String,
    pub email: String,
}

/// Full profile replacement (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileReq {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Partial profile update (PATCH).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfilePatchReq {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// A tag or an ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttrDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAttrReq {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttrListQuery {
    /// `1`/`0`; anything else is rejected.
    pub assigned_only: Option<String>,
}

/// Recipe as listed and returned from writes; relations are ids.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeDto {
    pub id: i32,
    pub title: String,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: String,
}

/// Single recipe with tags and ingredients expanded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeDetailDto {
    pub id: i32,
    pub title: String,
    pub tags: Vec<AttrDto>,
    pub ingredients: Vec<AttrDto>,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: String,
}

/// Recipe payload for POST, PUT and PATCH. POST and PUT require
/// `title`, `time_minutes` and `price`; PATCH takes any subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RecipeReq {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    /// Decimal string or number, at most two decimal places.
    #[schema(value_type = Option<String>, example = "5.00")]
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<i32>>,
}

impl RecipeReq {
    /// Complete recipe; missing required fields are reported together.
    pub fn into_new_recipe(self) -> Result<NewRecipe, DomainError> {
        let mut errors = FieldErrors::new();
        if self.title.is_none() {
            errors.add("title", REQUIRED);
        }
        if self.time_minutes.is_none() {
            errors.add("time_minutes", REQUIRED);
        }
        if self.price.is_none() {
            errors.add("price", REQUIRED);
        }
        errors.finish()?;

        Ok(NewRecipe {
            title: self.title.unwrap_or_default(),
            time_minutes: self.time_minutes.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            ingredients: self.ingredients.unwrap_or_default(),
        })
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<RecipeReq> for RecipePatch {
    fn from(req: RecipeReq) -> Self {
        Self {
            title: req.title,
            time_minutes: req.time_minutes,
            price: req.price,
            link: req.link,
            tags: req.tags,
            ingredients: req.ingredients,
        }
    }
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

impl From<&User> for ProfileDto {
    fn from(u: &User) -> Self {
        Self {
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

impl From<Token> for TokenDto {
    fn from(t: Token) -> Self {
        Self { token: t.key }
    }
}

impl From<ProfileReq> for UserPatch {
    fn from(req: ProfileReq) -> Self {
        Self {
            email: Some(req.email),
            name: Some(req.name),
            password: Some(req.password),
        }
    }
}

impl From<ProfilePatchReq> for UserPatch {
    fn from(req: ProfilePatchReq) -> Self {
        Self {
            email: req.email,
            name: req.name,
            password: req.password,
        }
    }
}

impl From<Attribute> for AttrDto {
    fn from(a: Attribute) -> Self {
        Self {
            id: a.id,
            name: a.name,
        }
    }
}

impl From<Recipe> for RecipeDto {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            tags: r.tags.into_iter().map(|t| t.id).collect(),
            ingredients: r.ingredients.into_iter().map(|i| i.id).collect(),
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
        }
    }
}

impl From<Recipe> for RecipeDetailDto {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            tags: r.tags.into_iter().map(AttrDto::from).collect(),
            ingredients: r.ingredients.into_iter().map(AttrDto::from).collect(),
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
        }
    }
}
