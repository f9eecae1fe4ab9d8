use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Account keyed by a lower-cased email. No serde here; REST DTOs live in `api::rest::dto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Fully prepared account row; the service has normalized and hashed everything.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile update; `None` leaves the field unchanged. `password` is cleartext.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

/// The two owner-scoped name tables that recipes link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Tag,
    Ingredient,
}

impl AttrKind {
    /// Request field that references this kind from a recipe.
    pub fn field(self) -> &'static str {
        match self {
            AttrKind::Tag => "tags",
            AttrKind::Ingredient => "ingredients",
        }
    }
}

/// A tag or an ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    /// Ordered by name.
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

/// Partial recipe update. A present `tags`/`ingredients` list replaces the current set.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<i32>>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.time_minutes.is_none()
            && self.price.is_none()
            && self.link.is_none()
            && self.tags.is_none()
            && self.ingredients.is_none()
    }
}

/// A full replacement is a patch that sets every field; omitted relations become empty.
impl From<NewRecipe> for RecipePatch {
    fn from(r: NewRecipe) -> Self {
        Self {
            title: Some(r.title),
            time_minutes: Some(r.time_minutes),
            price: Some(r.price),
            link: Some(r.link),
            tags: Some(r.tags),
            ingredients: Some(r.ingredients),
        }
    }
}
