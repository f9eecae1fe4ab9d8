//! SeaORM entities. Foreign keys and cascades are declared in the migration;
//! queries join by explicit columns, so no `Relation` variants are needed.

pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod tag;
pub mod token;
pub mod user;
