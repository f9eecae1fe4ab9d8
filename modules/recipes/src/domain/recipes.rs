use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::contract::model::{AttrKind, Attribute, NewRecipe, Recipe, RecipePatch};
use crate::domain::error::DomainError;
use crate::domain::repo::RecipesRepository;
use crate::domain::validation::{self, FieldErrors};

/// Owner-scoped tags, ingredients and recipes.
#[derive(Clone)]
pub struct RecipesService {
    repo: Arc<dyn RecipesRepository>,
    config: RecipesServiceConfig,
}

#[derive(Debug, Clone)]
pub struct RecipesServiceConfig {
    pub max_name_length: usize,
}

impl Default for RecipesServiceConfig {
    fn default() -> Self {
        Self {
            max_name_length: 255,
        }
    }
}

impl RecipesService {
    pub fn new(repo: Arc<dyn RecipesRepository>, config: RecipesServiceConfig) -> Self {
        Self { repo, config }
    }

    #[instrument(name = "recipes.service.list_attrs", skip(self))]
    pub async fn list_attrs(
        &self,
        owner: i32,
        kind: AttrKind,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, DomainError> {
        self.repo
            .list_attrs(kind, owner, assigned_only)
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    #[instrument(name = "recipes.service.create_attr", skip(self))]
    pub async fn create_attr(
        &self,
        owner: i32,
        kind: AttrKind,
        name: &str,
    ) -> Result<Attribute, DomainError> {
        let name = name.trim();
        let mut errors = FieldErrors::new();
        validation::check_text(&mut errors, "name", name, self.config.max_name_length);
        errors.finish()?;

        let attr = self
            .repo
            .insert_attr(kind, owner, name.to_string())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(id = attr.id, "created {:?}", kind);
        Ok(attr)
    }

    #[instrument(name = "recipes.service.list_recipes", skip(self))]
    pub async fn list_recipes(&self, owner: i32) -> Result<Vec<Recipe>, DomainError> {
        self.repo
            .list_recipes(owner)
            .await
            .map_err(|e| DomainError::database(e.to_string()))
    }

    #[instrument(name = "recipes.service.get_recipe", skip(self))]
    pub async fn get_recipe(&self, owner: i32, id: i32) -> Result<Recipe, DomainError> {
        self.repo
            .find_recipe(owner, id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::recipe_not_found(id))
    }

    #[instrument(name = "recipes.service.create_recipe", skip(self, new_recipe))]
    pub async fn create_recipe(
        &self,
        owner: i32,
        new_recipe: NewRecipe,
    ) -> Result<Recipe, DomainError> {
        let patch = normalize(RecipePatch::from(new_recipe));
        self.validate(owner, &patch).await?;

        let new_recipe = NewRecipe {
            title: patch.title.unwrap_or_default(),
            time_minutes: patch.time_minutes.unwrap_or_default(),
            price: patch.price.unwrap_or_default(),
            link: patch.link.unwrap_or_default(),
            tags: patch.tags.unwrap_or_default(),
            ingredients: patch.ingredients.unwrap_or_default(),
        };

        let recipe = self
            .repo
            .insert_recipe(owner, new_recipe)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        info!(id = recipe.id, "recipe created");
        Ok(recipe)
    }

    /// Full replacement (PUT). Omitted relations are cleared.
    pub async fn replace_recipe(
        &self,
        owner: i32,
        id: i32,
        recipe: NewRecipe,
    ) -> Result<Recipe, DomainError> {
        self.update_recipe(owner, id, recipe.into()).await
    }

    /// Partial update (PATCH). Only present fields change.
    #[instrument(name = "recipes.service.update_recipe", skip(self, patch))]
    pub async fn update_recipe(
        &self,
        owner: i32,
        id: i32,
        patch: RecipePatch,
    ) -> Result<Recipe, DomainError> {
        // Not-found wins over validation errors.
        let current = self.get_recipe(owner, id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let patch = normalize(patch);
        self.validate(owner, &patch).await?;

        let recipe = self
            .repo
            .update_recipe(owner, id, patch)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::recipe_not_found(id))?;
        info!("recipe updated");
        Ok(recipe)
    }

    #[instrument(name = "recipes.service.delete_recipe", skip(self))]
    pub async fn delete_recipe(&self, owner: i32, id: i32) -> Result<(), DomainError> {
        let deleted = self
            .repo
            .delete_recipe(owner, id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        if !deleted {
            return Err(DomainError::recipe_not_found(id));
        }
        info!("recipe deleted");
        Ok(())
    }

    async fn validate(&self, owner: i32, patch: &RecipePatch) -> Result<(), DomainError> {
        let max = self.config.max_name_length;
        let mut errors = FieldErrors::new();

        if let Some(ref title) = patch.title {
            validation::check_text(&mut errors, "title", title, max);
        }
        if let Some(minutes) = patch.time_minutes {
            validation::check_time_minutes(&mut errors, minutes);
        }
        if let Some(price) = patch.price {
            validation::check_price(&mut errors, price);
        }
        if let Some(ref link) = patch.link {
            validation::check_optional_text(&mut errors, "link", link, max);
        }
        if let Some(ref ids) = patch.tags {
            self.check_refs(&mut errors, owner, AttrKind::Tag, ids).await?;
        }
        if let Some(ref ids) = patch.ingredients {
            self.check_refs(&mut errors, owner, AttrKind::Ingredient, ids)
                .await?;
        }

        errors.finish()
    }

    /// Foreign and missing ids get the same message.
    async fn check_refs(
        &self,
        errors: &mut FieldErrors,
        owner: i32,
        kind: AttrKind,
        ids: &[i32],
    ) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let owned: BTreeSet<i32> = self
            .repo
            .owned_attr_ids(kind, owner, ids)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .into_iter()
            .collect();

        if let Some(bad) = ids.iter().find(|id| !owned.contains(id)) {
            errors.add(
                kind.field(),
                format!("Invalid pk \"{bad}\" - object does not exist."),
            );
        }
        Ok(())
    }
}

/// Trim text and drop duplicate relation ids, keeping first-seen order.
fn normalize(mut patch: RecipePatch) -> RecipePatch {
    fn dedup(ids: Vec<i32>) -> Vec<i32> {
        let mut seen = BTreeSet::new();
        ids.into_iter().filter(|id| seen.insert(*id)).collect()
    }

    patch.title = patch.title.map(|t| t.trim().to_string());
    patch.link = patch.link.map(|l| l.trim().to_string());
    patch.tags = patch.tags.map(dedup);
    patch.ingredients = patch.ingredients.map(dedup);
    patch
}
