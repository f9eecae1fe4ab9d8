use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::api::OpenApiRegistry;
use modkit::{DbModule, Module, ModuleCtx, RestfulModule};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::RecipesConfig;
use crate::domain::recipes::{RecipesService, RecipesServiceConfig};
use crate::domain::users::{UsersConfig, UsersService};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::{SeaOrmRecipesRepository, SeaOrmUsersRepository};

/// Users, tokens, tags, ingredients and recipes behind one REST surface.
#[derive(Default)]
pub struct Recipes {
    // Filled by `init`; read by `register_rest` and the CLI.
    users: ArcSwapOption<UsersService>,
    recipes: ArcSwapOption<RecipesService>,
}

impl Recipes {
    pub const NAME: &'static str = "recipes";

    /// Account service, available after `init`.
    pub fn users_service(&self) -> anyhow::Result<Arc<UsersService>> {
        self.users
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    pub fn recipes_service(&self) -> anyhow::Result<Arc<RecipesService>> {
        self.recipes
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }
}

#[async_trait]
impl Module for Recipes {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing recipes module");

        let cfg: RecipesConfig = ctx.module_config()?;
        debug!(
            "Loaded recipes config: min_password_length={}, max_name_length={}",
            cfg.min_password_length, cfg.max_name_length
        );

        let db = ctx.db_required()?;
        let conn = db.sea();

        let users = UsersService::new(
            Arc::new(SeaOrmUsersRepository::new(conn.clone())),
            UsersConfig {
                min_password_length: cfg.min_password_length,
                max_name_length: cfg.max_name_length,
            },
        );
        let recipes = RecipesService::new(
            Arc::new(SeaOrmRecipesRepository::new(conn)),
            RecipesServiceConfig {
                max_name_length: cfg.max_name_length,
            },
        );

        self.users.store(Some(Arc::new(users)));
        self.recipes.store(Some(Arc::new(recipes)));
        Ok(())
    }
}

#[async_trait]
impl DbModule for Recipes {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running recipes database migrations");
        let conn = db.sea();
        Migrator::up(&conn, None).await?;
        info!("Recipes database migrations completed successfully");
        Ok(())
    }
}

impl RestfulModule for Recipes {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering recipes REST routes");

        let router = routes::register_routes(
            router,
            openapi,
            self.users_service()?,
            self.recipes_service()?,
        )?;
        info!("Recipes REST routes registered successfully");
        Ok(router)
    }
}
