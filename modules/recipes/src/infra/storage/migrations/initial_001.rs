use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Clone, Copy, DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    Password,
    IsActive,
    IsStaff,
    IsSuperuser,
    CreatedAt,
    LastLogin,
}

#[derive(Clone, Copy, DeriveIden)]
enum AuthTokens {
    Table,
    Key,
    UserId,
    CreatedAt,
}

#[derive(Clone, Copy, DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    UserId,
}

#[derive(Clone, Copy, DeriveIden)]
enum Ingredients {
    Table,
    Id,
    Name,
    UserId,
}

#[derive(Clone, Copy, DeriveIden)]
enum Recipes {
    Table,
    Id,
    Title,
    TimeMinutes,
    PriceCents,
    Link,
    UserId,
}

#[derive(Clone, Copy, DeriveIden)]
enum RecipeTags {
    Table,
    RecipeId,
    TagId,
}

#[derive(Clone, Copy, DeriveIden)]
enum RecipeIngredients {
    Table,
    RecipeId,
    IngredientId,
}

fn owner_fk(table: impl IntoIden + 'static, name: &str) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, Alias::new("user_id"))
        .to(Users::Table, Users::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

/// Owner-scoped `(id, name, user_id)` table.
fn named_table(
    table: impl IntoIden + Clone + 'static,
    id: impl IntoIden,
    name: impl IntoIden,
    user_id: impl IntoIden,
    fk: &str,
) -> TableCreateStatement {
    Table::create()
        .table(table.clone())
        .if_not_exists()
        .col(
            ColumnDef::new(id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(name).string_len(255).not_null())
        .col(ColumnDef::new(user_id).integer().not_null())
        .foreign_key(&mut owner_fk(table, fk))
        .to_owned()
}

/// Composite-key join table, cascading from both sides.
fn link_table(
    table: impl IntoIden + Clone + 'static,
    recipe_id: impl IntoIden + Clone + 'static,
    other_id: impl IntoIden + Clone + 'static,
    other: impl IntoIden + 'static,
    other_pk: impl IntoIden + 'static,
    prefix: &str,
) -> TableCreateStatement {
    Table::create()
        .table(table.clone())
        .if_not_exists()
        .col(ColumnDef::new(recipe_id.clone()).integer().not_null())
        .col(ColumnDef::new(other_id.clone()).integer().not_null())
        .primary_key(Index::create().col(recipe_id.clone()).col(other_id.clone()))
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{prefix}_recipe"))
                .from(table.clone(), recipe_id)
                .to(Recipes::Table, Recipes::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{prefix}_target"))
                .from(table, other_id)
                .to(other, other_pk)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsSuperuser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthTokens::Key)
                            .string_len(40)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AuthTokens::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AuthTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut owner_fk(AuthTokens::Table, "fk_auth_tokens_user"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(named_table(
                Tags::Table,
                Tags::Id,
                Tags::Name,
                Tags::UserId,
                "fk_tags_user",
            ))
            .await?;

        manager
            .create_table(named_table(
                Ingredients::Table,
                Ingredients::Id,
                Ingredients::Name,
                Ingredients::UserId,
                "fk_ingredients_user",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Recipes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Recipes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Recipes::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Recipes::TimeMinutes).integer().not_null())
                    .col(ColumnDef::new(Recipes::PriceCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Recipes::Link)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Recipes::UserId).integer().not_null())
                    .foreign_key(&mut owner_fk(Recipes::Table, "fk_recipes_user"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(link_table(
                RecipeTags::Table,
                RecipeTags::RecipeId,
                RecipeTags::TagId,
                Tags::Table,
                Tags::Id,
                "recipe_tags",
            ))
            .await?;

        manager
            .create_table(link_table(
                RecipeIngredients::Table,
                RecipeIngredients::RecipeId,
                RecipeIngredients::IngredientId,
                Ingredients::Table,
                Ingredients::Id,
                "recipe_ingredients",
            ))
            .await?;

        for (name, table, col) in [
            ("idx_tags_user", Tags::Table.into_iden(), Tags::UserId.into_iden()),
            (
                "idx_ingredients_user",
                Ingredients::Table.into_iden(),
                Ingredients::UserId.into_iden(),
            ),
            ("idx_recipes_user", Recipes::Table.into_iden(), Recipes::UserId.into_iden()),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col(col)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            RecipeIngredients::Table.into_iden(),
            RecipeTags::Table.into_iden(),
            Recipes::Table.into_iden(),
            Ingredients::Table.into_iden(),
            Tags::Table.into_iden(),
            AuthTokens::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
