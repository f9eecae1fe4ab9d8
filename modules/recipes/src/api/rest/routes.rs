use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};

use crate::api::rest::{dto, handlers};
use crate::domain::recipes::RecipesService;
use crate::domain::users::UsersService;

type Builder = OperationBuilder<Missing, Missing, ()>;

pub fn register_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    users: Arc<UsersService>,
    recipes: Arc<RecipesService>,
) -> anyhow::Result<Router> {
    // POST /user/create - Register
    router = Builder::post("/user/create")
        .operation_id("recipes.create_user")
        .summary("Register a new user")
        .description("Create an account; the password is never returned")
        .tag("user")
        .json_request::<dto::CreateUserReq>(openapi, "Registration data")
        .handler(handlers::create_user)
        .json_response_with_schema::<dto::UserDto>(openapi, 201, "Created user")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // POST /user/token - Obtain token
    router = Builder::post("/user/token")
        .operation_id("recipes.create_token")
        .summary("Create an auth token")
        .description("Exchange email and password for an opaque API token")
        .tag("user")
        .json_request::<dto::TokenReq>(openapi, "Credentials")
        .handler(handlers::create_token)
        .json_response_with_schema::<dto::TokenDto>(openapi, 200, "Token")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // GET /user/me - Profile
    router = Builder::get("/user/me")
        .operation_id("recipes.get_me")
        .summary("Get the authenticated user")
        .tag("user")
        .authenticated()
        .handler(handlers::get_me)
        .json_response_with_schema::<dto::ProfileDto>(openapi, 200, "Profile")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // PUT /user/me - Replace profile
    router = Builder::put("/user/me")
        .operation_id("recipes.put_me")
        .summary("Replace the authenticated user's profile")
        .tag("user")
        .authenticated()
        .json_request::<dto::ProfileReq>(openapi, "Full profile")
        .handler(handlers::put_me)
        .json_response_with_schema::<dto::ProfileDto>(openapi, 200, "Updated profile")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // PATCH /user/me - Update profile
    router = Builder::patch("/user/me")
        .operation_id("recipes.patch_me")
        .summary("Update the authenticated user's profile")
        .description("A new password is hashed before it is stored")
        .tag("user")
        .authenticated()
        .json_request::<dto::ProfilePatchReq>(openapi, "Fields to change")
        .handler(handlers::patch_me)
        .json_response_with_schema::<dto::ProfileDto>(openapi, 200, "Updated profile")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // GET /recipe/tags - List tags
    router = Builder::get("/recipe/tags")
        .operation_id("recipes.list_tags")
        .summary("List tags")
        .description("Tags of the authenticated user ordered by name")
        .tag("tags")
        .authenticated()
        .query_param("assigned_only", false, "1 to keep only tags used by a recipe")
        .handler(handlers::list_tags)
        .json_list_response::<dto::AttrDto>(openapi, 200, "List of tags")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // POST /recipe/tags - Create tag
    router = Builder::post("/recipe/tags")
        .operation_id("recipes.create_tag")
        .summary("Create a tag")
        .tag("tags")
        .authenticated()
        .json_request::<dto::CreateAttrReq>(openapi, "Tag name")
        .handler(handlers::create_tag)
        .json_response_with_schema::<dto::AttrDto>(openapi, 201, "Created tag")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // GET /recipe/ingredients - List ingredients
    router = Builder::get("/recipe/ingredients")
        .operation_id("recipes.list_ingredients")
        .summary("List ingredients")
        .description("Ingredients of the authenticated user ordered by name")
        .tag("ingredients")
        .authenticated()
        .query_param(
            "assigned_only",
            false,
            "1 to keep only ingredients used by a recipe",
        )
        .handler(handlers::list_ingredients)
        .json_list_response::<dto::AttrDto>(openapi, 200, "List of ingredients")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // POST /recipe/ingredients - Create ingredient
    router = Builder::post("/recipe/ingredients")
        .operation_id("recipes.create_ingredient")
        .summary("Create an ingredient")
        .tag("ingredients")
        .authenticated()
        .json_request::<dto::CreateAttrReq>(openapi, "Ingredient name")
        .handler(handlers::create_ingredient)
        .json_response_with_schema::<dto::AttrDto>(openapi, 201, "Created ingredient")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .register(router, openapi);

    // GET /recipe/recipes - List
    router = Builder::get("/recipe/recipes")
        .operation_id("recipes.list_recipes")
        .summary("List recipes")
        .description("Recipes of the authenticated user, newest first")
        .tag("recipes")
        .authenticated()
        .handler(handlers::list_recipes)
        .json_list_response::<dto::RecipeDto>(openapi, 200, "List of recipes")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // POST /recipe/recipes - Create
    router = Builder::post("/recipe/recipes")
        .operation_id("recipes.create_recipe")
        .summary("Create a recipe")
        .tag("recipes")
        .authenticated()
        .json_request::<dto::RecipeReq>(openapi, "Recipe data")
        .handler(handlers::create_recipe)
        .json_response_with_schema::<dto::RecipeDto>(openapi, 201, "Created recipe")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    // GET /recipe/recipes/{id} - Detail
    router = Builder::get("/recipe/recipes/{id}")
        .operation_id("recipes.get_recipe")
        .summary("Get recipe by ID")
        .description("Tags and ingredients are expanded")
        .tag("recipes")
        .authenticated()
        .path_param("id", "Recipe ID")
        .handler(handlers::get_recipe)
        .json_response_with_schema::<dto::RecipeDetailDto>(openapi, 200, "Recipe found")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 404, "Not Found")
        .register(router, openapi);

    // PUT /recipe/recipes/{id} - Replace
    router = Builder::put("/recipe/recipes/{id}")
        .operation_id("recipes.replace_recipe")
        .summary("Replace recipe")
        .description("Omitted tags and ingredients are cleared")
        .tag("recipes")
        .authenticated()
        .path_param("id", "Recipe ID")
        .json_request::<dto::RecipeReq>(openapi, "Full recipe")
        .handler(handlers::replace_recipe)
        .json_response_with_schema::<dto::RecipeDto>(openapi, 200, "Updated recipe")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 404, "Not Found")
        .register(router, openapi);

    // PATCH /recipe/recipes/{id} - Partial update
    router = Builder::patch("/recipe/recipes/{id}")
        .operation_id("recipes.patch_recipe")
        .summary("Update recipe")
        .description("Only the given fields change; a given relation list replaces the current one")
        .tag("recipes")
        .authenticated()
        .path_param("id", "Recipe ID")
        .json_request::<dto::RecipeReq>(openapi, "Fields to change")
        .handler(handlers::patch_recipe)
        .json_response_with_schema::<dto::RecipeDto>(openapi, 200, "Updated recipe")
        .problem_response(openapi, 400, "Bad Request")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 404, "Not Found")
        .register(router, openapi);

    // DELETE /recipe/recipes/{id}
    router = Builder::delete("/recipe/recipes/{id}")
        .operation_id("recipes.delete_recipe")
        .summary("Delete recipe")
        .tag("recipes")
        .authenticated()
        .path_param("id", "Recipe ID")
        .handler(handlers::delete_recipe)
        .empty_response(204, "Recipe deleted")
        .problem_response(openapi, 401, "Unauthorized")
        .problem_response(openapi, 404, "Not Found")
        .register(router, openapi);

    router = router.layer(Extension(users)).layer(Extension(recipes));

    Ok(router)
}
