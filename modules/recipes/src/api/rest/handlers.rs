use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{error, info};

use crate::api::rest::auth::AuthUser;
use crate::api::rest::dto::{
    AttrDto, AttrListQuery, CreateAttrReq, CreateUserReq, ProfileDto, ProfilePatchReq, ProfileReq,
    RecipeDetailDto, RecipeDto, RecipeReq, TokenDto, TokenReq, UserDto,
};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::extract::ApiJson;
use crate::contract::model::AttrKind;
use crate::domain::error::DomainError;
use crate::domain::recipes::RecipesService;
use crate::domain::users::UsersService;
use crate::domain::validation;

use modkit::api::problem::ProblemResponse;

// --- users ---

/// Register a new account
pub async fn create_user(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    ApiJson(req): ApiJson<CreateUserReq>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    info!("Registering user");

    match svc.register(&req.email, &req.password, &req.name).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Exchange email and password for an API token
pub async fn create_token(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    ApiJson(req): ApiJson<TokenReq>,
) -> Result<Json<TokenDto>, ProblemResponse> {
    info!("Issuing token");

    match svc.issue_token(&req.email, &req.password).await {
        Ok(token) => Ok(Json(TokenDto::from(token))),
        Err(e) => {
            error!("Failed to issue token: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn get_me(AuthUser(user): AuthUser) -> Json<ProfileDto> {
    info!("Getting profile of user {}", user.id);
    Json(ProfileDto::from(&user))
}

/// Replace the caller's profile
pub async fn put_me(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ProfileReq>,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    info!("Replacing profile of user {}", user.id);

    match svc.update_profile(&user, req.into()).await {
        Ok(updated) => Ok(Json(ProfileDto::from(&updated))),
        Err(e) => {
            error!("Failed to update profile of user {}: {}", user.id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Update part of the caller's profile
pub async fn patch_me(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ProfilePatchReq>,
) -> Result<Json<ProfileDto>, ProblemResponse> {
    info!("Patching profile of user {}", user.id);

    match svc.update_profile(&user, req.into()).await {
        Ok(updated) => Ok(Json(ProfileDto::from(&updated))),
        Err(e) => {
            error!("Failed to update profile of user {}: {}", user.id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// --- tags & ingredients ---

async fn list_attrs(
    svc: &RecipesService,
    kind: AttrKind,
    owner: i32,
    query: AttrListQuery,
    uri: &Uri,
) -> Result<Json<Vec<AttrDto>>, ProblemResponse> {
    let assigned_only = match query.assigned_only.as_deref().map(validation::parse_flag) {
        None => false,
        Some(Some(flag)) => flag,
        Some(None) => {
            let e = DomainError::field("assigned_only", validation::INVALID_BOOLEAN);
            return Err(map_domain_error(&e, uri.path()));
        }
    };
    info!(?kind, assigned_only, "Listing for user {}", owner);

    match svc.list_attrs(owner, kind, assigned_only).await {
        Ok(items) => Ok(Json(items.into_iter().map(AttrDto::from).collect())),
        Err(e) => {
            error!("Failed to list {:?}: {}", kind, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

async fn create_attr(
    svc: &RecipesService,
    kind: AttrKind,
    owner: i32,
    req: CreateAttrReq,
    uri: &Uri,
) -> Result<(StatusCode, Json<AttrDto>), ProblemResponse> {
    info!(?kind, "Creating '{}' for user {}", req.name, owner);

    match svc.create_attr(owner, kind, &req.name).await {
        Ok(item) => Ok((StatusCode::CREATED, Json(AttrDto::from(item)))),
        Err(e) => {
            error!("Failed to create {:?}: {}", kind, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn list_tags(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Query(query): Query<AttrListQuery>,
) -> Result<Json<Vec<AttrDto>>, ProblemResponse> {
    list_attrs(&svc, AttrKind::Tag, user.id, query, &uri).await
}

pub async fn create_tag(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateAttrReq>,
) -> Result<(StatusCode, Json<AttrDto>), ProblemResponse> {
    create_attr(&svc, AttrKind::Tag, user.id, req, &uri).await
}

pub async fn list_ingredients(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Query(query): Query<AttrListQuery>,
) -> Result<Json<Vec<AttrDto>>, ProblemResponse> {
    list_attrs(&svc, AttrKind::Ingredient, user.id, query, &uri).await
}

pub async fn create_ingredient(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateAttrReq>,
) -> Result<(StatusCode, Json<AttrDto>), ProblemResponse> {
    create_attr(&svc, AttrKind::Ingredient, user.id, req, &uri).await
}

// --- recipes ---

pub async fn list_recipes(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<RecipeDto>>, ProblemResponse> {
    info!("Listing recipes for user {}", user.id);

    match svc.list_recipes(user.id).await {
        Ok(recipes) => Ok(Json(recipes.into_iter().map(RecipeDto::from).collect())),
        Err(e) => {
            error!("Failed to list recipes: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a recipe with tags and ingredients expanded
pub async fn get_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<RecipeDetailDto>, ProblemResponse> {
    info!("Getting recipe with id: {}", id);

    match svc.get_recipe(user.id, id).await {
        Ok(recipe) => Ok(Json(RecipeDetailDto::from(recipe))),
        Err(e) => {
            error!("Failed to get recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn create_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<RecipeReq>,
) -> Result<(StatusCode, Json<RecipeDto>), ProblemResponse> {
    info!("Creating recipe: {:?}", req.title);

    let result = match req.into_new_recipe() {
        Ok(new_recipe) => svc.create_recipe(user.id, new_recipe).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(recipe) => Ok((StatusCode::CREATED, Json(RecipeDto::from(recipe)))),
        Err(e) => {
            error!("Failed to create recipe: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace a recipe; omitted tags and ingredients are cleared
pub async fn replace_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<RecipeReq>,
) -> Result<Json<RecipeDto>, ProblemResponse> {
    info!("Replacing recipe {}", id);

    // 404 takes precedence over missing fields.
    let result = match svc.get_recipe(user.id, id).await {
        Ok(_) => match req.into_new_recipe() {
            Ok(recipe) => svc.replace_recipe(user.id, id, recipe).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };
    match result {
        Ok(recipe) => Ok(Json(RecipeDto::from(recipe))),
        Err(e) => {
            error!("Failed to replace recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn patch_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    ApiJson(req): ApiJson<RecipeReq>,
) -> Result<Json<RecipeDto>, ProblemResponse> {
    info!("Patching recipe {}", id);

    match svc.update_recipe(user.id, id, req.into()).await {
        Ok(recipe) => Ok(Json(RecipeDto::from(recipe))),
        Err(e) => {
            error!("Failed to patch recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_recipe(
    uri: Uri,
    Extension(svc): Extension<Arc<RecipesService>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting recipe: {}", id);

    match svc.delete_recipe(user.id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete recipe {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
