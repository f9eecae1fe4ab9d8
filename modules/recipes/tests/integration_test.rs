mod common;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;

use recipes::contract::model::{AttrKind, NewRecipe, RecipePatch, UserPatch};
use recipes::domain::error::DomainError;
use recipes::domain::repo::UsersRepository;
use recipes::infra::storage::sea_orm_repo::SeaOrmUsersRepository;

use common::{create_test_db, create_test_services};

#[tokio::test]
async fn create_user_normalizes_email_and_hashes_password() -> Result<()> {
    let (users, _) = create_test_services().await;

    let user = users.create_user("  Cook@Example.COM ", "pw12345", "Cook").await?;
    assert_eq!(user.email, "cook@example.com");
    assert!(user.is_active);
    assert!(!user.is_staff);
    assert!(!user.is_superuser);
    assert_ne!(user.password_hash, "pw12345");
    assert!(users.check_password(&user, "pw12345"));
    assert!(!users.check_password(&user, "pw1234"));
    Ok(())
}

#[tokio::test]
async fn create_user_without_email_fails() {
    let (users, _) = create_test_services().await;

    let err = users.create_user("   ", "pw12345", "").await.unwrap_err();
    assert!(matches!(err, DomainError::EmailRequired));
}

#[tokio::test]
async fn create_superuser_sets_flags() -> Result<()> {
    let (users, _) = create_test_services().await;

    let admin = users.create_superuser("root@example.com", "pw12345").await?;
    assert!(admin.is_staff);
    assert!(admin.is_superuser);
    Ok(())
}

#[tokio::test]
async fn create_superuser_checks_email_and_password() {
    let (users, _) = create_test_services().await;

    let err = users
        .create_superuser("root@example.com", "")
        .await
        .unwrap_err();
    match err {
        DomainError::Validation { errors } => assert_eq!(errors[0].field, "password"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = users
        .create_superuser("not-an-email", "pw12345")
        .await
        .unwrap_err();
    match err {
        DomainError::Validation { errors } => assert_eq!(errors[0].field, "email"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_email_is_case_insensitive() -> Result<()> {
    let (users, _) = create_test_services().await;

    users.create_user("dup@example.com", "pw12345", "").await?;
    let err = users
        .create_user("DUP@example.com", "pw12345", "")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::EmailAlreadyExists { .. }));
    Ok(())
}

#[tokio::test]
async fn issue_token_and_authenticate() -> Result<()> {
    let db = create_test_db().await;
    let repo = Arc::new(SeaOrmUsersRepository::new(db));
    let users = recipes::domain::users::UsersService::new(repo.clone(), Default::default());

    let user = users.create_user("a@x.com", "pw12345", "A").await?;
    assert!(user.last_login.is_none());

    let token = users.issue_token("a@x.com", "pw12345").await?;
    assert_eq!(token.user_id, user.id);
    assert_eq!(token.key.len(), 40);
    assert!(token.key.chars().all(|c| c.is_ascii_hexdigit()));

    let again = users.issue_token("A@x.com", "pw12345").await?;
    assert_eq!(again.key, token.key);

    let stored = repo.find_by_id(user.id).await?.unwrap();
    assert!(stored.last_login.is_some());

    let resolved = users.authenticate(&token.key).await?;
    assert_eq!(resolved.id, user.id);

    assert!(matches!(
        users.authenticate("not-a-token").await,
        Err(DomainError::InvalidToken)
    ));
    assert!(matches!(
        users.authenticate("").await,
        Err(DomainError::InvalidToken)
    ));
    Ok(())
}

#[tokio::test]
async fn issue_token_rejects_bad_credentials() -> Result<()> {
    let (users, _) = create_test_services().await;
    users.create_user("a@x.com", "pw12345", "A").await?;

    assert!(matches!(
        users.issue_token("a@x.com", "nope-nope").await,
        Err(DomainError::InvalidCredentials)
    ));
    assert!(matches!(
        users.issue_token("b@x.com", "pw12345").await,
        Err(DomainError::InvalidCredentials)
    ));
    assert!(matches!(
        users.issue_token("", "").await,
        Err(DomainError::Validation { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn inactive_user_cannot_log_in() -> Result<()> {
    let db = create_test_db().await;
    let repo = Arc::new(SeaOrmUsersRepository::new(db));
    let users = recipes::domain::users::UsersService::new(repo.clone(), Default::default());

    let token_user = users.create_user("a@x.com", "pw12345", "A").await?;
    let token = users.issue_token("a@x.com", "pw12345").await?;

    let mut disabled = token_user.clone();
    disabled.is_active = false;
    repo.update(&disabled).await?;

    assert!(matches!(
        users.issue_token("a@x.com", "pw12345").await,
        Err(DomainError::InvalidCredentials)
    ));
    assert!(matches!(
        users.authenticate(&token.key).await,
        Err(DomainError::InvalidToken)
    ));
    Ok(())
}

#[tokio::test]
async fn update_profile_rehashes_password_and_checks_email() -> Result<()> {
    let (users, _) = create_test_services().await;
    let user = users.create_user("a@x.com", "pw12345", "A").await?;
    users.create_user("b@x.com", "pw12345", "B").await?;

    let updated = users
        .update_profile(
            &user,
            UserPatch {
                password: Some("brand-new".into()),
                name: Some(" Alice ".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "Alice");
    assert!(users.check_password(&updated, "brand-new"));
    users.issue_token("a@x.com", "brand-new").await?;

    let err = users
        .update_profile(
            &updated,
            UserPatch {
                email: Some("B@x.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::EmailAlreadyExists { .. }));

    let err = users
        .update_profile(
            &updated,
            UserPatch {
                password: Some("123".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    Ok(())
}

#[tokio::test]
async fn recipe_service_crud() -> Result<()> {
    let (users, catalog) = create_test_services().await;
    let owner = users.create_user("a@x.com", "pw12345", "A").await?.id;

    let vegan = catalog.create_attr(owner, AttrKind::Tag, " Vegan ").await?;
    assert_eq!(vegan.name, "Vegan");
    let tofu = catalog
        .create_attr(owner, AttrKind::Ingredient, "Tofu")
        .await?;

    let recipe = catalog
        .create_recipe(
            owner,
            NewRecipe {
                title: "Bowl".into(),
                time_minutes: 15,
                price: Decimal::from_str("7.5")?,
                tags: vec![vegan.id, vegan.id],
                ingredients: vec![tofu.id],
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(recipe.price, Decimal::new(750, 2));
    assert_eq!(recipe.tags, vec![vegan.clone()]);
    assert_eq!(recipe.ingredients, vec![tofu.clone()]);

    let patched = catalog
        .update_recipe(
            owner,
            recipe.id,
            RecipePatch {
                tags: Some(vec![]),
                ..Default::default()
            },
        )
        .await?;
    assert!(patched.tags.is_empty());
    assert_eq!(patched.ingredients, vec![tofu]);
    assert_eq!(patched.title, "Bowl");

    let unchanged = catalog
        .update_recipe(owner, recipe.id, RecipePatch::default())
        .await?;
    assert_eq!(unchanged, patched);

    assert!(catalog
        .list_attrs(owner, AttrKind::Tag, true)
        .await?
        .is_empty());
    assert_eq!(catalog.list_attrs(owner, AttrKind::Tag, false).await?, vec![vegan]);

    catalog.delete_recipe(owner, recipe.id).await?;
    assert!(matches!(
        catalog.get_recipe(owner, recipe.id).await,
        Err(DomainError::RecipeNotFound { .. })
    ));
    assert!(matches!(
        catalog.delete_recipe(owner, recipe.id).await,
        Err(DomainError::RecipeNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn recipes_are_owner_scoped() -> Result<()> {
    let (users, catalog) = create_test_services().await;
    let alice = users.create_user("alice@x.com", "pw12345", "").await?.id;
    let bob = users.create_user("bob@x.com", "pw12345", "").await?.id;

    let tag = catalog.create_attr(alice, AttrKind::Tag, "Mine").await?;
    let recipe = catalog
        .create_recipe(
            alice,
            NewRecipe {
                title: "Secret".into(),
                time_minutes: 1,
                price: Decimal::ONE,
                ..Default::default()
            },
        )
        .await?;

    assert!(catalog.list_recipes(bob).await?.is_empty());
    assert!(matches!(
        catalog.get_recipe(bob, recipe.id).await,
        Err(DomainError::RecipeNotFound { .. })
    ));
    assert!(matches!(
        catalog
            .update_recipe(
                bob,
                recipe.id,
                RecipePatch {
                    title: Some("x".into()),
                    ..Default::default()
                },
            )
            .await,
        Err(DomainError::RecipeNotFound { .. })
    ));

    let err = catalog
        .create_recipe(
            bob,
            NewRecipe {
                title: "Copy".into(),
                time_minutes: 1,
                price: Decimal::ONE,
                tags: vec![tag.id],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        DomainError::Validation { errors } => {
            assert_eq!(errors[0].field, "tags");
            assert!(errors[0].message.contains(&tag.id.to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn recipes_listed_newest_first() -> Result<()> {
    let (users, catalog) = create_test_services().await;
    let owner = users.create_user("a@x.com", "pw12345", "").await?.id;

    for title in ["First", "Second"] {
        catalog
            .create_recipe(
                owner,
                NewRecipe {
                    title: title.into(),
                    time_minutes: 1,
                    price: Decimal::ONE,
                    ..Default::default()
                },
            )
            .await?;
    }

    let titles: Vec<String> = catalog
        .list_recipes(owner)
        .await?
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
    Ok(())
}
