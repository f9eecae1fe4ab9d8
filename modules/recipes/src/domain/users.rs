use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::contract::model::{NewUser, Token, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::password::{generate_token_key, hash_password, verify_password};
use crate::domain::repo::{RepoError, UsersRepository};
use crate::domain::validation::{self, FieldErrors};

/// Account management, token issuance and token authentication.
#[derive(Clone)]
pub struct UsersService {
    repo: Arc<dyn UsersRepository>,
    config: UsersConfig,
}

#[derive(Debug, Clone)]
pub struct UsersConfig {
    pub min_password_length: usize,
    pub max_name_length: usize,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            min_password_length: 5,
            max_name_length: 255,
        }
    }
}

impl UsersService {
    pub fn new(repo: Arc<dyn UsersRepository>, config: UsersConfig) -> Self {
        Self { repo, config }
    }

    /// Create a regular account. The email is lower-cased and the password hashed.
    #[instrument(name = "recipes.service.create_user", skip(self, email, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, DomainError> {
        self.create_account(email, password, name, false).await
    }

    /// Administrative account. Email and password go through the sign-up checks.
    #[instrument(name = "recipes.service.create_superuser", skip_all)]
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let mut errors = FieldErrors::new();
        validation::check_email(&mut errors, email, self.config.max_name_length);
        validation::check_password(&mut errors, password, self.config.min_password_length);
        errors.finish()?;

        self.create_account(email, password, "", true).await
    }

    pub fn check_password(&self, user: &User, candidate: &str) -> bool {
        verify_password(candidate, &user.password_hash)
    }

    /// Public sign-up: field validation on top of [`Self::create_user`].
    #[instrument(name = "recipes.service.register", skip(self, email, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, DomainError> {
        let mut errors = FieldErrors::new();
        validation::check_email(&mut errors, email, self.config.max_name_length);
        validation::check_password(&mut errors, password, self.config.min_password_length);
        validation::check_text(&mut errors, "name", name, self.config.max_name_length);
        errors.finish()?;

        self.create_user(email, password, name.trim()).await
    }

    /// Exchange credentials for the user's token, creating it on first login.
    #[instrument(name = "recipes.service.issue_token", skip_all)]
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<Token, DomainError> {
        let mut errors = FieldErrors::new();
        if email.trim().is_empty() {
            errors.add("email", validation::BLANK);
        }
        if password.is_empty() {
            errors.add("password", validation::BLANK);
        }
        errors.finish()?;

        let user = self
            .repo
            .find_by_email(&validation::normalize_email(email))
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or(DomainError::InvalidCredentials)?;

        if !user.is_active || !self.check_password(&user, password) {
            debug!(user_id = user.id, "credentials rejected");
            return Err(DomainError::InvalidCredentials);
        }

        let token = self.get_or_create_token(user.id).await?;
        self.repo
            .set_last_login(user.id, Utc::now())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        info!(user_id = user.id, "token issued");
        Ok(token)
    }

    /// Resolve a token key to an active user.
    #[instrument(name = "recipes.service.authenticate", skip_all)]
    pub async fn authenticate(&self, key: &str) -> Result<User, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidToken);
        }
        match self
            .repo
            .find_user_by_token(key)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            Some(user) if user.is_active => Ok(user),
            _ => Err(DomainError::InvalidToken),
        }
    }

    /// Apply a profile patch. A new password is hashed, a new email normalized.
    #[instrument(
        name = "recipes.service.update_profile",
        skip(self, user, patch),
        fields(user_id = user.id)
    )]
    pub async fn update_profile(&self, user: &User, patch: UserPatch) -> Result<User, DomainError> {
        let mut errors = FieldErrors::new();
        if let Some(ref email) = patch.email {
            validation::check_email(&mut errors, email, self.config.max_name_length);
        }
        if let Some(ref password) = patch.password {
            validation::check_password(&mut errors, password, self.config.min_password_length);
        }
        if let Some(ref name) = patch.name {
            validation::check_text(&mut errors, "name", name, self.config.max_name_length);
        }
        errors.finish()?;

        let mut current = user.clone();

        if let Some(email) = patch.email {
            let email = validation::normalize_email(&email);
            if email != current.email
                && self
                    .repo
                    .email_exists(&email)
                    .await
                    .map_err(|e| DomainError::database(e.to_string()))?
            {
                return Err(DomainError::email_already_exists(email));
            }
            current.email = email;
        }
        if let Some(name) = patch.name {
            current.name = name.trim().to_string();
        }
        if let Some(password) = patch.password {
            current.password_hash = hash_password(&password)?;
        }

        match self.repo.update(&current).await {
            Ok(()) => {
                info!("profile updated");
                Ok(current)
            }
            Err(RepoError::Conflict) => Err(DomainError::email_already_exists(current.email)),
            Err(RepoError::Other(e)) => Err(DomainError::database(e.to_string())),
        }
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        superuser: bool,
    ) -> Result<User, DomainError> {
        let email = validation::normalize_email(email);
        if email.is_empty() {
            return Err(DomainError::EmailRequired);
        }

        if self
            .repo
            .email_exists(&email)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            return Err(DomainError::email_already_exists(email));
        }

        let new_user = NewUser {
            email: email.clone(),
            name: name.to_string(),
            password_hash: hash_password(password)?,
            is_staff: superuser,
            is_superuser: superuser,
            created_at: Utc::now(),
        };

        // The unique index still decides when two sign-ups race.
        match self.repo.insert(new_user).await {
            Ok(user) => {
                info!(user_id = user.id, superuser, "account created");
                Ok(user)
            }
            Err(RepoError::Conflict) => Err(DomainError::email_already_exists(email)),
            Err(RepoError::Other(e)) => Err(DomainError::database(e.to_string())),
        }
    }

    async fn get_or_create_token(&self, user_id: i32) -> Result<Token, DomainError> {
        if let Some(token) = self
            .repo
            .find_token_for_user(user_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            return Ok(token);
        }

        let token = Token {
            key: generate_token_key(),
            user_id,
            created_at: Utc::now(),
        };
        match self.repo.insert_token(&token).await {
            Ok(()) => Ok(token),
            // Lost a race with a concurrent login; use the winner's token.
            Err(RepoError::Conflict) => self
                .repo
                .find_token_for_user(user_id)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?
                .ok_or_else(|| DomainError::internal("token vanished after conflict")),
            Err(RepoError::Other(e)) => Err(DomainError::database(e.to_string())),
        }
    }
}
