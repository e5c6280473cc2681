//! Email/password account directory on top of the `users` table.
//!
//! Passwords are stored as bcrypt hashes. Signing up signs the new user in,
//! and every sign-in state change is published through [`AuthState`].

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseConnection, QueryFilter, SqlErr, prelude::*};
use uuid::Uuid;

use crate::{AuthError, Subscription, users, util::normalize_required_text};

use super::{AuthProvider, AuthState, Identity};

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug)]
pub struct Accounts {
    database: DatabaseConnection,
    state: AuthState,
    cost: u32,
}

impl From<users::Model> for Identity {
    fn from(model: users::Model) -> Self {
        Self {
            uid: model.uid,
            email: model.email,
            display_name: model.display_name,
        }
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::InvalidEmail(email));
    }
    Ok(email)
}

/// bcrypt is CPU bound: keep it off the async workers.
async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

async fn verify_password(password: &str, hash: String) -> Result<bool, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

impl Accounts {
    /// Return a builder for `Accounts`. Help to build the struct.
    pub fn builder() -> AccountsBuilder {
        AccountsBuilder::default()
    }

    /// The sign-in state shared with this directory.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, AuthError> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?)
    }

    /// Registers a new user and signs them in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailInUse(email));
        }

        let password_hash = hash_password(password, self.cost).await?;
        let model = users::ActiveModel {
            uid: ActiveValue::Set(Uuid::new_v4().simple().to_string()),
            email: ActiveValue::Set(email.clone()),
            password_hash: ActiveValue::Set(password_hash),
            display_name: ActiveValue::Set(display_name.and_then(normalize_required_text)),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await
        // A concurrent sign-up may take the email after the check above.
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailInUse(email),
            _ => AuthError::Database(err),
        })?;

        let identity = Identity::from(model);
        tracing::info!("registered user {}", identity.uid);
        self.state.sign_in(identity.clone());
        Ok(identity)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let model = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, model.password_hash.clone()).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::from(model);
        self.state.sign_in(identity.clone());
        Ok(identity)
    }

    pub fn sign_out(&self) {
        self.state.sign_out();
    }

    /// Changes the display name of the signed-in user.
    pub async fn update_profile(&self, display_name: &str) -> Result<Identity, AuthError> {
        let current = self.state.current_user().ok_or(AuthError::Unauthenticated)?;
        let display_name = normalize_required_text(display_name)
            .ok_or_else(|| AuthError::InvalidProfile("name cannot be empty".to_string()))?;

        let model = users::ActiveModel {
            uid: ActiveValue::Set(current.uid),
            display_name: ActiveValue::Set(Some(display_name)),
            ..Default::default()
        }
        .update(&self.database)
        .await?;

        let identity = Identity::from(model);
        self.state.sign_in(identity.clone());
        Ok(identity)
    }
}

impl AuthProvider for Accounts {
    fn current_user(&self) -> Option<Identity> {
        self.state.current_user()
    }

    fn on_auth_state_changed<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        self.state.on_auth_state_changed(callback)
    }
}

/// The builder for `Accounts`
pub struct AccountsBuilder {
    database: DatabaseConnection,
    state: AuthState,
    cost: u32,
}

impl Default for AccountsBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            state: AuthState::new(),
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AccountsBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> AccountsBuilder {
        self.database = db;
        self
    }

    /// Share an existing sign-in state instead of a fresh one.
    pub fn state(mut self, state: AuthState) -> AccountsBuilder {
        self.state = state;
        self
    }

    /// bcrypt cost used for new passwords.
    pub fn cost(mut self, cost: u32) -> AccountsBuilder {
        self.cost = cost;
        self
    }

    /// Construct `Accounts`
    pub fn build(self) -> Accounts {
        Accounts {
            database: self.database,
            state: self.state,
            cost: self.cost,
        }
    }
}
