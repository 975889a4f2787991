// app/src/services/auth_service.rs

//! Accounts and session tokens: password hashing, registration, login and token resolution.

use crate::errors::AppError;
use crate::state::AppState;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use storefront::{Identity, NewUser, Session, User, UserChanges};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const INVALID_TOKEN: &str = "Invalid or expired session token.";

/// Hashes a plain-text password with Argon2 and a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::validation("password", "This field is required."));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Returns `Ok(false)` on a mismatch; malformed stored hashes are internal errors.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if hashed_password_str.is_empty() || provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

fn validate_username(username: &str) -> Result<String, AppError> {
  let username = username.trim();
  if username.is_empty() {
    return Err(AppError::validation("username", "This field is required."));
  }
  if username.chars().count() > MAX_USERNAME_LEN {
    return Err(AppError::validation(
      "username",
      format!("Ensure this field has no more than {} characters.", MAX_USERNAME_LEN),
    ));
  }
  Ok(username.to_string())
}

fn validate_email(email: &str) -> Result<String, AppError> {
  let email = email.trim();
  if email.chars().count() > MAX_EMAIL_LEN {
    return Err(AppError::validation(
      "email",
      format!("Ensure this field has no more than {} characters.", MAX_EMAIL_LEN),
    ));
  }
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
    _ => Err(AppError::validation("email", "Enter a valid email address.")),
  }
}

fn validate_password(password: &str) -> Result<(), AppError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::validation(
      "password",
      format!(
        "This password is too short. It must contain at least {} characters.",
        MIN_PASSWORD_LEN
      ),
    ));
  }
  Ok(())
}

// Argon2 is CPU-bound; run it on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
  F: FnOnce() -> Result<T, AppError> + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(f)
    .await
    .map_err(|join_err| AppError::Internal(format!("Password hashing task failed: {}", join_err)))?
}

async fn issue_session(state: &AppState, user: &User) -> Result<Session, AppError> {
  let now = Utc::now();
  let session = Session {
    token: Uuid::new_v4(),
    user_id: user.id,
    created_at: now,
    expires_at: now + Duration::hours(state.config.session_ttl_hours),
  };
  state.store.insert_session(&session).await?;
  Ok(session)
}

#[instrument(name = "auth_service::register", skip(state, email, password))]
pub async fn register(state: &AppState, username: &str, email: &str, password: &str) -> Result<(User, Session), AppError> {
  let username = validate_username(username)?;
  let email = validate_email(email)?;
  validate_password(password)?;

  let password_hash = blocking({
    let password = password.to_string();
    move || hash_password(&password)
  })
  .await?;
  let user = state
    .store
    .insert_user(&NewUser {
      username,
      email,
      password_hash,
    })
    .await?;
  let session = issue_session(state, &user).await?;
  info!(user_id = user.id, "User registered.");
  Ok((user, session))
}

#[instrument(name = "auth_service::login", skip(state, password))]
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<(User, Session), AppError> {
  let user = match state.store.get_user_by_username(username.trim()).await? {
    Some(user) => user,
    None => {
      warn!("Login for unknown username.");
      return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }
  };
  let matches = blocking({
    let (hash, password) = (user.password_hash.clone(), password.to_string());
    move || verify_password(&hash, &password)
  })
  .await?;
  if !matches {
    warn!(user_id = user.id, "Login with wrong password.");
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  }
  let session = issue_session(state, &user).await?;
  info!(user_id = user.id, "User logged in.");
  Ok((user, session))
}

#[instrument(name = "auth_service::logout", skip(state, token))]
pub async fn logout(state: &AppState, token: Uuid) -> Result<(), AppError> {
  state.store.delete_session(token).await?;
  Ok(())
}

/// Maps a bearer token to the caller's identity. Expired sessions are removed on sight.
#[instrument(name = "auth_service::resolve_token", skip(state, token))]
pub async fn resolve_token(state: &AppState, token: Uuid) -> Result<Identity, AppError> {
  let session = state
    .store
    .get_session(token)
    .await?
    .ok_or_else(|| AppError::Auth(INVALID_TOKEN.to_string()))?;

  if session.is_expired_at(Utc::now()) {
    debug!(user_id = session.user_id, "Session expired.");
    state.store.delete_session(token).await?;
    return Err(AppError::Auth(INVALID_TOKEN.to_string()));
  }

  let user = state
    .store
    .get_user(session.user_id)
    .await?
    .ok_or_else(|| AppError::Auth(INVALID_TOKEN.to_string()))?;
  Ok(Identity::from(&user))
}

pub async fn current_user(state: &AppState, identity: &Identity) -> Result<User, AppError> {
  state
    .store
    .get_user(identity.user_id)
    .await?
    .ok_or_else(|| AppError::Auth(INVALID_TOKEN.to_string()))
}

/// Applies the given profile fields, keeping the others.
#[instrument(name = "auth_service::update_profile", skip(state, identity, email), fields(user_id = identity.user_id))]
pub async fn update_profile(
  state: &AppState,
  identity: &Identity,
  username: Option<&str>,
  email: Option<&str>,
) -> Result<User, AppError> {
  let current = current_user(state, identity).await?;
  let changes = UserChanges {
    username: validate_username(username.unwrap_or(&current.username))?,
    email: validate_email(email.unwrap_or(&current.email))?,
  };
  state
    .store
    .update_user(current.id, &changes)
    .await?
    .ok_or_else(|| AppError::Auth(INVALID_TOKEN.to_string()))
}
