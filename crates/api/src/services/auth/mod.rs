//! Authentication service.
//!
//! Password registration with email verification, and throttled password
//! login.

mod error;
mod verification;

pub use error::AuthError;
pub use verification::{CODE_TTL, MAX_CODE_GUESSES, VerificationCodes};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::{info, instrument};

use tanam_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::throttle::{LoginThrottle, ThrottleError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A freshly registered user and the verification code to deliver.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub code: String,
}

/// Authentication service.
///
/// Handles user registration, email verification, and login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    throttle: &'a LoginThrottle,
    codes: &'a VerificationCodes,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        throttle: &'a LoginThrottle,
        codes: &'a VerificationCodes,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            throttle,
            codes,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new user and issue an email verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::Store` if the verification code cannot be stored.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let code = self.codes.issue(email.as_str()).await?;
        info!(user_id = %user.id, "User registered");

        Ok(Registration { user, code })
    }

    /// Mark `email` verified if `code` is its live verification code.
    ///
    /// Every call counts as a guess before the code is compared.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TooManyGuesses` once the email is out of guesses.
    /// Returns `AuthError::InvalidCode` if the code is wrong or expired.
    /// Returns `AuthError::Repository` if the user no longer exists.
    #[instrument(skip(self, code))]
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        self.codes
            .record_guess(email.as_str())
            .await
            .map_err(|e| match e {
                ThrottleError::LimitExceeded => AuthError::TooManyGuesses,
                other => AuthError::Throttle(other),
            })?;

        if !self.codes.matches(email.as_str(), code).await? {
            return Err(AuthError::InvalidCode);
        }

        self.users.mark_email_verified(&email).await?;
        self.codes.consume(email.as_str()).await;
        Ok(())
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password.
    ///
    /// The attempt is recorded before the limit is checked, and both happen
    /// before any credential lookup, so a locked-out identity never reaches
    /// the database. A successful login clears the attempt record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Throttle` if the identity is locked out or the
    /// throttle store fails.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.throttle.record_attempt(email).await?;
        self.throttle.check_limit(email).await?;

        let email_addr = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password(&email_addr)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        self.throttle.reset(email).await;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
