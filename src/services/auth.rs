//! Account service implementation
//!
//! This service handles account registration, authorization, credential
//! changes and ownership checks. Passwords are stored as Argon2id PHC strings.

use std::sync::LazyLock;
use argon2::Argon2;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use regex::Regex;
use tracing::{info, warn, debug};
use crate::database::repositories::AccountRepository;
use crate::models::account::{Account, CreateAccountRequest};
use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::helpers::non_blank;

/// Special characters a password may contain
pub const PASSWORD_SPECIALS: &str = "@$!%*?&#";
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const LOGIN_NAME_MAX_LENGTH: usize = 32;
pub const USERNAME_MAX_LENGTH: usize = 64;

static LOGIN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").expect("login name pattern is valid")
});

/// Check a login name: 3 to 32 Latin letters, digits, `_`, `.` or `-`
pub fn validate_login_name(login_name: &str) -> Result<()> {
    if LOGIN_NAME_RE.is_match(login_name) {
        Ok(())
    } else {
        Err(TaskBuddyError::InvalidInput(format!(
            "Login name must be 3-{} characters: Latin letters, digits, '_', '.' or '-'",
            LOGIN_NAME_MAX_LENGTH
        )))
    }
}

/// Check a display name and return it trimmed
pub fn validate_username(username: &str) -> Result<&str> {
    let username = non_blank(username)
        .ok_or_else(|| TaskBuddyError::InvalidInput("Username must not be empty".to_string()))?;
    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Username must be at most {} characters",
            USERNAME_MAX_LENGTH
        )));
    }
    Ok(username)
}

/// Check the password policy.
///
/// At least eight characters with a lowercase letter, an uppercase letter,
/// a digit and one of [`PASSWORD_SPECIALS`]; nothing outside those classes.
pub fn validate_password(password: &str) -> Result<()> {
    let is_special = |c: char| PASSWORD_SPECIALS.contains(c);

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        )));
    }
    if let Some(c) = password
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || is_special(c)))
    {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Password contains a forbidden character: '{}'",
            c
        )));
    }

    let checks = [
        (password.chars().any(|c| c.is_ascii_lowercase()), "a lowercase letter"),
        (password.chars().any(|c| c.is_ascii_uppercase()), "an uppercase letter"),
        (password.chars().any(|c| c.is_ascii_digit()), "a digit"),
        (password.chars().any(is_special), "a special character (@$!%*?&#)"),
    ];
    match checks.iter().find(|(ok, _)| !ok) {
        Some((_, missing)) => Err(TaskBuddyError::InvalidInput(format!(
            "Password must contain {}",
            missing
        ))),
        None => Ok(()),
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TaskBuddyError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| TaskBuddyError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Whether the Telegram user is the owner of the account
pub fn is_owner(user_telegram_id: i64, owner_telegram_id: i64) -> bool {
    user_telegram_id == owner_telegram_id
}

/// Account service for registration and credential management
#[derive(Clone, Debug)]
pub struct AccountService {
    accounts: AccountRepository,
}

impl AccountService {
    /// Create a new AccountService instance
    pub fn new(accounts: AccountRepository) -> Self {
        Self { accounts }
    }

    /// Register a new account for a Telegram user. New accounts start logged in.
    pub async fn register(
        &self,
        owner_telegram_id: i64,
        login_name: &str,
        username: &str,
        password: &str,
    ) -> Result<Account> {
        debug!(owner_telegram_id = owner_telegram_id, "Registering account");

        validate_login_name(login_name)?;
        let username = validate_username(username)?;
        validate_password(password)?;

        if self.accounts.find_by_owner(owner_telegram_id).await?.is_some() {
            warn!(owner_telegram_id = owner_telegram_id, "Telegram user already has an account");
            return Err(TaskBuddyError::InvalidInput(
                "An account is already linked to this Telegram user".to_string(),
            ));
        }
        self.ensure_login_name_free(login_name).await?;

        let request = CreateAccountRequest {
            owner_telegram_id,
            login_name: login_name.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            is_login: true,
        };

        let account = self.accounts.create(request).await?;
        info!(owner_telegram_id = owner_telegram_id, login_name = %account.login_name, "Account registered");
        Ok(account)
    }

    /// Authorize a Telegram user into their own account
    pub async fn login(&self, user_telegram_id: i64, login_name: &str, password: &str) -> Result<Account> {
        debug!(user_id = user_telegram_id, login_name = %login_name, "Authorization attempt");

        let mut account = self
            .accounts
            .find_by_login_name(login_name)
            .await?
            .ok_or_else(|| TaskBuddyError::Authentication("Unknown login name".to_string()))?;

        if !is_owner(user_telegram_id, account.owner_telegram_id) {
            warn!(user_id = user_telegram_id, login_name = %login_name, "Authorization into a foreign account");
            return Err(TaskBuddyError::PermissionDenied(
                "This account belongs to another Telegram user".to_string(),
            ));
        }
        if !verify_password(password, &account.password_hash)? {
            warn!(user_id = user_telegram_id, "Wrong password");
            return Err(TaskBuddyError::Authentication("Wrong password".to_string()));
        }

        self.accounts.set_login(account.owner_telegram_id, true).await?;
        account.is_login = true;
        info!(user_id = user_telegram_id, "User logged in");
        Ok(account)
    }

    pub async fn logout(&self, owner_telegram_id: i64) -> Result<()> {
        self.accounts.set_login(owner_telegram_id, false).await?;
        info!(owner_telegram_id = owner_telegram_id, "User logged out");
        Ok(())
    }

    pub async fn update_username(&self, owner_telegram_id: i64, username: &str) -> Result<()> {
        let username = validate_username(username)?;
        self.accounts.update_username(owner_telegram_id, username).await
    }

    pub async fn update_login_name(&self, owner_telegram_id: i64, login_name: &str) -> Result<()> {
        validate_login_name(login_name)?;
        self.ensure_login_name_free(login_name).await?;
        self.accounts.update_login_name(owner_telegram_id, login_name).await
    }

    pub async fn update_password(&self, owner_telegram_id: i64, password: &str) -> Result<()> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.accounts.update_password_hash(owner_telegram_id, &password_hash).await?;
        info!(owner_telegram_id = owner_telegram_id, "Password changed");
        Ok(())
    }

    /// Delete an account together with its tasks
    pub async fn delete(&self, owner_telegram_id: i64) -> Result<()> {
        if !self.accounts.delete(owner_telegram_id).await? {
            return Err(TaskBuddyError::AccountNotFound { owner_telegram_id });
        }
        info!(owner_telegram_id = owner_telegram_id, "Account deleted");
        Ok(())
    }

    pub async fn find_by_owner(&self, owner_telegram_id: i64) -> Result<Option<Account>> {
        self.accounts.find_by_owner(owner_telegram_id).await
    }

    pub async fn find_by_login_name(&self, login_name: &str) -> Result<Option<Account>> {
        self.accounts.find_by_login_name(login_name).await
    }

    /// The account of a user, only if it exists and is logged in
    pub async fn active_account(&self, owner_telegram_id: i64) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .find_by_owner(owner_telegram_id)
            .await?
            .filter(|account| account.is_login))
    }

    async fn ensure_login_name_free(&self, login_name: &str) -> Result<()> {
        if self.accounts.find_by_login_name(login_name).await?.is_some() {
            return Err(TaskBuddyError::InvalidInput(format!(
                "Login name '{}' is already taken",
                login_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_login_name_validation() {
        assert!(validate_login_name("alice").is_ok());
        assert!(validate_login_name("a.b-c_1").is_ok());
        assert!(validate_login_name("ab").is_err());
        assert!(validate_login_name(&"x".repeat(33)).is_err());
        assert!(validate_login_name("алиса").is_err());
        assert!(validate_login_name("has space").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert!(validate_password("Aa1@aaaa").is_ok());

        assert_matches!(validate_password("Aa1@aaa"), Err(TaskBuddyError::InvalidInput(_)));
        assert!(validate_password("password1!").is_err());
        assert!(validate_password("PASSWORD1!").is_err());
        assert!(validate_password("Password!!").is_err());
        assert!(validate_password("Password11").is_err());
        assert!(validate_password("Passw0rd!^").is_err());
        assert!(validate_password("Пароль1!Aa").is_err());
    }

    #[test]
    fn test_username_validation() {
        assert_eq!(validate_username("  Alice  ").unwrap(), "Alice");
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Passw0rd!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Passw0rd!", &hash).unwrap());
        assert!(!verify_password("Passw0rd?", &hash).unwrap());
        assert_ne!(hash, hash_password("Passw0rd!").unwrap());

        assert_matches!(verify_password("x", "not a hash"), Err(TaskBuddyError::PasswordHash(_)));
    }

    #[test]
    fn test_is_owner() {
        assert!(is_owner(10, 10));
        assert!(!is_owner(10, 11));
    }
}
