//! Login state and the cached promo sheet for one dashboard session.
//!
//! A [`Session`] is created when a command starts and dropped when it ends; handlers
//! borrow it instead of reaching for global state. The credential check is a plaintext
//! comparison against the credentials sheet.

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use log::{debug, info};

use crate::{data::is_missing, error::PromoError, table::Table};

pub const USER_COLUMN: &str = "user";
pub const PASSWORD_COLUMN: &str = "password";

/// True when the first row for `username` carries exactly `password`. A blank password
/// cell never matches.
pub fn authenticate(users: &Table, username: &str, password: &str) -> Result<bool, PromoError> {
    let user_col = users.require_column(USER_COLUMN)?;
    let password_col = users.require_column(PASSWORD_COLUMN)?;
    Ok(users
        .rows()
        .iter()
        .find(|row| row[user_col] == username)
        .is_some_and(|row| {
            let stored = row[password_col].as_str();
            !is_missing(stored) && stored == password
        }))
}

struct CachedTable {
    table: Table,
    loaded_at: Instant,
}

pub struct Session {
    user: Option<String>,
    cache_ttl: Duration,
    cached: Option<CachedTable>,
}

impl Session {
    pub fn new(cache_ttl: Duration) -> Self {
        Session {
            user: None,
            cache_ttl,
            cached: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn login(&mut self, users: &Table, username: &str, password: &str) -> Result<()> {
        if !authenticate(users, username, password)? {
            bail!("Invalid username or password");
        }
        info!("User '{username}' logged in");
        self.user = Some(username.to_string());
        Ok(())
    }

    /// Clears the login and the cached sheet.
    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!("User '{user}' logged out");
        }
        self.cached = None;
    }

    /// Returns the cached sheet, calling `load` when nothing is cached or the cache is
    /// older than the session's TTL.
    pub fn dataset<F>(&mut self, now: Instant, load: F) -> Result<&Table>
    where
        F: FnOnce() -> Result<Table>,
    {
        let fresh = self.cached.as_ref().is_some_and(|cached| {
            now.saturating_duration_since(cached.loaded_at) < self.cache_ttl
        });
        if !fresh {
            debug!("Loading promo sheet");
            let table = load()?;
            self.cached = Some(CachedTable {
                table,
                loaded_at: now,
            });
        }
        match &self.cached {
            Some(cached) => Ok(&cached.table),
            None => bail!("Promo sheet is not loaded"),
        }
    }
}
