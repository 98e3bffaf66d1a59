//! Cookie jars holding the persisted half of a session.
//!
//! A jar maps cookie names to values with a max-age and path, the way a
//! browser does. Expired cookies read as absent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Bearer token cookie
pub const TOKEN_COOKIE: &str = "singlelink.token";

/// Account identifier cookie
pub const USER_ID_COOKIE: &str = "singlelink.userID";

/// Session cookies live for 24 hours.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24;

/// Cookie file name in the cookie directory
const COOKIE_FILE: &str = "cookies.json";

#[derive(Error, Debug)]
pub enum CookieError {
    #[error("Failed to access cookie file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode cookies: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub path: String,
}

impl CookieOptions {
    /// 24 hour max-age scoped to the root path.
    pub fn session_default() -> Self {
        Self {
            max_age: Duration::seconds(SESSION_MAX_AGE_SECS),
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

impl Cookie {
    pub fn new(name: &str, value: &str, options: &CookieOptions) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: options.path.clone(),
            expires_at: Utc::now() + options.max_age,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub trait CookieJar: Send + Sync {
    /// Full cookie record, or `None` when missing or expired.
    fn cookie(&self, name: &str) -> Option<Cookie>;

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), CookieError>;

    /// Remove a cookie. Removing a missing cookie is not an error.
    fn destroy(&self, name: &str) -> Result<(), CookieError>;

    fn get(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|c| c.value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn live(cookies: &HashMap<String, Cookie>, name: &str) -> Option<Cookie> {
    cookies.get(name).filter(|c| !c.is_expired()).cloned()
}

/// In-process jar. Cookies vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie(&self, name: &str) -> Option<Cookie> {
        live(&lock(&self.cookies), name)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), CookieError> {
        lock(&self.cookies).insert(name.to_string(), Cookie::new(name, value, options));
        Ok(())
    }

    fn destroy(&self, name: &str) -> Result<(), CookieError> {
        lock(&self.cookies).remove(name);
        Ok(())
    }
}

/// Jar persisted as JSON so a session survives process restarts.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl FileCookieJar {
    /// Open the jar stored in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, CookieError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(COOKIE_FILE);

        let mut cookies: HashMap<String, Cookie> = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };
        cookies.retain(|_, c| !c.is_expired());
        debug!(path = %path.display(), count = cookies.len(), "Cookie jar loaded");

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, cookies: &mut HashMap<String, Cookie>) -> Result<(), CookieError> {
        cookies.retain(|_, c| !c.is_expired());
        let contents = serde_json::to_string_pretty(cookies)?;

        // Write-then-rename so a crash never leaves a half-written jar.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CookieJar for FileCookieJar {
    fn cookie(&self, name: &str) -> Option<Cookie> {
        live(&lock(&self.cookies), name)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), CookieError> {
        let mut cookies = lock(&self.cookies);
        cookies.insert(name.to_string(), Cookie::new(name, value, options));
        self.save(&mut cookies)
    }

    fn destroy(&self, name: &str) -> Result<(), CookieError> {
        let mut cookies = lock(&self.cookies);
        if cookies.remove(name).is_none() {
            return Ok(());
        }
        self.save(&mut cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired() -> CookieOptions {
        CookieOptions {
            max_age: Duration::seconds(-1),
            path: "/".to_string(),
        }
    }

    #[test]
    fn test_session_default_options() {
        let opts = CookieOptions::session_default();
        assert_eq!(opts.max_age.num_seconds(), 86_400);
        assert_eq!(opts.path, "/");
    }

    #[test]
    fn test_memory_jar_set_get_destroy() {
        let jar = MemoryCookieJar::new();
        assert_eq!(jar.get(TOKEN_COOKIE), None);

        jar.set(TOKEN_COOKIE, "T1", &CookieOptions::session_default()).unwrap();
        assert_eq!(jar.get(TOKEN_COOKIE).as_deref(), Some("T1"));

        let cookie = jar.cookie(TOKEN_COOKIE).unwrap();
        assert_eq!(cookie.path, "/");
        let ttl = cookie.expires_at - Utc::now();
        assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));

        jar.destroy(TOKEN_COOKIE).unwrap();
        assert_eq!(jar.get(TOKEN_COOKIE), None);
        // Destroying twice is fine
        jar.destroy(TOKEN_COOKIE).unwrap();
    }

    #[test]
    fn test_expired_cookie_reads_as_absent() {
        let jar = MemoryCookieJar::new();
        jar.set(USER_ID_COOKIE, "42", &expired()).unwrap();
        assert_eq!(jar.get(USER_ID_COOKIE), None);
    }

    #[test]
    fn test_file_jar_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let jar = FileCookieJar::open(dir.path()).unwrap();
            jar.set(TOKEN_COOKIE, "T1", &CookieOptions::session_default()).unwrap();
            jar.set(USER_ID_COOKIE, "42", &CookieOptions::session_default()).unwrap();
        }

        let jar = FileCookieJar::open(dir.path()).unwrap();
        assert_eq!(jar.get(TOKEN_COOKIE).as_deref(), Some("T1"));
        assert_eq!(jar.get(USER_ID_COOKIE).as_deref(), Some("42"));

        jar.destroy(TOKEN_COOKIE).unwrap();
        let jar = FileCookieJar::open(dir.path()).unwrap();
        assert_eq!(jar.get(TOKEN_COOKIE), None);
        assert_eq!(jar.get(USER_ID_COOKIE).as_deref(), Some("42"));
    }

    #[test]
    fn test_file_jar_purges_expired_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::open(dir.path()).unwrap();
        jar.set("stale", "x", &expired()).unwrap();
        jar.set(TOKEN_COOKIE, "T1", &CookieOptions::session_default()).unwrap();

        let contents = std::fs::read_to_string(jar.path()).unwrap();
        assert!(!contents.contains("stale"));
        assert!(contents.contains(TOKEN_COOKIE));
    }

    #[test]
    fn test_file_jar_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COOKIE_FILE), "{not json").unwrap();
        assert!(matches!(
            FileCookieJar::open(dir.path()),
            Err(CookieError::Serialization(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_jar_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::open(dir.path()).unwrap();
        jar.set(TOKEN_COOKIE, "T1", &CookieOptions::session_default()).unwrap();

        let mode = std::fs::metadata(jar.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
