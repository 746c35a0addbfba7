//! Provider authentication info.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// How the fetcher authenticates against the provider.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Username and password
    Credentials { username: String, password: String },
    /// Path to an exported cookies file, passed through untouched
    Cookies(PathBuf),
}

impl Auth {
    /// Pick the single auth method supplied.
    ///
    /// Empty strings count as absent. Supplying neither, or both, is an error.
    pub fn resolve(
        username: Option<&str>,
        password: Option<&str>,
        cookies_file: Option<&Path>,
    ) -> Result<Self> {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        let credentials = match (non_empty(username), non_empty(password)) {
            (Some(u), Some(p)) => Some((u.to_string(), p.to_string())),
            _ => None,
        };
        let cookies = cookies_file.filter(|p| !p.as_os_str().is_empty());

        match (credentials, cookies) {
            (Some((username, password)), None) => Ok(Auth::Credentials { username, password }),
            (None, Some(path)) => Ok(Auth::Cookies(path.to_path_buf())),
            (Some(_), Some(_)) => Err(AppError::NoAuthInfo(
                "Provide either a username/password or a cookies file, not both.".to_string(),
            )),
            (None, None) => Err(AppError::NoAuthInfo(
                "Please provide your username/password or a cookies file.".to_string(),
            )),
        }
    }

    /// Check that a cookies file is usable before any fetch.
    ///
    /// Credentials can only be checked by the provider.
    pub fn verify(&self) -> Result<()> {
        let Auth::Cookies(path) = self else {
            return Ok(());
        };
        if !path.is_file() {
            return Err(AppError::config(format!(
                "Cookies file {} does not exist or is not a file",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cookies file {} is unreadable: {}", path.display(), e))
        })?;
        if cookie_header(&content).is_empty() {
            return Err(AppError::config(format!(
                "Cookies file {} is empty",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Join the entries of a cookies file into a `Cookie` header value.
///
/// Blank lines and `#` comments are skipped.
pub fn cookie_header(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Auth::Cookies(path) => f.debug_tuple("Cookies").field(path).finish(),
        }
    }
}
