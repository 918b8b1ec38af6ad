// Runtime settings and the local credential store.
//
// `Settings` is resolved once in `main` and handed to everything that
// needs an endpoint or the credential path. The credential file is a
// single JSON object in the user's home directory, readable only by the
// owner.

use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GostError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com/gists";
pub const DEFAULT_AUTH_URL: &str = "https://api.github.com/authorizations";
pub const CREDENTIALS_FILE: &str = ".gost";

const TOKEN_NOTE: &str = "gost cli";

/// Endpoints and paths used for one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub auth_url: String,
    pub credentials_path: PathBuf,
}

impl Settings {
    /// Resolve settings from `GOST_API_URL`, `GOST_AUTH_URL` and
    /// `GOST_CONFIG`, falling back to the public GitHub endpoints and
    /// `~/.gost`. An explicit `config` path beats all of them.
    pub fn from_env(config: Option<PathBuf>) -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok(), dirs::home_dir(), config)
    }

    /// The home directory is only needed when neither `config` nor
    /// `GOST_CONFIG` names the credential file.
    pub fn resolve<F>(lookup: F, home: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials_path = match config.or_else(|| non_empty("GOST_CONFIG").map(PathBuf::from)) {
            Some(path) => path,
            None => home
                .ok_or_else(|| {
                    GostError::InvalidInput("could not determine home directory".into())
                })?
                .join(CREDENTIALS_FILE),
        };

        Ok(Settings {
            api_url: non_empty("GOST_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.into()),
            auth_url: non_empty("GOST_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.into()),
            credentials_path,
        })
    }
}

/// Stored login. Field names match the on-disk format
/// `{"Username": .., "Token": .., "Private": ..}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub username: String,
    pub token: String,
    /// New gists are created secret when set.
    pub private: bool,
}

/// Reads and writes the credential file at a fixed path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credentials. A missing file yields
    /// `GostError::ConfigNotFound`.
    pub fn load(&self) -> Result<Credentials> {
        if !self.path.exists() {
            return Err(GostError::ConfigNotFound(self.path.clone()));
        }
        let data = fs::read_to_string(&self.path)?;
        let creds: Credentials = serde_json::from_str(&data)?;
        debug!("loaded credentials for {} from {}", creds.username, self.path.display());
        Ok(creds)
    }

    /// Write the credentials, replacing any existing file. The file is
    /// restricted to the owner on unix.
    pub fn save(&self, creds: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(creds)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(data.as_bytes())?;

        info!("saved credentials for {} to {}", creds.username, self.path.display());
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    token: String,
}

/// Exchange a username and password for an access token scoped to gists.
/// Any non-2xx response is an `Auth` error carrying status and body.
pub fn request_token(client: &Client, auth_url: &str, username: &str, password: &str) -> Result<String> {
    let body = serde_json::json!({ "scopes": ["gist"], "note": TOKEN_NOTE });
    debug!("POST {} as {}", auth_url, username);
    let res = client
        .post(auth_url)
        .basic_auth(username, Some(password))
        .json(&body)
        .send()?;

    let status = res.status();
    if !status.is_success() {
        let txt = res.text().unwrap_or_default();
        return Err(GostError::Auth { status: status.as_u16(), body: txt });
    }
    let resp: TokenResponse = res.json()?;
    Ok(resp.token)
}

/// Build fresh credentials from a username/password pair. New logins
/// default to private gists.
pub fn create_credentials(client: &Client, settings: &Settings, username: &str, password: &str) -> Result<Credentials> {
    let token = request_token(client, &settings.auth_url, username, password)?;
    Ok(Credentials {
        username: username.to_string(),
        token,
        private: true,
    })
}
