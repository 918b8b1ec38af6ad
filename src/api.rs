// Gist API client: a small blocking HTTP client for the gists REST
// endpoint. One round trip per call, no retries, no caching. Every call
// carries the stored access token.

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::browser::Opener;
use crate::config::{Credentials, Settings};
use crate::error::{GostError, Result};

const USER_AGENT: &str = concat!("gost/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Build the HTTP client shared by the token exchange and the API calls.
pub fn http_client() -> Result<Client> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(client)
}

/// A gist as returned by the API.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Gist {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
}

impl Gist {
    /// File names in name order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Owner {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
}

/// One file inside a gist. Everything except `content` is assigned by
/// the server. Listings leave `content` empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GistFile {
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default)]
    pub raw_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// File body sent on create and update.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FileContent {
    pub content: String,
}

#[derive(Serialize, Debug)]
struct NewGist<'a> {
    description: &'a str,
    public: bool,
    files: BTreeMap<String, FileContent>,
}

/// PATCH body. A `None` file entry serialises as `null`, which deletes
/// that file server-side.
#[derive(Serialize, Debug, Default)]
struct GistPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    files: BTreeMap<String, Option<FileContent>>,
}

/// Read local files into a `name -> content` map keyed by base name.
pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GostError::InvalidInput(format!("not a file path: {}", path.display())))?
            .to_string();
        let content = fs::read_to_string(path)?;
        if files.insert(name.clone(), content).is_some() {
            return Err(GostError::InvalidInput(format!(
                "more than one file named {:?}",
                name
            )));
        }
    }
    Ok(files)
}

/// Blocking client for the gists endpoint. Holds the HTTP client, the
/// base URL and the stored login.
#[derive(Clone)]
pub struct GistClient {
    client: Client,
    base_url: String,
    token: String,
    private_default: bool,
}

impl GistClient {
    pub fn new(settings: &Settings, creds: &Credentials) -> Result<Self> {
        Ok(Self::with_client(http_client()?, settings, creds))
    }

    pub fn with_client(client: Client, settings: &Settings, creds: &Credentials) -> Self {
        GistClient {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            token: creds.token.clone(),
            private_default: creds.private,
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("token {}", self.token))
            .map_err(|_| GostError::InvalidInput("access token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        Ok(headers)
    }

    fn gist_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    fn execute(&self, req: RequestBuilder) -> Result<Response> {
        check_status(req.headers(self.auth_headers()?).send()?)
    }

    fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = self.execute(req)?;
        Ok(res.json()?)
    }

    /// All gists owned by the authenticated user.
    pub fn list(&self) -> Result<Vec<Gist>> {
        debug!("GET {}", self.base_url);
        self.fetch(self.client.get(&self.base_url))
    }

    /// One gist by id, with file contents.
    pub fn get(&self, id: &str) -> Result<Gist> {
        let url = self.gist_url(id);
        debug!("GET {}", url);
        self.fetch(self.client.get(&url))
    }

    /// Create a gist from a `name -> content` map. Visibility is
    /// `public` when given, otherwise the opposite of the stored
    /// private default.
    pub fn create(
        &self,
        description: &str,
        files: BTreeMap<String, String>,
        public: Option<bool>,
    ) -> Result<Gist> {
        if files.is_empty() {
            return Err(GostError::InvalidInput("at least one file is required".into()));
        }
        let body = NewGist {
            description,
            public: public.unwrap_or(!self.private_default),
            files: files
                .into_iter()
                .map(|(name, content)| (name, FileContent { content }))
                .collect(),
        };
        debug!("POST {} ({} files, public: {})", self.base_url, body.files.len(), body.public);
        self.fetch(self.client.post(&self.base_url).json(&body))
    }

    /// Patch a gist. Only the fields supplied are sent. A file mapped to
    /// `None` is deleted; a file mapped to content is added or replaced.
    pub fn update(
        &self,
        id: &str,
        description: Option<&str>,
        files: BTreeMap<String, Option<String>>,
    ) -> Result<Gist> {
        if description.is_none() && files.is_empty() {
            return Err(GostError::InvalidInput("nothing to update".into()));
        }
        let patch = GistPatch {
            description: description.map(str::to_string),
            files: files
                .into_iter()
                .map(|(name, content)| (name, content.map(|content| FileContent { content })))
                .collect(),
        };
        self.patch(id, &patch)
    }

    fn patch(&self, id: &str, patch: &GistPatch) -> Result<Gist> {
        let url = self.gist_url(id);
        debug!("PATCH {}", url);
        self.fetch(self.client.patch(&url).json(patch))
    }

    /// Delete the whole gist, or only `file` from it.
    ///
    /// The API has no single-file delete, so removing one file re-sends
    /// every other file with its current content and the target as
    /// `null`.
    pub fn delete(&self, id: &str, file: Option<&str>) -> Result<()> {
        let Some(file) = file else {
            let url = self.gist_url(id);
            debug!("DELETE {}", url);
            self.execute(self.client.delete(&url))?;
            return Ok(());
        };

        let gist = self.get(id)?;
        if !gist.files.contains_key(file) {
            return Err(GostError::FileNotFound { id: id.to_string(), file: file.to_string() });
        }
        let mut patch = GistPatch {
            description: Some(gist.description.clone()),
            ..Default::default()
        };
        for (name, entry) in &gist.files {
            let value = if name == file {
                None
            } else {
                Some(FileContent { content: self.content_of(entry)? })
            };
            patch.files.insert(name.clone(), value);
        }
        self.patch(id, &patch)?;
        Ok(())
    }

    /// Full content of a file. Large files come back truncated from the
    /// gist endpoint and are fetched from their raw URL instead.
    fn content_of(&self, file: &GistFile) -> Result<String> {
        if !file.truncated || file.raw_url.is_empty() {
            return Ok(file.content.clone());
        }
        // The raw URL is server-supplied and may name another host, so the
        // token stays off this request.
        debug!("GET {} (truncated content)", file.raw_url);
        let res = check_status(self.client.get(&file.raw_url).send()?)?;
        Ok(res.text()?)
    }

    /// Write the gist's files into `dir`, one local file per remote file.
    /// Returns the paths written.
    pub fn download(&self, id: &str, file: Option<&str>, dir: &Path) -> Result<Vec<PathBuf>> {
        let gist = self.get(id)?;
        let selected = select_files(&gist, file)?;
        if let Some((name, _)) = selected.iter().find(|(name, _)| !is_plain_file_name(name)) {
            return Err(GostError::InvalidInput(format!(
                "refusing to write file with unsafe name {:?}",
                name
            )));
        }
        let mut written = Vec::new();
        for (name, entry) in selected {
            let path = dir.join(name);
            fs::write(&path, self.content_of(entry)?)?;
            debug!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Print each selected file as `name:` followed by its content.
    pub fn view(&self, id: &str, file: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let gist = self.get(id)?;
        for (name, entry) in select_files(&gist, file)? {
            writeln!(out, "{}:", name)?;
            writeln!(out, "{}", self.content_of(entry)?)?;
        }
        Ok(())
    }

    /// Open the gist's web page.
    pub fn view_in_browser(&self, id: &str, opener: &dyn Opener) -> Result<()> {
        let gist = self.get(id)?;
        opener.open(&gist.html_url)
    }
}

fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    debug!("{} {}", status.as_u16(), res.url());
    if !status.is_success() {
        let txt = res.text().unwrap_or_default();
        return Err(GostError::Http { status: status.as_u16(), body: txt });
    }
    Ok(res)
}

fn select_files<'a>(gist: &'a Gist, file: Option<&str>) -> Result<Vec<(&'a String, &'a GistFile)>> {
    match file {
        None => Ok(gist.files.iter().collect()),
        Some(name) => gist
            .files
            .get_key_value(name)
            .map(|entry| vec![entry])
            .ok_or_else(|| GostError::FileNotFound { id: gist.id.clone(), file: name.to_string() }),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
