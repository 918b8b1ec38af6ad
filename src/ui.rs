// UI layer: credential prompts, command dispatch and output formatting.
// Every command runs once and returns; errors bubble up to `main`.

use crate::api::{read_files, Gist, GistClient};
use crate::browser::{Opener, SystemOpener};
use crate::cli::{visibility, Cli, Cmd};
use crate::config::{create_credentials, CredentialStore, Credentials, Settings};
use crate::error::GostError;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

/// Resolve settings, make sure we have credentials, then run the command.
pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env(cli.config)?;
    let store = CredentialStore::new(&settings.credentials_path);
    let http = crate::api::http_client()?;

    if cli.cmd == Cmd::Login {
        let mut creds = interactive_create(&http, &settings)?;
        // Keep the visibility preference across logins.
        if let Ok(old) = store.load() {
            creds.private = old.private;
        }
        store.save(&creds).context("Failed to save credentials")?;
        println!("Saved credentials to {}", store.path().display());
        return Ok(());
    }

    let creds = load_or_create(&store, &http, &settings)?;
    let client = GistClient::with_client(http, &settings, &creds);
    let opener = SystemOpener::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&cli.cmd, &client, &opener, &mut out)
}

/// Load stored credentials, running the interactive login on first use.
pub fn load_or_create(store: &CredentialStore, http: &Client, settings: &Settings) -> Result<Credentials> {
    match store.load() {
        Ok(creds) => Ok(creds),
        Err(GostError::ConfigNotFound(path)) => {
            eprintln!("No credentials at {}, logging in.", path.display());
            let creds = interactive_create(http, settings)?;
            store.save(&creds).context("Failed to save credentials")?;
            Ok(creds)
        }
        Err(e) => Err(e).context("Failed to load credentials"),
    }
}

/// Prompt for username and password and exchange them for a token.
pub fn interactive_create(http: &Client, settings: &Settings) -> Result<Credentials> {
    let default_user = std::env::var("USER").unwrap_or_default();
    let username: String = Input::new()
        .with_prompt("Username")
        .default(default_user)
        .interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Requesting token...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let res = create_credentials(http, settings, &username, &password);
    spinner.finish_and_clear();

    Ok(res?)
}

/// Run one command against the API, writing user-facing output to `out`.
pub fn execute(cmd: &Cmd, client: &GistClient, opener: &dyn Opener, out: &mut dyn Write) -> Result<()> {
    debug!("running {:?}", cmd);
    match cmd {
        Cmd::List { id } => {
            let gists = match id {
                Some(id) => vec![client.get(id)?],
                None => client.list()?,
            };
            out.write_all(format_listing(&gists).as_bytes())?;
        }
        Cmd::Create { description, public, secret, files } => {
            if files.is_empty() {
                anyhow::bail!("no files given");
            }
            let files = read_files(files)?;
            let gist = client.create(description, files, visibility(*public, *secret))?;
            writeln!(out, "{}", gist.html_url)?;
        }
        Cmd::Delete { id, file, yes } => {
            if file.is_none() && !*yes && !confirm_delete(id)? {
                writeln!(out, "Aborted")?;
                return Ok(());
            }
            client.delete(id, file.as_deref())?;
            match file {
                Some(f) => writeln!(out, "Removed {} from {}", f, id)?,
                None => writeln!(out, "Deleted {}", id)?,
            }
        }
        Cmd::View { id, file, browser } => {
            if *browser {
                client.view_in_browser(id, opener)?;
            } else {
                client.view(id, file.as_deref(), out)?;
            }
        }
        Cmd::Save { id, file, dir } => {
            for path in client.download(id, file.as_deref(), dir)? {
                writeln!(out, "{}", path.display())?;
            }
        }
        Cmd::Update { id, description, files, remove } => {
            if description.is_none() && files.is_empty() && remove.is_empty() {
                anyhow::bail!("nothing to update: give --description, --file or --remove");
            }
            let mut changes: BTreeMap<String, Option<String>> = read_files(files)?
                .into_iter()
                .map(|(name, content)| (name, Some(content)))
                .collect();
            for name in remove {
                if changes.insert(name.clone(), None).is_some() {
                    anyhow::bail!("{} is both added and removed", name);
                }
            }
            let gist = client.update(id, description.as_deref(), changes)?;
            writeln!(out, "{}", gist.html_url)?;
        }
        Cmd::Login => anyhow::bail!("login runs before any credentials are loaded"),
    }
    Ok(())
}

fn confirm_delete(id: &str) -> Result<bool> {
    let ok = Confirm::new()
        .with_prompt(format!("Delete gist {}?", id))
        .default(false)
        .interact()?;
    Ok(ok)
}

/// One line per gist: `id  files  visibility  - description`, with the
/// first two columns padded to their widest entry. The dash is left out
/// when there is no description.
pub fn format_listing(gists: &[Gist]) -> String {
    let rows: Vec<(&str, String, &str, &str)> = gists
        .iter()
        .map(|g| {
            let visibility = if g.public { "public" } else { "secret" };
            (g.id.as_str(), g.file_names().join(", "), visibility, g.description.as_str())
        })
        .collect();
    let id_width = rows.iter().map(|r| r.0.chars().count()).max().unwrap_or(0);
    let files_width = rows.iter().map(|r| r.1.chars().count()).max().unwrap_or(0);

    let mut listing = String::new();
    for (id, files, visibility, description) in rows {
        let mut line = format!(
            "{:<iw$}  {:<fw$}  {}",
            id,
            files,
            visibility,
            iw = id_width,
            fw = files_width
        );
        if !description.is_empty() {
            line.push_str("  - ");
            line.push_str(description);
        }
        listing.push_str(line.trim_end());
        listing.push('\n');
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GistFile;
    use mockito::Server;
    use serde_json::json;
    use std::path::PathBuf;

    fn gist(id: &str, public: bool, description: &str, files: &[&str]) -> Gist {
        Gist {
            id: id.into(),
            description: description.into(),
            public,
            files: files
                .iter()
                .map(|f| (f.to_string(), GistFile { filename: f.to_string(), ..Default::default() }))
                .collect(),
            ..Default::default()
        }
    }

    fn client_for(server: &Server) -> GistClient {
        let settings = Settings {
            api_url: format!("{}/gists", server.url()),
            auth_url: format!("{}/authorizations", server.url()),
            credentials_path: PathBuf::from("/nonexistent/.gost"),
        };
        let creds = Credentials { username: "octocat".into(), token: "abc".into(), private: true };
        GistClient::new(&settings, &creds).unwrap()
    }

    struct NoBrowser;

    impl Opener for NoBrowser {
        fn open(&self, url: &str) -> crate::Result<()> {
            panic!("unexpected browser launch for {}", url)
        }
    }

    #[test]
    fn listing_aligns_columns() {
        let listing = format_listing(&[
            gist("a1", true, "short", &["x.rs"]),
            gist("bbbb22", false, "longer one", &["main.rs", "lib.rs"]),
        ]);
        assert_eq!(
            listing,
            "a1      x.rs             public  - short\n\
             bbbb22  lib.rs, main.rs  secret  - longer one\n"
        );
    }

    #[test]
    fn listing_omits_dash_without_description() {
        assert_eq!(format_listing(&[gist("a1", true, "", &["x.rs"])]), "a1  x.rs  public\n");
        assert_eq!(format_listing(&[]), "");
    }

    #[test]
    fn list_with_id_fetches_one_gist() {
        let mut server = Server::new();
        let one = server
            .mock("GET", "/gists/abc")
            .with_status(200)
            .with_body(json!({ "id": "abc", "description": "d", "public": true, "files": {} }).to_string())
            .create();
        let all = server.mock("GET", "/gists").expect(0).create();
        let mut out = Vec::new();

        execute(&Cmd::List { id: Some("abc".into()) }, &client_for(&server), &NoBrowser, &mut out).unwrap();

        one.assert();
        all.assert();
        assert_eq!(String::from_utf8(out).unwrap(), "abc    public  - d\n");
    }

    #[test]
    fn create_prints_html_url() {
        let mut server = Server::new();
        server
            .mock("POST", "/gists")
            .with_status(201)
            .with_body(json!({ "id": "n1", "html_url": "https://gist.github.com/n1" }).to_string())
            .create();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hi").unwrap();
        let cmd = Cmd::Create { description: "d".into(), public: false, secret: false, files: vec![path] };
        let mut out = Vec::new();

        execute(&cmd, &client_for(&server), &NoBrowser, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "https://gist.github.com/n1\n");
    }

    #[test]
    fn create_without_files_fails_before_any_request() {
        let mut server = Server::new();
        let post = server.mock("POST", "/gists").expect(0).create();
        let cmd = Cmd::Create { description: "d".into(), public: false, secret: false, files: vec![] };

        assert!(execute(&cmd, &client_for(&server), &NoBrowser, &mut Vec::new()).is_err());
        post.assert();
    }

    #[test]
    fn update_without_changes_fails() {
        let server = Server::new();
        let cmd = Cmd::Update { id: "abc".into(), description: None, files: vec![], remove: vec![] };
        assert!(execute(&cmd, &client_for(&server), &NoBrowser, &mut Vec::new()).is_err());
    }

    #[test]
    fn update_removes_named_files() {
        let mut server = Server::new();
        let patch = server
            .mock("PATCH", "/gists/abc")
            .match_body(mockito::Matcher::Json(json!({ "files": { "old.txt": null } })))
            .with_status(200)
            .with_body(json!({ "id": "abc", "html_url": "https://gist.github.com/abc" }).to_string())
            .create();
        let cmd = Cmd::Update { id: "abc".into(), description: None, files: vec![], remove: vec!["old.txt".into()] };

        execute(&cmd, &client_for(&server), &NoBrowser, &mut Vec::new()).unwrap();
        patch.assert();
    }

    #[test]
    fn delete_with_yes_skips_prompt() {
        let mut server = Server::new();
        let del = server.mock("DELETE", "/gists/abc").with_status(204).create();
        let cmd = Cmd::Delete { id: "abc".into(), file: None, yes: true };
        let mut out = Vec::new();

        execute(&cmd, &client_for(&server), &NoBrowser, &mut out).unwrap();
        del.assert();
        assert_eq!(String::from_utf8(out).unwrap(), "Deleted abc\n");
    }

    #[test]
    fn save_reports_written_paths() {
        let mut server = Server::new();
        server
            .mock("GET", "/gists/abc")
            .with_status(200)
            .with_body(
                json!({ "id": "abc", "files": { "a.txt": { "filename": "a.txt", "content": "A" } } })
                    .to_string(),
            )
            .create();
        let dir = tempfile::tempdir().unwrap();
        let cmd = Cmd::Save { id: "abc".into(), file: None, dir: dir.path().to_path_buf() };
        let mut out = Vec::new();

        execute(&cmd, &client_for(&server), &NoBrowser, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{}\n", dir.path().join("a.txt").display())
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "A");
    }

    #[test]
    fn load_or_create_uses_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(|_| None, Some(dir.path().to_path_buf()), None).unwrap();
        let store = CredentialStore::new(&settings.credentials_path);
        let creds = Credentials { username: "octocat".into(), token: "t".into(), private: false };
        store.save(&creds).unwrap();

        let http = crate::api::http_client().unwrap();
        assert_eq!(load_or_create(&store, &http, &settings).unwrap(), creds);
    }
}
