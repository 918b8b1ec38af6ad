// Library root
// -----------
// The binary (`main.rs`) parses arguments and hands them to `ui::run`.
//
// Module responsibilities:
// - `config`: endpoints, the credential file and the token exchange.
// - `api`: the blocking gist client and the gist/file records.
// - `browser`: opening a gist's page with the platform launcher.
// - `cli`: argument definitions.
// - `ui`: prompts, dispatch and listing output.
// - `error`: the error kinds every layer returns.
pub mod api;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod ui;

pub use api::{Gist, GistClient, GistFile};
pub use config::{CredentialStore, Credentials, Settings};
pub use error::{GostError, Result};
