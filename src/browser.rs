//! Opening gist pages in the platform's browser.
//!
//! The launcher command is picked once from the running platform:
//! - macOS: `open`
//! - Linux: `xdg-open`
//! - Windows: `cmd /C start`
//!
//! On any other platform opening a URL does nothing.

use log::{debug, warn};
use std::process::Command;

use crate::error::{GostError, Result};

/// Something that can show a URL to the user.
pub trait Opener {
    fn open(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Unsupported,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unsupported
        }
    }
}

/// Program and arguments that open `url` on `platform`, or `None` when
/// the platform has no known launcher.
pub fn command_for(platform: Platform, url: &str) -> Option<(&'static str, Vec<String>)> {
    match platform {
        Platform::MacOs => Some(("open", vec![url.to_string()])),
        Platform::Linux => Some(("xdg-open", vec![url.to_string()])),
        // The empty argument is the window title `start` expects first.
        Platform::Windows => Some((
            "cmd",
            vec!["/C".into(), "start".into(), "".into(), url.to_string()],
        )),
        Platform::Unsupported => None,
    }
}

/// Opens URLs by spawning the platform launcher.
#[derive(Debug, Clone)]
pub struct SystemOpener {
    platform: Platform,
}

impl SystemOpener {
    pub fn new(platform: Platform) -> Self {
        SystemOpener { platform }
    }
}

impl Default for SystemOpener {
    fn default() -> Self {
        SystemOpener::new(Platform::current())
    }
}

impl Opener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let Some((program, args)) = command_for(self.platform, url) else {
            warn!("no browser launcher for this platform, not opening {}", url);
            return Ok(());
        };

        debug!("running {} {:?}", program, args);
        let status = Command::new(program)
            .args(&args)
            .status()
            .map_err(|e| GostError::Exec(format!("{}: {}", program, e)))?;
        if !status.success() {
            return Err(GostError::Exec(format!("{} exited with {}", program, status)));
        }
        Ok(())
    }
}
