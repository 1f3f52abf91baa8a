/*
 * appcell-core
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::{policy::error::ConfigError, Error, Result};

/// Resolved access mode for one entry of the filesystem map. Suppression always wins over a
/// prior positive mode registered under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesystemMode {
    ReadOnly,
    ReadWrite,
    Suppressed,
}

impl Display for FilesystemMode {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ReadOnly => write!(fmter, "ro"),
            Self::ReadWrite => write!(fmter, "rw"),
            Self::Suppressed => write!(fmter, "suppressed"),
        }
    }
}

/// The recognised symbolic forms of a filesystem token, minus any `:ro`/`:rw` mode suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesystemToken {
    Host,
    Home,
    XdgUserDir(XdgUserDir),
    XdgRun(String),
    HomeRelative(String),
    Absolute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XdgUserDir {
    Desktop,
    Documents,
    Download,
    Music,
    Pictures,
    PublicShare,
    Templates,
    Videos,
}

impl XdgUserDir {
    /// Name of the `user-dirs.dirs` shell variable this token resolves to.
    pub fn variable(&self) -> &'static str {
        match self {
            Self::Desktop => "XDG_DESKTOP_DIR",
            Self::Documents => "XDG_DOCUMENTS_DIR",
            Self::Download => "XDG_DOWNLOAD_DIR",
            Self::Music => "XDG_MUSIC_DIR",
            Self::Pictures => "XDG_PICTURES_DIR",
            Self::PublicShare => "XDG_PUBLICSHARE_DIR",
            Self::Templates => "XDG_TEMPLATES_DIR",
            Self::Videos => "XDG_VIDEOS_DIR",
        }
    }

    /// The fallback `$HOME`-relative directory name used when no `user-dirs.dirs` entry exists.
    pub fn default_relative(&self) -> &'static str {
        match self {
            Self::Desktop => "Desktop",
            Self::Documents => "Documents",
            Self::Download => "Downloads",
            Self::Music => "Music",
            Self::Pictures => "Pictures",
            Self::PublicShare => "Public",
            Self::Templates => "Templates",
            Self::Videos => "Videos",
        }
    }
}

/// Splits a raw token into its canonical key and an optional explicit mode, per the `:ro`/`:rw`
/// suffix grammar, then validates the key against the recognised forms from §3.
pub fn parse_token(raw: &str) -> Result<(String, Option<FilesystemMode>)> {
    let (key, mode) = match raw.strip_suffix(":ro") {
        Some(stripped) => (stripped, Some(FilesystemMode::ReadOnly)),
        None => match raw.strip_suffix(":rw") {
            Some(stripped) => (stripped, Some(FilesystemMode::ReadWrite)),
            None => (raw, None),
        },
    };

    validate(key)?;
    Ok((key.to_string(), mode))
}

pub fn validate(key: &str) -> Result<()> {
    classify(key).map(|_| ()).ok_or_else(|| error_unknown(key))
}

fn error_unknown(key: &str) -> Error {
    crate::error!(ConfigError::UnknownFilesystem(key.to_string()))
}

/// Classifies an already-mode-stripped key into its symbolic form.
pub fn classify(key: &str) -> Option<FilesystemToken> {
    match key {
        "host" => return Some(FilesystemToken::Host),
        "home" => return Some(FilesystemToken::Home),
        "xdg-desktop" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Desktop)),
        "xdg-documents" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Documents)),
        "xdg-download" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Download)),
        "xdg-music" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Music)),
        "xdg-pictures" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Pictures)),
        "xdg-public-share" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::PublicShare)),
        "xdg-templates" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Templates)),
        "xdg-videos" => return Some(FilesystemToken::XdgUserDir(XdgUserDir::Videos)),
        _ => (),
    }

    if let Some(suffix) = key.strip_prefix("xdg-run/") {
        if !suffix.is_empty() {
            return Some(FilesystemToken::XdgRun(suffix.to_string()));
        }

        return None;
    }

    if let Some(subpath) = key.strip_prefix("~/") {
        return Some(FilesystemToken::HomeRelative(subpath.to_string()));
    }

    if key.starts_with('/') {
        return Some(FilesystemToken::Absolute(key.to_string()));
    }

    None
}

/// Directory names excluded from a `host` filesystem grant; these are covered by the base
/// skeleton's own binds/symlinks/synthesized trees and must never be shadowed by a wholesale
/// `host` bind.
pub const ROOT_EXCLUSION_LIST: &[&str] =
    &[".", "..", "lib", "lib32", "lib64", "bin", "sbin", "usr", "boot", "root", "tmp", "etc", "app", "run", "proc", "sys", "dev", "var"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_suffix() {
        assert_eq!(parse_token("home:ro").unwrap(), ("home".to_string(), Some(FilesystemMode::ReadOnly)));
        assert_eq!(parse_token("~/Projects:rw").unwrap(), ("~/Projects".to_string(), Some(FilesystemMode::ReadWrite)));
        assert_eq!(parse_token("/srv").unwrap(), ("/srv".to_string(), None));
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(parse_token("nonsense").is_err());
        assert!(parse_token("xdg-run/").is_err());
    }

    #[test]
    fn classifies_xdg_run_with_suffix() {
        assert_eq!(classify("xdg-run/gvfs"), Some(FilesystemToken::XdgRun("gvfs".to_string())));
    }

    #[test]
    fn root_exclusion_list_excludes_sys() {
        assert!(ROOT_EXCLUSION_LIST.contains(&"sys"));
        assert!(!ROOT_EXCLUSION_LIST.contains(&"opt"));
        assert!(!ROOT_EXCLUSION_LIST.contains(&"home"));
    }
}
