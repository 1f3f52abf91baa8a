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

//! Narrow contracts toward the collaborators this crate treats as external (§1, §6): the
//! on-disk application repository, the package/manifest builder, and the installation layout
//! resolver. None of their internals are modelled here; this module only carries the resolved
//! shapes the composer needs to consume.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Whether a deployed tree is the application itself or its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    App,
    Runtime,
}

/// Opaque identifier for a deployed tree: `(kind, name/arch/branch)`. The repository format and
/// its commit/signature verification live entirely outside this crate; a `Ref` is treated as a
/// resolved handle, never parsed back out of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    kind: RefKind,
    name: String,
    arch: String,
    branch: String,
}

impl Ref {
    pub fn new(kind: RefKind, name: impl Into<String>, arch: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            arch: arch.into(),
            branch: branch.into(),
        }
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

impl Display for Ref {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        write!(fmter, "{}/{}/{}", self.name, self.arch, self.branch)
    }
}

/// Which sandbox prefix an extension's deploy directory is bound under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPrefix {
    App,
    Runtime,
}

impl ExtensionPrefix {
    pub fn mount_prefix(&self) -> &'static str {
        match self {
            Self::App => "/app",
            Self::Runtime => "/usr",
        }
    }
}

/// One extension declared by the runtime or application metadata, resolved to a deploy
/// directory on disk by the external installation-layout resolver (§6). The composer only
/// needs the resolved path and the subdirectory name to bind it and lock it.
#[derive(Debug, Clone)]
pub struct Extension {
    /// Subdirectory name under the mount prefix, e.g. `extensions/Plugins`.
    pub directory: String,
    /// Resolved `<deploy>/files` directory on the host.
    pub deploy_files: PathBuf,
    pub prefix: ExtensionPrefix,
}

impl Extension {
    pub fn new(directory: impl Into<String>, deploy_files: impl Into<PathBuf>, prefix: ExtensionPrefix) -> Self {
        Self {
            directory: directory.into(),
            deploy_files: deploy_files.into(),
            prefix,
        }
    }

    pub fn mount_point(&self) -> String {
        format!("{}/{}", self.prefix.mount_prefix(), self.directory)
    }
}

/// The resolved application deployment the composer consumes (§6): an application id, its own
/// ref and that of its runtime, the two read-only trees bound at `/app` and `/usr`, the
/// app-private data directory mirrored to `/var/{cache,data,config}`, and any extensions.
#[derive(Debug, Clone)]
pub struct AppDeployment {
    pub app_id: String,
    pub app_ref: Ref,
    pub runtime_ref: Ref,
    pub app_files: PathBuf,
    pub runtime_files: PathBuf,
    pub app_data_dir: PathBuf,
    pub extensions: Vec<Extension>,
}

impl AppDeployment {
    pub fn new(
        app_id: impl Into<String>,
        app_ref: Ref,
        runtime_ref: Ref,
        app_files: impl Into<PathBuf>,
        runtime_files: impl Into<PathBuf>,
        app_data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_ref,
            runtime_ref,
            app_files: app_files.into(),
            runtime_files: runtime_files.into(),
            app_data_dir: app_data_dir.into(),
            extensions: Vec::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<Extension>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.app_data_dir.join("cache")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.app_data_dir.join("data")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.app_data_dir.join("config")
    }

    pub fn app_files(&self) -> &Path {
        &self.app_files
    }

    pub fn runtime_files(&self) -> &Path {
        &self.runtime_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_displays_as_triple() {
        let r = Ref::new(RefKind::Runtime, "org.example.Platform", "x86_64", "1.0");
        assert_eq!(r.to_string(), "org.example.Platform/x86_64/1.0");
    }

    #[test]
    fn extension_mount_point_uses_prefix() {
        let ext = Extension::new("Plugins", "/deploy/ext", ExtensionPrefix::App);
        assert_eq!(ext.mount_point(), "/app/Plugins");
    }
}
