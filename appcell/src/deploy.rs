/*
 * appcell
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify
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

//! Stand-in for the installation-layout resolver that appcell-core treats as an external
//! collaborator (§1, §6). The real repository format, its commit verification and its
//! manifest builder are out of scope; this module only walks a conventional on-disk layout
//! under the repository directory and hands the composer a resolved [`AppDeployment`].

use std::{env::var, fs, path::PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use appcell_core::{
    err,
    error,
    impl_error,
    policy::{
        document::{negated, split_list, Document},
        Policy,
    },
    runtime::{AppDeployment, Extension, ExtensionPrefix, Ref, RefKind},
    constants::HOME,
    ErrorGeneric,
    ErrorTrait,
    Result,
};

const REPOSITORY_DIR_DEFAULT: &str = "/.local/share/appcell/repo";

lazy_static! {
    static ref REPOSITORY_DIR: String = var("APPCELL_REPO_DIR").unwrap_or_else(|_| format!("{}{}", *HOME, REPOSITORY_DIR_DEFAULT));
    static ref APP_ID_PATTERN: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap();
}

#[derive(Debug)]
pub enum DeployError {
    InvalidAppId(String),
    MissingMetadata(String),
}

impl_error!(DeployError);

impl std::fmt::Display for DeployError {
    fn fmt(&self, fmter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAppId(id) => write!(fmter, "'{id}' is not a valid reverse-DNS application id."),
            Self::MissingMetadata(path) => write!(fmter, "Metadata file '{path}' is missing."),
        }
    }
}

/// Rejects anything that isn't a dotted reverse-DNS identifier, mirroring the application-id
/// shape used to scope bus-name ownership and the scope unit name (GLOSSARY).
pub fn validate_app_id(id: &str) -> Result<()> {
    if APP_ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        err!(DeployError::InvalidAppId(id.to_string()))
    }
}

/// One deployed tree resolved from the repository: its ref, its `files` directory, and the
/// parsed metadata document sitting alongside it.
struct Tree {
    files: PathBuf,
    metadata: Document,
}

fn load_tree(kind: &str, name: &str, arch: &str, branch: &str) -> Result<Tree> {
    let root = PathBuf::from(&*REPOSITORY_DIR).join(kind).join(name).join(arch).join(branch);
    let files = root.join("files");
    let metadata_path = root.join("metadata");

    let text = fs::read_to_string(&metadata_path).map_err(|_| error!(DeployError::MissingMetadata(metadata_path.display().to_string())))?;

    Ok(Tree {
        files,
        metadata: Document::parse(&text),
    })
}

fn split_ref(value: &str, default_arch: &str) -> (String, String, String) {
    let parts: Vec<&str> = value.splitn(3, '/').collect();
    match parts.as_slice() {
        [name, arch, branch] => (name.to_string(), arch.to_string(), branch.to_string()),
        [name, branch] => (name.to_string(), default_arch.to_string(), branch.to_string()),
        [name] => (name.to_string(), default_arch.to_string(), "stable".to_string()),
        _ => (value.to_string(), default_arch.to_string(), "stable".to_string()),
    }
}

/// The application deployment plus the policy carried by its own and its runtime's metadata,
/// ready to be merged with command-line overrides before composition.
pub struct ResolvedApp {
    pub deployment: AppDeployment,
    pub policy: Policy,
}

/// Resolves `app_id` (optionally `name/arch/branch`) against the conventional repository
/// layout: `$REPO/app/<id>/<arch>/<branch>/{files,metadata}` for the application and
/// `$REPO/runtime/<name>/<arch>/<branch>/{files,metadata}` for its runtime. The runtime
/// reference and any extensions are read from the application's own metadata, under the
/// `[Application]` group (`runtime`, `extensions`) that `compose.rs`'s `app_info` step writes
/// back out for diagnostic purposes.
pub fn resolve(app_ref: &str, arch: &str) -> Result<ResolvedApp> {
    let (name, arch, branch) = split_ref(app_ref, arch);
    validate_app_id(&name)?;

    let app = load_tree("app", &name, &arch, &branch)?;
    let runtime_value = app
        .metadata
        .get("Application", "runtime")
        .ok_or_else(|| error!(DeployError::MissingMetadata(format!("[Application] runtime= in {name} metadata"))))?;
    let (runtime_name, runtime_arch, runtime_branch) = split_ref(runtime_value, &arch);
    let runtime = load_tree("runtime", &runtime_name, &runtime_arch, &runtime_branch)?;

    let app_ref = Ref::new(RefKind::App, name.clone(), arch.clone(), branch.clone());
    let runtime_ref = Ref::new(RefKind::Runtime, runtime_name.clone(), runtime_arch.clone(), runtime_branch.clone());
    let data_dir = format!("{}/.var/app/{}", *HOME, name);

    fs::create_dir_all(format!("{data_dir}/cache")).prepend_io(|| format!("{data_dir}/cache"))?;
    fs::create_dir_all(format!("{data_dir}/data")).prepend_io(|| format!("{data_dir}/data"))?;
    fs::create_dir_all(format!("{data_dir}/config")).prepend_io(|| format!("{data_dir}/config"))?;

    let mut policy = Policy::new();

    policy.merge(&metadata_policy(&runtime.metadata)?);
    policy.merge(&metadata_policy(&app.metadata)?);

    let mut extensions = Vec::new();
    resolve_extensions(&runtime.metadata, &runtime_arch, &runtime_branch, ExtensionPrefix::Runtime, &mut extensions)?;
    resolve_extensions(&app.metadata, &arch, &branch, ExtensionPrefix::App, &mut extensions)?;

    let deployment = AppDeployment::new(name, app_ref, runtime_ref, app.files, runtime.files, data_dir).with_extensions(extensions);

    Ok(ResolvedApp { deployment, policy })
}

/// The application/runtime metadata format reuses the same `[Context]`/bus-policy/`[Environment]`
/// grammar `Policy::load_metadata` already parses; only the `[Application]` group is specific to
/// this resolver.
fn metadata_policy(doc: &Document) -> Result<Policy> {
    Policy::load_metadata(&doc.render())
}

/// Declared extensions live in `[Application] extensions = <id>;<id>;...`, each resolved
/// against the repository's `extension/<id>/<arch>/<branch>/files` tree; this is a declared
/// list rather than a filesystem scan, matching the metadata-driven shape of everything else
/// this resolver reads.
fn resolve_extensions(doc: &Document, arch: &str, branch: &str, prefix: ExtensionPrefix, out: &mut Vec<Extension>) -> Result<()> {
    let Some(declared) = doc.get("Application", "extensions") else {
        return Ok(());
    };

    for entry in split_list(declared) {
        let (removed, id) = negated(entry);
        if removed {
            continue;
        }

        let tree = load_tree("extension", id, arch, branch)?;
        out.push(Extension::new(id.rsplit('.').next().unwrap_or(id), tree.files, prefix));
    }

    Ok(())
}
