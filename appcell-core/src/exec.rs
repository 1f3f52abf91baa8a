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

//! The sandbox composer and its collaborators (§4.2-§4.5): the seccomp program builder, the
//! D-Bus proxy supervisor, the transient scope registrar, and the argument-vector builder they
//! all feed into.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
};

use crate::{constants::BWRAP_EXECUTABLE, ErrorTrait};

pub mod args;
pub mod compose;
pub mod proxy;
pub mod scope;
pub mod seccomp;

/// The four error kinds named in §7, unified behind the one `ErrorTrait` every layer of this
/// crate already reports through.
#[derive(Debug)]
pub enum ExecutionError {
    /// Invalid token, unknown name, or bad filesystem specifier reaching the composer from
    /// outside the policy model itself (e.g. an unsupported seccomp architecture token).
    Configuration(String),
    /// No user service manager, unable to connect to the session bus: "sandboxing not
    /// available" with no fallback.
    Unavailable(String),
    /// Cannot create a pipe, cannot write a temporary fd, proxy binary missing.
    Resource(String),
    /// A spawned proxy exited before writing its readiness byte.
    ProxyReadiness(String),
    ProcessInit(&'static str, std::io::ErrorKind),
    ProcessWait(&'static str, std::io::ErrorKind),
    Helper(ExitStatus),
}

impl Display for ExecutionError {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Configuration(what) => write!(fmter, "Invalid configuration: '{what}'."),
            Self::Unavailable(what) => write!(fmter, "Sandboxing not available: {what}."),
            Self::Resource(what) => write!(fmter, "{what}"),
            Self::ProxyReadiness(bus) => write!(fmter, "Failed to sync with dbus proxy '{bus}'."),
            Self::ProcessInit(exec, err) => write!(fmter, "Unable to initialize '{exec}': {err}"),
            Self::ProcessWait(exec, err) => write!(fmter, "Unable to wait on '{exec}': {err}"),
            Self::Helper(status) => write!(fmter, "'{BWRAP_EXECUTABLE}' exited with {status}"),
        }
    }
}

impl ErrorTrait for ExecutionError {
    fn code(&self) -> i32 {
        match self {
            Self::Helper(status) => 128 + status.signal().unwrap_or(1),
            _ => 1,
        }
    }
}
