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

use crate::impl_error;

/// A single configuration-error kind (§7) covering every policy-document parse failure: an
/// invalid token, an unknown name, or a malformed filesystem specifier. Each variant carries
/// exactly the offending string, reported verbatim.
#[derive(Debug, Clone)]
pub enum ConfigError {
    UnknownShare(String),
    UnknownSocket(String),
    UnknownDevice(String),
    UnknownFilesystem(String),
    InvalidBusName(String),
    UnknownPolicyLevel(String),
}

impl_error!(ConfigError);

impl Display for ConfigError {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::UnknownShare(v) => write!(fmter, "Unknown share type '{v}'."),
            Self::UnknownSocket(v) => write!(fmter, "Unknown socket type '{v}'."),
            Self::UnknownDevice(v) => write!(fmter, "Unknown device type '{v}'."),
            Self::UnknownFilesystem(v) => write!(fmter, "Unknown filesystem location '{v}'."),
            Self::InvalidBusName(v) => write!(fmter, "Invalid D-Bus well-known name '{v}'."),
            Self::UnknownPolicyLevel(v) => write!(fmter, "Unknown D-Bus policy level '{v}'."),
        }
    }
}
