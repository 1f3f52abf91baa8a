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

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{policy::error::ConfigError, Error, Result};

/// Per-bus-name D-Bus access level, ordered by increasing privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BusPolicyLevel {
    None,
    See,
    Talk,
    Own,
}

impl Display for BusPolicyLevel {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        write!(fmter, "{}", match self {
            Self::None => "none",
            Self::See => "see",
            Self::Talk => "talk",
            Self::Own => "own",
        })
    }
}

impl FromStr for BusPolicyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "none" => Self::None,
            "see" => Self::See,
            "talk" => Self::Talk,
            "own" => Self::Own,
            _ => crate::err!(ConfigError::UnknownPolicyLevel(s.to_string()))?,
        })
    }
}

/// Validates `name` as a D-Bus well-known name (never a unique name starting with `:`),
/// optionally suffixed `.*` to denote a namespace prefix grant.
pub fn validate_name(name: &str) -> Result<()> {
    let base = name.strip_suffix(".*").unwrap_or(name);

    if base.is_empty() || base.starts_with(':') || !base.contains('.') || base.split('.').any(|seg| seg.is_empty()) {
        crate::err!(ConfigError::InvalidBusName(name.to_string()))?
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_privilege() {
        assert!(BusPolicyLevel::None < BusPolicyLevel::See);
        assert!(BusPolicyLevel::See < BusPolicyLevel::Talk);
        assert!(BusPolicyLevel::Talk < BusPolicyLevel::Own);
    }

    #[test]
    fn rejects_unique_names() {
        assert!(validate_name(":1.42").is_err());
    }

    #[test]
    fn accepts_prefix_grant() {
        assert!(validate_name("org.example.App.*").is_ok());
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("talk".parse::<BusPolicyLevel>().unwrap(), BusPolicyLevel::Talk);
        assert!("blurt".parse::<BusPolicyLevel>().is_err());
    }
}
