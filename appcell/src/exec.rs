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

//! Drives [`appcell_core::exec::compose::compose_and_run`] from a terminal (§2a). Parsing,
//! translation and shell completion remain out of scope per §1; this walks the raw token stream
//! directly rather than through the `Operand` state machine, since every option here takes its
//! value as the following token and the application id marks the end of appcell's own flags —
//! everything after it, verbatim, is the command run inside the sandbox.

use std::env::consts::ARCH;

use appcell_core::{
    err,
    error,
    exec::compose::{compose_and_run, Flags},
    policy::{document::Document, Policy},
    utils::{arguments::{Arguments, InvalidArgument}, check_root},
    Result,
};

use crate::deploy;

pub fn execute(args: &mut Arguments) -> Result<()> {
    check_root()?;

    let tokens = args.inner();
    let mut flags = Flags::default();
    let mut custom_command = None;
    let mut app_ref = None;
    let mut overrides = Document::new();
    let mut shares = Vec::new();
    let mut sockets = Vec::new();
    let mut filesystems = Vec::new();
    let mut trailing = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        i += 1;

        if app_ref.is_some() {
            trailing.push(token.to_string());
            continue;
        }

        match token {
            "-d" | "--devel" => flags.devel = true,
            "-b" | "--background" => flags.background = true,
            "--log-session-bus" => flags.log_session_bus = true,
            "--log-system-bus" => flags.log_system_bus = true,
            "--command" => custom_command = Some(take_value(tokens, &mut i, "--command")?),
            "--share" => shares.push(take_value(tokens, &mut i, "--share")?.to_string()),
            "--unshare" => shares.push(format!("!{}", take_value(tokens, &mut i, "--unshare")?)),
            "--socket" => sockets.push(take_value(tokens, &mut i, "--socket")?.to_string()),
            "--unsocket" => sockets.push(format!("!{}", take_value(tokens, &mut i, "--unsocket")?)),
            "--filesystem" => filesystems.push(take_value(tokens, &mut i, "--filesystem")?.to_string()),
            "--unfilesystem" => filesystems.push(format!("!{}", take_value(tokens, &mut i, "--unfilesystem")?)),
            "--talk" => {
                let name = take_value(tokens, &mut i, "--talk")?;
                overrides.set("Session Bus Policy", name, "talk");
            },
            _ if token.starts_with('-') => err!(InvalidArgument::InvalidOperand(token.to_string()))?,
            _ => app_ref = Some(token),
        }
    }

    let app_ref = app_ref.ok_or_else(|| error!(InvalidArgument::TargetUnspecified))?;

    if !shares.is_empty() {
        overrides.set("Context", "shared", shares.join(","));
    }
    if !sockets.is_empty() {
        overrides.set("Context", "sockets", sockets.join(","));
    }
    if !filesystems.is_empty() {
        overrides.set("Context", "filesystems", filesystems.join(","));
    }

    let extra_policy = Policy::load_metadata(&overrides.render())?;
    let resolved = deploy::resolve(app_ref, ARCH)?;
    let mut policy = resolved.policy;
    policy.merge(&extra_policy);

    compose_and_run(&resolved.deployment, &policy, None, flags, custom_command, &trailing)
}

/// Consumes the token following a flag as its value; the flag's own name is only used for the
/// "expects a value" error, not for re-parsing.
fn take_value<'a>(tokens: &[&'a str], i: &mut usize, name: &'static str) -> Result<&'a str> {
    match tokens.get(*i) {
        Some(value) => {
            *i += 1;
            Ok(value)
        },
        None => err!(InvalidArgument::UnsuppliedOperand(name, "expects a value")),
    }
}
