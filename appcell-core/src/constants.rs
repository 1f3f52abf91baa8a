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

use std::{env::var, time::Duration};

use lazy_static::lazy_static;
use nix::unistd::{getegid, geteuid};
use signal_hook::consts::*;

use crate::{
    error,
    utils::{ansi::*, unix_epoch_time},
    Error,
    ErrorKind,
};

pub static METHOD_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub const BWRAP_EXECUTABLE: &str = "bwrap";
pub const DBUS_PROXY_EXECUTABLE: &str = "xdg-dbus-proxy";
pub const DEFAULT_PATH: &str = "/app/bin:/usr/bin";
pub const SIGNAL_LIST: &[i32; 4] = &[SIGHUP, SIGINT, SIGQUIT, SIGTERM];

const APPCELL_DATA_DIR: &str = "/.local/share/appcell";

#[macro_export]
macro_rules! format_str {
    ( $( $x:expr ),+ ) => {
        format!($( $x, )+).leak()
    };
}

#[macro_export]
macro_rules! to_static_str {
    ( $x:expr ) => {
        $x.to_string().leak()
    };
}

lazy_static! {
    pub static ref VERBOSE: bool = var("APPCELL_VERBOSE").is_ok_and(|v| v == "1");
    pub static ref UID: u32 = geteuid().as_raw();
    pub static ref GID: u32 = getegid().as_raw();
    pub static ref HOME: &'static str = env("HOME");
    pub static ref TERM: &'static str = env_opt("TERM");
    pub static ref COLORTERM: &'static str = env_opt("COLORTERM");
    pub static ref LANG: &'static str = env_default("LANG", "en_US.utf8");
    pub static ref WAYLAND_DISPLAY: &'static str = env_opt("WAYLAND_DISPLAY");
    pub static ref X11_DISPLAY: &'static str = env_opt("DISPLAY");
    pub static ref XAUTHORITY: &'static str = env_opt("XAUTHORITY");
    pub static ref DATA_DIR: &'static str = env_default_dir("APPCELL_DATA_DIR", APPCELL_DATA_DIR);
    pub static ref XDG_RUNTIME_DIR: String = var("XDG_RUNTIME_DIR").unwrap_or_else(|_| format!("/run/user/{}", *UID));
    pub static ref DBUS_SESSION_BUS_ADDRESS: &'static str = env_opt("DBUS_SESSION_BUS_ADDRESS");
    pub static ref DBUS_SYSTEM_BUS_ADDRESS: &'static str = env_opt("DBUS_SYSTEM_BUS_ADDRESS");
    pub static ref DBUS_PROXY_PATH: &'static str = env_default("XDG_APP_DBUSPROXY", DBUS_PROXY_EXECUTABLE);
    pub static ref LOG_LOCATION: &'static str = format_str!("{}/appcell.log", *DATA_DIR);
    pub static ref UNIX_TIMESTAMP: u64 = unix_epoch_time().as_secs();
    pub static ref IS_COLOR_TERMINAL: bool = is_color_terminal();
    pub static ref IS_TRUECOLOR_TERMINLAL: bool = is_truecolor_terminal();
    pub static ref BOLD: &'static str = bold();
    pub static ref RESET: &'static str = reset();
    pub static ref DIM: &'static str = dim();
    pub static ref YELLOW: &'static str = yellow();
    pub static ref BOLD_WHITE: &'static str = bold_white();
    pub static ref BOLD_YELLOW: &'static str = bold_yellow();
    pub static ref BOLD_RED: &'static str = bold_red();
    pub static ref BOLD_GREEN: &'static str = bold_green();
    pub static ref UNDERLINE: &'static str = underline();

    /// Short VCS revision and build date, stamped in by the binary crate's build script.
    pub static ref APPCELL_BUILDHEAD: &'static str = option_env!("APPCELL_BUILDHEAD").unwrap_or("N/A");
    pub static ref APPCELL_BUILDSTAMP: &'static str = option_env!("APPCELL_BUILDSTAMP").unwrap_or("N/A");
}

fn env(env: &'static str) -> &'static str {
    var(env).map_or_else(|_| error!(ErrorKind::EnvVarUnset(env)).fatal(), |var| var.leak())
}

fn env_opt(env: &str) -> &'static str {
    var(env).map_or_else(|_| "", |var| var.leak())
}

fn env_default(env: &str, default: &'static str) -> &'static str {
    var(env).map_or_else(|_| default, |var| var.leak())
}

fn env_default_dir(env: &str, default: &str) -> &'static str {
    var(env).map_or_else(|_| format_str!("{}{}", *HOME, default), |var| var.leak())
}
