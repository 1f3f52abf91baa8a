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

use appcell_core::{constants::{APPCELL_BUILDHEAD, APPCELL_BUILDSTAMP}, utils::Arguments, Result};

pub fn help(_args: &mut Arguments) -> Result<()> {
    print!(
        "appcell {}\n\n\
         Launches a desktop application inside an unprivileged bubblewrap sandbox.\n\n\
         USAGE:\n    \
         appcell [OPTIONS] <APP_ID>[/<ARCH>/<BRANCH>] [-- <COMMAND> [ARGS...]]\n\n\
         OPTIONS:\n    \
         -d, --devel                 Relax the seccomp filter and propagate toolchain variables.\n    \
         -b, --background            Spawn the helper detached instead of exec'ing into it.\n    \
         --command <CMD>             Run CMD instead of the application's declared entry point.\n    \
         --log-session-bus           Enable proxy logging on the session bus.\n    \
         --log-system-bus            Enable proxy logging on the system bus.\n    \
         --share <NAME>               Grant a share, e.g. network or ipc.\n    \
         --unshare <NAME>             Revoke a share.\n    \
         --socket <NAME>               Grant a socket, e.g. x11, wayland, pulseaudio.\n    \
         --unsocket <NAME>             Revoke a socket.\n    \
         --filesystem <TOKEN>         Grant a filesystem token, e.g. home, xdg-documents:ro.\n    \
         -h, --help                   Print this help text.\n    \
         -V, --version                Print version information.\n",
        *APPCELL_BUILDHEAD
    );
    Ok(())
}

pub fn print_version(_args: &mut Arguments) -> Result<()> {
    println!("appcell {} ({})", *APPCELL_BUILDHEAD, *APPCELL_BUILDSTAMP);
    Ok(())
}
