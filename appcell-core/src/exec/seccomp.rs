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

//! Berkeley Packet Filter program construction for the `--seccomp` helper option (§4.2).
//!
//! Syscall blocklist derived from flatpak-run.c in the flatpak project:
//! https://github.com/flatpak/flatpak/blob/main/common/flatpak-run.c
//!
//! Please do not open issue reports, especially regarding lessened security, regarding filters
//! that can be toggled. When the relevant options are activated, users are warned of the
//! potential ramifications of doing so.

use libseccomp::{
    ScmpAction as Action,
    ScmpArch,
    ScmpArgCompare as Compare,
    ScmpCompareOp as Op,
    ScmpFilterContext,
    ScmpSyscall as Syscall,
};
use nix::libc;

use crate::{err, exec::ExecutionError, Error, ErrorGeneric, Result};

static EPERM: Action = Action::Errno(libc::EPERM);

/*
 * Personality values obtained from personality.h in the Linux kernel:
 * https://git.kernel.org/pub/scm/linux/kernel/git/stable/linux.git/tree/include/uapi/linux/personality.h
 */
const PERSONALITY_ADDR_NO_RANDOMIZE: u64 = 0x0040000;

/// Syscalls denied unconditionally regardless of `devel`.
static RULES: &[(&str, Action)] = &[
    ("syslog", EPERM),
    ("uselib", EPERM),
    ("acct", EPERM),
    ("modify_ldt", EPERM),
    ("quotactl", EPERM),
    ("move_pages", EPERM),
    ("mbind", EPERM),
    ("get_mempolicy", EPERM),
    ("set_mempolicy", EPERM),
    ("migrate_pages", EPERM),
    ("unshare", EPERM),
    ("mount", EPERM),
    ("pivot_root", EPERM),
];

/// Syscalls denied only when debugging affordances are not requested (§4.2).
static DEVEL_RULES: &[(&str, Action)] = &[("perf_event_open", EPERM), ("ptrace", EPERM)];

/// Socket address families with no legitimate use inside the sandbox; each is denied with
/// `EAFNOSUPPORT` as flatpak does, rather than `EPERM`, so callers see "not supported" instead of
/// "permission denied".
static DENIED_FAMILIES: &[i32] = &[
    libc::AF_AX25,
    libc::AF_IPX,
    libc::AF_APPLETALK,
    libc::AF_NETROM,
    libc::AF_BRIDGE,
    libc::AF_ATMPVC,
    libc::AF_X25,
    libc::AF_ROSE,
    libc::AF_DECnet,
    libc::AF_NETBEUI,
    libc::AF_SECURITY,
    libc::AF_KEY,
];

/// Maps an architecture token (as accepted on the command line) to the `libseccomp` constant.
fn parse_arch(token: &str) -> Result<ScmpArch> {
    Ok(match token {
        "x86" => ScmpArch::X86,
        "x86_64" => ScmpArch::X8664,
        "x32" => ScmpArch::X32,
        "aarch64" => ScmpArch::Aarch64,
        "arm" => ScmpArch::Arm,
        _ => err!(ExecutionError::Configuration(format!("unsupported seccomp architecture '{token}'")))?,
    })
}

/// Builds the BPF program and writes it into a pipe, returning the read end ready to be handed to
/// the container helper's `--seccomp` option via an identity fd mapping. The caller must keep the
/// returned `PipeReader` alive until the helper is spawned — dropping it closes the fd.
///
/// `arch`, when given, is added alongside the native architecture and its usual companions (on
/// an x86_64 host: x86, x86_64 and x32). `devel` suppresses the `perf_event_open`/`ptrace` deny
/// rules so a debugger can attach inside the sandbox.
pub fn build_filter(arch: Option<&str>, devel: bool) -> Result<os_pipe::PipeReader> {
    let mut filter = ScmpFilterContext::new_filter(Action::Allow).generic()?;

    if cfg!(target_arch = "x86_64") {
        filter.add_arch(ScmpArch::X86).generic()?;
        filter.add_arch(ScmpArch::X8664).generic()?;
        filter.add_arch(ScmpArch::X32).generic()?;
    } else {
        filter.add_arch(ScmpArch::Native).generic()?;
    }

    if let Some(token) = arch {
        let parsed = parse_arch(token)?;
        filter.add_arch(parsed).generic()?;
    }

    for (name, action) in RULES {
        filter.add_rule(*action, Syscall::from_name(name).generic()?).generic()?;
    }

    if !devel {
        for (name, action) in DEVEL_RULES {
            filter.add_rule(*action, Syscall::from_name(name).generic()?).generic()?;
        }
    }

    filter
        .add_rule_conditional(
            EPERM,
            Syscall::from_name("clone").generic()?,
            &[Compare::new(0, Op::MaskedEqual(libc::CLONE_NEWUSER as u64), libc::CLONE_NEWUSER as u64)],
        )
        .generic()?;
    filter
        .add_rule_conditional(
            EPERM,
            Syscall::from_name("personality").generic()?,
            &[Compare::new(0, Op::NotEqual, PERSONALITY_ADDR_NO_RANDOMIZE)],
        )
        .generic()?;

    let socket = Syscall::from_name("socket").generic()?;
    for family in DENIED_FAMILIES {
        filter
            .add_rule_conditional(
                Action::Errno(libc::EAFNOSUPPORT),
                socket,
                &[Compare::new(0, Op::Equal, *family as u64)],
            )
            .generic()?;
    }
    filter
        .add_rule_conditional(
            Action::Errno(libc::EAFNOSUPPORT),
            socket,
            &[Compare::new(0, Op::GreaterEqual, libc::AF_NETLINK as u64 + 1)],
        )
        .generic()?;

    let (reader, mut writer) =
        os_pipe::pipe().prepend(|| "unable to create seccomp program pipe".into())?;
    filter.export_bpf(&mut writer).generic()?;
    drop(writer);

    Ok(reader)
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;

    use super::*;

    #[test]
    fn rejects_unknown_architecture_token() {
        assert!(parse_arch("mips").is_err());
    }

    #[test]
    fn accepts_known_architecture_tokens() {
        assert!(parse_arch("aarch64").is_ok());
        assert!(parse_arch("x32").is_ok());
    }

    #[test]
    fn builds_filter_and_returns_readable_fd() {
        let reader = build_filter(None, false).expect("filter should build");
        assert!(reader.as_raw_fd() >= 0);
    }

    #[test]
    fn devel_mode_still_builds_a_filter() {
        let reader = build_filter(Some("x86_64"), true).expect("filter should build with devel affordances");
        assert!(reader.as_raw_fd() >= 0);
    }
}
