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

//! The container helper's argument vector (§6), built up in the exact order the composer wants
//! it to appear. Order matters here: the helper applies namespace, filesystem and device options
//! as it encounters them, so `ExecutionArgs` is a flat ordered list rather than the bucketed
//! by-concern collections a config-file representation might use.

/// One container helper option together with whatever operands it takes. Fd-carrying variants
/// hold the fd the composer already opened; `ExecutionArgs::fds` collects them so the caller can
/// build the matching `command_fds::FdMapping` list.
#[derive(Debug, Clone)]
pub enum Argument {
    UnsharePid,
    UnshareUser,
    UnshareIpc,
    UnshareNet,
    Dev(String),
    Proc(String),
    Directory(String),
    Bind(String, String),
    RoBind(String, String),
    DevBind(String, String),
    SymbolicLink(String, String),
    BindData(i32, String),
    FileData(i32, String),
    LockFile(String),
    EnvVar(String, String),
    Seccomp(i32),
    SyncFd(i32),
    Args(i32),
}

impl Argument {
    /// Appends this option's CLI tokens to `out`, in the exact form the helper expects.
    pub fn push_into(&self, out: &mut Vec<String>) {
        match self {
            Self::UnsharePid => out.push("--unshare-pid".into()),
            Self::UnshareUser => out.push("--unshare-user".into()),
            Self::UnshareIpc => out.push("--unshare-ipc".into()),
            Self::UnshareNet => out.push("--unshare-net".into()),
            Self::Dev(dst) => extend(out, &["--dev", dst]),
            Self::Proc(dst) => extend(out, &["--proc", dst]),
            Self::Directory(dst) => extend(out, &["--dir", dst]),
            Self::Bind(src, dst) => extend(out, &["--bind", src, dst]),
            Self::RoBind(src, dst) => extend(out, &["--ro-bind", src, dst]),
            Self::DevBind(src, dst) => extend(out, &["--dev-bind", src, dst]),
            Self::SymbolicLink(target, dst) => extend(out, &["--symlink", target, dst]),
            Self::BindData(fd, dst) => extend(out, &["--bind-data", &fd.to_string(), dst]),
            Self::FileData(fd, dst) => extend(out, &["--file", &fd.to_string(), dst]),
            Self::LockFile(path) => extend(out, &["--lock-file", path]),
            Self::EnvVar(name, value) => extend(out, &["--setenv", name, value]),
            Self::Seccomp(fd) => extend(out, &["--seccomp", &fd.to_string()]),
            Self::SyncFd(fd) => extend(out, &["--sync-fd", &fd.to_string()]),
            Self::Args(fd) => extend(out, &["--args", &fd.to_string()]),
        }
    }

    /// The fd this option carries, if any, so it can be inherited into the child process.
    pub fn fd(&self) -> Option<i32> {
        match self {
            Self::BindData(fd, _) | Self::FileData(fd, _) | Self::Seccomp(fd) | Self::SyncFd(fd) | Self::Args(fd) => {
                Some(*fd)
            },
            _ => None,
        }
    }
}

fn extend(out: &mut Vec<String>, tokens: &[&str]) {
    out.extend(tokens.iter().map(|tok| tok.to_string()));
}

/// Ordered accumulator for the arguments the composer hands to the container helper.
#[derive(Debug, Clone, Default)]
pub struct ExecutionArgs {
    args: Vec<Argument>,
}

impl ExecutionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: Argument) -> &mut Self {
        self.args.push(arg);
        self
    }

    pub fn push_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Argument::EnvVar(name.into(), value.into()))
    }

    pub fn has_env(&self, name: &str) -> bool {
        self.args.iter().any(|arg| matches!(arg, Argument::EnvVar(n, _) if n == name))
    }

    /// Flattens every argument, in insertion order, into the CLI token vector.
    pub fn argv(&self) -> Vec<String> {
        let mut out = Vec::new();
        for arg in &self.args {
            arg.push_into(&mut out);
        }
        out
    }

    /// Every fd referenced by an argument in this list, in insertion order.
    pub fn fds(&self) -> Vec<i32> {
        self.args.iter().filter_map(Argument::fd).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_preserves_insertion_order() {
        let mut args = ExecutionArgs::new();
        args.push(Argument::UnsharePid)
            .push(Argument::RoBind("/usr".into(), "/usr".into()))
            .push(Argument::EnvVar("PATH".into(), "/app/bin:/usr/bin".into()));

        assert_eq!(args.argv(), vec![
            "--unshare-pid",
            "--ro-bind",
            "/usr",
            "/usr",
            "--setenv",
            "PATH",
            "/app/bin:/usr/bin",
        ]);
    }

    #[test]
    fn collects_fds_in_order() {
        let mut args = ExecutionArgs::new();
        args.push(Argument::Seccomp(7)).push(Argument::Bind("/a".into(), "/b".into())).push(Argument::SyncFd(9));

        assert_eq!(args.fds(), vec![7, 9]);
    }

    #[test]
    fn has_env_finds_pushed_variable() {
        let mut args = ExecutionArgs::new();
        args.push_env("DISPLAY", ":0");
        assert!(args.has_env("DISPLAY"));
        assert!(!args.has_env("WAYLAND_DISPLAY"));
    }
}
