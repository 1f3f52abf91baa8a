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

//! Spawns and supervises one out-of-process bus filter per connected bus (§4.4). Each configured
//! proxy shares a single readiness pipe with the sandbox composer: the read end is bound as the
//! helper's `--sync-fd`, the write end is inherited by every proxy as `--fd=<fd>`, and each proxy
//! writes exactly one byte once its listening socket is bound.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Read,
    os::fd::AsRawFd,
    process::{Child, Command},
};

use command_fds::{CommandFdExt, FdMapping};
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    constants::{DBUS_PROXY_EXECUTABLE, DBUS_PROXY_PATH, XDG_RUNTIME_DIR},
    err,
    exec::ExecutionError,
    policy::dbus::BusPolicyLevel,
    Error,
    ErrorGeneric,
    Result,
};

/// Which bus a proxy instance is filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Session,
    System,
}

impl Display for Bus {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        write!(fmter, "{}", match self {
            Self::Session => "session",
            Self::System => "system",
        })
    }
}

/// One request to filter a bus: its real address, the per-name policy, an optional application
/// id to grant ownership to, and whether the proxy should log its traffic.
pub struct ProxyRequest<'a> {
    pub bus: Bus,
    pub bus_address: &'a str,
    pub app_id: Option<&'a str>,
    pub policy: &'a indexmap::IndexMap<String, BusPolicyLevel>,
    pub log: bool,
}

/// A spawned proxy process together with the in-sandbox socket path the composer binds in its
/// place.
pub struct ProxyHandle {
    pub bus: Bus,
    pub socket_path: String,
    child: Child,
}

/// Owns the readiness pipe shared by every proxy spawned in one composition. `sync_read_fd` is
/// handed to the helper via `--sync-fd` and must stay open until the helper is spawned, so this
/// supervisor is kept alive (not consumed) by `await_ready`.
pub struct ProxySupervisor {
    reader: os_pipe::PipeReader,
    writer: Option<os_pipe::PipeWriter>,
    spawned: usize,
}

impl ProxySupervisor {
    pub fn new() -> Result<Self> {
        let (reader, writer) = os_pipe::pipe().prepend(|| "unable to create proxy readiness pipe".into())?;
        Ok(Self {
            reader,
            writer: Some(writer),
            spawned: 0,
        })
    }

    /// The fd the composer hands to the container helper as `--sync-fd <fd>`.
    pub fn sync_read_fd(&self) -> i32 {
        self.reader.as_raw_fd()
    }

    /// Spawns one proxy for `request`, returning its handle. The socket path is randomised under
    /// the runtime directory so repeated compositions never collide.
    pub fn spawn(&mut self, request: ProxyRequest) -> Result<ProxyHandle> {
        let proxy_dir = format!("{}/bus-proxy", *XDG_RUNTIME_DIR);
        std::fs::create_dir_all(&proxy_dir).prepend_io(|| proxy_dir.clone())?;

        let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect();
        let socket_path = format!("{proxy_dir}/{}-bus-proxy-{suffix}", request.bus);

        let mut rules = Vec::new();
        if let Some(app_id) = request.app_id {
            rules.push(format!("--own={app_id}"));
            rules.push(format!("--own={app_id}.*"));
        }
        for (name, level) in request.policy {
            if *level >= BusPolicyLevel::See {
                rules.push(format!("--{level}={name}"));
            }
        }

        let write_fd = self.writer.as_ref().expect("readiness pipe writer taken before all proxies spawned").as_raw_fd();
        let mut cmd = Command::new(&*DBUS_PROXY_PATH);
        cmd.arg(request.bus_address).arg(&socket_path).arg("--filter").args(&rules).arg(format!("--fd={write_fd}"));

        if request.log {
            cmd.arg("--log");
        }

        cmd.fd_mappings(vec![FdMapping {
            parent_fd: write_fd,
            child_fd: write_fd,
        }])
        .unwrap();

        let child = cmd.spawn().map_err(|e| Error::new(Box::new(ExecutionError::ProcessInit(DBUS_PROXY_EXECUTABLE, e.kind()))))?;

        self.spawned += 1;
        Ok(ProxyHandle {
            bus: request.bus,
            socket_path,
            child,
        })
    }

    /// Blocks until every spawned proxy has written its one readiness byte. A proxy that exits
    /// (or a short read) is fatal; any handles still alive are killed so no partial sandbox is
    /// left running. Takes `&mut self` rather than consuming the supervisor: `sync_read_fd` must
    /// stay open until the helper is actually spawned with it.
    pub fn await_ready(&mut self, handles: &mut [ProxyHandle]) -> Result<()> {
        self.writer.take();

        let mut remaining = self.spawned;
        let mut byte = [0u8; 1];

        while remaining > 0 {
            match self.reader.read(&mut byte) {
                Ok(1) => remaining -= 1,
                _ => {
                    for handle in handles.iter_mut() {
                        handle.child.kill().ok();
                    }
                    err!(ExecutionError::ProxyReadiness(
                        handles.first().map(|h| h.bus.to_string()).unwrap_or_else(|| "unknown".into())
                    ))?
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_display_matches_policy_rule_prefix() {
        assert_eq!(Bus::Session.to_string(), "session");
        assert_eq!(Bus::System.to_string(), "system");
    }

    #[test]
    fn supervisor_exposes_distinct_sync_fd() {
        let sup = ProxySupervisor::new().unwrap();
        assert!(sup.sync_read_fd() >= 0);
    }
}
