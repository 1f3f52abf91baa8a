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

//! The merge-capable, serialisable permission policy (§3, §4.1): what one application invocation
//! may share with the host. Populated from one or more key-value documents via [`Policy::merge`]
//! and consumed exactly once by the sandbox composer.

use bitflags::bitflags;
use indexmap::{IndexMap, IndexSet};

pub use dbus::BusPolicyLevel;
pub use error::ConfigError;
pub use filesystem::{FilesystemMode, FilesystemToken, XdgUserDir};

use crate::{
    policy::{
        document::{negated, split_list, Document},
        filesystem::parse_token,
    },
    Result,
};

pub mod dbus;
pub mod document;
pub mod error;
pub mod filesystem;
mod mask;

use mask::TriMask;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Share: u8 {
        const NETWORK = 0b01;
        const IPC     = 0b10;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Socket: u8 {
        const X11         = 0b00001;
        const WAYLAND     = 0b00010;
        const PULSEAUDIO  = 0b00100;
        const SESSION_BUS = 0b01000;
        const SYSTEM_BUS  = 0b10000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Device: u8 {
        const DRI = 0b01;
    }
}

fn share_name(bit: Share) -> &'static str {
    match bit {
        bit if bit == Share::NETWORK => "network",
        bit if bit == Share::IPC => "ipc",
        _ => unreachable!("non-canonical share bit"),
    }
}

fn parse_share(name: &str) -> Result<Share> {
    Ok(match name {
        "network" => Share::NETWORK,
        "ipc" => Share::IPC,
        _ => crate::err!(ConfigError::UnknownShare(name.to_string()))?,
    })
}

fn socket_name(bit: Socket) -> &'static str {
    match bit {
        bit if bit == Socket::X11 => "x11",
        bit if bit == Socket::WAYLAND => "wayland",
        bit if bit == Socket::PULSEAUDIO => "pulseaudio",
        bit if bit == Socket::SESSION_BUS => "session-bus",
        bit if bit == Socket::SYSTEM_BUS => "system-bus",
        _ => unreachable!("non-canonical socket bit"),
    }
}

fn parse_socket(name: &str) -> Result<Socket> {
    Ok(match name {
        "x11" => Socket::X11,
        "wayland" => Socket::WAYLAND,
        "pulseaudio" => Socket::PULSEAUDIO,
        "session-bus" => Socket::SESSION_BUS,
        "system-bus" => Socket::SYSTEM_BUS,
        _ => crate::err!(ConfigError::UnknownSocket(name.to_string()))?,
    })
}

fn device_name(bit: Device) -> &'static str {
    match bit {
        bit if bit == Device::DRI => "dri",
        _ => unreachable!("non-canonical device bit"),
    }
}

fn parse_device(name: &str) -> Result<Device> {
    Ok(match name {
        "dri" => Device::DRI,
        _ => crate::err!(ConfigError::UnknownDevice(name.to_string()))?,
    })
}

const ALL_SHARES: &[Share] = &[Share::NETWORK, Share::IPC];
const ALL_SOCKETS: &[Socket] = &[Socket::X11, Socket::WAYLAND, Socket::PULSEAUDIO, Socket::SESSION_BUS, Socket::SYSTEM_BUS];
const ALL_DEVICES: &[Device] = &[Device::DRI];

/// The suppression sentinel naturally falls out of [`FilesystemMode::Suppressed`]; no separate
/// representation is needed in the map.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    shares: TriMask<Share>,
    sockets: TriMask<Socket>,
    devices: TriMask<Device>,
    env_vars: IndexMap<String, String>,
    persistent: IndexSet<String>,
    filesystems: IndexMap<String, FilesystemMode>,
    session_bus_policy: IndexMap<String, BusPolicyLevel>,
    system_bus_policy: IndexMap<String, BusPolicyLevel>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_share(&mut self, kind: Share, enabled: bool) {
        self.shares.set(kind, enabled);
    }

    pub fn set_socket(&mut self, kind: Socket, enabled: bool) {
        self.sockets.set(kind, enabled);
    }

    pub fn set_device(&mut self, kind: Device, enabled: bool) {
        self.devices.set(kind, enabled);
    }

    pub fn shares(&self) -> Share {
        self.shares.enabled()
    }

    pub fn shares_valid(&self) -> Share {
        self.shares.valid()
    }

    pub fn sockets(&self) -> Socket {
        self.sockets.enabled()
    }

    pub fn sockets_valid(&self) -> Socket {
        self.sockets.valid()
    }

    pub fn devices(&self) -> Device {
        self.devices.enabled()
    }

    pub fn devices_valid(&self) -> Device {
        self.devices.valid()
    }

    pub fn has_share(&self, kind: Share) -> bool {
        self.shares.is_enabled(kind)
    }

    pub fn has_socket(&self, kind: Socket) -> bool {
        self.sockets.is_enabled(kind)
    }

    pub fn has_device(&self, kind: Device) -> bool {
        self.devices.is_enabled(kind)
    }

    /// Empty value means "unset in sandbox".
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(name.into(), value.into());
    }

    pub fn unset_env(&mut self, name: impl Into<String>) {
        self.set_env(name, "");
    }

    pub fn env_vars(&self) -> &IndexMap<String, String> {
        &self.env_vars
    }

    pub fn set_persistent(&mut self, path: impl Into<String>) {
        self.persistent.insert(path.into());
    }

    pub fn persistent(&self) -> &IndexSet<String> {
        &self.persistent
    }

    /// Parses a trailing `:ro`/`:rw` suffix, defaulting to read-write, and records the mode
    /// under the stripped key. A prior suppression or positive entry under the same key is
    /// overwritten per §3.
    pub fn add_filesystem(&mut self, raw: &str) -> Result<()> {
        let (key, mode) = parse_token(raw)?;

        self.filesystems.insert(key, mode.unwrap_or(FilesystemMode::ReadWrite));
        Ok(())
    }

    /// Inserts a suppression sentinel under the stripped key; this overrides any prior entry,
    /// positive or otherwise.
    pub fn remove_filesystem(&mut self, raw: &str) -> Result<()> {
        let (key, _) = parse_token(raw)?;

        self.filesystems.insert(key, FilesystemMode::Suppressed);
        Ok(())
    }

    pub fn filesystems(&self) -> &IndexMap<String, FilesystemMode> {
        &self.filesystems
    }

    pub fn set_session_bus_policy(&mut self, name: impl Into<String>, level: BusPolicyLevel) -> Result<()> {
        let name = name.into();

        dbus::validate_name(&name)?;
        self.session_bus_policy.insert(name, level);
        Ok(())
    }

    pub fn set_system_bus_policy(&mut self, name: impl Into<String>, level: BusPolicyLevel) -> Result<()> {
        let name = name.into();

        dbus::validate_name(&name)?;
        self.system_bus_policy.insert(name, level);
        Ok(())
    }

    pub fn session_bus_policy(&self) -> &IndexMap<String, BusPolicyLevel> {
        &self.session_bus_policy
    }

    pub fn system_bus_policy(&self) -> &IndexMap<String, BusPolicyLevel> {
        &self.system_bus_policy
    }

    /// Merge semantics per §3: bitmask fields OR their `valid` bits and replace `enabled` bits
    /// covered by the source's `valid` mask; maps have source keys overwrite destination keys.
    /// Unspecified fields of `other` leave `self` untouched. Merges never fail.
    pub fn merge(&mut self, other: &Policy) {
        self.shares.merge(&other.shares);
        self.sockets.merge(&other.sockets);
        self.devices.merge(&other.devices);

        for (k, v) in &other.env_vars {
            self.env_vars.insert(k.clone(), v.clone());
        }

        for path in &other.persistent {
            self.persistent.insert(path.clone());
        }

        for (k, v) in &other.filesystems {
            self.filesystems.insert(k.clone(), *v);
        }

        for (k, v) in &other.session_bus_policy {
            self.session_bus_policy.insert(k.clone(), *v);
        }

        for (k, v) in &other.system_bus_policy {
            self.system_bus_policy.insert(k.clone(), *v);
        }
    }

    /// Parses a key-value document with groups `Context`, `Session Bus Policy`,
    /// `System Bus Policy`, `Environment` (§4.1, §6). Values in `Context` are comma-separated
    /// lists; a leading `!` negates (explicitly-off for shares/sockets/devices, suppression for
    /// filesystems, removal for persistent paths).
    pub fn load_metadata(document: &str) -> Result<Self> {
        let doc = Document::parse(document);
        let mut policy = Self::new();

        if let Some(shared) = doc.get("Context", "shared") {
            for entry in split_list(shared) {
                let (neg, name) = negated(entry);
                policy.set_share(parse_share(name)?, !neg);
            }
        }

        if let Some(sockets) = doc.get("Context", "sockets") {
            for entry in split_list(sockets) {
                let (neg, name) = negated(entry);
                policy.set_socket(parse_socket(name)?, !neg);
            }
        }

        if let Some(devices) = doc.get("Context", "devices") {
            for entry in split_list(devices) {
                let (neg, name) = negated(entry);
                policy.set_device(parse_device(name)?, !neg);
            }
        }

        if let Some(filesystems) = doc.get("Context", "filesystems") {
            for entry in split_list(filesystems) {
                let (neg, name) = negated(entry);

                if neg {
                    policy.remove_filesystem(name)?;
                } else {
                    policy.add_filesystem(name)?;
                }
            }
        }

        if let Some(persistent) = doc.get("Context", "persistent") {
            for entry in split_list(persistent) {
                let (neg, name) = negated(entry);

                if neg {
                    policy.persistent.shift_remove(name);
                } else {
                    policy.set_persistent(name);
                }
            }
        }

        if let Some(section) = doc.section("Session Bus Policy") {
            for (name, level) in section {
                policy.set_session_bus_policy(name.clone(), level.parse()?)?;
            }
        }

        if let Some(section) = doc.section("System Bus Policy") {
            for (name, level) in section {
                policy.set_system_bus_policy(name.clone(), level.parse()?)?;
            }
        }

        if let Some(section) = doc.section("Environment") {
            for (name, value) in section {
                policy.set_env(name.clone(), value.clone());
            }
        }

        Ok(policy)
    }

    /// Inverse of [`Policy::load_metadata`]; emits only fields present in the `valid` masks.
    pub fn save_metadata(&self) -> String {
        let mut doc = Document::new();

        let shared = bitmask_list(&self.shares, ALL_SHARES, share_name);
        if !shared.is_empty() {
            doc.set("Context", "shared", shared.join(","));
        }

        let sockets = bitmask_list(&self.sockets, ALL_SOCKETS, socket_name);
        if !sockets.is_empty() {
            doc.set("Context", "sockets", sockets.join(","));
        }

        let devices = bitmask_list(&self.devices, ALL_DEVICES, device_name);
        if !devices.is_empty() {
            doc.set("Context", "devices", devices.join(","));
        }

        if !self.filesystems.is_empty() {
            let list = self
                .filesystems
                .iter()
                .map(|(k, mode)| match mode {
                    FilesystemMode::Suppressed => format!("!{k}"),
                    FilesystemMode::ReadOnly => format!("{k}:ro"),
                    FilesystemMode::ReadWrite => k.clone(),
                })
                .collect::<Vec<_>>();

            doc.set("Context", "filesystems", list.join(","));
        }

        if !self.persistent.is_empty() {
            doc.set("Context", "persistent", self.persistent.iter().cloned().collect::<Vec<_>>().join(","));
        }

        for (name, level) in &self.session_bus_policy {
            doc.set("Session Bus Policy", name, level.to_string());
        }

        for (name, level) in &self.system_bus_policy {
            doc.set("System Bus Policy", name, level.to_string());
        }

        for (name, value) in &self.env_vars {
            doc.set("Environment", name, value.clone());
        }

        doc.render()
    }
}

fn bitmask_list<T>(mask: &TriMask<T>, all: &[T], name: impl Fn(T) -> &'static str) -> Vec<String>
where
    T: bitflags::Flags + Copy,
{
    all.iter()
        .filter(|bit| mask.is_valid(**bit))
        .map(|bit| match mask.is_enabled(*bit) {
            true => name(*bit).to_string(),
            false => format!("!{}", name(*bit)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_scenario_from_spec() {
        let mut p1 = Policy::new();
        p1.set_socket(Socket::X11, true);

        let mut p2 = Policy::new();
        p2.set_socket(Socket::X11, false);
        p2.set_socket(Socket::WAYLAND, true);

        p1.merge(&p2);

        assert_eq!(p1.sockets_valid(), Socket::X11 | Socket::WAYLAND);
        assert_eq!(p1.sockets(), Socket::WAYLAND);
    }

    #[test]
    fn round_trips_through_metadata() {
        let mut policy = Policy::new();
        policy.set_share(Share::NETWORK, true);
        policy.set_socket(Socket::WAYLAND, true);
        policy.set_device(Device::DRI, false);
        policy.add_filesystem("home").unwrap();
        policy.add_filesystem("xdg-documents:ro").unwrap();
        policy.set_persistent(".config/app");
        policy.set_session_bus_policy("org.freedesktop.portal.Documents", BusPolicyLevel::Talk).unwrap();
        policy.set_env("FOO", "bar");

        let saved = policy.save_metadata();
        let reloaded = Policy::load_metadata(&saved).unwrap();

        assert_eq!(reloaded.shares_valid(), policy.shares_valid());
        assert_eq!(reloaded.shares(), policy.shares());
        assert_eq!(reloaded.sockets_valid(), policy.sockets_valid());
        assert_eq!(reloaded.sockets(), policy.sockets());
        assert_eq!(reloaded.devices_valid(), policy.devices_valid());
        assert_eq!(reloaded.devices(), policy.devices());
        assert_eq!(reloaded.filesystems(), policy.filesystems());
        assert_eq!(reloaded.persistent(), policy.persistent());
        assert_eq!(reloaded.session_bus_policy(), policy.session_bus_policy());
        assert_eq!(reloaded.env_vars(), policy.env_vars());
    }

    #[test]
    fn rejects_unknown_share() {
        let mut policy = Policy::new();
        assert!(Policy::load_metadata("[Context]\nshared=telepathy\n").is_err());
        let _ = &mut policy;
    }

    #[test]
    fn filesystem_suppression_overrides_prior_mode() {
        let mut policy = Policy::new();
        policy.add_filesystem("home:rw").unwrap();
        policy.remove_filesystem("home").unwrap();

        assert_eq!(policy.filesystems().get("home"), Some(&FilesystemMode::Suppressed));
    }
}
