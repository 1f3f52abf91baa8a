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

//! Registers the about-to-be-spawned pid as a transient scope unit with the user's service
//! manager (§4.5), so that it and everything the helper subsequently spawns land in the correct
//! cgroup before any proxy or the helper itself starts.

use std::{os::unix::net::UnixStream, path::Path};

use zbus::{blocking::connection::Builder, zvariant::Value};

use crate::{constants::UID, err, exec::ExecutionError, Error, Result};

const SERVICE_MANAGER_PATH: &str = "/org/freedesktop/systemd1";
const SERVICE_MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

/// Connects to the user service manager over its private peer-to-peer socket, registers
/// `app_id`'s about-to-be-spawned pid as a transient scope, and blocks until the unit's start job
/// completes. Fails the composition outright if no user session is available.
pub fn register(app_id: &str, pid: u32) -> Result<()> {
    let socket_path = format!("/run/user/{}/systemd/private", *UID);

    if !Path::new(&socket_path).exists() {
        err!(ExecutionError::Unavailable("no user session available".into()))?
    }

    let stream = UnixStream::connect(&socket_path)
        .map_err(|e| crate::error!(ExecutionError::Resource(format!("unable to connect to '{socket_path}': {e}"))))?;
    let connection =
        Builder::unix_stream(stream).p2p().build().map_err(|e| crate::error!(ExecutionError::Resource(format!("unable to establish service manager connection: {e}"))))?;

    let unit_name = format!("xdg-app-{app_id}-{pid}.scope");
    let properties: Vec<(&str, Value<'static>)> = vec![("PIDs", Value::new(vec![pid]))];
    let aux: Vec<(&str, Vec<(&str, Value<'static>)>)> = Vec::new();

    let reply = connection
        .call_method(
            Option::<&str>::None,
            SERVICE_MANAGER_PATH,
            Some(SERVICE_MANAGER_INTERFACE),
            "StartTransientUnit",
            &(unit_name.as_str(), "fail", properties, aux),
        )
        .map_err(|e| crate::error!(ExecutionError::Resource(format!("StartTransientUnit call failed: {e}"))))?;

    let job: zbus::zvariant::OwnedObjectPath = reply
        .body()
        .deserialize()
        .map_err(|e| crate::error!(ExecutionError::Resource(format!("malformed StartTransientUnit reply: {e}"))))?;

    wait_for_job_removed(&connection, &job)
}

/// Iterates the connection's message stream until a `JobRemoved` signal naming `job` arrives.
fn wait_for_job_removed(connection: &zbus::blocking::Connection, job: &zbus::zvariant::OwnedObjectPath) -> Result<()> {
    let iter = zbus::blocking::MessageIterator::from(connection);

    for msg in iter {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => continue,
        };

        let header = msg.header();
        if header.member().map(|m| m.as_str()) != Some("JobRemoved") {
            continue;
        }

        let Ok((_id, path, _unit, _result)) = msg.body().deserialize::<(u32, zbus::zvariant::OwnedObjectPath, String, String)>() else {
            continue;
        };

        if &path == job {
            return Ok(());
        }
    }

    err!(ExecutionError::Resource("service manager connection closed before job completion".into()))?
}
