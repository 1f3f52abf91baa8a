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

//! The sandbox composer (§4.3): the orchestrator that turns a resolved application deployment
//! plus a merged policy into a running sandbox. Builds the argument vector section by section, in
//! the exact order the container helper needs to see it, then registers a transient scope, spawns
//! any D-Bus proxies, waits for their readiness, and finally hands control to the helper.

use std::{
    fs::{self, File},
    io::{Read as _, Write as _},
    os::{fd::AsRawFd, unix::process::CommandExt},
    path::Path,
    process::Command,
};

use command_fds::{CommandFdExt, FdMapping};
use indexmap::IndexMap;

use crate::{
    constants::{DBUS_SESSION_BUS_ADDRESS, DBUS_SYSTEM_BUS_ADDRESS, GID, HOME, UID, WAYLAND_DISPLAY, X11_DISPLAY, XAUTHORITY, XDG_RUNTIME_DIR},
    err,
    exec::{
        args::{Argument, ExecutionArgs},
        proxy::{Bus, ProxyRequest, ProxySupervisor},
        scope,
        seccomp,
        ExecutionError,
    },
    policy::{BusPolicyLevel, FilesystemMode, FilesystemToken, Policy},
    runtime::{AppDeployment, Ref},
    utils::check_socket,
    Error,
    ErrorGeneric,
    Result,
};

/// The four toggles named in the composer's public contract (§4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub devel: bool,
    pub background: bool,
    pub log_session_bus: bool,
    pub log_system_bus: bool,
}

/// Collects everything the composer accumulates while building one sandbox: the ordered argument
/// list, the fd mappings needed to carry synthesized content and the seccomp program into the
/// helper, and the pipe/file handles those fds are borrowed from (kept alive until `spawn`).
struct Sandbox {
    args: ExecutionArgs,
    mappings: Vec<FdMapping>,
    xdg_dirs_bound: bool,
    keep_alive: Vec<os_pipe::PipeReader>,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            args: ExecutionArgs::new(),
            mappings: Vec::new(),
            xdg_dirs_bound: false,
            keep_alive: Vec::new(),
        }
    }

    fn push(&mut self, arg: Argument) -> &mut Self {
        if let Some(fd) = arg.fd() {
            self.mappings.push(FdMapping {
                parent_fd: fd,
                child_fd: fd,
            });
        }
        self.args.push(arg);
        self
    }

    /// Writes `content` into a pipe and returns the fd the read end is known by; the read end is
    /// retained in `keep_alive` so it survives until the helper is spawned.
    fn deliver(&mut self, content: &[u8]) -> Result<i32> {
        let (reader, mut writer) = os_pipe::pipe().prepend(|| "unable to create delivery pipe".into())?;
        writer.write_all(content).prepend(|| "unable to write synthesized content".into())?;
        drop(writer);

        let fd = reader.as_raw_fd();
        self.keep_alive.push(reader);
        Ok(fd)
    }
}

/// Translates a merged policy and a resolved application deployment into a running sandbox
/// (§4.3). `custom_runtime_ref` overrides the runtime named in `deployment` when present;
/// `custom_command`/`argv` override the application's declared entry point.
pub fn compose_and_run(
    deployment: &AppDeployment,
    policy: &Policy,
    custom_runtime_ref: Option<&Ref>,
    flags: Flags,
    custom_command: Option<&str>,
    argv: &[String],
) -> Result<()> {
    let mut sandbox = Sandbox::new();
    let runtime_ref = custom_runtime_ref.unwrap_or(&deployment.runtime_ref);

    base_skeleton(&mut sandbox, deployment)?;
    network_and_ipc(&mut sandbox, policy);
    devices(&mut sandbox, policy);
    let xdg_bound = filesystems(&mut sandbox, deployment, policy)?;
    xdg_user_dirs(&mut sandbox, deployment, policy, xdg_bound)?;
    persistent_paths(&mut sandbox, deployment, policy)?;
    graphical_sockets(&mut sandbox, policy)?;

    // The scope must exist before any child (proxy or helper) is spawned, so that every one of
    // them lands in the app's cgroup by inheritance rather than the session's.
    scope::register(&deployment.app_id, std::process::id())?;

    let mut proxies = ProxySupervisor::new()?;
    let mut handles = Vec::new();
    let any_proxy = dbus(&mut sandbox, deployment, policy, &flags, &mut proxies, &mut handles)?;

    monitor_path(&mut sandbox);
    document_portal(&mut sandbox, deployment);
    font_paths(&mut sandbox);
    app_info(&mut sandbox, deployment, runtime_ref, policy)?;
    extensions(&mut sandbox, deployment);
    environment(&mut sandbox, deployment, policy, &flags);

    let command = argv_for(custom_command, argv);
    long_argv_handoff(&mut sandbox, &command)?;

    execute(sandbox, any_proxy, proxies, &mut handles, &flags, &command)
}

fn argv_for(custom_command: Option<&str>, argv: &[String]) -> Vec<String> {
    match custom_command {
        Some(cmd) => {
            let mut v = vec![cmd.to_string()];
            v.extend(argv.iter().cloned());
            v
        },
        None => argv.to_vec(),
    }
}

fn base_skeleton(sandbox: &mut Sandbox, deployment: &AppDeployment) -> Result<()> {
    sandbox
        .push(Argument::UnsharePid)
        .push(Argument::UnshareUser)
        .push(Argument::Dev("/dev".into()))
        .push(Argument::Proc("/proc".into()))
        .push(Argument::Directory("/tmp".into()))
        .push(Argument::Directory("/run/host".into()))
        .push(Argument::Directory(format!("/run/user/{}", *UID)))
        .push(Argument::EnvVar("XDG_RUNTIME_DIR".into(), format!("/run/user/{}", *UID)))
        .push(Argument::SymbolicLink("/tmp".into(), "/var/tmp".into()))
        .push(Argument::SymbolicLink("/run".into(), "/var/run".into()));

    for dir in ["block", "bus", "class", "dev", "devices"] {
        let path = format!("/sys/{dir}");
        if Path::new(&path).exists() {
            sandbox.push(Argument::RoBind(path.clone(), path));
        }
    }

    let passwd = synthesize_passwd();
    let passwd_fd = sandbox.deliver(passwd.as_bytes())?;
    sandbox.push(Argument::BindData(passwd_fd, "/etc/passwd".into()));

    let group = synthesize_group();
    let group_fd = sandbox.deliver(group.as_bytes())?;
    sandbox.push(Argument::BindData(group_fd, "/etc/group".into()));

    let machine_id = if Path::new("/etc/machine-id").exists() {
        "/etc/machine-id"
    } else {
        "/var/lib/dbus/machine-id"
    };
    sandbox.push(Argument::RoBind(machine_id.into(), "/etc/machine-id".into()));
    sandbox.push(Argument::SymbolicLink("/run/host/monitor/resolv.conf".into(), "/etc/resolv.conf".into()));
    sandbox.push(Argument::Directory((*HOME).into()));

    for dir in ["lib", "lib32", "lib64", "bin", "sbin"] {
        if deployment.runtime_files().join(dir).exists() {
            sandbox.push(Argument::SymbolicLink(format!("usr/{dir}"), format!("/{dir}")));
        }
    }

    sandbox
        .push(Argument::RoBind(deployment.runtime_files().display().to_string(), "/usr".into()))
        .push(Argument::LockFile("/usr/.ref".into()))
        .push(Argument::RoBind(deployment.app_files().display().to_string(), "/app".into()))
        .push(Argument::LockFile("/app/.ref".into()));

    let data_dir = deployment.app_data_dir.display().to_string();
    sandbox
        .push(Argument::Bind(deployment.cache_dir().display().to_string(), "/var/cache".into()))
        .push(Argument::Bind(deployment.data_dir().display().to_string(), "/var/data".into()))
        .push(Argument::Bind(deployment.config_dir().display().to_string(), "/var/config".into()))
        .push(Argument::Bind(data_dir.clone(), data_dir));

    Ok(())
}

fn synthesize_passwd() -> String {
    let name = std::env::var("USER").unwrap_or_else(|_| "user".into());
    let gecos = std::env::var("REAL_NAME").unwrap_or_else(|_| name.clone());
    format!("{name}:x:{}:{}:{gecos}:{}:/bin/sh\nnfsnobody:x:65534:65534:Unmapped user:/:/sbin/nologin\n", *UID, *GID, *HOME)
}

fn synthesize_group() -> String {
    let name = std::env::var("USER").unwrap_or_else(|_| "user".into());
    format!("{name}:x:{}:\nnfsnobody:x:65534:\n", *GID)
}

fn network_and_ipc(sandbox: &mut Sandbox, policy: &Policy) {
    use crate::policy::Share;

    if !policy.has_share(Share::IPC) {
        sandbox.push(Argument::UnshareIpc);
    }
    if !policy.has_share(Share::NETWORK) {
        sandbox.push(Argument::UnshareNet);
    }
}

fn devices(sandbox: &mut Sandbox, policy: &Policy) {
    use crate::policy::Device;

    if policy.has_device(Device::DRI) && Path::new("/dev/dri").exists() {
        sandbox.push(Argument::DevBind("/dev/dri".into(), "/dev/dri".into()));

        if Path::new("/dev/nvidiactl").exists() {
            sandbox.push(Argument::DevBind("/dev/nvidiactl".into(), "/dev/nvidiactl".into()));
            if Path::new("/dev/nvidia0").exists() {
                sandbox.push(Argument::DevBind("/dev/nvidia0".into(), "/dev/nvidia0".into()));
            }
        }
    }
}

/// Binds every filesystem-map entry per §4.3 and returns whether any xdg-user-dir token was
/// bound, so the caller knows whether to synthesize `user-dirs.dirs`.
fn filesystems(sandbox: &mut Sandbox, deployment: &AppDeployment, policy: &Policy) -> Result<bool> {
    use crate::policy::filesystem::{classify, ROOT_EXCLUSION_LIST};

    let host_mode = policy.filesystems().get("host").copied();
    let home_mode = policy.filesystems().get("home").copied();
    let mut xdg_bound = false;

    if let Some(mode) = host_mode.filter(|m| *m != FilesystemMode::Suppressed) {
        if let Ok(entries) = fs::read_dir("/") {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if ROOT_EXCLUSION_LIST.contains(&name.as_str()) {
                    continue;
                }
                bind_mode(sandbox, &format!("/{name}"), &format!("/{name}"), mode);
            }
        }
        if Path::new("/run/media").exists() {
            bind_mode(sandbox, "/run/media", "/run/media", mode);
        }
    }

    if let Some(mode) = home_mode.filter(|m| *m != FilesystemMode::Suppressed) {
        bind_mode(sandbox, &HOME, &HOME, mode);
    }

    for (key, mode) in policy.filesystems() {
        if key == "host" || key == "home" || *mode == FilesystemMode::Suppressed {
            continue;
        }

        let Some(token) = classify(key) else { continue };
        let target = match token {
            FilesystemToken::Host | FilesystemToken::Home => continue,
            FilesystemToken::XdgUserDir(dir) => {
                let resolved = format!("{}/{}", *HOME, dir.default_relative());
                if resolved == *HOME {
                    continue;
                }
                xdg_bound = true;
                resolved
            },
            FilesystemToken::XdgRun(suffix) => format!("{}/{}", *XDG_RUNTIME_DIR, suffix),
            FilesystemToken::HomeRelative(sub) => format!("{}/{}", *HOME, sub),
            FilesystemToken::Absolute(path) => path,
        };

        if Path::new(&target).exists() {
            bind_mode(sandbox, &target, &target, *mode);
        }
    }

    sandbox.xdg_dirs_bound = xdg_bound;
    Ok(xdg_bound)
}

fn bind_mode(sandbox: &mut Sandbox, src: &str, dst: &str, mode: FilesystemMode) {
    match mode {
        FilesystemMode::ReadOnly => sandbox.push(Argument::RoBind(src.into(), dst.into())),
        _ => sandbox.push(Argument::Bind(src.into(), dst.into())),
    };
}

fn xdg_user_dirs(sandbox: &mut Sandbox, deployment: &AppDeployment, policy: &Policy, xdg_bound: bool) -> Result<()> {
    let dest = format!("{}/config/user-dirs.dirs", deployment.app_data_dir.display());

    if policy.filesystems().get("home").is_some_and(|m| *m != FilesystemMode::Suppressed) {
        let real = format!("{}/.config/user-dirs.dirs", *HOME);
        if Path::new(&real).exists() {
            sandbox.push(Argument::RoBind(real, dest));
        }
        return Ok(());
    }

    if !xdg_bound {
        return Ok(());
    }

    use crate::policy::XdgUserDir;

    let mut content = String::new();
    for dir in [
        XdgUserDir::Desktop,
        XdgUserDir::Documents,
        XdgUserDir::Download,
        XdgUserDir::Music,
        XdgUserDir::Pictures,
        XdgUserDir::PublicShare,
        XdgUserDir::Templates,
        XdgUserDir::Videos,
    ] {
        content.push_str(&format!("{}=\"$HOME/{}\"\n", dir.variable(), dir.default_relative()));
    }

    let fd = sandbox.deliver(content.as_bytes())?;
    sandbox.push(Argument::FileData(fd, dest));
    Ok(())
}

fn persistent_paths(sandbox: &mut Sandbox, deployment: &AppDeployment, policy: &Policy) -> Result<()> {
    let host_granted = policy.filesystems().get("host").is_some_and(|m| *m != FilesystemMode::Suppressed);
    let home_granted = policy.filesystems().get("home").is_some_and(|m| *m != FilesystemMode::Suppressed);

    if host_granted || home_granted {
        return Ok(());
    }

    for path in policy.persistent() {
        let host_path = format!("{}/.var/app/{}/{}", *HOME, deployment.app_id, path);
        fs::create_dir_all(&host_path).prepend_io(|| host_path.clone())?;
        sandbox.push(Argument::Bind(host_path, format!("{}/{}", *HOME, path)));
    }

    Ok(())
}

fn graphical_sockets(sandbox: &mut Sandbox, policy: &Policy) -> Result<()> {
    use crate::policy::Socket;

    if policy.has_socket(Socket::X11) {
        if let Some(display_number) = X11_DISPLAY.strip_prefix(':').filter(|d| d.chars().all(|c| c.is_ascii_digit())) {
            let src = format!("/tmp/.X11-unix/X{display_number}");
            if Path::new(&src).exists() {
                sandbox.push(Argument::Bind(src, "/tmp/.X11-unix/X99".into()));
                sandbox.push(Argument::EnvVar("DISPLAY".into(), ":99.0".into()));

                if !XAUTHORITY.is_empty() {
                    if let Some(filtered) = filter_xauthority(&XAUTHORITY, display_number) {
                        let fd = sandbox.deliver(&filtered)?;
                        let dest = format!("/run/user/{}/Xauthority", *UID);
                        sandbox.push(Argument::BindData(fd, dest.clone()));
                        sandbox.push(Argument::EnvVar("XAUTHORITY".into(), dest));
                    }
                }
            }
        }
    }

    if policy.has_socket(Socket::WAYLAND) {
        let src = format!("{}/wayland-0", *XDG_RUNTIME_DIR);
        if !WAYLAND_DISPLAY.is_empty() && Path::new(&src).exists() {
            sandbox.push(Argument::Bind(src, format!("/run/user/{}/wayland-0", *UID)));
        }
    }

    if policy.has_socket(Socket::PULSEAUDIO) {
        let src = format!("{}/pulse/native", *XDG_RUNTIME_DIR);
        if check_socket(&src) {
            let dest = format!("/run/user/{}/pulse/native", *UID);
            sandbox.push(Argument::Bind(src, dest));

            let config_fd = sandbox.deliver(b"enable-shm=no\n")?;
            let config_dest = format!("/run/user/{}/pulse/config", *UID);
            sandbox.push(Argument::BindData(config_fd, config_dest.clone()));
            sandbox.push(Argument::EnvVar("PULSE_SERVER".into(), format!("unix:/run/user/{}/pulse/native", *UID)));
            sandbox.push(Argument::EnvVar("PULSE_CLIENTCONFIG".into(), config_dest));
        }
    }

    Ok(())
}

/// Parses the on-disk Xauthority binary format and rewrites the matching `FamilyLocal` entries
/// to display number 99. Returns `None` if the file cannot be read or has no matching entry.
fn filter_xauthority(path: &str, display_number: &str) -> Option<Vec<u8>> {
    const FAMILY_LOCAL: u16 = 256;

    let mut file = File::open(path).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;

    let node = nix::sys::utsname::uname().ok()?;
    let hostname = node.nodename().to_string_lossy().to_string();

    let mut out = Vec::new();
    let mut cursor = 0usize;

    while cursor + 2 <= data.len() {
        let family = u16::from_be_bytes([data[cursor], data[cursor + 1]]);
        cursor += 2;

        let mut fields = Vec::with_capacity(4);
        for _ in 0..4 {
            if cursor + 2 > data.len() {
                return if out.is_empty() { None } else { Some(out) };
            }
            let len = u16::from_be_bytes([data[cursor], data[cursor + 1]]) as usize;
            cursor += 2;
            if cursor + len > data.len() {
                return if out.is_empty() { None } else { Some(out) };
            }
            fields.push(data[cursor..cursor + len].to_vec());
            cursor += len;
        }

        let address = String::from_utf8_lossy(&fields[0]).to_string();
        if family == FAMILY_LOCAL && address == hostname {
            let rewritten_number = b"99".to_vec();
            out.extend_from_slice(&family.to_be_bytes());
            write_field(&mut out, &fields[0]);
            write_field(&mut out, &rewritten_number);
            write_field(&mut out, &fields[2]);
            write_field(&mut out, &fields[3]);
        }

        let _ = display_number;
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn write_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u16).to_be_bytes());
    out.extend_from_slice(field);
}

/// Binds D-Bus for both buses: directly if unrestricted, otherwise through a supervised proxy.
/// Returns whether any proxy was spawned at all.
fn dbus(
    sandbox: &mut Sandbox,
    deployment: &AppDeployment,
    policy: &Policy,
    flags: &Flags,
    proxies: &mut ProxySupervisor,
    handles: &mut Vec<crate::exec::proxy::ProxyHandle>,
) -> Result<bool> {
    use crate::policy::Socket;

    let mut any = false;

    if policy.has_socket(Socket::SESSION_BUS) || !policy.session_bus_policy().is_empty() {
        any |= bind_bus(
            sandbox,
            Bus::Session,
            &DBUS_SESSION_BUS_ADDRESS,
            policy.session_bus_policy(),
            Some(deployment.app_id.as_str()),
            flags.log_session_bus,
            policy.has_socket(Socket::SESSION_BUS) && policy.session_bus_policy().is_empty(),
            proxies,
            handles,
        )?;
    }

    if policy.has_socket(Socket::SYSTEM_BUS) || !policy.system_bus_policy().is_empty() {
        any |= bind_bus(
            sandbox,
            Bus::System,
            &DBUS_SYSTEM_BUS_ADDRESS,
            policy.system_bus_policy(),
            None,
            flags.log_system_bus,
            policy.has_socket(Socket::SYSTEM_BUS) && policy.system_bus_policy().is_empty(),
            proxies,
            handles,
        )?;
    }

    Ok(any)
}

#[allow(clippy::too_many_arguments)]
fn bind_bus(
    sandbox: &mut Sandbox,
    bus: Bus,
    address: &str,
    rules: &IndexMap<String, BusPolicyLevel>,
    app_id: Option<&str>,
    log: bool,
    unrestricted: bool,
    proxies: &mut ProxySupervisor,
    handles: &mut Vec<crate::exec::proxy::ProxyHandle>,
) -> Result<bool> {
    let dest = bus_dest_path(bus);

    if unrestricted && matches!(bus, Bus::System) {
        let real = address.strip_prefix("unix:path=").unwrap_or(address);
        sandbox.push(Argument::Bind(real.into(), dest.clone()));
        sandbox.push(Argument::EnvVar(format!("DBUS_{}_BUS_ADDRESS", bus_env_infix(bus)), format!("unix:path={dest}")));
        return Ok(false);
    }

    let handle = proxies.spawn(ProxyRequest {
        bus,
        bus_address: address,
        app_id,
        policy: rules,
        log,
    })?;

    sandbox.push(Argument::Bind(handle.socket_path.clone(), dest.clone()));
    sandbox.push(Argument::EnvVar(format!("DBUS_{}_BUS_ADDRESS", bus_env_infix(bus)), format!("unix:path={dest}")));
    handles.push(handle);
    Ok(true)
}

/// The fixed in-sandbox path each bus is bound at, whether reached directly or through a proxy.
fn bus_dest_path(bus: Bus) -> String {
    match bus {
        Bus::Session => format!("/run/user/{}/bus", *UID),
        Bus::System => "/run/dbus/system_bus_socket".into(),
    }
}

fn bus_env_infix(bus: Bus) -> &'static str {
    match bus {
        Bus::Session => "SESSION",
        Bus::System => "SYSTEM",
    }
}

fn monitor_path(sandbox: &mut Sandbox) {
    match request_monitor_path() {
        Some(path) => {
            sandbox.push(Argument::Bind(path, "/run/host/monitor".into()));
            sandbox.push(Argument::SymbolicLink("/run/host/monitor/localtime".into(), "/etc/localtime".into()));
        },
        None => {
            sandbox.push(Argument::Bind("/etc/resolv.conf".into(), "/run/host/monitor/resolv.conf".into()));

            match fs::read_link("/etc/localtime") {
                Ok(target) => sandbox.push(Argument::SymbolicLink(target.display().to_string(), "/run/host/monitor/localtime".into())),
                Err(_) => sandbox.push(Argument::Bind("/etc/localtime".into(), "/run/host/monitor/localtime".into())),
            };
        },
    }
}

/// Best-effort `RequestMonitor` call against the session helper; failure only disables the
/// feature and is logged at warning level rather than aborting composition.
fn request_monitor_path() -> Option<String> {
    let connection = zbus::blocking::Connection::session().ok()?;
    let reply = connection
        .call_method(
            Some("org.freedesktop.portal.Desktop"),
            "/org/freedesktop/portal/desktop",
            Some("org.freedesktop.home.Monitor"),
            "RequestMonitor",
            &(),
        )
        .ok()?;

    let path: String = reply.body().deserialize().ok()?;
    Some(path)
}

/// Best-effort `GetMountPoint` call against the document portal; failure only disables the
/// feature.
fn document_portal(sandbox: &mut Sandbox, deployment: &AppDeployment) {
    let Some(mount) = document_portal_mount_point() else {
        crate::log::Logger::new("appcell").init().ok().map(|mut l| l.log(crate::log::Level::Warn, "document portal unavailable; skipping doc mount"));
        return;
    };

    let src = format!("{mount}/by-app/{}", deployment.app_id);
    sandbox.push(Argument::Bind(src, format!("/run/user/{}/doc", *UID)));
}

fn document_portal_mount_point() -> Option<String> {
    let connection = zbus::blocking::Connection::session().ok()?;
    let reply = connection
        .call_method(
            Some("org.freedesktop.portal.Documents"),
            "/org/freedesktop/portal/documents",
            Some("org.freedesktop.portal.Documents"),
            "GetMountPoint",
            &(),
        )
        .ok()?;

    let path: Vec<u8> = reply.body().deserialize().ok()?;
    Some(String::from_utf8_lossy(&path).trim_end_matches('\0').to_string())
}

fn font_paths(sandbox: &mut Sandbox) {
    if Path::new("/usr/share/fonts").exists() {
        sandbox.push(Argument::RoBind("/usr/share/fonts".into(), "/run/host/fonts".into()));
    }

    for candidate in [format!("{}/.local/share/fonts", *HOME), format!("{}/.fonts", *HOME)] {
        if Path::new(&candidate).exists() {
            sandbox.push(Argument::RoBind(candidate, "/run/host/user-fonts".into()));
            break;
        }
    }
}

fn app_info(sandbox: &mut Sandbox, deployment: &AppDeployment, runtime_ref: &Ref, policy: &Policy) -> Result<()> {
    let mut content = policy.save_metadata();
    content.push_str(&format!(
        "\n[Application]\nname={}\nruntime={}\napp-path={}\n",
        deployment.app_id,
        runtime_ref,
        deployment.app_files().display()
    ));

    let fd = sandbox.deliver(content.as_bytes())?;
    sandbox.push(Argument::FileData(fd, format!("/run/user/{}/xdg-app-info", *UID)));
    Ok(())
}

fn extensions(sandbox: &mut Sandbox, deployment: &AppDeployment) {
    for extension in &deployment.extensions {
        let mount_point = extension.mount_point();
        sandbox.push(Argument::Bind(extension.deploy_files.display().to_string(), mount_point.clone()));
        sandbox.push(Argument::LockFile(format!("{mount_point}/.ref")));
    }
}

const DEVEL_VARS: &[&str] = &["ACLOCAL_PATH", "C_INCLUDE_PATH", "CPLUS_INCLUDE_PATH", "LDFLAGS", "PKG_CONFIG_PATH"];

/// Desktop-identity variables propagated from the host when not `devel` (§6, §9c); this is a
/// closed list and extending it is an explicit policy decision, not an open-ended passthrough.
const IDENTITY_VARS: &[&str] = &[
    "PWD",
    "TERM",
    "USER",
    "USERNAME",
    "LOGNAME",
    "HOSTNAME",
    "GDMSESSION",
    "XDG_CURRENT_DESKTOP",
    "XDG_SESSION_DESKTOP",
    "DESKTOP_SESSION",
    "EMAIL_ADDRESS",
    "REAL_NAME",
];

fn environment(sandbox: &mut Sandbox, deployment: &AppDeployment, policy: &Policy, flags: &Flags) {
    sandbox.push(Argument::EnvVar("PATH".into(), "/app/bin:/usr/bin".into()));
    sandbox.push(Argument::EnvVar("LD_LIBRARY_PATH".into(), "/app/lib".into()));
    sandbox.push(Argument::EnvVar("XDG_CONFIG_DIRS".into(), "/app/etc/xdg:/etc/xdg".into()));
    sandbox.push(Argument::EnvVar("XDG_DATA_DIRS".into(), "/app/share:/usr/share".into()));
    sandbox.push(Argument::EnvVar("SHELL".into(), "/bin/sh".into()));

    if flags.devel {
        for var in DEVEL_VARS {
            if let Ok(value) = std::env::var(var) {
                sandbox.push(Argument::EnvVar((*var).into(), value));
            }
        }
        sandbox.push(Argument::EnvVar("LC_ALL".into(), "en_US.utf8".into()));
    } else {
        for var in IDENTITY_VARS {
            if let Ok(value) = std::env::var(var) {
                sandbox.push(Argument::EnvVar((*var).into(), value));
            }
        }
        for (name, value) in std::env::vars() {
            if name == "LANG" || name.starts_with("LC_") {
                sandbox.push(Argument::EnvVar(name, value));
            }
        }
    }

    for (name, value) in policy.env_vars() {
        sandbox.push(Argument::EnvVar(name.clone(), value.clone()));
    }

    sandbox.push(Argument::EnvVar("XDG_DATA_HOME".into(), "/var/data".into()));
    sandbox.push(Argument::EnvVar("XDG_CONFIG_HOME".into(), "/var/config".into()));
    sandbox.push(Argument::EnvVar("XDG_CACHE_HOME".into(), "/var/cache".into()));

    let _ = deployment;
}

/// Switches to `--args <fd>` once the command-line form would grow unwieldy; 32 arguments is a
/// conservative, easily-reasoned-about threshold rather than an exact kernel limit.
const LONG_ARGV_THRESHOLD: usize = 32;

fn long_argv_handoff(sandbox: &mut Sandbox, command: &[String]) -> Result<()> {
    if sandbox.args.len() + command.len() <= LONG_ARGV_THRESHOLD {
        return Ok(());
    }

    let mut joined = Vec::new();
    for arg in command {
        joined.extend_from_slice(arg.as_bytes());
        joined.push(0);
    }

    let fd = sandbox.deliver(&joined)?;
    sandbox.push(Argument::Args(fd));
    Ok(())
}

fn execute(
    sandbox: Sandbox,
    any_proxy: bool,
    mut proxies: ProxySupervisor,
    handles: &mut Vec<crate::exec::proxy::ProxyHandle>,
    flags: &Flags,
    command: &[String],
) -> Result<()> {
    proxies.await_ready(handles)?;
    // `proxies` (and its readiness-pipe read end) and `seccomp_reader` must both stay alive until
    // the helper is actually spawned below: the fds handed to it are only valid as long as these
    // owners are.
    let sync_fd = proxies.sync_read_fd();

    let mut argv = sandbox.args.argv();
    let seccomp_reader = seccomp::build_filter(None, flags.devel)?;
    let seccomp_fd = seccomp_reader.as_raw_fd();
    let mut mappings = sandbox.mappings;
    mappings.push(FdMapping {
        parent_fd: seccomp_fd,
        child_fd: seccomp_fd,
    });
    argv.push("--seccomp".into());
    argv.push(seccomp_fd.to_string());

    if any_proxy {
        argv.push("--sync-fd".into());
        argv.push(sync_fd.to_string());
        mappings.push(FdMapping {
            parent_fd: sync_fd,
            child_fd: sync_fd,
        });
    }

    let mut helper = Command::new(crate::constants::BWRAP_EXECUTABLE);
    helper.env_clear().args(&argv).args(command).fd_mappings(mappings).unwrap();

    if flags.background {
        helper.spawn().map_err(|e| crate::error!(ExecutionError::ProcessInit(crate::constants::BWRAP_EXECUTABLE, e.kind())))?;
        Ok(())
    } else {
        let error = helper.exec();
        err!(ExecutionError::ProcessInit(crate::constants::BWRAP_EXECUTABLE, error.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_for_prefers_custom_command() {
        let argv = argv_for(Some("bash"), &["-lc".to_string(), "echo hi".to_string()]);
        assert_eq!(argv, vec!["bash".to_string(), "-lc".to_string(), "echo hi".to_string()]);
    }

    #[test]
    fn bus_env_infix_matches_bus() {
        assert_eq!(bus_env_infix(Bus::Session), "SESSION");
        assert_eq!(bus_env_infix(Bus::System), "SYSTEM");
    }

    #[test]
    fn bus_dest_path_is_fixed_per_bus() {
        assert_eq!(bus_dest_path(Bus::Session), format!("/run/user/{}/bus", *UID));
        assert_eq!(bus_dest_path(Bus::System), "/run/dbus/system_bus_socket");
    }
}
