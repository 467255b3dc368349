//! CLI command listing the canonical vocabulary at one host version

use console::style;

use crate::normalize::{
    CanonicalNodeType, CanonicalSocketName, HostVersion, RUNTIME_SOCKETS, SocketDirection,
    from_canonical, socket_from_canonical,
};
use crate::restore::RestoreConfig;

/// Canonical sockets of `type_id` with the name each one has at `version`.
fn sockets_in_effect(
    type_id: &str,
    version: HostVersion,
) -> Vec<(SocketDirection, CanonicalSocketName, &'static str)> {
    let mut seen = Vec::new();
    for socket in RUNTIME_SOCKETS.iter().filter(|s| s.node == type_id) {
        let key = (socket.direction, socket.canonical);
        if seen.iter().any(|(d, c, _)| (*d, *c) == key) {
            continue;
        }
        if let Some(name) = socket_from_canonical(type_id, socket.direction, socket.canonical, version) {
            seen.push((socket.direction, socket.canonical, name));
        }
    }
    seen
}

pub fn execute(host_version: Option<HostVersion>, sockets: bool) -> anyhow::Result<()> {
    let version = match host_version {
        Some(version) => version,
        None => RestoreConfig::load(None)?.host.version,
    };

    println!("Host {}", style(version).bold());
    for canonical in CanonicalNodeType::ALL {
        let Some(type_id) = from_canonical(*canonical, version) else {
            println!("  {:<26} {}", canonical.as_str(), style("unavailable").red());
            continue;
        };
        println!("  {:<26} {}", canonical.as_str(), style(type_id).cyan());
        if sockets {
            for (direction, socket, name) in sockets_in_effect(type_id, version) {
                println!(
                    "      {:<6} {:<20} {}",
                    direction.to_string(),
                    socket.as_str(),
                    style(name).dim()
                );
            }
        }
    }
    Ok(())
}
