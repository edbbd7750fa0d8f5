use std::net::Ipv4Addr;

use anyhow::Context;

/// Resolves `host` and keeps the first IPv4 address. A host that is
/// already an IPv4 literal is returned as is.
pub async fn resolve_ipv4(host: &str, port: u16) -> anyhow::Result<Ipv4Addr> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolve {host}"))?;
    first_ipv4(addrs.map(|a| a.ip())).with_context(|| format!("{host} has no IPv4 address"))
}

fn first_ipv4(addrs: impl IntoIterator<Item = std::net::IpAddr>) -> Option<Ipv4Addr> {
    addrs.into_iter().find_map(|ip| match ip {
        std::net::IpAddr::V4(v4) => Some(v4),
        std::net::IpAddr::V6(_) => None,
    })
}
