use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns true if `addr` falls in a range that must never be reached under
/// `DestClass::External`: RFC1918, loopback, or link-local.
pub fn is_blocked(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(addr: Ipv4Addr) -> bool {
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        // Carrier-grade NAT (RFC 6598), commonly used by internal cloud metadata
        // endpoints (e.g. 169.254.169.254 is covered by is_link_local above).
        || (addr.octets()[0] == 100 && (64..128).contains(&addr.octets()[1]))
}

fn is_blocked_v6(addr: Ipv6Addr) -> bool {
    addr.is_loopback()
        || addr.is_unspecified()
        || is_unique_local(addr)
        || is_unicast_link_local(addr)
        || addr.to_ipv4_mapped().is_some_and(is_blocked_v4)
}

fn is_unique_local(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Resolve `host` and check every returned address against `is_blocked`.
/// Resolution happens once; a DNS response that later repoints to a private
/// address is out of scope.
pub async fn resolve_and_check(host: &str, port: u16) -> Result<Vec<std::net::SocketAddr>, std::io::Error> {
    let addrs: Vec<_> = tokio::net::lookup_host((host, port)).await?.collect();
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_private_v4_ranges() {
        assert!(is_blocked("10.0.0.5".parse().unwrap()));
        assert!(is_blocked("192.168.1.1".parse().unwrap()));
        assert!(is_blocked("172.16.0.1".parse().unwrap()));
        assert!(is_blocked("127.0.0.1".parse().unwrap()));
        assert!(is_blocked("169.254.169.254".parse().unwrap()));
    }

    #[test]
    fn allows_public_v4() {
        assert!(!is_blocked("8.8.8.8".parse().unwrap()));
        assert!(!is_blocked("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn blocks_v6_loopback_and_unique_local() {
        assert!(is_blocked("::1".parse().unwrap()));
        assert!(is_blocked("fd00::1".parse().unwrap()));
        assert!(is_blocked("fe80::1".parse().unwrap()));
    }
}
