//! Primary IPv4 discovery for the access banner.
//!
//! Lookup order: the interface carrying the default route, then whatever
//! `hostname -I` reports first. Every failure collapses to `None`.

use nix::ifaddrs::getifaddrs;
use std::fs;
use std::net::Ipv4Addr;
use std::process::Command;

const ROUTE_TABLE: &str = "/proc/net/route";

/// Interface name of the first default route in a `/proc/net/route` dump.
pub fn parse_default_route_iface(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= 2 && fields[1] == "00000000" {
            Some(fields[0].to_string())
        } else {
            None
        }
    })
}

/// First non-loopback IPv4 address in `hostname -I` output.
pub fn parse_hostname_addrs(output: &str) -> Option<Ipv4Addr> {
    output
        .split_whitespace()
        .filter_map(|token| token.parse::<Ipv4Addr>().ok())
        .find(|ip| !ip.is_loopback())
}

fn iface_ipv4(iface: &str) -> Option<Ipv4Addr> {
    let addrs = match getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            log::debug!("[Host] [NET] getifaddrs failed: {}", e);
            return None;
        }
    };

    for ifaddr in addrs {
        if ifaddr.interface_name != iface {
            continue;
        }
        if let Some(sin) = ifaddr.address.as_ref().and_then(|a| a.as_sockaddr_in()) {
            return Some(Ipv4Addr::from(sin.ip()));
        }
    }
    None
}

fn hostname_ipv4() -> Option<Ipv4Addr> {
    let output = Command::new("hostname").arg("-I").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_hostname_addrs(&String::from_utf8_lossy(&output.stdout))
}

/// Best-effort primary IPv4 address of this host.
pub fn primary_ipv4() -> Option<Ipv4Addr> {
    if let Ok(table) = fs::read_to_string(ROUTE_TABLE) {
        if let Some(iface) = parse_default_route_iface(&table) {
            if let Some(ip) = iface_ipv4(&iface) {
                log::debug!("[Host] [NET] Default route via {} ({})", iface, ip);
                return Some(ip);
            }
        }
    }
    hostname_ipv4()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT\n\
docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0\n\
ens3\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n\
ens3\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0\n";

    #[test]
    fn test_default_route_iface() {
        assert_eq!(parse_default_route_iface(ROUTES), Some("ens3".to_string()));
    }

    #[test]
    fn test_no_default_route() {
        let table = "Iface\tDestination\tGateway\n lo\t0000007F\t00000000\n";
        assert_eq!(parse_default_route_iface(table), None);
        assert_eq!(parse_default_route_iface(""), None);
    }

    #[test]
    fn test_hostname_addrs_skips_loopback_and_v6() {
        assert_eq!(
            parse_hostname_addrs("127.0.1.1 fe80::1 192.168.1.20 10.0.0.5\n"),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
        assert_eq!(parse_hostname_addrs("  \n"), None);
    }

    #[test]
    fn test_primary_ipv4_does_not_panic() {
        let _ = primary_ipv4();
    }
}
