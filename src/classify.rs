//! IPv4 address classification
//!
//! Pure predicates that partition the IPv4 space into private, multicast,
//! and otherwise reserved ranges. Only addresses that fall outside all of
//! these are worth sending to the intelligence providers.
//!
//! The ranges here deliberately go beyond `Ipv4Addr::is_private`: loopback,
//! link-local, and the 0.0.0.0/8 block are all treated as private for
//! enrichment purposes, since none of them can be geolocated.

use std::net::Ipv4Addr;

/// RFC 1918 ranges plus loopback, link-local, and the "this network" block.
pub fn is_private(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 10 // 10.0.0.0/8
        || (a == 172 && (16..=31).contains(&b)) // 172.16.0.0/12
        || (a == 192 && b == 168) // 192.168.0.0/16
        || a == 127 // 127.0.0.0/8
        || a == 0 // 0.0.0.0/8
        || (a == 169 && b == 254) // 169.254.0.0/16 link-local
}

/// Class D multicast range, 224.0.0.0/4.
pub fn is_multicast(ip: Ipv4Addr) -> bool {
    let [a, _, _, _] = ip.octets();
    (224..=239).contains(&a)
}

/// Any address that must never be sent to an intelligence provider:
/// private, multicast, or one of the IANA special-purpose ranges.
pub fn is_special(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    is_private(ip)
        || is_multicast(ip)
        || (a == 100 && (64..=127).contains(&b)) // 100.64.0.0/10 carrier-grade NAT
        || (a == 192 && b == 0 && c == 0) // 192.0.0.0/24 IANA
        || (a == 192 && b == 0 && c == 2) // 192.0.2.0/24 TEST-NET-1
        || (a == 198 && b == 51 && c == 100) // 198.51.100.0/24 TEST-NET-2
        || (a == 203 && b == 0 && c == 113) // 203.0.113.0/24 TEST-NET-3
        || (a == 192 && b == 88 && c == 99) // 192.88.99.0/24 6to4 relay anycast
        || (a == 198 && (b == 18 || b == 19)) // 198.18.0.0/15 benchmarking
        || a >= 240 // 240.0.0.0/4 reserved
}

/// Routable on the public internet, i.e. not special in any way.
pub fn is_public(ip: Ipv4Addr) -> bool {
    !is_special(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_private_ranges() {
        assert!(is_private(ip("10.0.0.0")));
        assert!(is_private(ip("10.255.255.255")));
        assert!(is_private(ip("172.16.0.0")));
        assert!(is_private(ip("172.31.255.255")));
        assert!(is_private(ip("192.168.0.0")));
        assert!(is_private(ip("192.168.255.255")));
        assert!(is_private(ip("127.0.0.1")));
        assert!(is_private(ip("0.0.0.0")));
        assert!(is_private(ip("169.254.1.1")));
    }

    #[test]
    fn test_private_boundaries() {
        assert!(!is_private(ip("9.255.255.255")));
        assert!(!is_private(ip("11.0.0.0")));
        assert!(!is_private(ip("172.15.255.255")));
        assert!(!is_private(ip("172.32.0.0")));
        assert!(!is_private(ip("192.167.255.255")));
        assert!(!is_private(ip("192.169.0.0")));
        assert!(!is_private(ip("169.253.255.255")));
        assert!(!is_private(ip("170.254.0.1")));
    }

    #[test]
    fn test_multicast_boundaries() {
        assert!(!is_multicast(ip("223.255.255.255")));
        assert!(is_multicast(ip("224.0.0.0")));
        assert!(is_multicast(ip("239.255.255.255")));
        assert!(!is_multicast(ip("240.0.0.0")));
    }

    #[test]
    fn test_special_ranges() {
        assert!(is_special(ip("100.64.0.0")));
        assert!(is_special(ip("100.127.255.255")));
        assert!(!is_special(ip("100.63.255.255")));
        assert!(!is_special(ip("100.128.0.0")));

        assert!(is_special(ip("192.0.0.1")));
        assert!(is_special(ip("192.0.2.1")));
        assert!(!is_special(ip("192.0.1.1")));

        assert!(is_special(ip("198.51.100.9")));
        assert!(is_special(ip("203.0.113.200")));
        assert!(is_special(ip("192.88.99.1")));

        assert!(is_special(ip("198.18.0.0")));
        assert!(is_special(ip("198.19.255.255")));
        assert!(!is_special(ip("198.17.255.255")));
        assert!(!is_special(ip("198.20.0.0")));

        // 240.0.0.0/4 reserved, multicast already special
        assert!(is_special(ip("240.0.0.0")));
        assert!(is_special(ip("255.255.255.255")));
        assert!(is_special(ip("224.0.0.1")));
    }

    #[test]
    fn test_public() {
        assert!(is_public(ip("8.8.8.8")));
        assert!(is_public(ip("1.1.1.1")));
        assert!(is_public(ip("9.255.255.255")));
        assert!(is_public(ip("198.20.0.0")));
        assert!(!is_public(ip("10.0.0.0")));
        assert!(!is_public(ip("239.255.255.255")));
        assert!(!is_public(ip("240.0.0.0")));
    }
}
