//! IP address, interface and network checks for `IPAddr` attributes.

use std::net::{IpAddr, Ipv4Addr};

pub(crate) const CIDR_REQUIRED: &str =
    "Specified address should be in CIDR notation, e.g. 192.168.0.2/24";
pub(crate) const ZONE_INDEX_V6_ONLY: &str = "Zone index is allowed only for IPv6 addresses";

/// Options of an `IPAddr` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpAddrOptions {
    /// Accept IPv4 values.
    pub v4: bool,
    /// Accept IPv6 values.
    pub v6: bool,
    /// Require `address/prefix` (interface) notation.
    pub cidr: bool,
    /// Parse as a network; takes precedence over `cidr`.
    pub network: bool,
    /// Reject networks with host bits set.
    pub network_strict: bool,
    /// Accept a trailing `%zone` on IPv6 addresses.
    pub allow_zone_index: bool,
}

impl Default for IpAddrOptions {
    fn default() -> Self {
        Self {
            v4: true,
            v6: true,
            cidr: false,
            network: false,
            network_strict: false,
            allow_zone_index: false,
        }
    }
}

impl IpAddrOptions {
    /// Declaration-level sanity check, run at resolution time.
    pub fn check_declaration(&self) -> Result<(), String> {
        if !self.v4 && !self.v6 {
            return Err("Either IPv4 or IPv6 should be allowed".to_string());
        }
        Ok(())
    }

    /// Check `value` against these options.
    ///
    /// The error string is the user-facing validation message.
    pub fn check(&self, value: &str) -> Result<(), String> {
        if self.network {
            return self.check_network(value);
        }

        if self.cidr && !value.contains('/') {
            return Err(CIDR_REQUIRED.to_string());
        }

        let (text, has_zone_index) = match value.rfind('%') {
            Some(idx) if self.allow_zone_index => (&value[..idx], true),
            _ => (value, false),
        };

        if self.cidr {
            self.parse_prefixed(text)
                .map_err(|_| self.malformed(value, "interface"))?;
            if has_zone_index {
                // an interface is never a bare IPv6 address
                return Err(ZONE_INDEX_V6_ONLY.to_string());
            }
            return Ok(());
        }

        let addr = self
            .parse_address(text)
            .ok_or_else(|| self.malformed(value, "address"))?;
        if has_zone_index && !addr.is_ipv6() {
            return Err(ZONE_INDEX_V6_ONLY.to_string());
        }
        Ok(())
    }

    fn check_network(&self, value: &str) -> Result<(), String> {
        let (addr, prefix) = self
            .parse_prefixed(value)
            .map_err(|_| self.malformed(value, "network"))?;
        if self.network_strict && has_host_bits(addr, prefix) {
            return Err(format!("{} has host bits set", value));
        }
        Ok(())
    }

    fn parse_address(&self, text: &str) -> Option<IpAddr> {
        let addr: IpAddr = text.parse().ok()?;
        let allowed = match addr {
            IpAddr::V4(_) => self.v4,
            IpAddr::V6(_) => self.v6,
        };
        allowed.then_some(addr)
    }

    /// Parse `address[/prefix]`; a missing prefix means a host route.
    fn parse_prefixed(&self, text: &str) -> Result<(IpAddr, u8), ()> {
        let (addr_text, prefix_text) = match text.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (text, None),
        };
        let addr = self.parse_address(addr_text).ok_or(())?;
        let max = max_prefix(addr);
        let prefix = match prefix_text {
            None => max,
            Some(p) => parse_prefix(addr, p).ok_or(())?,
        };
        if prefix > max {
            return Err(());
        }
        Ok((addr, prefix))
    }

    fn malformed(&self, value: &str, what: &str) -> String {
        let family = match (self.v4, self.v6) {
            (true, true) => "IPv4 or IPv6",
            (true, false) => "IPv4",
            _ => "IPv6",
        };
        format!("'{}' does not appear to be an {} {}", value, family, what)
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn parse_prefix(addr: IpAddr, text: &str) -> Option<u8> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    // IPv4 also accepts a dotted netmask
    if addr.is_ipv4() {
        let mask: Ipv4Addr = text.parse().ok()?;
        let bits = u32::from(mask);
        let ones = bits.leading_ones();
        if bits.checked_shl(ones).unwrap_or(0) == 0 {
            return Some(ones as u8);
        }
    }
    None
}

fn has_host_bits(addr: IpAddr, prefix: u8) -> bool {
    match addr {
        IpAddr::V4(a) => {
            let host = u32::MAX.checked_shr(u32::from(prefix)).unwrap_or(0);
            u32::from(a) & host != 0
        }
        IpAddr::V6(a) => {
            let host = u128::MAX.checked_shr(u32::from(prefix)).unwrap_or(0);
            u128::from(a) & host != 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr() -> IpAddrOptions {
        IpAddrOptions {
            cidr: true,
            ..Default::default()
        }
    }

    #[test]
    fn plain_addresses() {
        let opts = IpAddrOptions::default();
        assert!(opts.check("127.0.0.1").is_ok());
        assert!(opts.check("22::56").is_ok());
        assert!(opts.check("192.").is_err());
        assert!(opts.check("5:5").is_err());
        assert!(opts.check("ff:ff:ee:aa").is_err());
    }

    #[test]
    fn cidr_requires_prefix() {
        let opts = cidr();
        assert_eq!(opts.check("192.168.1.1").unwrap_err(), CIDR_REQUIRED);
        assert!(opts.check("127.0.0.1/32").is_ok());
        assert!(opts.check("22::56/64").is_ok());
        assert!(opts.check("192.168.3.1/33").is_err());
        assert!(opts.check("ff::4/129").is_err());
        assert!(opts.check("10.0.0.1/255.255.255.0").is_ok());
        assert!(opts.check("10.0.0.1/255.0.255.0").is_err());
    }

    #[test]
    fn families_are_enforced() {
        let v4_only = IpAddrOptions {
            v6: false,
            ..Default::default()
        };
        assert!(v4_only.check("10.0.0.1").is_ok());
        let err = v4_only.check("::1").unwrap_err();
        assert_eq!(err, "'::1' does not appear to be an IPv4 address");

        let none = IpAddrOptions {
            v4: false,
            v6: false,
            ..Default::default()
        };
        assert!(none.check_declaration().is_err());
    }

    #[test]
    fn zone_index() {
        let opts = IpAddrOptions {
            allow_zone_index: true,
            ..Default::default()
        };
        assert!(opts.check("fe80::1%em0").is_ok());
        assert_eq!(opts.check("10.0.0.1%em0").unwrap_err(), ZONE_INDEX_V6_ONLY);

        let strict = IpAddrOptions::default();
        assert!(strict.check("fe80::1%em0").is_err());
    }

    #[test]
    fn networks() {
        let loose = IpAddrOptions {
            network: true,
            ..Default::default()
        };
        assert!(loose.check("192.168.0.0/24").is_ok());
        assert!(loose.check("192.168.0.5/24").is_ok());
        assert!(loose.check("10.0.0.1").is_ok());

        let strict = IpAddrOptions {
            network: true,
            network_strict: true,
            ..Default::default()
        };
        assert!(strict.check("192.168.0.0/24").is_ok());
        assert_eq!(
            strict.check("192.168.0.5/24").unwrap_err(),
            "192.168.0.5/24 has host bits set"
        );
        assert!(strict.check("fd00::/8").is_ok());
        assert!(strict.check("fd00::1/64").is_err());
        assert!(strict.check("0.0.0.0/0").is_ok());
    }
}
