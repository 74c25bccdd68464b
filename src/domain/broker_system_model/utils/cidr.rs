use std::net::IpAddr;

use crate::error::{BrokerError, BrokerResult};

/// Parses `address/prefix` notation and returns the network address.
pub fn parse_cidr(cidr: &str) -> BrokerResult<IpAddr> {
    let (address, prefix) = cidr.trim().split_once('/').ok_or_else(|| BrokerError::InvalidParameter(format!("CIDR '{}' has no prefix length", cidr)))?;

    let address: IpAddr = address.parse().map_err(|_| BrokerError::InvalidParameter(format!("CIDR '{}' has an invalid address", cidr)))?;
    let prefix: u8 = prefix.parse().map_err(|_| BrokerError::InvalidParameter(format!("CIDR '{}' has an invalid prefix length", cidr)))?;

    let max_prefix = if address.is_ipv4() { 32 } else { 128 };
    if prefix > max_prefix {
        return Err(BrokerError::InvalidParameter(format!("CIDR '{}' prefix exceeds {}", cidr, max_prefix)));
    }

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cidrs() {
        assert!(parse_cidr("10.0.0.0/24").unwrap().is_ipv4());
        assert!(parse_cidr("0.0.0.0/0").is_ok());
        assert!(parse_cidr("fd00::/64").unwrap().is_ipv6());
    }

    #[test]
    fn test_invalid_cidrs() {
        for cidr in ["10.0.0.0", "10.0.0.0/33", "300.0.0.1/24", "fd00::/129", "abc/8", "10.0.0.0/x"] {
            assert!(matches!(parse_cidr(cidr), Err(BrokerError::InvalidParameter(_))), "{} should be rejected", cidr);
        }
    }
}
