//! 128-bit entity identifiers with a fixed textual form (spec §2 C1).
//!
//! Every entity shares one `EntityId` type: a raw `u128` generated from
//! `uuid::Uuid::new_v4()`, rendered as lowercase hyphenated hex so the
//! wire format is stable regardless of how the host chose to print UUIDs
//! (spec §1 explicitly leaves "UUID string representation choice" to the
//! caller; we fix one here for the whole crate).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u128);

/// The well-known id for unauthenticated actions (spec §3 "Special sentinel
/// user id \"anonymous\"").
pub const ANONYMOUS_USER_ID: EntityId = EntityId(0);

impl EntityId {
    pub fn new() -> Self {
        EntityId(uuid::Uuid::new_v4().as_u128())
    }

    pub fn from_raw(raw: u128) -> Self {
        EntityId(raw)
    }

    pub fn as_raw(self) -> u128 {
        self.0
    }

    pub fn is_anonymous(self) -> bool {
        self == ANONYMOUS_USER_ID
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        EntityId(u128::from_le_bytes(bytes))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            return write!(f, "anonymous");
        }
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntityIdError;

impl FromStr for EntityId {
    type Err = ParseEntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "anonymous" {
            return Ok(ANONYMOUS_USER_ID);
        }
        uuid::Uuid::parse_str(s)
            .map(|u| EntityId(u.as_u128()))
            .map_err(|_| ParseEntityIdError)
    }
}

/// An IP address stored as 16 raw bytes, v4 addresses left-padded with
/// zeros (spec §6.1 context version 1 layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawIp([u8; 16]);

impl RawIp {
    pub const UNKNOWN: RawIp = RawIp([0u8; 16]);

    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        RawIp(bytes)
    }
}

impl From<IpAddr> for RawIp {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => {
                let mut bytes = [0u8; 16];
                bytes[12..].copy_from_slice(&v4.octets());
                RawIp(bytes)
            }
            IpAddr::V6(v6) => RawIp(v6.octets()),
        }
    }
}

impl fmt::Display for RawIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0[..12] == [0u8; 12] {
            write!(f, "{}", Ipv4Addr::new(self.0[12], self.0[13], self.0[14], self.0[15]))
        } else {
            write!(f, "{}", Ipv6Addr::from(self.0))
        }
    }
}

impl FromStr for RawIp {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "unknown" {
            return Ok(RawIp::UNKNOWN);
        }
        s.parse::<IpAddr>().map(RawIp::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_round_trips_through_display_and_parse() {
        assert_eq!(ANONYMOUS_USER_ID.to_string(), "anonymous");
        assert_eq!("anonymous".parse::<EntityId>().unwrap(), ANONYMOUS_USER_ID);
    }

    #[test]
    fn ipv4_is_left_padded_into_sixteen_bytes() {
        let raw: RawIp = "10.0.0.1".parse().unwrap();
        assert_eq!(&raw.to_bytes()[..12], &[0u8; 12]);
        assert_eq!(raw.to_string(), "10.0.0.1");
    }
}
