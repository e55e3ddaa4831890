// ============================================
// File: crates/tunnelscope-core/src/packet/flow.rs
// ============================================
//! # Flow
//!
//! Source/destination pair of one captured packet, used to look up
//! subscribers. Lives only for the duration of one dispatch decision.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Direction-specific address pair of a captured IPv4 packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flow {
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
}

impl Flow {
    /// Creates a new flow.
    #[must_use]
    pub const fn new(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Self { src, dst }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_basics() {
        let flow = Flow::new(Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(1, 1, 1, 1));

        assert_eq!(flow.to_string(), "10.0.0.2 -> 1.1.1.1");

        let json = serde_json::to_string(&flow).unwrap();
        assert_eq!(json, r#"{"src":"10.0.0.2","dst":"1.1.1.1"}"#);
    }
}
