//! Longest-prefix-match tries for IPv4/IPv6 CIDR sets
//!
//! Stores membership of exact CIDR prefixes per address family and answers
//! one question: given a candidate network, which stored prefix is the most
//! specific one that covers it? The trie holds the canonical prefix string
//! exactly as it was inserted, so callers can use the answer as a lookup key
//! into their own indexes.

use std::fmt;
use std::net::IpAddr;

pub use ip_network::IpNetwork;

/// IPv4 vs IPv6, distinguished by address bit-width and textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4 (32-bit addresses)
    V4,
    /// IPv6 (128-bit addresses)
    V6,
}

impl AddressFamily {
    /// Determine the family from the textual form of a prefix or address.
    ///
    /// A colon anywhere in the string means IPv6, everything else is IPv4.
    /// This mirrors how the source table is partitioned and is intentionally
    /// a heuristic: it classifies even strings that do not parse.
    pub fn of_text(text: &str) -> Self {
        if text.contains(':') {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }

    /// Family of a parsed network.
    pub fn of_network(network: &IpNetwork) -> Self {
        match network {
            IpNetwork::V4(_) => AddressFamily::V4,
            IpNetwork::V6(_) => AddressFamily::V6,
        }
    }

    /// Address width in bits (32 or 128).
    pub fn bit_width(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Error returned when a string is not a syntactically valid IP network
/// or address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPrefixError {
    text: String,
}

impl InvalidPrefixError {
    /// The offending input text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for InvalidPrefixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IP prefix: {:?}", self.text)
    }
}

impl std::error::Error for InvalidPrefixError {}

/// Parse a CIDR prefix or bare address, leniently.
///
/// Accepts `addr/len` or a bare address (treated as /32 or /128). Host bits
/// beyond the prefix length are truncated to the network address rather than
/// rejected, so `216.1.81.5/25` parses as `216.1.81.0/25`.
pub fn parse_prefix(text: &str) -> Result<IpNetwork, InvalidPrefixError> {
    let trimmed = text.trim();
    let invalid = || InvalidPrefixError {
        text: text.to_string(),
    };

    if let Some((addr, len)) = trimmed.split_once('/') {
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let len: u8 = len.parse().map_err(|_| invalid())?;
        IpNetwork::new_truncate(addr, len).map_err(|_| invalid())
    } else {
        let addr: IpAddr = trimmed.parse().map_err(|_| invalid())?;
        let len = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        IpNetwork::new_truncate(addr, len).map_err(|_| invalid())
    }
}

#[derive(Default)]
struct Node {
    children: [Option<Box<Node>>; 2],
    /// Canonical prefix string terminating at this depth, if any.
    key: Option<String>,
}

/// Binary radix trie over address bits for one address family.
///
/// Each inserted prefix occupies the node reached by walking its network
/// address bits for `prefix_len` levels. Lookup walks the candidate's bits
/// and keeps the deepest key passed, which is exactly the longest stored
/// prefix covering the candidate.
pub struct PrefixTrie {
    root: Node,
    len: usize,
}

impl PrefixTrie {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    /// Register membership of an exact prefix.
    ///
    /// `bits` is the network address left-aligned in 128 bits. Inserting the
    /// same prefix again is a no-op: the first canonical string wins.
    pub fn insert(&mut self, bits: u128, prefix_len: u8, canonical: &str) {
        let mut node = &mut self.root;
        for depth in 0..prefix_len {
            let bit = ((bits >> (127 - depth)) & 1) as usize;
            node = node.children[bit]
                .get_or_insert_with(Default::default)
                .as_mut();
        }
        if node.key.is_none() {
            node.key = Some(canonical.to_string());
            self.len += 1;
        }
    }

    /// The most specific stored prefix covering the candidate, if any.
    ///
    /// The walk descends at most `prefix_len` levels: a stored prefix longer
    /// than the candidate cannot cover it and is never reported.
    pub fn longest_covering(&self, bits: u128, prefix_len: u8) -> Option<&str> {
        let mut best = self.root.key.as_deref();
        let mut node = &self.root;
        for depth in 0..prefix_len {
            let bit = ((bits >> (127 - depth)) & 1) as usize;
            match node.children[bit].as_deref() {
                Some(child) => {
                    if child.key.is_some() {
                        best = child.key.as_deref();
                    }
                    node = child;
                }
                None => break,
            }
        }
        best
    }

    /// Number of distinct prefixes stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no prefix has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// Left-align a network's address bits in 128 bits, plus its prefix length.
fn key_bits(network: &IpNetwork) -> (u128, u8) {
    match network {
        IpNetwork::V4(n) => (
            (u32::from(n.network_address()) as u128) << 96,
            n.netmask(),
        ),
        IpNetwork::V6(n) => (u128::from(n.network_address()), n.netmask()),
    }
}

/// One [`PrefixTrie`] per address family.
///
/// Supports both IPv4 and IPv6 prefixes; dispatch follows the parsed network
/// type, so a candidate from the wrong family simply finds nothing.
pub struct DualStackTrie {
    v4: PrefixTrie,
    v6: PrefixTrie,
}

impl DualStackTrie {
    /// Create an empty dual-stack trie.
    pub fn new() -> Self {
        Self {
            v4: PrefixTrie::new(),
            v6: PrefixTrie::new(),
        }
    }

    /// Register membership of an exact prefix under its family.
    ///
    /// `canonical` is stored verbatim and returned by
    /// [`longest_covering`](Self::longest_covering); duplicate inserts of the
    /// same prefix are idempotent.
    pub fn insert(&mut self, network: &IpNetwork, canonical: &str) {
        let (bits, len) = key_bits(network);
        match network {
            IpNetwork::V4(_) => self.v4.insert(bits, len, canonical),
            IpNetwork::V6(_) => self.v6.insert(bits, len, canonical),
        }
    }

    /// The most specific registered prefix containing `candidate`, or `None`.
    pub fn longest_covering(&self, candidate: &IpNetwork) -> Option<&str> {
        let (bits, len) = key_bits(candidate);
        match candidate {
            IpNetwork::V4(_) => self.v4.longest_covering(bits, len),
            IpNetwork::V6(_) => self.v6.longest_covering(bits, len),
        }
    }

    /// Number of distinct IPv4 prefixes.
    pub fn ipv4_count(&self) -> usize {
        self.v4.len()
    }

    /// Number of distinct IPv6 prefixes.
    pub fn ipv6_count(&self) -> usize {
        self.v6.len()
    }

    /// Total distinct prefixes across both families.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Returns true if neither family has entries.
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

impl Default for DualStackTrie {
    fn default() -> Self {
        Self::new()
    }
}
