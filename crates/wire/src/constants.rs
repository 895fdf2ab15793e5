//! Wire constants named in §6.4: small integer codes used inside message
//! payloads, and their string form used in handshake option maps.

/// Reliability class of an attribute update or interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transportation {
    Reliable,
    BestEffort,
}

impl Transportation {
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Reliable => 0,
            Self::BestEffort => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reliable => "HLAreliable",
            Self::BestEffort => "HLAbestEffort",
        }
    }

    #[must_use]
    pub fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Reliable),
            1 => Some(Self::BestEffort),
            _ => None,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HLAreliable" => Some(Self::Reliable),
            "HLAbestEffort" => Some(Self::BestEffort),
            _ => None,
        }
    }
}

/// Time-stamp ordering class of an attribute update or interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    TimeStamp,
    Receive,
}

impl Order {
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::TimeStamp => 0,
            Self::Receive => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimeStamp => "TimeStamp",
            Self::Receive => "Receive",
        }
    }

    #[must_use]
    pub fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::TimeStamp),
            1 => Some(Self::Receive),
            _ => None,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TimeStamp" => Some(Self::TimeStamp),
            "Receive" => Some(Self::Receive),
            _ => None,
        }
    }
}

/// The only protocol version this implementation advertises and accepts.
pub const PROTOCOL_VERSION: &str = "8";

/// Known message-framing encoding names (§4.6, §4.8).
pub const ENCODING_TIGHT_BE1: &str = "TightBE1";

/// Compression negotiation tokens (§4.6). `Lzma` is recognized on the wire
/// but never selected by this server's negotiation algorithm (see
/// `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    No,
    Zlib,
    Lzma,
}

impl Compression {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Zlib => "zlib",
            Self::Lzma => "lzma",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no" => Some(Self::No),
            "zlib" => Some(Self::Zlib),
            "lzma" => Some(Self::Lzma),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transportation_wire_values_are_stable() {
        assert_eq!(Transportation::Reliable.wire_value(), 0);
        assert_eq!(Transportation::BestEffort.wire_value(), 1);
        assert_eq!(Transportation::Reliable.as_str(), "HLAreliable");
        assert_eq!(Transportation::BestEffort.as_str(), "HLAbestEffort");
    }

    #[test]
    fn order_wire_values_are_stable() {
        assert_eq!(Order::TimeStamp.wire_value(), 0);
        assert_eq!(Order::Receive.wire_value(), 1);
    }
}
