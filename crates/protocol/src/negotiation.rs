//! Handshake negotiation policy (§4.6). Pure functions over option maps;
//! no I/O. Kept separate from [`crate::handshake`] so the algorithm itself
//! is unit-testable against the exact scenarios in §8 without a socket.

use openrti_wire::OptionMap;

pub const PROTOCOL_VERSION: &str = "8";
pub const ENCODING: &str = "TightBE1";

/// What the server decided to speak with this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub version: String,
    pub encoding: String,
    pub compression: String,
}

/// Inputs to compression selection (§4.6 step 3): whether the server
/// prefers to compress when it can, and whether this build actually links
/// zlib. Modeled as a capability flag rather than a compile-time `cfg` so
/// tests can exercise both branches.
#[derive(Debug, Clone, Copy)]
pub struct ServerPolicy {
    pub prefer_compression: bool,
    pub zlib_available: bool,
}

/// Runs §4.6 steps 1–3. Step 4 (asking the server node for a connect
/// handle) and step 5 (building the response map) are the caller's
/// responsibility in [`crate::handshake`], since they require a
/// [`crate::handshake::ConnectSink`] this module deliberately knows
/// nothing about.
///
/// Returns `Ok(Negotiated)` or the `error` strings to send back verbatim.
pub fn negotiate(
    client: &OptionMap,
    server: &OptionMap,
    policy: ServerPolicy,
) -> Result<Negotiated, Vec<String>> {
    let client_versions = client.get("version").unwrap_or(&[]);
    if client_versions.is_empty() || !client_versions.iter().any(|v| v == PROTOCOL_VERSION) {
        return Err(vec!["No/incompatible version".to_string()]);
    }

    let default_encoding = [ENCODING.to_string()];
    let server_encodings = server.get("encoding").unwrap_or(&default_encoding);
    let client_encodings = client.get("encoding").unwrap_or(&[]);
    // Preserve *client* preference order when intersecting (§9 Open
    // Question 1, decided in DESIGN.md: bit-for-bit match of the source's
    // behavior rather than a server-preference mode nobody asked for).
    let chosen_encoding = client_encodings
        .iter()
        .find(|enc| server_encodings.iter().any(|known| known == *enc))
        .cloned();
    let Some(chosen_encoding) = chosen_encoding else {
        return Err(vec!["no common encoding".to_string()]);
    };

    let client_compression = client.get("compression").unwrap_or(&[]);
    let chosen_compression = if policy.prefer_compression
        && policy.zlib_available
        && client_compression.iter().any(|c| c == "zlib")
    {
        "zlib"
    } else {
        "no"
    };

    Ok(Negotiated {
        version: PROTOCOL_VERSION.to_string(),
        encoding: chosen_encoding,
        compression: chosen_compression.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &[&str])]) -> OptionMap {
        let mut m = OptionMap::new();
        for (k, v) in pairs {
            m.set(*k, v.iter().map(|s| s.to_string()).collect());
        }
        m
    }

    #[test]
    fn scenario_3_handshake_negotiation() {
        let client = map(&[("version", &["7", "8"]), ("encoding", &["TightBE1"])]);
        let server = map(&[("version", &["8"]), ("encoding", &["TightBE1"])]);
        let result = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
        )
        .unwrap();
        assert_eq!(result.version, "8");
        assert_eq!(result.encoding, "TightBE1");
        assert_eq!(result.compression, "no");
    }

    #[test]
    fn scenario_4_encoding_mismatch() {
        let client = map(&[("version", &["8"]), ("encoding", &["UTF7BE"])]);
        let server = map(&[("version", &["8"]), ("encoding", &["TightBE1"])]);
        let err = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
        )
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].contains("no common encoding"));
    }

    #[test]
    fn missing_version_is_rejected() {
        let client = map(&[("encoding", &["TightBE1"])]);
        let server = map(&[("version", &["8"])]);
        let err = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
        )
        .unwrap_err();
        assert_eq!(err, vec!["No/incompatible version".to_string()]);
    }

    #[test]
    fn incompatible_version_is_rejected() {
        let client = map(&[("version", &["6", "7"]), ("encoding", &["TightBE1"])]);
        let server = map(&[("version", &["8"])]);
        assert!(negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true
            }
        )
        .is_err());
    }

    /// Documents the Open Question 1 decision: client order wins even
    /// when it disagrees with the server's own most-preferred encoding.
    #[test]
    fn prefers_client_order_when_versions_overlap() {
        let client = map(&[
            ("version", &["8"]),
            ("encoding", &["SecondChoice", "TightBE1"]),
        ]);
        let mut server = map(&[("version", &["8"])]);
        server.set(
            "encoding",
            vec!["TightBE1".to_string(), "SecondChoice".to_string()],
        );
        let result = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
        )
        .unwrap();
        // Client prefers "SecondChoice" over "TightBE1"; both are known
        // to the server, so the client's order wins.
        assert_eq!(result.encoding, "SecondChoice");
    }

    #[test]
    fn compression_chosen_only_when_server_prefers_and_client_offers_zlib() {
        let client = map(&[
            ("version", &["8"]),
            ("encoding", &["TightBE1"]),
            ("compression", &["zlib", "no"]),
        ]);
        let server = map(&[("version", &["8"]), ("encoding", &["TightBE1"])]);

        let no_preference = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: false,
                zlib_available: true,
            },
        )
        .unwrap();
        assert_eq!(no_preference.compression, "no");

        let preferred = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: true,
                zlib_available: true,
            },
        )
        .unwrap();
        assert_eq!(preferred.compression, "zlib");

        let no_zlib_build = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: true,
                zlib_available: false,
            },
        )
        .unwrap();
        assert_eq!(no_zlib_build.compression, "no");
    }

    #[test]
    fn lzma_is_accepted_but_never_chosen() {
        let client = map(&[
            ("version", &["8"]),
            ("encoding", &["TightBE1"]),
            ("compression", &["lzma"]),
        ]);
        let server = map(&[("version", &["8"]), ("encoding", &["TightBE1"])]);
        let result = negotiate(
            &client,
            &server,
            ServerPolicy {
                prefer_compression: true,
                zlib_available: true,
            },
        )
        .unwrap();
        assert_eq!(result.compression, "no");
    }
}
