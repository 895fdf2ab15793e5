//! The server configuration reader (§4.11, §6.6): a SAX parse of an XML
//! document with root element `OpenRTIServerConfig version="1"`, in the
//! same event-driven style the object-model readers use.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ConfigError;

/// One `listen` element: the address a listener should be bound to (§6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenEntry {
    pub url: String,
}

/// The fully parsed contents of a server configuration document (§4.11).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerConfig {
    pub parent_server_url: Option<String>,
    pub permit_time_regulation: bool,
    pub enable_zlib_compression: bool,
    pub listen: Vec<ListenEntry>,
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).trim().to_string())
}

fn required_attr(e: &BytesStart, element: &str, key: &str) -> Result<String, ConfigError> {
    attr(e, key).ok_or_else(|| ConfigError::MissingAttribute {
        element: element.to_string(),
        attribute: key.to_string(),
    })
}

/// Parses `1`/`0`/`t`/`f`/`T`/`F` by first character (§4.11); anything else
/// is a [`ConfigError::InvalidBoolean`].
fn parse_bool(element: &str, attribute: &str, value: &str) -> Result<bool, ConfigError> {
    match value.chars().next() {
        Some('1' | 't' | 'T') => Ok(true),
        Some('0' | 'f' | 'F') => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }),
    }
}

fn bool_attr(e: &BytesStart, element: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
    match attr(e, key) {
        Some(value) => parse_bool(element, key, &value),
        None => Ok(default),
    }
}

/// Parses a server configuration document, returning the recognized
/// settings (§4.11's table): `parentServer`, `permitTimeRegulation`,
/// `enableZLibCompression`, and any number of `listen` elements.
pub fn read(content: &str) -> Result<ServerConfig, ConfigError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut config = ServerConfig::default();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ConfigError::xml(e.to_string()))?
        {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if !seen_root {
                    if name != "OpenRTIServerConfig" {
                        return Err(ConfigError::UnexpectedRoot(name));
                    }
                    let version = required_attr(&e, "OpenRTIServerConfig", "version")?;
                    if version != "1" {
                        return Err(ConfigError::UnsupportedVersion(version));
                    }
                    seen_root = true;
                } else {
                    match name.as_str() {
                        "parentServer" => {
                            config.parent_server_url = Some(required_attr(&e, "parentServer", "url")?);
                        }
                        "permitTimeRegulation" => {
                            config.permit_time_regulation =
                                bool_attr(&e, "permitTimeRegulation", "enable", config.permit_time_regulation)?;
                        }
                        "enableZLibCompression" => {
                            config.enable_zlib_compression = bool_attr(
                                &e,
                                "enableZLibCompression",
                                "enable",
                                config.enable_zlib_compression,
                            )?;
                        }
                        "listen" => {
                            let url = required_attr(&e, "listen", "url")?;
                            config.listen.push(ListenEntry { url });
                        }
                        other => return Err(ConfigError::UnrecognizedElement(other.to_string())),
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ConfigError::UnexpectedRoot(String::new()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_recognized_element() {
        let xml = r#"<OpenRTIServerConfig version="1">
            <parentServer url="rti://upstream:14321"/>
            <permitTimeRegulation enable="true"/>
            <enableZLibCompression enable="0"/>
            <listen url="rti://0.0.0.0:14321"/>
            <listen url="pipe://.OpenRTI"/>
        </OpenRTIServerConfig>"#;
        let config = read(xml).unwrap();
        assert_eq!(config.parent_server_url.as_deref(), Some("rti://upstream:14321"));
        assert!(config.permit_time_regulation);
        assert!(!config.enable_zlib_compression);
        assert_eq!(
            config.listen,
            vec![
                ListenEntry { url: "rti://0.0.0.0:14321".to_string() },
                ListenEntry { url: "pipe://.OpenRTI".to_string() },
            ]
        );
    }

    #[test]
    fn defaults_are_false_and_empty_when_elements_are_absent() {
        let xml = r#"<OpenRTIServerConfig version="1"/>"#;
        let config = read(xml).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn rejects_an_unrecognized_root_element() {
        let xml = r#"<NotTheRightRoot version="1"/>"#;
        assert!(matches!(read(xml), Err(ConfigError::UnexpectedRoot(_))));
    }

    #[test]
    fn rejects_an_unsupported_version() {
        let xml = r#"<OpenRTIServerConfig version="2"/>"#;
        assert!(matches!(read(xml), Err(ConfigError::UnsupportedVersion(v)) if v == "2"));
    }

    #[test]
    fn rejects_an_invalid_boolean() {
        let xml = r#"<OpenRTIServerConfig version="1"><permitTimeRegulation enable="maybe"/></OpenRTIServerConfig>"#;
        assert!(matches!(read(xml), Err(ConfigError::InvalidBoolean { .. })));
    }

    #[test]
    fn accepts_first_character_boolean_forms() {
        for (value, expected) in [("1", true), ("0", false), ("t", true), ("f", false), ("T", true), ("F", false)] {
            let xml = format!(
                r#"<OpenRTIServerConfig version="1"><permitTimeRegulation enable="{value}"/></OpenRTIServerConfig>"#
            );
            assert_eq!(read(&xml).unwrap().permit_time_regulation, expected, "value={value}");
        }
    }

    #[test]
    fn rejects_an_unrecognized_child_element() {
        let xml = r#"<OpenRTIServerConfig version="1"><bogus/></OpenRTIServerConfig>"#;
        assert!(matches!(read(xml), Err(ConfigError::UnrecognizedElement(e)) if e == "bogus"));
    }
}
