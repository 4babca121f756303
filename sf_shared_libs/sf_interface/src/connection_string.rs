/*
Connection strings name the serial forwarder to talk to:
    sf@HOST:PORT   (canonical)
    sf@HOST        (default port)
    HOST:PORT
IPv6 hosts go in brackets, e.g. sf@[::1]:9002
*/
use common::ports::SF_DEFAULT_PORT;

use crate::error::SfError;

const SF_SCHEME: &str = "sf@";

/// Split a connection string into host and port
pub fn parse_sf_connection_string(connection_string: &str) -> Result<(String, u16), SfError> {
    let trimmed = connection_string.trim();
    let (target, has_scheme) = match trimmed.strip_prefix(SF_SCHEME) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    if target.is_empty() {
        return Err(SfError::connection_string(connection_string, "missing host"));
    }

    let (host, port_str) = split_host_port(connection_string, target)?;
    if host.is_empty() {
        return Err(SfError::connection_string(connection_string, "missing host"));
    }
    if !host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b':')
    {
        return Err(SfError::connection_string(
            connection_string,
            format!("invalid host '{}'", host),
        ));
    }

    let port = match port_str {
        Some(p) => p.parse::<u16>().map_err(|_| {
            SfError::connection_string(connection_string, format!("invalid port '{}'", p))
        })?,
        // a bare HOST is ambiguous without the scheme, so only sf@HOST gets the default port
        None if has_scheme => SF_DEFAULT_PORT,
        None => return Err(SfError::connection_string(connection_string, "missing port")),
    };
    if port == 0 {
        return Err(SfError::connection_string(connection_string, "port 0"));
    }

    Ok((host.to_string(), port))
}

fn split_host_port<'a>(
    input: &str,
    target: &'a str,
) -> Result<(&'a str, Option<&'a str>), SfError> {
    if let Some(bracketed) = target.strip_prefix('[') {
        let (host, rest) = bracketed
            .split_once(']')
            .ok_or_else(|| SfError::connection_string(input, "unterminated '['"))?;
        return match rest {
            "" => Ok((host, None)),
            _ => match rest.strip_prefix(':') {
                Some(port) => Ok((host, Some(port))),
                None => Err(SfError::connection_string(input, "garbage after ']'")),
            },
        };
    }
    match target.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => Err(SfError::connection_string(
            input,
            "IPv6 hosts must be written in brackets",
        )),
        Some((host, port)) => Ok((host, Some(port))),
        None => Ok((target, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_scheme() {
        assert_eq!(
            parse_sf_connection_string("sf@localhost:9002").unwrap(),
            ("localhost".to_string(), 9002)
        );
        assert_eq!(
            parse_sf_connection_string("sf@10.0.0.7:9100").unwrap(),
            ("10.0.0.7".to_string(), 9100)
        );
    }

    #[test]
    fn parse_host_port() {
        for (host, port) in [("gateway.local", 1), ("127.0.0.1", 65535), ("sink-02", 9002)] {
            let parsed = parse_sf_connection_string(&format!("{}:{}", host, port)).unwrap();
            assert_eq!(parsed, (host.to_string(), port));
        }
    }

    #[test]
    fn default_port_only_with_scheme() {
        assert_eq!(
            parse_sf_connection_string("sf@localhost").unwrap(),
            ("localhost".to_string(), SF_DEFAULT_PORT)
        );
        assert!(parse_sf_connection_string("localhost").is_err());
    }

    #[test]
    fn parse_ipv6() {
        assert_eq!(
            parse_sf_connection_string("sf@[::1]:9002").unwrap(),
            ("::1".to_string(), 9002)
        );
        assert!(parse_sf_connection_string("sf@::1:9002").is_err());
    }

    #[test]
    fn reject_malformed() {
        for bad in [
            "",
            "sf@",
            ":9002",
            "sf@:9002",
            "host:",
            "host:port",
            "host:70000",
            "host:0",
            "ho st:9002",
            "sf@[::1",
            "sf@[::1]9002",
        ] {
            match parse_sf_connection_string(bad) {
                Err(SfError::ConnectionString { .. }) => {}
                other => panic!("'{}' should be rejected, got {:?}", bad, other),
            }
        }
    }
}
