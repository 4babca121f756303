/*
Command line surface of amsender. Clap parses and validates the flags, then
into_command() turns them into either a version request or everything needed to
send one packet.
*/

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, Parser};
use common::constants::{AM_BROADCAST_ADDR, AM_DEFAULT_GROUP, AM_DEFAULT_SOURCE_ADDR};
use common::hex::{decode_hex, encode_hex, HexError};
use common::{AmAddr, AmGroup, AmId};
use logging::{LogConfig, LogSink};
use sf_interface::parse_sf_connection_string;

use crate::error::AppError;
use crate::packet_builder::PacketFields;

/// Packet payload given as hex digit pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexPayload(pub Vec<u8>);

impl FromStr for HexPayload {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(HexPayload)
    }
}

impl fmt::Display for HexPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", encode_hex(&self.0))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "amsender",
    about = "Send a single ActiveMessage packet through a serial forwarder",
    disable_version_flag = true
)]
pub struct Args {
    /// Serial forwarder to connect to: sf@HOST:PORT, sf@HOST or HOST:PORT
    #[arg(required_unless_present = "show_version")]
    pub connection_string: Option<String>,

    /// Source address of the packet (hex)
    #[arg(short = 's', long = "source", default_value_t = AM_DEFAULT_SOURCE_ADDR)]
    pub source: AmAddr,

    /// Destination address of the packet (hex)
    #[arg(short = 'd', long = "destination", default_value_t = AM_BROADCAST_ADDR)]
    pub destination: AmAddr,

    /// Packet AM group (hex)
    #[arg(short = 'g', long = "group", default_value_t = AM_DEFAULT_GROUP)]
    pub group: AmGroup,

    /// Packet AM ID (hex)
    #[arg(short = 'a', long = "amid", required_unless_present = "show_version")]
    pub am_id: Option<AmId>,

    /// Packet payload (hex)
    #[arg(short = 'p', long = "payload", default_value = "")]
    pub payload: HexPayload,

    /// Debug mode, repeat for more detail
    #[arg(short = 'D', long = "debug", action = ArgAction::Count)]
    pub debug: u8,

    /// Show application version
    #[arg(short = 'V', long = "version")]
    pub show_version: bool,

    /// Write all log output to this file instead of stdout
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Command {
    ShowVersion,
    Send(SendRequest),
}

#[derive(Debug)]
pub struct SendRequest {
    pub host: String,
    pub port: u16,
    pub fields: PacketFields,
    pub log_config: LogConfig,
}

impl Args {
    pub fn into_command(self) -> Result<Command, AppError> {
        if self.show_version {
            return Ok(Command::ShowVersion);
        }

        let connection_string = self
            .connection_string
            .ok_or_else(|| AppError::Argument("missing connection string".to_string()))?;
        let am_type = self
            .am_id
            .ok_or_else(|| AppError::Argument("missing AM ID (-a)".to_string()))?;
        let (host, port) =
            parse_sf_connection_string(&connection_string).map_err(AppError::ConnectionString)?;

        let mut log_config = LogConfig::with_debug_level(self.debug).library_target("sf_interface");
        if let Some(path) = self.log_file {
            log_config = log_config.all_to(LogSink::File(path));
        }

        Ok(Command::Send(SendRequest {
            host,
            port,
            fields: PacketFields {
                source: self.source,
                destination: self.destination,
                group: self.group,
                am_type,
                payload: self.payload.0,
            },
            log_config,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use logging::LogStream;

    fn send_request(argv: &[&str]) -> SendRequest {
        match Args::try_parse_from(argv).unwrap().into_command().unwrap() {
            Command::Send(request) => request,
            Command::ShowVersion => panic!("expected a send request"),
        }
    }

    #[test]
    fn defaults() {
        let request = send_request(&["amsender", "sf@localhost:9002", "-a", "3F"]);
        assert_eq!(request.host, "localhost");
        assert_eq!(request.port, 9002);
        assert_eq!(
            request.fields,
            PacketFields {
                source: AmAddr(0x0001),
                destination: AmAddr(0xFFFF),
                group: AmGroup(0x22),
                am_type: AmId(0x3F),
                payload: Vec::new(),
            }
        );
        assert_eq!(request.log_config.debug_level, 0);
        assert_eq!(request.log_config.sink(LogStream::Info), &LogSink::Stdout);
    }

    #[test]
    fn all_flags() {
        let request = send_request(&[
            "amsender", "-s", "0x0A0B", "-d", "1234", "-g", "7e", "-a", "a0", "-p", "DEADbeef", "-DD",
            "sf@10.0.0.1",
        ]);
        assert_eq!(request.port, 9002);
        assert_eq!(request.fields.source, AmAddr(0x0A0B));
        assert_eq!(request.fields.destination, AmAddr(0x1234));
        assert_eq!(request.fields.group, AmGroup(0x7E));
        assert_eq!(request.fields.am_type, AmId(0xA0));
        assert_eq!(request.fields.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(request.log_config.debug_level, 2);
    }

    #[test]
    fn version_needs_nothing_else() {
        let args = Args::try_parse_from(["amsender", "-V"]).unwrap();
        assert!(matches!(args.into_command(), Ok(Command::ShowVersion)));
    }

    #[test]
    fn amid_is_required() {
        let err = Args::try_parse_from(["amsender", "sf@localhost:9002"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn bad_field_values_are_rejected() {
        for argv in [
            ["amsender", "sf@localhost", "-a", "100"],
            ["amsender", "sf@localhost", "-a", "zz"],
            ["amsender", "sf@localhost", "-s", "12345"],
        ] {
            assert!(Args::try_parse_from(argv).is_err(), "{:?}", argv);
        }
        let err = Args::try_parse_from(["amsender", "sf@localhost", "-a", "1", "-p", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn malformed_connection_string() {
        let args = Args::try_parse_from(["amsender", "sf@:9002", "-a", "1"]).unwrap();
        assert!(matches!(args.into_command(), Err(AppError::ConnectionString(_))));
    }

    #[test]
    fn log_file_takes_every_stream() {
        let request = send_request(&["amsender", "gw:9002", "-a", "1", "--log-file", "/tmp/amsender.log"]);
        let sink = LogSink::File(PathBuf::from("/tmp/amsender.log"));
        assert_eq!(request.log_config.sink(LogStream::Debug), &sink);
        assert_eq!(request.log_config.sink(LogStream::Error), &sink);
        assert_eq!(request.log_config.library_targets, vec!["sf_interface".to_string()]);
    }

    #[test]
    fn payload_display_is_lowercase_hex() {
        let payload: HexPayload = "0A0b".parse().unwrap();
        assert_eq!(payload.to_string(), "0a0b");
    }
}
