/*
ActiveMessage packet as it is carried inside a serial forwarder frame.

Layout (all multi-byte fields big endian):
    [dispatch][dest: u16][src: u16][payload len][group][am type][payload ...]

References:
    - TinyOS TEP 113 (serial communication) for the AM serial packet layout
*/
use std::fmt;
use std::io::Error as IoError;
use std::io::ErrorKind;

use common::constants::{AM_DISPATCH, AM_HEADER_SIZE_BYTES, AM_MAX_PAYLOAD_SIZE_BYTES};
use common::hex::encode_hex;
use common::{AmAddr, AmGroup, AmId};

/// Every AM packet carries this header in front of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmMsgHeader {
    pub destination: AmAddr,
    pub source: AmAddr,
    pub group: AmGroup,
    pub am_type: AmId,
}

impl AmMsgHeader {
    pub const DISPATCH_INDEX: usize = 0;
    pub const DEST_INDEX: usize = 1;
    pub const SOURCE_INDEX: usize = 3;
    pub const LEN_INDEX: usize = 5;
    pub const GROUP_INDEX: usize = 6;
    pub const TYPE_INDEX: usize = 7;

    fn to_bytes(&self, payload_len: u8) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(AM_HEADER_SIZE_BYTES);
        bytes.push(AM_DISPATCH);
        bytes.extend_from_slice(&self.destination.0.to_be_bytes());
        bytes.extend_from_slice(&self.source.0.to_be_bytes());
        bytes.push(payload_len);
        bytes.push(self.group.0);
        bytes.push(self.am_type.0);
        bytes
    }

    /// Returns the header and the payload length it announces
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), IoError> {
        if bytes.len() < AM_HEADER_SIZE_BYTES {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                "Header bytes too short",
            ));
        }
        if bytes[Self::DISPATCH_INDEX] != AM_DISPATCH {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!("Not an AM packet, dispatch byte {:02X}", bytes[Self::DISPATCH_INDEX]),
            ));
        }
        let header = AmMsgHeader {
            destination: AmAddr(u16::from_be_bytes([
                bytes[Self::DEST_INDEX],
                bytes[Self::DEST_INDEX + 1],
            ])),
            source: AmAddr(u16::from_be_bytes([
                bytes[Self::SOURCE_INDEX],
                bytes[Self::SOURCE_INDEX + 1],
            ])),
            group: AmGroup(bytes[Self::GROUP_INDEX]),
            am_type: AmId(bytes[Self::TYPE_INDEX]),
        };
        Ok((header, bytes[Self::LEN_INDEX] as usize))
    }
}

/// Message struct with header and payload. Start from `AmMsg::default()` (or a dispatcher)
/// and fill in the fields with the setters before handing it to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmMsg {
    pub header: AmMsgHeader,
    pub payload: Vec<u8>,
}

impl AmMsg {
    pub fn new(
        destination: AmAddr,
        source: AmAddr,
        group: AmGroup,
        am_type: AmId,
        payload: Vec<u8>,
    ) -> Self {
        AmMsg {
            header: AmMsgHeader {
                destination,
                source,
                group,
                am_type,
            },
            payload,
        }
    }

    pub fn destination(&self) -> AmAddr {
        self.header.destination
    }

    pub fn source(&self) -> AmAddr {
        self.header.source
    }

    pub fn group(&self) -> AmGroup {
        self.header.group
    }

    pub fn am_type(&self) -> AmId {
        self.header.am_type
    }

    pub fn set_destination(&mut self, destination: AmAddr) {
        self.header.destination = destination;
    }

    pub fn set_source(&mut self, source: AmAddr) {
        self.header.source = source;
    }

    pub fn set_group(&mut self, group: AmGroup) {
        self.header.group = group;
    }

    pub fn set_type(&mut self, am_type: AmId) {
        self.header.am_type = am_type;
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    fn to_bytes(&self) -> Result<Vec<u8>, IoError> {
        if self.payload.len() > AM_MAX_PAYLOAD_SIZE_BYTES {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Payload of {} bytes exceeds the {} byte limit",
                    self.payload.len(),
                    AM_MAX_PAYLOAD_SIZE_BYTES
                ),
            ));
        }
        let mut bytes = self.header.to_bytes(self.payload.len() as u8);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IoError> {
        let (header, payload_len) = AmMsgHeader::from_bytes(bytes)?;
        let body = &bytes[AM_HEADER_SIZE_BYTES..];
        if body.len() < payload_len {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                format!(
                    "Header announces {} payload bytes but only {} present",
                    payload_len,
                    body.len()
                ),
            ));
        }
        Ok(AmMsg {
            header,
            payload: body[..payload_len].to_vec(),
        })
    }
}

/// Rendered as `{group}source->destination[type] len: payload`
impl fmt::Display for AmMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{{}}}{}->{}[{}]{:>4}: {}",
            self.header.group,
            self.header.source,
            self.header.destination,
            self.header.am_type,
            self.payload.len(),
            encode_hex(&self.payload)
        )
    }
}

/// Serialize AmMsg struct to bytes, dispatch byte included
pub fn serialize_msg(msg: &AmMsg) -> Result<Vec<u8>, IoError> {
    let bytes = msg.to_bytes()?;
    Ok(bytes)
}

/// Deserialize bytes (dispatch byte first) into AmMsg struct
pub fn deserialize_msg(bytes: &[u8]) -> Result<AmMsg, IoError> {
    let msg: AmMsg = AmMsg::from_bytes(bytes)?;
    Ok(msg)
}
