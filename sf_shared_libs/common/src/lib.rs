pub mod am_types;
pub use am_types::{AmAddr, AmGroup, AmId, AmParseError};
pub mod hex;

/// Ports used for reaching serial forwarders
pub mod ports {
    /// Port a serial forwarder listens on when the connection string omits one
    pub const SF_DEFAULT_PORT: u16 = 9002;
}

/// For constants that are used across the entire project
pub mod constants {
    use crate::am_types::{AmAddr, AmGroup};

    /// Dispatch byte that marks a serial frame as an ActiveMessage packet
    pub const AM_DISPATCH: u8 = 0x00;

    pub const AM_BROADCAST_ADDR: AmAddr = AmAddr(0xFFFF);
    pub const AM_DEFAULT_SOURCE_ADDR: AmAddr = AmAddr(0x0001);
    pub const AM_DEFAULT_GROUP: AmGroup = AmGroup(0x22);

    /// dispatch(1) + dest(2) + src(2) + len(1) + group(1) + type(1)
    pub const AM_HEADER_SIZE_BYTES: usize = 8;

    // The frame length prefix is a single byte
    pub const SF_MAX_FRAME_SIZE_BYTES: usize = u8::MAX as usize;
    pub const AM_MAX_PAYLOAD_SIZE_BYTES: usize = SF_MAX_FRAME_SIZE_BYTES - AM_HEADER_SIZE_BYTES;

    /// Both ends of a serial forwarder link open with 'U' followed by a protocol version byte
    pub const SF_HANDSHAKE_MAGIC: u8 = b'U';
    pub const SF_PROTOCOL_VERSION: u8 = b' ';
}

#[cfg(test)]
mod tests {
    use crate::constants::*;

    #[test]
    fn payload_limit_fills_a_frame() {
        assert_eq!(AM_MAX_PAYLOAD_SIZE_BYTES + AM_HEADER_SIZE_BYTES, 255);
        assert_eq!(AM_MAX_PAYLOAD_SIZE_BYTES, 247);
    }

    #[test]
    fn default_addresses() {
        assert_eq!(AM_BROADCAST_ADDR.to_string(), "FFFF");
        assert_eq!(AM_DEFAULT_SOURCE_ADDR.to_string(), "0001");
        assert_eq!(AM_DEFAULT_GROUP.to_string(), "22");
    }
}
