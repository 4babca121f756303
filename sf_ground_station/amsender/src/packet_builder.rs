use common::{AmAddr, AmGroup, AmId};
use message_structure::AmMsg;
use sf_interface::Dispatcher;

/// Header fields and payload given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFields {
    pub source: AmAddr,
    pub destination: AmAddr,
    pub group: AmGroup,
    pub am_type: AmId,
    pub payload: Vec<u8>,
}

/// Start from the dispatcher's fresh packet and fill in every field
pub fn build_packet<D: Dispatcher + ?Sized>(dispatcher: &D, fields: PacketFields) -> AmMsg {
    let mut msg = dispatcher.new_packet();
    msg.set_destination(fields.destination);
    msg.set_source(fields.source);
    msg.set_group(fields.group);
    msg.set_type(fields.am_type);
    msg.set_payload(fields.payload);
    msg
}
