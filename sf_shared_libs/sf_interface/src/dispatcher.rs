/*
Dispatchers own one dispatch id each. A connection hands every inbound frame to the
dispatcher registered for the frame's first byte, and tools ask a dispatcher for fresh
packets so they start from the dispatcher's defaults.
*/
use common::constants::AM_DISPATCH;
use log::debug;
use message_structure::{deserialize_msg, AmMsg};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::SfError;

pub trait Dispatcher: Send + Sync {
    /// First byte of every frame this dispatcher handles
    fn dispatch_id(&self) -> u8;
    /// Allocate a new, empty packet for this dispatcher
    fn new_packet(&self) -> AmMsg;
    /// Take an inbound frame, dispatch byte included
    fn receive(&self, frame: &[u8]) -> Result<(), SfError>;
}

/// Dispatcher for ActiveMessage frames
#[derive(Debug, Default)]
pub struct MessageDispatcher {
    template: AmMsg,
    deliver_to: Option<UnboundedSender<AmMsg>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        MessageDispatcher::default()
    }

    /// Packets from `new_packet` start as copies of `template`
    pub fn with_template(template: AmMsg) -> Self {
        MessageDispatcher {
            template,
            deliver_to: None,
        }
    }

    /// Forward decoded inbound packets to a channel. Without one they are logged and dropped.
    pub fn deliver_to(mut self, sender: UnboundedSender<AmMsg>) -> Self {
        self.deliver_to = Some(sender);
        self
    }
}

impl Dispatcher for MessageDispatcher {
    fn dispatch_id(&self) -> u8 {
        AM_DISPATCH
    }

    fn new_packet(&self) -> AmMsg {
        let mut msg = self.template.clone();
        msg.payload.clear();
        msg
    }

    fn receive(&self, frame: &[u8]) -> Result<(), SfError> {
        let msg = deserialize_msg(frame).map_err(SfError::Encode)?;
        match &self.deliver_to {
            Some(sender) => {
                if sender.send(msg).is_err() {
                    debug!("receiver gone, dropping inbound packet");
                }
            }
            None => debug!("dropping inbound packet {}", msg),
        }
        Ok(())
    }
}
