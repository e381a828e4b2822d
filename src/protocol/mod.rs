/// Wire protocol: message model, reserved header fields and frame codec.
///
/// This module defines the two-part message (JSON header + optional text
/// payload) and its mapping onto a single text frame.
pub mod codec;
mod message;

pub(crate) use message::{ERROR, ID, SERVICE, SERVICES, TO, TYPE};
pub use message::{Header, Message, MessageType, ServiceSelector};
