/// Persistent event channel to the server - Gateway

mod protocol;
mod socket;

pub use protocol::{decode_frame, encode_frame, ClientEvent, ServerEvent};
pub use socket::{spawn_channel, ChannelHandle};
