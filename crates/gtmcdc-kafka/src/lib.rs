mod client;
mod error;
mod mock;

pub use client::{KafkaChannel, KafkaConfig, MessageChannel};
pub use error::{ChannelError, ChannelResult};
pub use mock::MockChannel;
