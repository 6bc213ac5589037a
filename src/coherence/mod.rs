//! Coherence Module
//!
//! Server side of the invalidation protocol: who caches which key, and how they are told
//! a write happened.

mod channel;
mod pusher;
mod registry;

pub use channel::{ChannelFactory, HttpChannel, HttpChannelFactory, InvalidationChannel};
pub use pusher::{InvalidationPusher, PushStats};
pub use registry::{CoherenceRegistry, Watcher};

#[cfg(test)]
pub(crate) use registry::tests::RecordingFactory;
