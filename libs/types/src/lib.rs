//! Core block and peer types shared by lightsync components.

mod block;
mod peer;
mod testonly;
#[cfg(test)]
mod tests;

pub use block::{BlockNumber, LightBlock};
pub use peer::PeerId;
