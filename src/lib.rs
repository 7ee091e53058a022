//! Rewrites the head of outgoing HTTP responses on flows that a control
//! plane has armed with a handler, using an NFQUEUE hook.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod ip;
pub mod nftables;
#[cfg(feature = "nfqueue")]
pub mod nfqueue;
pub mod packet;
pub mod protocol;

#[cfg(test)]
mod testutil;
