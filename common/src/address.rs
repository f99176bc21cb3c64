//! Account addresses.
//!
//! Backends and wallets hand out both checksummed and lowercase spellings of
//! the same account; [`Address`] compares by value, so either spelling
//! parses to the same key. Display uses the EIP-55 checksum.

pub use alloy_primitives::{address, Address};

/// Short `0x1234…abcd` label for logs and toasts.
pub fn short(address: &Address) -> String {
    let checksum = address.to_checksum(None);
    let head: String = checksum.chars().take(6).collect();
    let tail: String = checksum.chars().skip(checksum.chars().count() - 4).collect();
    format!("{head}…{tail}")
}
