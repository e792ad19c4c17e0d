//! Infrastructure adapters: network connections and configuration storage.

pub mod network;
pub mod storage;
