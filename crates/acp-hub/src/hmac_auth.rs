//! Hashing of presented kernel API keys. The implementation is
//! shared with the key-vault executor's service-key auth.

pub use acp_types::hash_api_key;
