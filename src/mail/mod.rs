pub mod client;
pub mod crypto;
pub mod threading;
pub mod types;
