// RouterOS device sessions over the REST interface.

pub mod client;

pub use client::{RestConnector, RestSession, Scheme};
