// Remote backend over the hosted function API.

pub mod client;

pub use client::{HttpBackend, HttpConfig};
