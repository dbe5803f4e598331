// jablosync-api: Async Rust client for the Jablotron cloud API

pub mod client;
pub mod cloud;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{Ack, RemoteClient, SectionControl};
pub use cloud::{CloudClient, CloudCredentials, DEFAULT_BASE_URL, UNSUPPORTED_SERVICES};
pub use error::Error;
pub use models::{RawGate, RawSection, RawSensor};
pub use transport::TransportConfig;
