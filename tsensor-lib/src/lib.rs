pub mod builder;
pub mod constants;
pub mod error;
pub mod keystore;
pub mod message;
pub mod signature;
pub mod temperature;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod tests;

// Re-export the working set so callers don't need the module paths.
pub use builder::{SensorParams, build_data, build_pair};
pub use error::{DecodeError, SensorError, SignatureError, ValidationError};
pub use keystore::KeyStore;
pub use message::{Message, MessageType, PowerSource, SensorData, SensorType};
pub use signature::{sign, validate};
pub use temperature::Temperature;
pub use transport::SensorSocket;
