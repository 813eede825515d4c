//! HMAC signing and validation of sensor payloads.

use crate::error::SignatureError;
use crate::message::{Message, MessageType, SensorData};
use crate::wire::encode_sensor_data;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 signature of `data`.
///
/// The MAC covers the canonical serialization of the payload alone, not the
/// enclosing envelope: the envelope can't be covered because the hash field
/// lives inside it.
pub fn sign(data: &SensorData, key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&encode_sensor_data(data));
    mac.finalize().into_bytes().to_vec()
}

/// Check a data message's embedded signature against `key`.
///
/// Pairing messages are rejected outright: their hash field is a key, and
/// treating it as a signature is a caller mistake, not a bad signature.
pub fn validate(msg: &Message, key: &[u8]) -> Result<(), SignatureError> {
    if msg.kind() == MessageType::Pair {
        return Err(SignatureError::WrongMessageKind);
    }
    let sig = msg.hash_bytes()?;
    let expected = sign(msg.data(), key);
    if expected != sig {
        return Err(SignatureError::Mismatch);
    }
    Ok(())
}
