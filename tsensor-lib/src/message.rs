//! Message model for the sensor broadcast protocol.
//!
//! Everything here was recovered from UDP captures of real sensors talking to
//! a thermostat hub, so field numbers, enum values, and the odd double
//! encoding of the hash field (base64 text inside a binary envelope) are
//! fixed by the firmware and must not be "cleaned up".
//!
//! A [`Message`] is either a pairing message, whose hash field carries the
//! device's shared secret, or a data message, whose hash field carries an
//! HMAC-SHA256 signature of the serialized [`SensorData`]. The two are a
//! tagged variant rather than flags on one struct so that a message that is
//! both or neither cannot be represented.

use crate::error::ValidationError;
use base64::{Engine as _, engine::general_purpose};
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, Serializer};
use std::fmt;
use strum_macros::Display;

/// Envelope discriminator. DATA is capture-verified; PAIR is inferred from
/// the firmware's handling of the pair button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum MessageType {
    #[strum(to_string = "PAIR")]
    Pair = 41,
    #[strum(to_string = "DATA")]
    Data = 42,
}

/// Where the thermostat files the reading. Values as emitted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum SensorType {
    #[strum(to_string = "OUTDOOR")]
    Outdoor = 1,
    #[strum(to_string = "REMOTE")]
    Remote = 2,
    #[strum(to_string = "SUPPLY")]
    Supply = 3,
    #[strum(to_string = "RETURN")]
    Return = 4,
    #[num_enum(catch_all)]
    #[strum(to_string = "UNKNOWN({0})")]
    Unknown(i32),
}

impl Default for SensorType {
    fn default() -> Self {
        SensorType::Remote
    }
}

impl SensorType {
    /// Parse the command-line token form. Tokens are case-insensitive;
    /// anything other than the four known types is rejected.
    pub fn from_token(token: &str) -> Result<Self, ValidationError> {
        match token.to_ascii_lowercase().as_str() {
            "outdoor" => Ok(SensorType::Outdoor),
            "remote" => Ok(SensorType::Remote),
            "supply" => Ok(SensorType::Supply),
            "return" => Ok(SensorType::Return),
            _ => Err(ValidationError::InvalidSensorType(token.to_string())),
        }
    }
}

/// How the sensor is powered. Only BATTERY has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum PowerSource {
    #[strum(to_string = "BATTERY")]
    Battery = 1,
    #[strum(to_string = "WIRED")]
    Wired = 2,
    #[num_enum(catch_all)]
    #[strum(to_string = "UNKNOWN({0})")]
    Unknown(i32),
}

// Enums render as their wire-name strings in JSON output.
impl Serialize for SensorType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for PowerSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The signed payload of every message. All fields are optional-presence:
/// the firmware omits fields it does not use, and an absent field is not the
/// same thing as a zero field.
///
/// Struct order matches wire field order (1 through 11).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_num: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Unknown firmware field 4, observed constant 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field4: Option<i32>,
    /// Unknown firmware field 5, observed constant 9.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field5: Option<i32>,
    /// Unknown firmware field 6, observed constant 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field6: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_source: Option<PowerSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<SensorType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<i32>,
    /// Raw temperature in device units, see [`crate::temperature`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<i32>,
}

/// A complete wire message: a pairing message transporting a key, or a data
/// message carrying a signed reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Sent when the pair button is pressed. `key` is the base64-encoded
    /// shared secret the listener should remember for this device.
    Pair { data: SensorData, key: String },
    /// A periodic reading. `signature` is the base64-encoded HMAC-SHA256 of
    /// the serialized `data`.
    Data { data: SensorData, signature: String },
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::Pair { .. } => MessageType::Pair,
            Message::Data { .. } => MessageType::Data,
        }
    }

    pub fn data(&self) -> &SensorData {
        match self {
            Message::Pair { data, .. } => data,
            Message::Data { data, .. } => data,
        }
    }

    /// The base64 text of the hash field, key or signature alike.
    pub fn hash(&self) -> &str {
        match self {
            Message::Pair { key, .. } => key,
            Message::Data { signature, .. } => signature,
        }
    }

    /// Decode the hash field back to raw bytes.
    pub fn hash_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(self.hash())
    }
}

impl fmt::Display for SensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(v) = self.unit_id {
            parts.push(format!("unit_id:{v}"));
        }
        if let Some(v) = self.seq_num {
            parts.push(format!("seq_num:{v}"));
        }
        if let Some(ref v) = self.mac {
            parts.push(format!("mac:{v:?}"));
        }
        if let Some(v) = self.field4 {
            parts.push(format!("field4:{v}"));
        }
        if let Some(v) = self.field5 {
            parts.push(format!("field5:{v}"));
        }
        if let Some(v) = self.field6 {
            parts.push(format!("field6:{v}"));
        }
        if let Some(v) = self.power_source {
            parts.push(format!("power_source:{v}"));
        }
        if let Some(ref v) = self.sensor_name {
            parts.push(format!("sensor_name:{v:?}"));
        }
        if let Some(v) = self.sensor_type {
            parts.push(format!("sensor_type:{v}"));
        }
        if let Some(v) = self.battery {
            parts.push(format!("battery:{v}"));
        }
        if let Some(v) = self.temp {
            parts.push(format!("temp:{v}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Canonical single-line text form. The listen path also uses this string
/// as the duplicate-suppression comparison key.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type:{} data:{{{}}} hash:{:?}",
            self.kind(),
            self.data(),
            self.hash()
        )
    }
}
