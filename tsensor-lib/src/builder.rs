//! Assembly of pairing and data messages from caller parameters.

use crate::constants::{
    SIMULATED_BATTERY, UNIT_ID_MAX, UNIT_ID_MIN, UNKNOWN_FIELD4, UNKNOWN_FIELD5, UNKNOWN_FIELD6,
};
use crate::error::ValidationError;
use crate::message::{Message, PowerSource, SensorData, SensorType};
use crate::signature::sign;
use crate::temperature::Temperature;
use base64::{Engine as _, engine::general_purpose};
use chrono::{Timelike, Utc};
use sha2::{Digest, Sha256};

/// Parameters for building a message. `None` values are derived: MAC and key
/// from the sensor name, sequence number from the time of day.
#[derive(Debug, Clone)]
pub struct SensorParams {
    pub sensor_name: String,
    pub mac: Option<String>,
    pub key: Option<Vec<u8>>,
    pub sensor_type: SensorType,
    pub unit_id: i32,
    pub seq_num: Option<i32>,
}

impl SensorParams {
    pub fn new(sensor_name: impl Into<String>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            mac: None,
            key: None,
            sensor_type: SensorType::default(),
            unit_id: 0,
            seq_num: None,
        }
    }
}

/// Derive the simulated MAC for a sensor name: the `0a` locally-administered
/// prefix plus the first five bytes of SHA-256(name), lowercase hex.
pub fn generate_mac(sensor_name: &str) -> String {
    let digest = Sha256::digest(sensor_name.as_bytes());
    format!("0a{}", hex::encode(&digest[..5]))
}

/// Derive the signing key for a sensor name: SHA-256(name), raw 32 bytes.
pub fn generate_key(sensor_name: &str) -> Vec<u8> {
    Sha256::digest(sensor_name.as_bytes()).to_vec()
}

/// Real sensors increment a counter per reading. That needs state we don't
/// keep between runs, so fake it from the UTC time of day at quarter-minute
/// resolution.
pub fn generate_seq_num() -> i32 {
    (Utc::now().num_seconds_from_midnight() / 15) as i32
}

fn base_data(params: &SensorParams) -> Result<(SensorData, Vec<u8>), ValidationError> {
    if !(UNIT_ID_MIN..=UNIT_ID_MAX).contains(&params.unit_id) {
        return Err(ValidationError::UnitIdOutOfRange(params.unit_id));
    }
    let mac = params
        .mac
        .clone()
        .unwrap_or_else(|| generate_mac(&params.sensor_name));
    let key = params
        .key
        .clone()
        .unwrap_or_else(|| generate_key(&params.sensor_name));
    let seq_num = params.seq_num.unwrap_or_else(generate_seq_num);

    let data = SensorData {
        unit_id: Some(params.unit_id),
        seq_num: Some(seq_num),
        mac: Some(mac),
        field4: Some(UNKNOWN_FIELD4),
        field5: Some(UNKNOWN_FIELD5),
        field6: Some(UNKNOWN_FIELD6),
        power_source: Some(PowerSource::Battery),
        sensor_name: Some(params.sensor_name.clone()),
        sensor_type: Some(params.sensor_type),
        battery: Some(SIMULATED_BATTERY),
        temp: None,
    };
    Ok((data, key))
}

/// Build a signed data message carrying one reading.
pub fn build_data(params: &SensorParams, temp: Temperature) -> Result<Message, ValidationError> {
    let (mut data, key) = base_data(params)?;
    data.temp = Some(temp.to_raw());
    let signature = general_purpose::STANDARD.encode(sign(&data, &key));
    Ok(Message::Data { data, signature })
}

/// Build a pairing message that transports the device key in the hash field.
pub fn build_pair(params: &SensorParams) -> Result<Message, ValidationError> {
    let (data, key) = base_data(params)?;
    let key = general_purpose::STANDARD.encode(key);
    Ok(Message::Pair { data, key })
}
