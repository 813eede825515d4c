//! Wire codec for the sensor broadcast protocol.
//!
//! The firmware serializes messages in a protobuf-style field-tagged binary
//! layout: varint scalars and length-delimited strings and sub-messages. The
//! field numbers in [`crate::constants`] were recovered from captured
//! traffic. Encoding always writes present fields in ascending field order
//! with minimal varints, which is the canonical form the firmware itself
//! emits; re-encoding a captured datagram reproduces it byte for byte, and
//! signatures computed over the canonical serialization verify against real
//! traffic.
//!
//! Decoding skips unrecognized fields instead of failing so that firmware
//! revisions that add fields still decode.

use crate::constants::*;
use crate::error::DecodeError;
use crate::message::{Message, MessageType, PowerSource, SensorData, SensorType};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::FromPrimitive;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

fn put_tag(buf: &mut BytesMut, field: u32, wire_type: u8) {
    put_varint(buf, (u64::from(field) << 3) | u64::from(wire_type));
}

fn put_int32(buf: &mut BytesMut, field: u32, value: i32) {
    put_tag(buf, field, WIRE_VARINT);
    // Negative int32 values are sign-extended to 64 bits on the wire.
    put_varint(buf, value as i64 as u64);
}

fn put_str(buf: &mut BytesMut, field: u32, value: &str) {
    put_tag(buf, field, WIRE_LEN);
    put_varint(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

fn put_len_prefixed(buf: &mut BytesMut, field: u32, payload: &[u8]) {
    put_tag(buf, field, WIRE_LEN);
    put_varint(buf, payload.len() as u64);
    buf.put_slice(payload);
}

fn get_varint(buf: &mut Bytes) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(DecodeError::Truncated);
        }
        if shift >= 64 {
            return Err(DecodeError::MalformedVarint);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn get_int32(buf: &mut Bytes) -> Result<i32, DecodeError> {
    // int32 fields keep the low 32 bits of the wire value.
    Ok(get_varint(buf)? as u32 as i32)
}

fn take(buf: &mut Bytes, len: usize) -> Result<Bytes, DecodeError> {
    if buf.remaining() < len {
        return Err(DecodeError::Truncated);
    }
    Ok(buf.split_to(len))
}

fn get_len_prefixed(buf: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = get_varint(buf)? as usize;
    take(buf, len)
}

fn get_string(buf: &mut Bytes) -> Result<String, DecodeError> {
    let raw = get_len_prefixed(buf)?;
    String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

/// Skip over one field value of the given wire type. Groups (wire types 3
/// and 4) are long dead and the firmware never emits them.
fn skip_field(buf: &mut Bytes, wire_type: u8) -> Result<(), DecodeError> {
    match wire_type {
        WIRE_VARINT => {
            get_varint(buf)?;
        }
        WIRE_FIXED64 => {
            take(buf, 8)?;
        }
        WIRE_LEN => {
            get_len_prefixed(buf)?;
        }
        WIRE_FIXED32 => {
            take(buf, 4)?;
        }
        other => return Err(DecodeError::UnsupportedWireType(other)),
    }
    Ok(())
}

/// Serialize the payload alone, in canonical form. Public because the
/// signature covers exactly these bytes, not the enclosing envelope.
pub fn encode_sensor_data(data: &SensorData) -> Bytes {
    let mut buf = BytesMut::new();
    if let Some(v) = data.unit_id {
        put_int32(&mut buf, FIELD_UNIT_ID, v);
    }
    if let Some(v) = data.seq_num {
        put_int32(&mut buf, FIELD_SEQ_NUM, v);
    }
    if let Some(ref v) = data.mac {
        put_str(&mut buf, FIELD_MAC, v);
    }
    if let Some(v) = data.field4 {
        put_int32(&mut buf, FIELD_UNKNOWN4, v);
    }
    if let Some(v) = data.field5 {
        put_int32(&mut buf, FIELD_UNKNOWN5, v);
    }
    if let Some(v) = data.field6 {
        put_int32(&mut buf, FIELD_UNKNOWN6, v);
    }
    if let Some(v) = data.power_source {
        put_int32(&mut buf, FIELD_POWER_SOURCE, v.into());
    }
    if let Some(ref v) = data.sensor_name {
        put_str(&mut buf, FIELD_SENSOR_NAME, v);
    }
    if let Some(v) = data.sensor_type {
        put_int32(&mut buf, FIELD_SENSOR_TYPE, v.into());
    }
    if let Some(v) = data.battery {
        put_int32(&mut buf, FIELD_BATTERY, v);
    }
    if let Some(v) = data.temp {
        put_int32(&mut buf, FIELD_TEMP, v);
    }
    buf.freeze()
}

fn decode_sensor_data(mut buf: Bytes) -> Result<SensorData, DecodeError> {
    let mut data = SensorData::default();
    while buf.has_remaining() {
        let tag = get_varint(&mut buf)?;
        let wire_type = (tag & 0x7) as u8;
        match ((tag >> 3) as u32, wire_type) {
            (FIELD_UNIT_ID, WIRE_VARINT) => data.unit_id = Some(get_int32(&mut buf)?),
            (FIELD_SEQ_NUM, WIRE_VARINT) => data.seq_num = Some(get_int32(&mut buf)?),
            (FIELD_MAC, WIRE_LEN) => data.mac = Some(get_string(&mut buf)?),
            (FIELD_UNKNOWN4, WIRE_VARINT) => data.field4 = Some(get_int32(&mut buf)?),
            (FIELD_UNKNOWN5, WIRE_VARINT) => data.field5 = Some(get_int32(&mut buf)?),
            (FIELD_UNKNOWN6, WIRE_VARINT) => data.field6 = Some(get_int32(&mut buf)?),
            (FIELD_POWER_SOURCE, WIRE_VARINT) => {
                data.power_source = Some(PowerSource::from_primitive(get_int32(&mut buf)?));
            }
            (FIELD_SENSOR_NAME, WIRE_LEN) => data.sensor_name = Some(get_string(&mut buf)?),
            (FIELD_SENSOR_TYPE, WIRE_VARINT) => {
                data.sensor_type = Some(SensorType::from_primitive(get_int32(&mut buf)?));
            }
            (FIELD_BATTERY, WIRE_VARINT) => data.battery = Some(get_int32(&mut buf)?),
            (FIELD_TEMP, WIRE_VARINT) => data.temp = Some(get_int32(&mut buf)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }
    Ok(data)
}

impl From<&Message> for Bytes {
    fn from(msg: &Message) -> Self {
        let sensor_data = encode_sensor_data(msg.data());
        let hash = msg.hash();

        let mut body = BytesMut::with_capacity(sensor_data.len() + hash.len() + 8);
        put_len_prefixed(&mut body, FIELD_BODY_SENSOR_DATA, &sensor_data);
        put_str(&mut body, FIELD_BODY_HASH, hash);

        let mut buf = BytesMut::with_capacity(body.len() + 8);
        put_int32(&mut buf, FIELD_MSG_TYPE, msg.kind().into());
        put_len_prefixed(&mut buf, FIELD_MSG_BODY, &body);
        buf.freeze()
    }
}

impl Message {
    /// Serialize the full envelope, ready to put on the wire.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self)
    }
}

impl TryFrom<Bytes> for Message {
    type Error = DecodeError;

    fn try_from(mut bytes: Bytes) -> Result<Self, Self::Error> {
        let mut msg_type: Option<i32> = None;
        let mut body: Option<Bytes> = None;
        while bytes.has_remaining() {
            let tag = get_varint(&mut bytes)?;
            let wire_type = (tag & 0x7) as u8;
            match ((tag >> 3) as u32, wire_type) {
                (FIELD_MSG_TYPE, WIRE_VARINT) => msg_type = Some(get_int32(&mut bytes)?),
                (FIELD_MSG_BODY, WIRE_LEN) => body = Some(get_len_prefixed(&mut bytes)?),
                _ => skip_field(&mut bytes, wire_type)?,
            }
        }

        let msg_type = msg_type.ok_or(DecodeError::MissingField("type"))?;
        let kind = MessageType::try_from(msg_type)
            .map_err(|_| DecodeError::UnknownMessageType(msg_type))?;
        let mut body = body.ok_or(DecodeError::MissingField("body"))?;

        let mut sensor_data: Option<Bytes> = None;
        let mut hash: Option<String> = None;
        while body.has_remaining() {
            let tag = get_varint(&mut body)?;
            let wire_type = (tag & 0x7) as u8;
            match ((tag >> 3) as u32, wire_type) {
                (FIELD_BODY_SENSOR_DATA, WIRE_LEN) => {
                    sensor_data = Some(get_len_prefixed(&mut body)?);
                }
                (FIELD_BODY_HASH, WIRE_LEN) => hash = Some(get_string(&mut body)?),
                _ => skip_field(&mut body, wire_type)?,
            }
        }

        let data =
            decode_sensor_data(sensor_data.ok_or(DecodeError::MissingField("sensor_data"))?)?;
        let hash = hash.ok_or(DecodeError::MissingField("hash"))?;

        Ok(match kind {
            MessageType::Pair => Message::Pair { data, key: hash },
            MessageType::Data => Message::Data {
                data,
                signature: hash,
            },
        })
    }
}
