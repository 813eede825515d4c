// Protocol constants for the thermostat sensor broadcast protocol

/// UDP port the sensors broadcast on and the thermostat hub listens on.
pub const SENSOR_PORT: u16 = 5001;

/// Receive buffer size. Observed datagrams stay under 128 bytes, so this
/// leaves plenty of headroom for longer sensor names and future fields.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Envelope field 1: message type discriminator (varint).
pub const FIELD_MSG_TYPE: u32 = 1;

/// Envelope field 42: the data-with-hash body (sub-message). The firmware
/// really does number this field 42; captures show tag bytes d2 02.
pub const FIELD_MSG_BODY: u32 = 42;

/// Body field 1: serialized SensorData (sub-message).
pub const FIELD_BODY_SENSOR_DATA: u32 = 1;

/// Body field 2: base64 key or signature text.
pub const FIELD_BODY_HASH: u32 = 2;

/// SensorData field 1: unit id the thermostat slots the reading into.
pub const FIELD_UNIT_ID: u32 = 1;

/// SensorData field 2: reading sequence number.
pub const FIELD_SEQ_NUM: u32 = 2;

/// SensorData field 3: device MAC, lowercase hex string.
pub const FIELD_MAC: u32 = 3;

/// SensorData field 4: unknown, constant 1 in every capture.
pub const FIELD_UNKNOWN4: u32 = 4;

/// SensorData field 5: unknown, constant 9 in every capture.
pub const FIELD_UNKNOWN5: u32 = 5;

/// SensorData field 6: unknown, constant 1 in every capture.
pub const FIELD_UNKNOWN6: u32 = 6;

/// SensorData field 7: power source enum.
pub const FIELD_POWER_SOURCE: u32 = 7;

/// SensorData field 8: human-readable sensor name.
pub const FIELD_SENSOR_NAME: u32 = 8;

/// SensorData field 9: sensor type enum.
pub const FIELD_SENSOR_TYPE: u32 = 9;

/// SensorData field 10: battery level.
pub const FIELD_BATTERY: u32 = 10;

/// SensorData field 11: raw temperature.
pub const FIELD_TEMP: u32 = 11;

/// Lowest unit id a thermostat accepts.
pub const UNIT_ID_MIN: i32 = 0;

/// Highest unit id a thermostat accepts.
pub const UNIT_ID_MAX: i32 = 19;

/// Value of SensorData field 4. Meaning unknown, never observed to change.
pub const UNKNOWN_FIELD4: i32 = 1;

/// Value of SensorData field 5. Meaning unknown, never observed to change.
pub const UNKNOWN_FIELD5: i32 = 9;

/// Value of SensorData field 6. Meaning unknown, never observed to change.
pub const UNKNOWN_FIELD6: i32 = 1;

/// Battery level the simulator reports. Real sensors report their own.
pub const SIMULATED_BATTERY: i32 = 95;

/// Highest sequence number the time-of-day generator produces (86400/15 - 1).
pub const MAX_GENERATED_SEQ: i32 = 5759;
