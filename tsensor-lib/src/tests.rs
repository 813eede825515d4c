use crate::builder::{
    SensorParams, build_data, build_pair, generate_key, generate_mac, generate_seq_num,
};
use crate::constants::MAX_GENERATED_SEQ;
use crate::error::{DecodeError, SignatureError, ValidationError};
use crate::message::{Message, MessageType, PowerSource, SensorData, SensorType};
use crate::signature::{sign, validate};
use crate::temperature::Temperature;
use crate::transport::SensorSocket;
use crate::wire::encode_sensor_data;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use num_enum::FromPrimitive;

/// A real datagram captured from a sensor broadcasting on port 5001.
const CAPTURED_DATA_HEX: &str = "082ad2025a0a2a0800100f1a0c3230393134383235613965362001280930013801420753656e736f7231480350ff015861122c63356d435a4753574b797234734e355474524f6949476a4842654336316f7a6b5a6430636b5073716559773d";

/// The pairing key the capturing listener had learned for that sensor.
const CAPTURED_KEY_B64: &str = "NjBg/J+jAs9vLEbpxqCQyUg6l/drSD7DFd4MvRASCNs=";

fn captured_message() -> Message {
    let bytes = Bytes::from(hex::decode(CAPTURED_DATA_HEX).expect("Failed to decode hex"));
    Message::try_from(bytes).expect("Failed to decode captured datagram")
}

fn porch_params() -> SensorParams {
    SensorParams {
        sensor_name: "Porch".to_string(),
        mac: None,
        key: None,
        sensor_type: SensorType::Outdoor,
        unit_id: 3,
        seq_num: Some(1234),
    }
}

#[test]
fn test_decode_captured_datagram() {
    let msg = captured_message();
    assert_eq!(msg.kind(), MessageType::Data);

    let data = msg.data();
    assert_eq!(data.unit_id, Some(0));
    assert_eq!(data.seq_num, Some(15));
    assert_eq!(data.mac.as_deref(), Some("20914825a9e6"));
    assert_eq!(data.field4, Some(1));
    assert_eq!(data.field5, Some(9));
    assert_eq!(data.field6, Some(1));
    assert_eq!(data.power_source, Some(PowerSource::Battery));
    assert_eq!(data.sensor_name.as_deref(), Some("Sensor1"));
    assert_eq!(data.sensor_type, Some(SensorType::Supply));
    assert_eq!(data.battery, Some(255));
    assert_eq!(data.temp, Some(97));
    assert_eq!(msg.hash(), "c5mCZGSWKyr4sN5TtROiIGjHBeC61ozkZd0ckPsqeYw=");
}

#[test]
fn test_validate_captured_datagram() {
    let msg = captured_message();
    let key = general_purpose::STANDARD
        .decode(CAPTURED_KEY_B64)
        .expect("Failed to decode key");
    validate(&msg, &key).expect("Captured signature should verify");
}

#[test]
fn test_reencode_captured_datagram() {
    // Canonical encoding must reproduce the firmware's bytes exactly,
    // otherwise our signatures would never match real traffic.
    let msg = captured_message();
    assert_eq!(
        hex::encode(msg.to_bytes()),
        CAPTURED_DATA_HEX,
        "Re-encoded datagram should be byte-identical to the capture"
    );
}

#[test]
fn test_corrupted_signature_is_mismatch() {
    let msg = captured_message();
    let key = general_purpose::STANDARD.decode(CAPTURED_KEY_B64).unwrap();

    let mut sig = msg.hash_bytes().expect("Failed to decode signature");
    sig[0] ^= 0x01;
    let tampered = Message::Data {
        data: msg.data().clone(),
        signature: general_purpose::STANDARD.encode(sig),
    };
    assert_eq!(validate(&tampered, &key), Err(SignatureError::Mismatch));
}

#[test]
fn test_validate_rejects_pairing_message() {
    let msg = build_pair(&porch_params()).expect("Failed to build pairing message");
    let key = generate_key("Porch");
    assert_eq!(
        validate(&msg, &key),
        Err(SignatureError::WrongMessageKind),
        "A pairing message carries a key, not a signature"
    );
}

#[test]
fn test_build_data_produces_known_bytes() {
    let temp = Temperature {
        value: 68.0,
        celsius: false,
    };
    let msg = build_data(&porch_params(), temp).expect("Failed to build data message");

    match &msg {
        Message::Data { signature, .. } => {
            assert_eq!(signature, "YcLZnO/s9KFJyB1tKOKgFl7Lzc0UcKbA4DTxrmwC+EY=");
        }
        _ => panic!("Expected a data message"),
    }
    assert_eq!(
        hex::encode(msg.to_bytes()),
        "082ad202580a28080310d2091a0c30616332396663636230356420012809300138014205506f7263684801505f5878122c59634c5a6e4f2f73394b464a794231744b4f4b67466c374c7a633055634b624134445478726d77432b45593d"
    );
    validate(&msg, &generate_key("Porch")).expect("Built message should verify against its key");
}

#[test]
fn test_build_pair_produces_known_bytes() {
    let msg = build_pair(&porch_params()).expect("Failed to build pairing message");

    match &msg {
        Message::Pair { key, data } => {
            assert_eq!(key, "wp/MsF3UDHWFCa1BQEWCIBvQ8wB+pIvipmlI1yHpYHI=");
            assert_eq!(data.temp, None, "Pairing messages carry no reading");
        }
        _ => panic!("Expected a pairing message"),
    }
    assert_eq!(
        hex::encode(msg.to_bytes()),
        "0829d202560a26080310d2091a0c30616332396663636230356420012809300138014205506f7263684801505f122c77702f4d73463355444857464361314251455743494276513877422b70497669706d6c49317948705948493d"
    );
}

#[test]
fn test_roundtrip_data_message() {
    let temp = Temperature {
        value: 72.5,
        celsius: false,
    };
    let msg = build_data(&porch_params(), temp).expect("Failed to build data message");
    let decoded = Message::try_from(msg.to_bytes()).expect("Failed to decode own encoding");
    assert_eq!(decoded, msg);
}

#[test]
fn test_roundtrip_pair_message() {
    let msg = build_pair(&porch_params()).expect("Failed to build pairing message");
    let decoded = Message::try_from(msg.to_bytes()).expect("Failed to decode own encoding");
    assert_eq!(decoded, msg);
}

#[test]
fn test_roundtrip_preserves_absent_fields() {
    // Absent is not zero: a sparse payload must come back just as sparse.
    let data = SensorData {
        sensor_name: Some("Closet".to_string()),
        temp: Some(111),
        ..Default::default()
    };
    let msg = Message::Data {
        data,
        signature: "AAAA".to_string(),
    };
    let decoded = Message::try_from(msg.to_bytes()).expect("Failed to decode sparse message");
    assert_eq!(decoded, msg);
    assert_eq!(decoded.data().unit_id, None);
    assert_eq!(decoded.data().battery, None);
}

#[test]
fn test_negative_temperature_encoding() {
    let temp = Temperature {
        value: -49.9,
        celsius: false,
    };
    assert_eq!(temp.to_raw(), -11);

    let data = SensorData {
        temp: Some(-11),
        ..Default::default()
    };
    // Negative int32 goes out as a ten-byte sign-extended varint.
    assert_eq!(hex::encode(encode_sensor_data(&data)), "58f5ffffffffffffffff01");

    let msg = Message::Data {
        data,
        signature: "AAAA".to_string(),
    };
    let decoded = Message::try_from(msg.to_bytes()).expect("Failed to decode negative temp");
    assert_eq!(decoded.data().temp, Some(-11));
}

#[test]
fn test_unknown_fields_are_skipped() {
    // Payload with trailing fields 12-15 covering every live wire type:
    // varint, fixed32, fixed64 and length-delimited. A newer firmware
    // revision must not break decoding.
    let hex_data = "082ad202280a2042074d7973746572795832604d6d010203047100010203040506077a03616263120441414141";
    let bytes = Bytes::from(hex::decode(hex_data).unwrap());
    let msg = Message::try_from(bytes).expect("Unknown fields should be skipped, not fatal");
    assert_eq!(msg.data().sensor_name.as_deref(), Some("Mystery"));
    assert_eq!(msg.data().temp, Some(50));
    assert_eq!(msg.data().unit_id, None);
    assert_eq!(msg.data().mac, None);
}

#[test]
fn test_decode_truncated_input() {
    let full = hex::decode(CAPTURED_DATA_HEX).unwrap();
    let bytes = Bytes::from(full[..10].to_vec());
    assert_eq!(Message::try_from(bytes), Err(DecodeError::Truncated));
}

#[test]
fn test_decode_overlong_varint() {
    let bytes = Bytes::from(vec![0xff; 11]);
    assert_eq!(Message::try_from(bytes), Err(DecodeError::MalformedVarint));
}

#[test]
fn test_decode_unknown_message_type() {
    // Well-formed envelope with discriminator 7, which no firmware sends.
    let bytes = Bytes::from(hex::decode("0807d202050a00120141").unwrap());
    assert_eq!(
        Message::try_from(bytes),
        Err(DecodeError::UnknownMessageType(7))
    );
}

#[test]
fn test_decode_missing_hash() {
    let bytes = Bytes::from(hex::decode("082ad202020a00").unwrap());
    assert_eq!(
        Message::try_from(bytes),
        Err(DecodeError::MissingField("hash"))
    );
}

#[test]
fn test_decode_missing_body() {
    let bytes = Bytes::from(hex::decode("082a").unwrap());
    assert_eq!(
        Message::try_from(bytes),
        Err(DecodeError::MissingField("body"))
    );
}

#[test]
fn test_hash_field_with_invalid_base64() {
    // Decode succeeds (the hash is just a string on the wire); validation is
    // where the bad encoding surfaces.
    let hex_data = "082ad2021c0a0b42074d7973746572795832120d21216e6f746261736536342121";
    let bytes = Bytes::from(hex::decode(hex_data).unwrap());
    let msg = Message::try_from(bytes).expect("Failed to decode message");
    assert!(matches!(
        validate(&msg, b"irrelevant"),
        Err(SignatureError::BadEncoding(_))
    ));
}

#[test]
fn test_signature_is_deterministic() {
    let data = captured_message().data().clone();
    let key = generate_key("Porch");
    assert_eq!(sign(&data, &key), sign(&data, &key));
    assert_ne!(
        sign(&data, &key),
        sign(&data, &generate_key("Attic")),
        "Different keys should produce different signatures"
    );
}

#[test]
fn test_temperature_golden_vectors() {
    // Observed device behavior: Fahrenheit input vs raw wire value.
    let vectors: [(f64, i32); 16] = [
        (140.0, 200),
        (101.0, 157),
        (100.0, 156),
        (95.0, 150),
        (68.0, 120),
        (66.0, 118),
        (65.0, 117),
        (64.0, 116),
        (63.0, 114),
        (62.0, 113),
        (61.0, 112),
        (60.0, 111),
        (59.0, 110),
        (14.0, 60),
        (-38.0, 2),
        (-40.0, 0),
    ];
    for (fahrenheit, raw) in vectors {
        let temp = Temperature {
            value: fahrenheit,
            celsius: false,
        };
        assert_eq!(temp.to_raw(), raw, "Wrong raw value for {fahrenheit} F");
    }
}

#[test]
fn test_temperature_celsius_conversion() {
    let temp = Temperature {
        value: 20.0,
        celsius: true,
    };
    assert_eq!(temp.to_raw(), 120, "20 C is 68 F, which encodes to 120");

    let temp = Temperature {
        value: -40.0,
        celsius: true,
    };
    assert_eq!(temp.to_raw(), 0, "-40 is where both scales meet");
}

#[test]
fn test_generated_mac_and_key() {
    assert_eq!(generate_mac("Sensor1"), "0a1322869ac8");
    assert_eq!(generate_mac("Porch"), "0ac29fccb05d");
    assert_eq!(
        hex::encode(generate_key("Sensor1")),
        "1322869ac8d3247fd60c9f614ec952b895151a7e14b7c9ae3062ed8fc0a842fb"
    );
    assert_eq!(generate_key("Porch").len(), 32);
}

#[test]
fn test_generated_seq_num_stays_in_range() {
    let seq = generate_seq_num();
    assert!(
        (0..=MAX_GENERATED_SEQ).contains(&seq),
        "Sequence number {seq} outside a day's worth of quarter-minutes"
    );
}

#[test]
fn test_unit_id_bounds() {
    for unit_id in [0, 19] {
        let params = SensorParams {
            unit_id,
            ..porch_params()
        };
        build_pair(&params).expect("Boundary unit ids are valid");
    }
    for unit_id in [-1, 20] {
        let params = SensorParams {
            unit_id,
            ..porch_params()
        };
        let temp = Temperature {
            value: 68.0,
            celsius: false,
        };
        assert_eq!(
            build_data(&params, temp),
            Err(ValidationError::UnitIdOutOfRange(unit_id))
        );
        assert_eq!(
            build_pair(&params),
            Err(ValidationError::UnitIdOutOfRange(unit_id))
        );
    }
    let err = ValidationError::UnitIdOutOfRange(20);
    assert_eq!(err.to_string(), "unitId [20] out of range (0-19)");
}

#[test]
fn test_sensor_type_tokens() {
    assert_eq!(SensorType::from_token("outdoor"), Ok(SensorType::Outdoor));
    assert_eq!(SensorType::from_token("REMOTE"), Ok(SensorType::Remote));
    assert_eq!(SensorType::from_token("Supply"), Ok(SensorType::Supply));
    assert_eq!(SensorType::from_token("return"), Ok(SensorType::Return));

    let err = SensorType::from_token("attic").unwrap_err();
    assert_eq!(err.to_string(), "invalid sensor type [attic]");
}

#[test]
fn test_default_sensor_type_is_remote() {
    assert_eq!(SensorType::default(), SensorType::Remote);
    assert_eq!(SensorParams::new("Sensor1").sensor_type, SensorType::Remote);
}

#[test]
fn test_unrecognized_enum_values_decode_losslessly() {
    assert_eq!(PowerSource::from_primitive(5), PowerSource::Unknown(5));
    assert_eq!(PowerSource::Unknown(5).to_string(), "UNKNOWN(5)");
    assert_eq!(SensorType::from_primitive(9).to_string(), "UNKNOWN(9)");
}

#[test]
fn test_display_canonical_form() {
    let msg = captured_message();
    assert_eq!(
        msg.to_string(),
        "type:DATA data:{unit_id:0 seq_num:15 mac:\"20914825a9e6\" field4:1 field5:9 field6:1 \
         power_source:BATTERY sensor_name:\"Sensor1\" sensor_type:SUPPLY battery:255 temp:97} \
         hash:\"c5mCZGSWKyr4sN5TtROiIGjHBeC61ozkZd0ckPsqeYw=\""
    );
}

#[tokio::test]
async fn test_udp_loopback_send_recv() {
    let listener = SensorSocket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("Failed to bind listener");
    let dest = listener.local_addr().expect("Failed to read local addr");

    let sender = SensorSocket::bind_sender().await.expect("Failed to bind sender");
    let payload = captured_message().to_bytes();
    sender.send(&payload, dest).await.expect("Failed to send");

    let (received, from) = listener.recv().await.expect("Failed to receive");
    assert_eq!(received, payload);
    assert!(from.ip().is_loopback());

    let msg = Message::try_from(received).expect("Failed to decode received datagram");
    assert_eq!(msg.data().sensor_name.as_deref(), Some("Sensor1"));
}
