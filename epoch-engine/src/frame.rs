//! RXM-RAW style binary framing for a completed (or force-flushed) epoch.
//!
//! The layout mirrors the u-blox receiver message format (sync markers,
//! class/id, explicit length, payload, running 8-bit checksum) so the
//! emitted bytes feed straight into downstream binary-protocol consumers.
//! Member records are written in arrival order.

use stream_core::element::{FieldError, FieldValue, StreamElement};
use stream_core::fields::{
    CURRENT_BUFFER_SIZE_FIELD, DEVICE_ID_FIELD, GENERATION_TIME_FIELD, GPS_CARRIER_PHASE_FIELD,
    GPS_DOPPLER_FIELD, GPS_ITOW_FIELD, GPS_LOSS_OF_LOCK_FIELD, GPS_MEASUREMENT_QUALITY_FIELD,
    GPS_MISSING_SV_FIELD, GPS_PSEUDO_RANGE_FIELD, GPS_RAW_DATA_FIELD, GPS_RAW_DATA_VERSION,
    GPS_RAW_DATA_VERSION_FIELD, GPS_SATS_FIELD, GPS_SIGNAL_STRENGTH_FIELD,
    GPS_SPACE_VEHICLE_FIELD, GPS_TIME_FIELD, GPS_WEEK_FIELD, OLD_BUFFER_SIZE_FIELD,
    POSITION_FIELD, SENSOR_TYPE_FIELD, TIMESTAMP_FIELD,
};

use crate::error::{ReassemblyError, Result};
use crate::group::EpochGroup;

const SYNC_MARKER_1: u8 = 0xB5;
const SYNC_MARKER_2: u8 = 0x62;
const CLASS_RXM: u8 = 0x02;
const ID_RAW: u8 = 0x10;
/// Bytes per satellite record in the payload.
pub const MEMBER_RECORD_LEN: usize = 24;
/// Frame bytes outside the per-member records: sync, class/id, length,
/// payload header, checksum.
pub const FRAME_OVERHEAD_LEN: usize = 16;

/// Running 8-bit checksum over the class/id/length/payload span.
pub fn checksum(bytes: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;
    for &byte in bytes {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Encodes the group's members into one binary frame. Deterministic; valid
/// at any fullness level, both natural completion and forced eviction pass
/// through here.
pub fn encode_frame(group: &EpochGroup) -> Result<Vec<u8>> {
    let key = group.key();
    let field = |source: FieldError| ReassemblyError::Encoding { key, source };
    let first = group.members().first().ok_or_else(|| {
        field(FieldError::Missing {
            name: GPS_ITOW_FIELD.to_string(),
        })
    })?;

    let count = group.len();
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD_LEN + MEMBER_RECORD_LEN * count);
    frame.extend_from_slice(&[SYNC_MARKER_1, SYNC_MARKER_2, CLASS_RXM, ID_RAW]);
    frame.extend_from_slice(&((MEMBER_RECORD_LEN * count) as u16).to_le_bytes());

    frame.extend_from_slice(&first.int(GPS_ITOW_FIELD).map_err(field)?.to_le_bytes());
    frame.extend_from_slice(&(first.int(GPS_WEEK_FIELD).map_err(field)? as i16).to_le_bytes());
    frame.push(count as u8);
    frame.push(0x00);

    for member in group.members() {
        frame.extend_from_slice(
            &member
                .double(GPS_CARRIER_PHASE_FIELD)
                .map_err(field)?
                .to_le_bytes(),
        );
        frame.extend_from_slice(
            &member
                .double(GPS_PSEUDO_RANGE_FIELD)
                .map_err(field)?
                .to_le_bytes(),
        );
        let doppler = member.double(GPS_DOPPLER_FIELD).map_err(field)? as f32;
        frame.extend_from_slice(&doppler.to_le_bytes());
        frame.push(member.byte(GPS_SPACE_VEHICLE_FIELD).map_err(field)?);
        let quality = member.int(GPS_MEASUREMENT_QUALITY_FIELD).map_err(field)?;
        frame.push((quality & 0xFF) as u8);
        frame.push(member.byte(GPS_SIGNAL_STRENGTH_FIELD).map_err(field)?);
        frame.push(member.byte(GPS_LOSS_OF_LOCK_FIELD).map_err(field)?);
    }

    let (ck_a, ck_b) = checksum(&frame[2..]);
    frame.push(ck_a);
    frame.push(ck_b);
    Ok(frame)
}

/// Builds the outgoing element: header fields copied from the first member,
/// encoder outputs, and the two tier-size diagnostics sampled at emission.
pub fn encode_output(
    group: &EpochGroup,
    recent_len: usize,
    stale_len: usize,
) -> Result<StreamElement> {
    let frame = encode_frame(group)?;
    // encode_frame already rejected the empty group.
    let first = &group.members()[0];
    Ok(StreamElement::builder(group.stream_name())
        .field_from(POSITION_FIELD, first)
        .field_from(GENERATION_TIME_FIELD, first)
        .field_from(TIMESTAMP_FIELD, first)
        .field_from(DEVICE_ID_FIELD, first)
        .field_from(GPS_TIME_FIELD, first)
        .field_from(SENSOR_TYPE_FIELD, first)
        .field(
            GPS_RAW_DATA_VERSION_FIELD,
            FieldValue::Int(GPS_RAW_DATA_VERSION),
        )
        .field(GPS_SATS_FIELD, FieldValue::Int(group.len() as i32))
        .field(GPS_MISSING_SV_FIELD, FieldValue::Byte(group.missing()))
        .field(GPS_RAW_DATA_FIELD, FieldValue::Binary(frame))
        .field(CURRENT_BUFFER_SIZE_FIELD, FieldValue::Int(recent_len as i32))
        .field(OLD_BUFFER_SIZE_FIELD, FieldValue::Int(stale_len as i32))
        .build())
}
