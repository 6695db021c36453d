// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Field names shared between the GPS feed and the reassembly output schema.

/// Epoch correlation key: unix time (ms) of the measurement instant.
pub const GPS_TIME_FIELD: &str = "gps_unixtime";
/// GPS interval of week, signed 32-bit.
pub const GPS_ITOW_FIELD: &str = "gps_time";
/// GPS week number, signed 16-bit.
pub const GPS_WEEK_FIELD: &str = "gps_week";
/// Expected satellite count for the epoch, captured at group open.
pub const GPS_NUM_SV_FIELD: &str = "num_sv";
pub const GPS_CARRIER_PHASE_FIELD: &str = "carrier_phase";
pub const GPS_PSEUDO_RANGE_FIELD: &str = "pseudo_range";
pub const GPS_DOPPLER_FIELD: &str = "doppler";
pub const GPS_SPACE_VEHICLE_FIELD: &str = "space_vehicle";
pub const GPS_MEASUREMENT_QUALITY_FIELD: &str = "measurement_quality";
pub const GPS_SIGNAL_STRENGTH_FIELD: &str = "signal_strength";
pub const GPS_LOSS_OF_LOCK_FIELD: &str = "loss_of_lock";

// Output schema. The header block is copied from the first member of each
// epoch; the remainder is produced by the encoder.
pub const POSITION_FIELD: &str = "position";
pub const GENERATION_TIME_FIELD: &str = "generation_time";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const DEVICE_ID_FIELD: &str = "device_id";
pub const SENSOR_TYPE_FIELD: &str = "sensor_type";
pub const GPS_RAW_DATA_VERSION_FIELD: &str = "gps_raw_data_version";
pub const GPS_SATS_FIELD: &str = "gps_sats";
pub const GPS_MISSING_SV_FIELD: &str = "gps_missing_sv";
pub const GPS_RAW_DATA_FIELD: &str = "gps_raw_data";
pub const CURRENT_BUFFER_SIZE_FIELD: &str = "current_data_buffer_size";
pub const OLD_BUFFER_SIZE_FIELD: &str = "old_data_buffer_size";

/// Version stamp written into every emitted raw-data element.
pub const GPS_RAW_DATA_VERSION: i32 = 1;
