// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared stream-element model, GPS field names, and engine configuration.

pub mod config;
pub mod element;
pub mod fields;

pub use config::{ReassemblyConfig, MS_PER_DAY};
pub use element::{EpochKey, FieldError, FieldValue, StreamElement, StreamElementBuilder};
