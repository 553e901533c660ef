//! Field mapper / normalizer
//!
//! Turns raw sheet rows into partial typed records. Dates leave here as
//! calendar dates, never as serial numbers.

pub mod columns;
pub mod dates;
pub mod mapper;
pub mod values;

pub use columns::{ColumnSpec, FieldKind, columns_for};
pub use dates::{date_to_serial, serial_to_date};
pub use mapper::{FieldError, FieldMapper, MappedRow};
