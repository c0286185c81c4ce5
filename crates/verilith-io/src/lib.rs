//! # Verilith I/O
//!
//! File formats around the engine: JSON design snapshots of the layout
//! database and JSON violation reports. Mask-layout interchange formats
//! (GDS-II, OASIS) are external collaborators and not parsed here.

pub mod design;
pub mod error;
pub mod report;

pub use design::{load_design, save_design};
pub use error::FormatError;
pub use report::{read_report, write_report};
