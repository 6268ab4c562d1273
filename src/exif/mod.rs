//! EXIF metadata handling
//!
//! Phone cameras store pixels in sensor order and record the display
//! rotation in the EXIF orientation tag (0x0112). The decoder applies it so
//! that extraction always sees the photo upright.

pub mod orientation;

pub use orientation::{apply_orientation, read_orientation, Orientation};
