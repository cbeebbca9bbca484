// ID3v2.3 tag structures
pub mod frames;
pub mod v2;

pub use frames::{FrameId, MimeStatus, PictureType};
pub use v2::{ExtendedHeader, FrameHeader, TagHeader};
