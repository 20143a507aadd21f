//! Best-effort extraction from raw OLT command-line output.
//!
//! Nothing in here fails: malformed or unexpected device text yields empty or
//! partial results.

pub mod resolver;
pub mod sections;
pub mod speed;
pub mod state;

pub use resolver::{resolve_main_service, ResolvedService};
pub use sections::{parse_sections, DeviceSection};
pub use speed::{extract_channels, format_speed_descriptor, speed_descriptor, ChannelKey, ChannelMap};
