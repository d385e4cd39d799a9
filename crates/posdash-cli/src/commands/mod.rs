pub mod common;
pub mod guests;
pub mod orders;
pub mod status;
pub mod sync;
pub mod watch;
