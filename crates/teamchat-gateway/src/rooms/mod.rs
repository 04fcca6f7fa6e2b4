//! Rooms
//!
//! The live subscription graph consulted by the event router.

mod index;

pub use index::RoomIndex;
