//! # Playback Module
//!
//! Synchronous playback of arrangements on a [`Player`](crate::device::Player).
//!
//! ## Sub-modules
//! - `latch` - One-shot rendezvous used to block the caller until a pass ends
//! - `driver` - The session state machine
//!
//! ## Session States
//! ```text
//! Idle → Loading → Playing → Completed
//!                     │
//!                     └────→ Cancelled
//! ```
//!
//! - **Loading**: the arrangement is compiled and handed to the player with its
//!   tempo and loop count
//! - **Playing**: the caller is blocked; each pass rewinds to tick 0 and restarts
//!   the player, until the loop count is reached
//! - **Cancelled**: a [`CancelHandle`] interrupted the wait; the player is
//!   stopped and the session returns normally
//!
//! A failure while loading or starting stops the player and leaves the driver
//! `Idle`.
//!
//! ## Key Types
//! - [`PlaybackDriver`] - Runs sessions
//! - [`PlaybackOutcome`] - Passes completed and whether the session was cancelled
//! - [`CancelHandle`] - Cloneable, usable from any thread

mod driver;
mod latch;


pub use driver::{CancelHandle, PlaybackDriver, PlaybackOutcome, PlaybackState};
pub use latch::Latch;
