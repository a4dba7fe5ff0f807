//! Relationship signal engines.
//!
//! Pure, synchronous scoring over records already read from the store. Each
//! engine takes `today` explicitly so results are reproducible; the async
//! report accessors in `services` do the reading and supply the date.

pub mod baseline;
pub mod commitments;
pub mod cultural;
pub mod defaults;
pub mod introductions;
pub mod momentum;
pub mod proof_points;
pub mod stall;
