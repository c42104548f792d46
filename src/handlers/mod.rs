// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth). Routing lives in lib.rs.

pub mod protected;
pub mod public;
pub mod utils;
