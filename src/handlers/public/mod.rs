// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Account creation, token acquisition and read-only catalogue endpoints.

pub mod emotions;
pub mod posts;
pub mod users;
