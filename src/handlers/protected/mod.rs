// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler here runs behind jwt_auth_middleware and receives the caller
// as an `AuthUser` extension. Ownership checks happen per resource.

pub mod comments;
pub mod diaries;
pub mod likes;
pub mod posts;
