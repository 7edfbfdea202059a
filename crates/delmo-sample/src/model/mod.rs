//! Model definitions used by the sample.

pub mod user;

pub use user::User;
