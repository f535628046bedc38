pub mod link;
pub mod pull_request;

pub use link::*;
pub use pull_request::*;
