//! Response shapes shared by all endpoints.

pub mod response;

pub use response::{ApiResponse, PingResponse, PING_OK};
