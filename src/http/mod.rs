//! HTTP integration: middleware, response mapping and the server.

mod middleware;
mod response;
mod server;

pub use middleware::{extract_tenant, handle, rate_limit, GateState};
pub use response::{
    respond, Denial, ErrorBody, GateRejection, RateLimitHeaders, ResponseMetadata, LIMIT_HEADER,
    REMAINING_HEADER, RESET_HEADER,
};
pub use server::{build_router, HttpServer};
