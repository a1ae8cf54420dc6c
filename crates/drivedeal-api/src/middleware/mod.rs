pub mod cors;
pub mod rate_limit;
pub mod security_headers;
pub mod suspicious;

pub use cors::{cors_middleware, CorsPolicy};
pub use rate_limit::{rate_limit_middleware, HttpRateLimiter};
pub use security_headers::{security_headers_middleware, SecurityHeadersConfig};
pub use suspicious::{suspicious_request_middleware, SuspiciousRequestConfig};
