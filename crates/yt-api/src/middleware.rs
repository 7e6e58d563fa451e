//! Middleware for logging, CORS, and response headers.

use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};

/// Access log line: remote ip, request line, status, size, and latency.
pub fn standard_middleware() -> Logger {
    Logger::new("%a \"%r\" %s %b %Dms")
}

/// Pages are same-origin HTML; cross-origin callers may only read.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allowed_methods(vec!["GET"])
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "same-origin"))
}
