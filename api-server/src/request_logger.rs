use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::StatusClass;
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing logging one line per HTTP request with its duration.
///
/// Server errors are logged at warn, health checks at debug.
pub struct RequestLogger;

struct RequestStart(Instant);

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let RequestStart(start) = request.local_cache(|| RequestStart(Instant::now()));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let status = response.status();

        let level = if status.class() == StatusClass::ServerError {
            log::Level::Warn
        } else if request.uri().path().as_str().ends_with("/health")
            || request.uri().path().as_str().ends_with("/health/ready")
        {
            log::Level::Debug
        } else {
            log::Level::Info
        };

        log::log!(
            level,
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            status.code,
            elapsed_ms
        );
    }
}
