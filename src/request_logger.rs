use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Status;
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Start time of the request being served.
struct RequestStart(Instant);

/// Fairing that logs one line per HTTP request with its latency.
///
/// Server errors are logged at `warn` so a failing store stands out from
/// ordinary traffic.
pub struct RequestLogger;

fn elapsed_millis(request: &Request<'_>) -> f64 {
    let start = request.local_cache(|| RequestStart(Instant::now()));
    start.0.elapsed().as_secs_f64() * 1000.0
}

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
        let millis = elapsed_millis(request);
        let status = response.status();

        if status.code >= Status::InternalServerError.code {
            log::warn!("{} {} -> {} ({:.2}ms)", request.method(), request.uri(), status.code, millis);
        } else {
            log::info!("{} {} -> {} ({:.2}ms)", request.method(), request.uri(), status.code, millis);
        }
    }
}
