use actix_web::HttpResponse;
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static CUSTOMERS_ADDED: AtomicU64 = AtomicU64::new(0);
static CUSTOMERS_DELETED: AtomicU64 = AtomicU64::new(0);
static STATUS_SWITCHES: AtomicU64 = AtomicU64::new(0);
static STATUS_SWITCH_FAILURES: AtomicU64 = AtomicU64::new(0);
static EXPORTS: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_customer_added() {
    CUSTOMERS_ADDED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_customer_deleted() {
    CUSTOMERS_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_status_switch(succeeded: bool) {
    if succeeded {
        STATUS_SWITCHES.fetch_add(1, Ordering::Relaxed);
    } else {
        STATUS_SWITCH_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_export() {
    EXPORTS.fetch_add(1, Ordering::Relaxed);
}

fn render() -> String {
    let counters = [
        ("http_requests_total", "Total number of HTTP requests", &REQUEST_COUNT),
        ("http_errors_total", "Total number of HTTP errors", &ERROR_COUNT),
        ("customers_added_total", "Customers created", &CUSTOMERS_ADDED),
        ("customers_deleted_total", "Customers deleted", &CUSTOMERS_DELETED),
        ("status_switches_total", "Committed status switches", &STATUS_SWITCHES),
        ("status_switch_failures_total", "Rejected status switch commits", &STATUS_SWITCH_FAILURES),
        ("exports_total", "Spreadsheet exports produced", &EXPORTS),
    ];

    counters
        .iter()
        .map(|(name, help, counter)| {
            format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus text metrics", content_type = "text/plain")
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render())
}
