use actix_web::{web, HttpResponse, Responder, ResponseError};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    api::metrics,
    middleware::auth::Claims,
    models::{
        CustomerListResponse, CustomerResponse, CustomerStatus, DeleteCustomerResponse,
        NewCustomerRequest, StatusInfo, SwitchStatusRequest, SwitchStatusResponse,
    },
    services::{
        customer_service::{CustomerService, SwitchOutcome},
        export_service,
        live_list::{empty_message, ListChange, LiveList},
    },
    store::CustomerEvent,
    utils::error::AppError,
};

fn parse_status(raw: &str) -> Result<CustomerStatus, AppError> {
    raw.parse().map_err(AppError::InvalidRequest)
}

/// GET /api/v1/customers/statuses - Status partitions available
#[utoipa::path(
    get,
    path = "/api/v1/customers/statuses",
    tag = "Customers",
    responses((status = 200, description = "Known statuses", body = [StatusInfo])),
    security(("bearer_auth" = []))
)]
pub async fn list_statuses() -> impl Responder {
    let statuses: Vec<StatusInfo> = CustomerStatus::ALL
        .iter()
        .map(|status| StatusInfo {
            status: *status,
            label: status.label().to_string(),
            collection: status.collection_name(),
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "statuses": statuses
    }))
}

/// GET /api/v1/customers/{status} - Every customer in one view
#[utoipa::path(
    get,
    path = "/api/v1/customers/{status}",
    tag = "Customers",
    params(("status" = String, Path, description = "pending | active | one_month | one_year")),
    responses(
        (status = 200, description = "Customers in the view", body = CustomerListResponse),
        (status = 400, description = "Unknown status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_customers(
    user: web::ReqData<Claims>,
    service: web::Data<CustomerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let status = match parse_status(&path) {
        Ok(status) => status,
        Err(e) => return e.error_response(),
    };

    log::info!("📋 GET /customers/{} - user {}", status, user.sub);

    match service.list_customers(status).await {
        Ok(customers) => {
            let empty = customers.is_empty();
            HttpResponse::Ok().json(CustomerListResponse {
                success: true,
                status,
                count: customers.len(),
                customers,
                empty,
                message: empty.then(|| empty_message(status)),
            })
        }
        Err(e) => {
            log::error!("❌ Error listing {} customers: {}", status, e);
            e.error_response()
        }
    }
}

/// POST /api/v1/customers/{status} - Adds a customer to the view
#[utoipa::path(
    post,
    path = "/api/v1/customers/{status}",
    tag = "Customers",
    params(("status" = String, Path, description = "View the customer is added to")),
    request_body = NewCustomerRequest,
    responses(
        (status = 201, description = "Customer added", body = CustomerResponse),
        (status = 400, description = "Missing field or unknown status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_customer(
    user: web::ReqData<Claims>,
    service: web::Data<CustomerService>,
    path: web::Path<String>,
    request: web::Json<NewCustomerRequest>,
) -> HttpResponse {
    let status = match parse_status(&path) {
        Ok(status) => status,
        Err(e) => return e.error_response(),
    };

    log::info!("📝 POST /customers/{} - user {}", status, user.sub);

    match service.add_customer(status, &request).await {
        Ok(customer) => HttpResponse::Created().json(CustomerResponse {
            success: true,
            customer,
        }),
        Err(e) => {
            log::warn!("⚠️ Failed to add customer: {}", e);
            e.error_response()
        }
    }
}

/// GET /api/v1/customers/{status}/{id}
#[utoipa::path(
    get,
    path = "/api/v1/customers/{status}/{id}",
    tag = "Customers",
    params(
        ("status" = String, Path, description = "Partition holding the customer"),
        ("id" = String, Path, description = "Customer id")
    ),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Not in that partition")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_customer(
    service: web::Data<CustomerService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (raw_status, id) = path.into_inner();
    let status = parse_status(&raw_status)?;

    let customer = service.get_customer(status, &id).await?;
    Ok(HttpResponse::Ok().json(CustomerResponse {
        success: true,
        customer,
    }))
}

/// DELETE /api/v1/customers/{status}/{id} - Permanent, no undo
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{status}/{id}",
    tag = "Customers",
    params(
        ("status" = String, Path, description = "Partition holding the customer"),
        ("id" = String, Path, description = "Customer id")
    ),
    responses((status = 200, description = "Delete processed; `deleted` is false for unknown ids", body = DeleteCustomerResponse)),
    security(("bearer_auth" = []))
)]
pub async fn delete_customer(
    user: web::ReqData<Claims>,
    service: web::Data<CustomerService>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (raw_status, id) = path.into_inner();
    let status = match parse_status(&raw_status) {
        Ok(status) => status,
        Err(e) => return e.error_response(),
    };

    log::info!("🗑️  DELETE /customers/{}/{} - user {}", status, id, user.sub);

    match service.delete_customer(status, &id).await {
        Ok(deleted) => HttpResponse::Ok().json(DeleteCustomerResponse {
            success: true,
            deleted,
        }),
        Err(e) => {
            log::error!("❌ Error deleting customer {}: {}", id, e);
            e.error_response()
        }
    }
}

/// POST /api/v1/customers/{status}/{id}/switch - Moves a customer to another view
#[utoipa::path(
    post,
    path = "/api/v1/customers/{status}/{id}/switch",
    tag = "Customers",
    params(
        ("status" = String, Path, description = "Current partition"),
        ("id" = String, Path, description = "Customer id")
    ),
    request_body = SwitchStatusRequest,
    responses(
        (status = 200, description = "Moved, or unchanged when already in the target", body = SwitchStatusResponse),
        (status = 404, description = "Not in the source partition"),
        (status = 503, description = "Commit rejected; customer was not moved")
    ),
    security(("bearer_auth" = []))
)]
pub async fn switch_status(
    user: web::ReqData<Claims>,
    service: web::Data<CustomerService>,
    path: web::Path<(String, String)>,
    request: web::Json<SwitchStatusRequest>,
) -> HttpResponse {
    let (raw_status, id) = path.into_inner();
    let from = match parse_status(&raw_status) {
        Ok(status) => status,
        Err(e) => return e.error_response(),
    };

    log::info!("🔀 POST /customers/{}/{}/switch -> {} - user {}", from, id, request.to, user.sub);

    match service.switch_status(from, &id, request.to).await {
        Ok(SwitchOutcome::Moved(customer)) => HttpResponse::Ok().json(SwitchStatusResponse {
            success: true,
            changed: true,
            customer,
        }),
        Ok(SwitchOutcome::Unchanged(customer)) => HttpResponse::Ok().json(SwitchStatusResponse {
            success: true,
            changed: false,
            customer,
        }),
        Err(e) => e.error_response(),
    }
}

/// GET /api/v1/customers/{status}/export - Spreadsheet of the view
#[utoipa::path(
    get,
    path = "/api/v1/customers/{status}/export",
    tag = "Customers",
    params(("status" = String, Path, description = "View to export")),
    responses(
        (status = 200, description = "xlsx file", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 422, description = "No customers in the view")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_customers(
    service: web::Data<CustomerService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let status = parse_status(&path)?;
    log::info!("📥 GET /customers/{}/export", status);

    let customers = service.list_customers(status).await?;
    let sheet = export_service::build_sheet(status, &customers)?;
    let bytes = export_service::render_xlsx(&sheet)?;

    metrics::record_export();
    log::info!("✅ Exported {} {} customers", sheet.rows.len(), status);

    Ok(HttpResponse::Ok()
        .content_type(export_service::XLSX_CONTENT_TYPE)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", sheet.file_name),
        ))
        .body(bytes))
}

fn sse_frame(event: &str, data: &serde_json::Value) -> web::Bytes {
    web::Bytes::from(format!("event: {}\ndata: {}\n\n", event, data))
}

fn snapshot_frame(list: &LiveList) -> web::Bytes {
    sse_frame(
        "snapshot",
        &serde_json::json!({
            "status": list.status(),
            "customers": list.customers(),
            "count": list.len(),
            "empty": list.is_empty(),
            "message": list.empty_message(),
        }),
    )
}

/// Frame for a change already applied to `list`.
fn change_frame(list: &LiveList, change: &ListChange) -> web::Bytes {
    match change {
        ListChange::Upserted(customer) => sse_frame(
            "added",
            &serde_json::json!({
                "customer": customer,
                "count": list.len(),
                "empty": false,
            }),
        ),
        ListChange::Removed(id) => sse_frame(
            "removed",
            &serde_json::json!({
                "id": id,
                "count": list.len(),
                "empty": list.is_empty(),
                "message": list.empty_message(),
            }),
        ),
    }
}

/// Frames for every change to `list`. A lagging subscriber gets a fresh
/// `snapshot`, or `resync` if the store cannot be read.
fn live_updates(
    service: web::Data<CustomerService>,
    list: LiveList,
    receiver: broadcast::Receiver<CustomerEvent>,
) -> impl Stream<Item = web::Bytes> {
    stream::unfold((list, receiver), move |(mut list, mut receiver)| {
        let service = service.clone();
        async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Some(change) = list.apply(&event) {
                            let frame = change_frame(&list, &change);
                            return Some((frame, (list, receiver)));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        let status = list.status();
                        log::warn!("⚠️  Live {} subscriber lagged by {} events", status, skipped);
                        let frame = match service.list_customers(status).await {
                            Ok(customers) => {
                                list = LiveList::new(status, customers);
                                snapshot_frame(&list)
                            }
                            Err(e) => {
                                log::error!("❌ Could not reload {} customers: {}", status, e);
                                sse_frame("resync", &serde_json::json!({ "skipped": skipped }))
                            }
                        };
                        return Some((frame, (list, receiver)));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    })
}

/// GET /api/v1/customers/{status}/live - Server-Sent Events for one view
///
/// Emits a `snapshot` first, then `added` / `removed` as the store commits
/// writes. Every frame carries the new `count` and `empty` state.
pub async fn live_customers(
    service: web::Data<CustomerService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let status = parse_status(&path)?;
    log::info!("📡 GET /customers/{}/live - subscriber attached", status);

    let (list, receiver) = service.watch(status).await?;
    let snapshot = snapshot_frame(&list);

    let body = stream::once(async move { snapshot })
        .chain(live_updates(service, list, receiver))
        .map(Ok::<_, Infallible>);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}
