//! The catch-all proxy route: converts an inbound actix-web request into a
//! [`RequestContext`], hands it to the [`Dispatcher`], and converts the
//! resulting [`ResponseParts`] back into an `HttpResponse`.

use std::sync::Arc;
use std::time::Instant;

use actix_web::error::ResponseError;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::context::RequestContext;
use crate::dispatcher::Dispatcher;

fn build_context(req: &HttpRequest, body: web::Bytes) -> RequestContext {
    let mut ctx = RequestContext::new(req.method().as_str(), req.path(), Instant::now());
    ctx.raw_query = req.query_string().to_string();
    ctx.remote_addr = req.peer_addr().map(|addr| addr.ip().to_string());
    ctx.body = body;
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            ctx.headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }
    ctx
}

async fn proxy(dispatcher: web::Data<Arc<Dispatcher>>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let ctx = build_context(&req, body);
    match dispatcher.dispatch(ctx).await {
        Ok(parts) => {
            let mut builder = HttpResponse::build(
                actix_web::http::StatusCode::from_u16(parts.status)
                    .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY),
            );
            for (name, value) in &parts.headers {
                builder.insert_header((name.as_str(), value.as_str()));
            }
            builder.body(parts.body)
        }
        Err(e) => e.error_response(),
    }
}

/// Configures the catch-all proxy route.
///
/// # Examples
///
/// ```rust
/// use actix_web::{web, App};
/// use gateway_rs::routes::http::configure_route;
///
/// let app = App::new().configure(configure_route);
/// ```
pub fn configure_route(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(10 * 1024 * 1024))
        .service(web::resource("/{tail:.*}").to(proxy));
}
