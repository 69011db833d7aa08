#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use actix_web::dev::ServerHandle;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use serde_json::json;
use tracing::{debug, error, info};

use crate::domain::AppState;
use crate::service::health_report;

#[get("/healthz")]
pub async fn healthz(data: web::Data<AppState>) -> HttpResponse {
    let report = health_report(&data.board, &data.metrics, chrono::Utc::now().timestamp());
    HttpResponse::Ok().json(report)
}

#[get("/status")]
pub async fn status(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.board.snapshot(chrono::Utc::now().timestamp()))
}

#[get("/metrics")]
pub async fn scrape_metrics(data: web::Data<AppState>) -> HttpResponse {
    match data.metrics.encode_text() {
        Ok(buf) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buf),
        Err(e) => {
            error!(error=%format!("{e:#}"), "encode metrics failed");
            HttpResponse::InternalServerError()
                .json(json!({"status":"error","reason":"encode metrics failed"}))
        }
    }
}

/// Starts the status server on its own thread and returns a handle to stop it.
pub fn spawn_status_server(bind: String, state: AppState) -> std::io::Result<ServerHandle> {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("status-server".into())
        .spawn(move || {
            let sys = actix_web::rt::System::new();
            let result = sys.block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(state.clone()))
                        .service(healthz)
                        .service(status)
                        .service(scrape_metrics)
                })
                .workers(1)
                .disable_signals()
                .bind(bind.as_str());
                let server = match server {
                    Ok(s) => s.run(),
                    Err(e) => {
                        if tx.send(Err(e)).is_err() {
                            debug!("status server caller went away before bind result");
                        }
                        return Ok(());
                    }
                };
                if tx.send(Ok(server.handle())).is_err() {
                    debug!("status server caller went away before server handle");
                }
                info!(bind = %bind, "status server listening");
                server.await
            });
            if let Err(e) = result {
                error!(error = %e, "status server stopped with error");
            }
        })?;
    rx.recv()
        .map_err(|_| std::io::Error::other("status server thread exited before binding"))?
}
