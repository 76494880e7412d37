//! hosting Server Binary
//!
//! Runs the HTTP/WebSocket server that fronts the Hub: one `/ws` upgrade
//! route per spec §6, CORS + request logging matching the teacher's
//! `hosting::Server::run`, generalized from the teacher's `/start`,
//! `/enter/{room_id}`, `/leave/{room_id}` trio (player-created rooms) to a
//! fixed table roster that already exists when the process comes up.

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use anyhow::Context;
use holdem_table_server::config::Config;
use holdem_table_server::hub::Hub;
use holdem_table_server::{connection, init_logging, spawn_shutdown_listener};
use std::collections::HashMap;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_logging(&config.log_level);
    let bind_addr = config.bind_addr.clone();

    let hub = Hub::new(config);
    hub.spawn_lobby_task();
    spawn_shutdown_listener(hub.clone());

    log::info!("binding on {bind_addr}");
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(web::Data::new(hub.clone()))
            .route("/ws", web::get().to(ws))
    })
    .workers(num_cpus_or_default())
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {bind_addr}"));

    let server = match server {
        Ok(server) => server,
        Err(err) => {
            log::error!("{err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        log::error!("server exited with error: {err}");
        std::process::exit(1);
    }
}

/// Upgrades an inbound HTTP request to a WebSocket, pulling the optional
/// `?token=` reconnection credential off the query string (spec §6:
/// "the client may supply a previous token as a URL query parameter named
/// `token`").
async fn ws(
    req: HttpRequest,
    body: web::Payload,
    hub: web::Data<std::sync::Arc<Hub>>,
) -> impl Responder {
    let token = query_param(req.query_string(), "token");
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            let hub = hub.get_ref().clone();
            actix_web::rt::spawn(connection::run(hub, session, stream, token));
            response
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    web::Query::<HashMap<String, String>>::from_query(query)
        .ok()
        .and_then(|q| q.get(key).cloned())
}

fn num_cpus_or_default() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
