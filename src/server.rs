//! Process composition: pool, transaction boundary, stores, engine and the
//! two listener surfaces (gRPC for the balance API, HTTP for health and
//! metrics), built in dependency order at startup.

use crate::config::Config;
use crate::engine::BalanceEngine;
use crate::errors::{BalanceError, Result};
use crate::grpc::server::balance::balance_service_server::BalanceServiceServer;
use crate::grpc::BalanceGrpcServer;
use crate::store::{AccountStore, LedgerStore, TierStore};
use crate::tx::TxManager;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    database: bool,
}

pub struct BalanceServer {
    config: Arc<Config>,
    db_pool: PgPool,
}

impl BalanceServer {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let db_pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;

        info!("Database connection pool established");

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .map_err(|e| BalanceError::Internal(format!("migration failed: {e}")))?;

        info!("Schema migrations applied");

        Ok(Self { config, db_pool })
    }

    pub async fn start(self) -> Result<()> {
        let config = self.config.clone();
        let db_pool = self.db_pool.clone();

        // Build the core in dependency order: boundary, stores, engine.
        let tx = TxManager::new(db_pool.clone());
        let engine = Arc::new(BalanceEngine::new(
            db_pool.clone(),
            tx,
            AccountStore::new(),
            LedgerStore::new(),
            TierStore::new(),
        ));

        // Start gRPC server
        let grpc_server = BalanceGrpcServer::new(engine.clone());
        let grpc_addr = format!("{}:{}", config.server.host, config.server.grpc_port)
            .parse()
            .map_err(|e| BalanceError::Internal(format!("invalid gRPC address: {e}")))?;
        let grpc_config = config.clone();

        tokio::spawn(async move {
            info!(
                "Starting gRPC server on port {}",
                grpc_config.server.grpc_port
            );

            if let Err(e) = Server::builder()
                .add_service(BalanceServiceServer::new(grpc_server))
                .serve(grpc_addr)
                .await
            {
                error!("gRPC server error: {}", e);
            }
        });

        // Start HTTP server for health checks and metrics
        let http_port = config.server.http_port;
        let http_db_pool = db_pool.clone();

        info!("Starting HTTP server on port {}", http_port);

        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(http_db_pool.clone()))
                .route("/health", web::get().to(Self::health_check))
                .route("/metrics", web::get().to(Self::metrics))
        })
        .bind(format!("{}:{}", config.server.host, http_port))
        .map_err(|e| BalanceError::Internal(format!("HTTP bind failed: {e}")))?
        .run()
        .await
        .map_err(|e| BalanceError::Internal(format!("HTTP server error: {e}")))?;

        Ok(())
    }

    async fn health_check(db_pool: web::Data<PgPool>) -> impl Responder {
        let db_healthy = sqlx::query("SELECT 1")
            .fetch_one(db_pool.get_ref())
            .await
            .is_ok();

        let status = if db_healthy { "healthy" } else { "unhealthy" };

        HttpResponse::Ok().json(HealthResponse {
            status: status.to_string(),
            service: "balance-engine".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: db_healthy,
        })
    }

    async fn metrics() -> impl Responder {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];

        match encoder.encode(&metric_families, &mut buffer) {
            Ok(_) => match String::from_utf8(buffer) {
                Ok(body) => HttpResponse::Ok()
                    .content_type("text/plain; version=0.0.4")
                    .body(body),
                Err(e) => HttpResponse::InternalServerError()
                    .body(format!("Failed to encode metrics: {}", e)),
            },
            Err(e) => HttpResponse::InternalServerError()
                .body(format!("Failed to gather metrics: {}", e)),
        }
    }
}
