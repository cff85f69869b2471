// [apps/api/src/main.rs]
/*!
 * =================================================================
 * APARATO: LEDGER API MAIN ENTRY POINT (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN DEL SERVIDOR
 *
 * Sigue la secuencia de arranque del `main.rs` original del monorepo:
 * carga de `.env`, inicialización de Heimdall, lectura de configuración
 * tipada, conexión a la base de datos y levantamiento del servidor Axum.
 * =================================================================
 */

use ledger_api::{build_router, AppState};
use ledger_infra_db::TursoClient;
use ledger_shared_config::AppConfig;
use ledger_shared_heimdall::init_tracing;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("ledger_api");

    let config = AppConfig::load().map_err(|fault| {
        error!(error = %fault, "failed to load configuration");
        fault
    })?;

    info!(db_uri = %config.db_uri, "connecting to ledger database");
    let database_client = TursoClient::connect(&config.db_uri, config.db_auth_token.clone()).await?;

    let state = AppState::new(database_client);
    let router = build_router(state);

    let bind_address = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(address = %bind_address, "ledger api listening");
    axum::serve(listener, router).await?;

    Ok(())
}
