// [apps/api/src/bin/migrator.rs]
/*!
 * =================================================================
 * APARATO: DB MIGRATOR CLI (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: OPS INFRASTRUCTURE (ESTRATO L6)
 * RESPONSABILIDAD: APLICACIÓN IDEMPOTENTE DEL ESQUEMA DEL LEDGER
 *
 * Conecta contra `DB_URI`/`DB_AUTH_TOKEN`, aplica el esquema completo
 * del ledger (tablas + índices, ya idempotente en sí mismo) y termina.
 * Mantenido por paridad operativa aunque el esquema también se aplica
 * de forma perezosa en cada arranque de los workers.
 * =================================================================
 */

use ledger_infra_db::schema::apply_full_ledger_schema;
use ledger_infra_db::TursoClient;
use ledger_shared_config::AppConfig;
use ledger_shared_heimdall::init_tracing;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("ledger_migrator");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        info!("applying credit-ledger schema");

        let config = AppConfig::load()?;

        let client = match TursoClient::connect(&config.db_uri, config.db_auth_token.clone()).await {
            Ok(client) => client,
            Err(connection_error) => {
                error!(error = %connection_error, "failed to connect to the ledger database");
                return Err(anyhow::anyhow!(connection_error));
            }
        };

        let connection = client
            .get_connection()
            .map_err(|error| anyhow::anyhow!("connection pool exhausted: {}", error))?;

        match apply_full_ledger_schema(&connection).await {
            Ok(_) => {
                info!("schema applied, ledger database is up to date");
                Ok(())
            }
            Err(schema_fault) => {
                error!(error = %schema_fault, "schema application failed");
                std::process::exit(1);
            }
        }
    })
}
