// [apps/api/src/state.rs]
/*!
 * =================================================================
 * APARATO: API SHARED STATE (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: CONTENEDOR DE DEPENDENCIAS COMPARTIDAS DEL FAÇADE
 *
 * Deliberadamente delgado: este estado sólo porta lo que la fachada
 * HTTP necesita: el cliente de persistencia y la identidad de la
 * compañía usada en el renderizado de proformas.
 * =================================================================
 */

use ledger_infra_db::TursoClient;

#[derive(Clone)]
pub struct AppState {
    pub database_client: TursoClient,
    pub company_name: String,
    pub company_address: String,
}

impl AppState {
    pub fn new(database_client: TursoClient) -> Self {
        Self {
            database_client,
            company_name: "metaShark Tech".to_string(),
            company_address: "Remote-first, planet Earth".to_string(),
        }
    }
}
