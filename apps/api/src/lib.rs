// [apps/api/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER HTTP FAÇADE (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: FACHADA HTTP DELGADA SOBRE LOS MANEJADORES DE DOMINIO
 *
 * Expone únicamente el ensamblaje del router (`build_router`) y el
 * estado compartido (`AppState`) — el binario (`main.rs`) decide cómo
 * cargar configuración, inicializar tracing y enlazar el socket.
 * =================================================================
 */

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
