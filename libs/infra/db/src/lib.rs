// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEDGER PERSISTENCE ADAPTER (V1.0 - GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 *
 * Expone el cliente de conexión (`TursoClient`), la unidad de trabajo
 * transaccional (`UnitOfWork`) y los repositorios de agregación por
 * entidad. Toda la capa de dominio depende de este crate únicamente a
 * través de estos tres puntos de entrada.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;
pub mod uow;

pub use client::TursoClient;
pub use errors::DbError;
pub use uow::UnitOfWork;
