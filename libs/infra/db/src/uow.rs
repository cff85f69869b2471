// [libs/infra/db/src/uow.rs]
/*!
 * =================================================================
 * APARATO: UNIT OF WORK (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ALCANCE TRANSACCIONAL ATÓMICO
 *
 * SQLite/libSQL no expone bloqueo de fila (`SELECT ... FOR UPDATE`).
 * Para emular la exclusión mutua por tenant que necesita el manejador de
 * comando al adquirir el ledger, una escritura abre la transacción en
 * modo `BEGIN IMMEDIATE`: adquiere el bloqueo de escritura de toda la
 * base de datos al abrir, en vez de al primer `INSERT`/`UPDATE`. Es más
 * grueso que un bloqueo de fila, pero entrega la misma serialización de
 * mutaciones concurrentes sobre un mismo ledger. Las rutas de sólo
 * lectura abren en modo diferido: no compiten por el bloqueo de
 * escritura.
 * =================================================================
 */

use crate::client::TursoClient;
use crate::errors::DbError;
use libsql::{Transaction, TransactionBehavior};
use tracing::instrument;

pub struct UnitOfWork {
    transaction: Transaction,
}

impl UnitOfWork {
    /// Abre un alcance transaccional que reserva el bloqueo de escritura
    /// de inmediato.
    #[instrument(skip(client))]
    pub async fn begin_for_write(client: &TursoClient) -> Result<Self, DbError> {
        let connection = client.get_connection()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(DbError::from)?;
        Ok(Self { transaction })
    }

    /// Abre un alcance transaccional diferido para consultas de sólo
    /// lectura: no compite por el bloqueo de escritura con mutaciones
    /// concurrentes.
    #[instrument(skip(client))]
    pub async fn begin_read_only(client: &TursoClient) -> Result<Self, DbError> {
        let connection = client.get_connection()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .await
            .map_err(DbError::from)?;
        Ok(Self { transaction })
    }

    pub fn handle(&self) -> &Transaction {
        &self.transaction
    }

    pub async fn commit(self) -> Result<(), DbError> {
        self.transaction.commit().await.map_err(DbError::from)
    }

    /// El rollback es explícito en las rutas de error; un `drop` sin
    /// commit también revierte (comportamiento de `libsql::Transaction`),
    /// pero los manejadores de comando llaman a esto para dejar la
    /// intención clara en el sitio de la llamada.
    pub async fn rollback(self) -> Result<(), DbError> {
        self.transaction.rollback().await.map_err(DbError::from)
    }
}
