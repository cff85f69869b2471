// [libs/domain/billing/src/commands.rs]
/*!
 * =================================================================
 * APARATO: CREDIT COMMAND HANDLERS (V1.0 - LEDGER GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONSUME / REFUND / ALLOCATE
 *
 * Las tres mutaciones comparten la misma forma:
 * 1. Comprobar idempotencia — si ya existe, devolver la transacción
 *    ganadora sin volver a mutar el balance.
 * 2. Abrir la unidad de trabajo con bloqueo de escritura (`BEGIN
 *    IMMEDIATE`), que serializa las mutaciones concurrentes del mismo
 *    ledger.
 * 3. Leer el ledger (para ALLOCATE: crearlo si no existe).
 * 4. Validar y calcular el nuevo balance.
 * 5. Insertar la entrada de auditoría. Una violación de unicidad sobre
 *    `idempotency_key` aquí es la señal de "perdí la carrera": se
 *    libera la transacción de escritura y se relee la fila ganadora
 *    en vez de propagar el fallo.
 * 6. Aplicar el nuevo balance y confirmar.
 * =================================================================
 */

use chrono::Utc;
use ledger_domain_models::{
    transaction::apply_balance_delta, CreditLedger, CreditTransaction, ErrorKind, LedgerError, Outcome,
    TransactionType,
};
use ledger_infra_db::repositories::{ledger, transaction as transaction_repo};
use ledger_infra_db::{DbError, TursoClient, UnitOfWork};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::dto::{AllocateCommand, ConsumeCommand, CreditTransactionResponse, RefundCommand};

fn to_response(entry: &CreditTransaction) -> CreditTransactionResponse {
    CreditTransactionResponse {
        transaction_id: entry.id.clone(),
        tenant_id: entry.tenant_id.clone(),
        transaction_type: entry.transaction_type.as_str().to_string(),
        amount: entry.amount,
        balance_before: entry.balance_before,
        balance_after: entry.balance_after,
        reference_type: entry.reference_type.clone(),
        reference_id: entry.reference_id.clone(),
        idempotency_key: entry.idempotency_key.clone(),
        created_at: entry.created_at,
    }
}

/// Intenta insertar la entrada de auditoría; si otro operador ganó la
/// carrera por la misma `idempotency_key`, relee su resultado en vez de
/// fallar.
async fn insert_or_read_winner(
    uow: &UnitOfWork,
    entry: &CreditTransaction,
) -> Outcome<Result<(), CreditTransaction>> {
    match transaction_repo::create(uow.handle(), entry).await {
        Ok(()) => Ok(Ok(())),
        Err(DbError::DuplicateIdempotencyKey) => {
            let winner = transaction_repo::get_by_idempotency_key(uow.handle(), &entry.idempotency_key)
                .await
                .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to re-read idempotency winner", e))?
                .ok_or_else(|| {
                    LedgerError::new(ErrorKind::ConsumeCreditFailed, "idempotency race lost but winner vanished")
                })?;
            Ok(Err(winner))
        }
        Err(db_fault) => Err(LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to persist transaction", db_fault)),
    }
}

/// Consume créditos del balance de un tenant.
#[instrument(skip(client, command), fields(tenant_id = %command.tenant_id))]
pub async fn consume(client: &TursoClient, command: ConsumeCommand) -> Outcome<CreditTransactionResponse> {
    if let Some(existing) = find_existing(client, &command.idempotency_key, ErrorKind::ConsumeCreditFailed).await? {
        return Ok(to_response(&existing));
    }

    let uow = UnitOfWork::begin_for_write(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to open write scope", e))?;

    let current_ledger = ledger::get_by_tenant(uow.handle(), &command.tenant_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to read ledger", e))?;

    let Some(current_ledger) = current_ledger else {
        return Err(LedgerError::new(
            ErrorKind::LedgerNotFound,
            format!("credit ledger not found for tenant {}", command.tenant_id),
        ));
    };

    if current_ledger.balance < command.amount {
        return Err(LedgerError::with_reason(
            ErrorKind::InsufficientCredit,
            format!(
                "insufficient credits. required: {}, available: {}",
                command.amount, current_ledger.balance
            ),
            format!("balance={}, required={}", current_ledger.balance, command.amount),
        ));
    }

    let balance_before = current_ledger.balance;
    let balance_after = apply_balance_delta(TransactionType::Consume, balance_before, command.amount);

    let entry = CreditTransaction {
        id: Uuid::new_v4().to_string(),
        tenant_id: command.tenant_id.clone(),
        ledger_id: current_ledger.id.clone(),
        transaction_type: TransactionType::Consume,
        amount: command.amount,
        balance_before,
        balance_after,
        reference_type: command.reference_type.clone(),
        reference_id: command.reference_id.clone(),
        idempotency_key: command.idempotency_key.clone(),
        created_at: Utc::now(),
    };

    match insert_or_read_winner(&uow, &entry).await? {
        Ok(()) => {}
        Err(winner) => {
            uow.rollback()
                .await
                .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to roll back lost race", e))?;
            return Ok(to_response(&winner));
        }
    }

    ledger::update_balance(uow.handle(), &current_ledger.id, balance_after, entry.created_at)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to update ledger balance", e))?;

    uow.commit()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::ConsumeCreditFailed, "failed to commit consume", e))?;

    Ok(to_response(&entry))
}

/// Reembolsa créditos al balance de un tenant. A diferencia de Consume,
/// no hay límite superior ni validación de suficiencia: los reembolsos
/// siempre son positivos y no tienen tope máximo.
#[instrument(skip(client, command), fields(tenant_id = %command.tenant_id))]
pub async fn refund(client: &TursoClient, command: RefundCommand) -> Outcome<CreditTransactionResponse> {
    if let Some(existing) = find_existing(client, &command.idempotency_key, ErrorKind::RefundCreditFailed).await? {
        return Ok(to_response(&existing));
    }

    let uow = UnitOfWork::begin_for_write(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::RefundCreditFailed, "failed to open write scope", e))?;

    let current_ledger = ledger::get_by_tenant(uow.handle(), &command.tenant_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::RefundCreditFailed, "failed to read ledger", e))?;

    let Some(current_ledger) = current_ledger else {
        return Err(LedgerError::new(
            ErrorKind::LedgerNotFound,
            format!("credit ledger not found for tenant {}", command.tenant_id),
        ));
    };

    let balance_before = current_ledger.balance;
    let balance_after = apply_balance_delta(TransactionType::Refund, balance_before, command.amount);

    let entry = CreditTransaction {
        id: Uuid::new_v4().to_string(),
        tenant_id: command.tenant_id.clone(),
        ledger_id: current_ledger.id.clone(),
        transaction_type: TransactionType::Refund,
        amount: command.amount,
        balance_before,
        balance_after,
        reference_type: command.reference_type.clone(),
        reference_id: command.reference_id.clone(),
        idempotency_key: command.idempotency_key.clone(),
        created_at: Utc::now(),
    };

    match insert_or_read_winner(&uow, &entry).await? {
        Ok(()) => {}
        Err(winner) => {
            uow.rollback()
                .await
                .map_err(|e| LedgerError::wrap(ErrorKind::RefundCreditFailed, "failed to roll back lost race", e))?;
            return Ok(to_response(&winner));
        }
    }

    ledger::update_balance(uow.handle(), &current_ledger.id, balance_after, entry.created_at)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::RefundCreditFailed, "failed to update ledger balance", e))?;

    uow.commit()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::RefundCreditFailed, "failed to commit refund", e))?;

    Ok(to_response(&entry))
}

/// Asigna créditos al balance de un tenant; a diferencia de Consume y
/// Refund, crea el ledger si no existe. Es el único camino legítimo
/// para el nacimiento de un ledger.
#[instrument(skip(client, command), fields(tenant_id = %command.tenant_id))]
pub async fn allocate(client: &TursoClient, command: AllocateCommand) -> Outcome<CreditTransactionResponse> {
    if let Some(existing) = find_existing(client, &command.idempotency_key, ErrorKind::AllocateCreditFailed).await? {
        return Ok(to_response(&existing));
    }

    let uow = UnitOfWork::begin_for_write(client)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to open write scope", e))?;

    let now = Utc::now();
    let existing_ledger = ledger::get_by_tenant(uow.handle(), &command.tenant_id)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to read ledger", e))?;

    let current_ledger = match existing_ledger {
        Some(found) => found,
        None => {
            let fresh = CreditLedger::newly_created(Uuid::new_v4().to_string(), command.tenant_id.clone(), now);
            ledger::create(uow.handle(), &fresh)
                .await
                .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to create ledger", e))?;
            fresh
        }
    };

    let balance_before = current_ledger.balance;
    let balance_after = apply_balance_delta(TransactionType::Allocate, balance_before, command.amount);

    let entry = CreditTransaction {
        id: Uuid::new_v4().to_string(),
        tenant_id: command.tenant_id.clone(),
        ledger_id: current_ledger.id.clone(),
        transaction_type: TransactionType::Allocate,
        amount: command.amount,
        balance_before,
        balance_after,
        reference_type: command.reference_type.clone(),
        reference_id: command.reference_id.clone(),
        idempotency_key: command.idempotency_key.clone(),
        created_at: now,
    };

    match insert_or_read_winner(&uow, &entry).await? {
        Ok(()) => {}
        Err(winner) => {
            uow.rollback()
                .await
                .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to roll back lost race", e))?;
            return Ok(to_response(&winner));
        }
    }

    ledger::update_balance(uow.handle(), &current_ledger.id, balance_after, now)
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to update ledger balance", e))?;

    uow.commit()
        .await
        .map_err(|e| LedgerError::wrap(ErrorKind::AllocateCreditFailed, "failed to commit allocation", e))?;

    Ok(to_response(&entry))
}

/// Comprobación de idempotencia previa a la apertura del alcance de
/// escritura: un `GET` barato antes del `BEGIN IMMEDIATE` evita competir
/// por el bloqueo en el camino feliz repetido.
async fn find_existing(
    client: &TursoClient,
    idempotency_key: &str,
    failure_kind: ErrorKind,
) -> Outcome<Option<CreditTransaction>> {
    let uow = UnitOfWork::begin_read_only(client)
        .await
        .map_err(|e| LedgerError::wrap(failure_kind, "failed to open read scope", e))?;

    let found = transaction_repo::get_by_idempotency_key(uow.handle(), idempotency_key)
        .await
        .map_err(|e| LedgerError::wrap(failure_kind, "failed to check idempotency", e))?;

    if found.is_some() {
        warn!(idempotency_key, "idempotent replay detected, skipping mutation");
    }

    Ok(found)
}
