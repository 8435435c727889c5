use crate::engine::BalanceEngine;
use crate::errors::BalanceError;
use crate::models;
use std::sync::Arc;
use tonic::{Request, Response, Status};

// Include generated protobuf code
pub mod balance {
    tonic::include_proto!("balance");
}

use balance::balance_service_server::BalanceService;
use balance::{
    CreateOperationRequest, CreateOperationResponse, GetBalanceRequest, GetBalanceResponse,
    ListOperationsRequest, ListOperationsResponse,
};

pub struct BalanceGrpcServer {
    engine: Arc<BalanceEngine>,
}

impl BalanceGrpcServer {
    pub fn new(engine: Arc<BalanceEngine>) -> Self {
        Self { engine }
    }
}

#[tonic::async_trait]
impl BalanceService for BalanceGrpcServer {
    async fn create_operation(
        &self,
        request: Request<CreateOperationRequest>,
    ) -> Result<Response<CreateOperationResponse>, Status> {
        let req = request.into_inner();

        if req.owner_id.is_empty() {
            return Err(Status::invalid_argument("owner_id is required"));
        }
        let kind = kind_from_proto(req.kind)?;

        let entry = self
            .engine
            .create_operation(
                &req.owner_id,
                models::NewOperation {
                    id: None,
                    amount: req.amount,
                    kind,
                    description: req.description,
                },
            )
            .await
            .map_err(status_from)?;

        Ok(Response::new(CreateOperationResponse {
            entry: Some(entry_to_proto(&entry)),
        }))
    }

    async fn get_balance(
        &self,
        request: Request<GetBalanceRequest>,
    ) -> Result<Response<GetBalanceResponse>, Status> {
        let req = request.into_inner();

        if req.owner_id.is_empty() {
            return Err(Status::invalid_argument("owner_id is required"));
        }

        let account = self
            .engine
            .get_balance(&req.owner_id)
            .await
            .map_err(status_from)?;

        Ok(Response::new(GetBalanceResponse {
            balance: account.balance,
        }))
    }

    async fn list_operations(
        &self,
        request: Request<ListOperationsRequest>,
    ) -> Result<Response<ListOperationsResponse>, Status> {
        let req = request.into_inner();

        if req.owner_id.is_empty() {
            return Err(Status::invalid_argument("owner_id is required"));
        }

        let (entries, total) = self
            .engine
            .list_operations(&req.owner_id, req.limit as i64, req.offset as i64)
            .await
            .map_err(status_from)?;

        Ok(Response::new(ListOperationsResponse {
            entries: entries.iter().map(entry_to_proto).collect(),
            total: total as i32,
        }))
    }
}

/// Total mapping from the core error taxonomy to wire status codes.
fn status_from(err: BalanceError) -> Status {
    match err {
        BalanceError::InvalidOperation(msg) => Status::invalid_argument(msg),
        BalanceError::AccountNotFound(owner) => {
            Status::not_found(format!("account not found for owner {owner}"))
        }
        BalanceError::InsufficientFunds {
            requested,
            available,
        } => Status::failed_precondition(format!(
            "insufficient funds: requested {requested}, available {available}"
        )),
        BalanceError::Database(_) | BalanceError::Internal(_) => {
            Status::internal("internal error")
        }
    }
}

fn kind_from_proto(kind: i32) -> Result<models::OperationKind, Status> {
    match balance::OperationKind::try_from(kind) {
        Ok(balance::OperationKind::Deposit) => Ok(models::OperationKind::Deposit),
        Ok(balance::OperationKind::Withdraw) => Ok(models::OperationKind::Withdraw),
        Ok(balance::OperationKind::Unspecified) | Err(_) => {
            Err(Status::invalid_argument("kind is required"))
        }
    }
}

fn kind_to_proto(kind: models::OperationKind) -> balance::OperationKind {
    match kind {
        models::OperationKind::Deposit => balance::OperationKind::Deposit,
        models::OperationKind::Withdraw => balance::OperationKind::Withdraw,
    }
}

fn entry_to_proto(entry: &models::LedgerEntry) -> balance::LedgerEntry {
    balance::LedgerEntry {
        id: entry.id.to_string(),
        account_id: entry.account_id.to_string(),
        amount: entry.amount,
        kind: kind_to_proto(entry.kind) as i32,
        description: entry.description.clone(),
        // Unix microseconds: full round-trip fidelity with what Postgres stores.
        created_at: entry.created_at.timestamp_micros(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_mapping_is_total() {
        assert_eq!(
            status_from(BalanceError::InvalidOperation("bad amount".into())).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            status_from(BalanceError::AccountNotFound("u1".into())).code(),
            Code::NotFound
        );
        assert_eq!(
            status_from(BalanceError::InsufficientFunds {
                requested: 60,
                available: 50
            })
            .code(),
            Code::FailedPrecondition
        );
        assert_eq!(
            status_from(BalanceError::Internal("boom".into())).code(),
            Code::Internal
        );
        assert_eq!(
            status_from(BalanceError::Database(sqlx::Error::RowNotFound)).code(),
            Code::Internal
        );
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let status = status_from(BalanceError::Internal("connection refused".into()));
        assert_eq!(status.message(), "internal error");
    }

    #[test]
    fn test_unspecified_kind_rejected() {
        let err = kind_from_proto(balance::OperationKind::Unspecified as i32).unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert!(kind_from_proto(99).is_err());
    }

    #[test]
    fn test_wire_timestamp_keeps_microsecond_precision() {
        use chrono::TimeZone;

        let created_at = chrono::Utc
            .timestamp_micros(1_717_200_000_123_456)
            .single()
            .unwrap();
        let entry = models::LedgerEntry {
            id: uuid::Uuid::new_v4(),
            account_id: uuid::Uuid::new_v4(),
            amount: 100,
            kind: models::OperationKind::Deposit,
            description: String::new(),
            created_at,
        };

        let proto = entry_to_proto(&entry);
        assert_eq!(proto.created_at, created_at.timestamp_micros());
        let recovered = chrono::Utc
            .timestamp_micros(proto.created_at)
            .single()
            .unwrap();
        assert_eq!(recovered, created_at);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [models::OperationKind::Deposit, models::OperationKind::Withdraw] {
            let proto = kind_to_proto(kind) as i32;
            assert_eq!(kind_from_proto(proto).unwrap(), kind);
        }
    }
}
