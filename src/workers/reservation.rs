use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditClient, AuditEventKind};
use crate::error::Error;
use crate::rpc::{decode_params, RpcService};
use crate::store::{with_deadline, NewReservation, ReservationStore};

/// Full call target for creating a reservation.
pub const CREATE_METHOD: &str = "Reservation.create";

/// Parameters of [`CREATE_METHOD`].
///
/// Built by the gateway after the caller's token is verified; `user_id` is
/// the token subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    /// Restaurant being booked
    #[serde(rename = "restaurantID")]
    pub restaurant_id: String,
    /// Verified subject
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Party size
    pub count: u32,
    /// Requested time
    #[serde(rename = "reservationTime")]
    pub reservation_time: String,
    /// Free-text remarks
    #[serde(default)]
    pub remarks: String,
}

impl CreateReservation {
    fn into_new(self) -> Result<NewReservation, Error> {
        if self.user_id.trim().is_empty() {
            return Err(Error::validation("userID is required"));
        }
        if self.restaurant_id.trim().is_empty() {
            return Err(Error::validation("restaurantID is required"));
        }
        if self.count == 0 {
            return Err(Error::validation("count must be positive"));
        }
        Ok(NewReservation {
            restaurant_id: self.restaurant_id,
            user_id: self.user_id,
            count: self.count,
            reservation_time: self.reservation_time,
            remarks: self.remarks,
        })
    }
}

/// The `Reservation` service.
pub struct ReservationService<S> {
    store: S,
    audit: AuditClient,
    db_timeout: Duration,
}

impl<S: ReservationStore> ReservationService<S> {
    /// Creates the service over `store`, auditing through `audit`.
    pub fn new(store: S, audit: AuditClient, db_timeout: Duration) -> Self {
        Self {
            store,
            audit,
            db_timeout,
        }
    }

    /// Writes one reservation and returns its status line.
    ///
    /// The `Reservation_Created` audit record is sent on a detached task; its
    /// outcome never reaches the caller.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an incomplete payload, [`Error::Persistence`]
    /// if the write fails or exceeds the persistence deadline.
    pub async fn create(&self, params: CreateReservation) -> Result<String, Error> {
        let record = with_deadline(self.db_timeout, self.store.insert(params.into_new()?)).await?;

        let status = format!(
            "Reservation: {} successfully created for userID: {}",
            record.id, record.user_id
        );
        tracing::info!(reservation_id = %record.id, user_id = %record.user_id, "reservation created");

        let audit = self.audit.clone();
        let data = status.clone();
        tokio::spawn(async move {
            audit.record(AuditEventKind::ReservationCreated, data).await;
        });

        Ok(status)
    }
}

#[async_trait]
impl<S: ReservationStore> RpcService for ReservationService<S> {
    fn name(&self) -> &'static str {
        "Reservation"
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<String, Error> {
        match method {
            "create" => self.create(decode_params(params)?).await,
            other => Err(Error::validation(format!("unknown method 'Reservation.{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::rpc::RpcClient;
    use crate::store::{MemoryReservationStore, ReservationRecord};

    fn dead_audit() -> AuditClient {
        // Port 9 on loopback refuses connections, so audit attempts fail fast.
        AuditClient::new(RpcClient::new("127.0.0.1:9", Duration::from_millis(200)))
    }

    fn service(store: MemoryReservationStore) -> ReservationService<MemoryReservationStore> {
        ReservationService::new(store, dead_audit(), Duration::from_secs(3))
    }

    fn params() -> serde_json::Value {
        serde_json::json!({
            "restaurantID": "7",
            "userID": "42",
            "count": 2,
            "reservationTime": "2026-10-20T19:00:00Z",
            "remarks": "window seat"
        })
    }

    #[tokio::test]
    async fn create_reports_id_and_subject() {
        let store = MemoryReservationStore::new();
        let svc = service(store.clone());

        let status = svc.call("create", params()).await.unwrap();
        assert_eq!(status, "Reservation: 1 successfully created for userID: 42");

        let rows = store.records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "42");
        assert_eq!(rows[0].count, 2);
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_create() {
        let store = MemoryReservationStore::new();
        let status = service(store).call("create", params()).await;
        assert!(status.is_ok());
    }

    #[tokio::test]
    async fn store_failure_is_returned() {
        let store = MemoryReservationStore::new();
        store.fail_inserts(Some("constraint violated"));
        let err = service(store).call("create", params()).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(PersistenceError::Rejected(_))));
    }

    #[tokio::test]
    async fn zero_count_is_rejected_before_write() {
        let store = MemoryReservationStore::new();
        let mut p = params();
        p["count"] = serde_json::json!(0);
        let err = service(store.clone()).call("create", p).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let err = service(MemoryReservationStore::new())
            .call("delete", params())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    struct Stuck;

    #[async_trait]
    impl ReservationStore for Stuck {
        async fn insert(&self, _: NewReservation) -> Result<ReservationRecord, PersistenceError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_hits_persistence_deadline() {
        let svc = ReservationService::new(Stuck, dead_audit(), Duration::from_secs(3));
        let err = svc.call("create", params()).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(PersistenceError::Timeout(_))));
    }
}
