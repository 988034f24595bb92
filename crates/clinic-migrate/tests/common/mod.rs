//! Fixtures and recording store doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use clinic_migrate::{
    BatchOutcome, EntityFilter, EntityKind, MemorySource, MemoryTarget, MigrateError, Result,
    SourceReader, SourceRecord, TargetId, TargetRecord, TargetWriter,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

static TRACING: Once = Once::new();

/// Route tracing output through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("clinic_migrate=debug")
            .try_init();
    });
}

fn created(i: usize) -> String {
    format!("2021-01-01T{:02}:{:02}:{:02}Z", i / 3600, (i / 60) % 60, i % 60)
}

pub fn user(i: usize) -> SourceRecord {
    SourceRecord::from_json(
        EntityKind::User,
        json!({
            "objectId": format!("user{:04}", i),
            "email": format!("user{}@clinic.test", i),
            "firstName": "Test",
            "role": (i % 3) as i64,
            "createdAt": created(i),
        }),
    )
}

pub fn users(n: usize) -> Vec<SourceRecord> {
    (0..n).map(user).collect()
}

pub fn client(i: usize) -> SourceRecord {
    SourceRecord::from_json(
        EntityKind::ClientProfile,
        json!({
            "objectId": format!("client{:04}", i),
            "user": {"__type": "Pointer", "className": "_User", "objectId": format!("user{:04}", i)},
            "fullName": format!("Client {}", i),
            "status": 0,
            "createdAt": created(i),
        }),
    )
}

pub fn professional(i: usize) -> SourceRecord {
    SourceRecord::from_json(
        EntityKind::ProfessionalProfile,
        json!({
            "objectId": format!("pro{:04}", i),
            "user": format!("user{:04}", i),
            "specialty": "Cardiology",
            "professionalType": 1,
            "location": {"__type": "GeoPoint", "latitude": -23.55, "longitude": -46.63},
            "createdAt": created(i),
        }),
    )
}

pub fn appointment(i: usize) -> SourceRecord {
    SourceRecord::from_json(
        EntityKind::Appointment,
        json!({
            "objectId": format!("appt{:04}", i),
            "client": format!("client{:04}", i % 5),
            "professional": format!("pro{:04}", i % 2),
            "date": {"__type": "Date", "iso": "2023-05-10T14:30:00.000Z"},
            "status": 1,
            "createdAt": created(i),
        }),
    )
}

/// A small clinic: 12 users, 5 clients, 2 professionals, 9 appointments.
pub fn clinic() -> MemorySource {
    let mut records = users(12);
    records.extend((0..5).map(client));
    records.extend((0..2).map(professional));
    records.extend((0..9).map(appointment));
    MemorySource::with_records(records)
}

/// Source that delegates to a [`MemorySource`] and can become unavailable.
pub struct FlakySource {
    inner: MemorySource,
    pages: AtomicUsize,
    /// `page` fails with `SourceUnavailable` from this call on (0-based).
    fail_from_page: Option<usize>,
}

impl FlakySource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            pages: AtomicUsize::new(0),
            fail_from_page: None,
        }
    }

    pub fn failing_from_page(mut self, call: usize) -> Self {
        self.fail_from_page = Some(call);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceReader for FlakySource {
    async fn count(&self, kind: EntityKind, filter: Option<&EntityFilter>) -> Result<u64> {
        self.inner.count(kind, filter).await
    }

    async fn page(
        &self,
        kind: EntityKind,
        filter: Option<&EntityFilter>,
        skip: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>> {
        let call = self.pages.fetch_add(1, Ordering::SeqCst);
        if self.fail_from_page.map_or(false, |n| call >= n) {
            return Err(MigrateError::source_unavailable("connection reset by peer"));
        }
        self.inner.page(kind, filter, skip, limit).await
    }

    fn store_type(&self) -> &str {
        "flaky"
    }
}

/// Target that records every commit and can inject failures.
#[derive(Default)]
pub struct RecordingTarget {
    pub inner: MemoryTarget,
    commits: Mutex<Vec<(EntityKind, Vec<String>)>>,
    /// Commit calls (0-based) whose batch is rejected.
    reject_commits: Vec<usize>,
    /// Commit call (0-based) that fails with `TargetUnavailable`.
    unavailable_at: Option<usize>,
    /// Source ids the store refuses individually; the rest of the batch is written.
    failing_ids: Vec<String>,
    /// Cancelled right after the given number of successful commits.
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.reject_commits = calls.into_iter().collect();
        self
    }

    pub fn failing_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.failing_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn unavailable_at(mut self, call: usize) -> Self {
        self.unavailable_at = Some(call);
        self
    }

    pub fn cancel_after(mut self, commits: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((commits, token));
        self
    }

    /// Sizes of every commit call, in order.
    pub fn commit_sizes(&self) -> Vec<usize> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, ids)| ids.len())
            .collect()
    }

    /// Source ids of every commit call, in order.
    pub fn committed_ids(&self) -> Vec<Vec<String>> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, ids)| ids.clone())
            .collect()
    }

    pub fn commit_calls(&self) -> usize {
        self.commits.lock().unwrap().len()
    }
}

#[async_trait]
impl TargetWriter for RecordingTarget {
    async fn commit(&self, kind: EntityKind, batch: Vec<TargetRecord>) -> Result<BatchOutcome> {
        let call = {
            let mut commits = self.commits.lock().unwrap();
            commits.push((kind, batch.iter().map(|r| r.source_id.clone()).collect()));
            commits.len() - 1
        };

        if self.unavailable_at == Some(call) {
            return Err(MigrateError::target_unavailable("permission denied"));
        }
        if self.reject_commits.contains(&call) {
            return Ok(BatchOutcome::rejected(&batch, "batch write failed: deadline exceeded"));
        }

        let attempted = batch.len();
        let (refused, accepted): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|r| self.failing_ids.contains(&r.source_id));
        let mut outcome = self.inner.commit(kind, accepted).await?;
        outcome.attempted = attempted;
        outcome.failed_record_ids = refused.into_iter().map(|r| r.source_id).collect();
        if let Some((after, token)) = &self.cancel_after {
            if call + 1 == *after {
                token.cancel();
            }
        }
        Ok(outcome)
    }

    async fn exists(&self, kind: EntityKind, id: &TargetId) -> Result<bool> {
        self.inner.exists(kind, id).await
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        self.inner.count(kind).await
    }

    fn store_type(&self) -> &str {
        "recording"
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
