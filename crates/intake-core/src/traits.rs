//! Trait abstractions for the persistence boundary.
//!
//! This module provides the [`PersistenceGateway`] trait that the pipeline
//! writes through. `intake-store` implements it over SQLite; tests implement
//! it with in-memory fakes.

use async_trait::async_trait;

use intake_types::{AggregateMetric, ReadingBatch};

use crate::error::Result;

/// Rows written by one successful [`PersistenceGateway::persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Reading rows inserted.
    pub readings: usize,
    /// Metric rows inserted.
    pub metrics: usize,
}

/// Writes a validated batch and its metrics as a single unit.
///
/// Implementations must either commit every reading row and every metric row
/// or commit nothing and return [`crate::Error::PersistenceFailure`]. Readings
/// are written before metrics.
///
/// # Example
///
/// ```ignore
/// use intake_core::{PersistenceGateway, metrics};
///
/// async fn save<G: PersistenceGateway>(gateway: &G, batch: &ReadingBatch) -> Result<()> {
///     let metrics = metrics::aggregate(batch)?;
///     let summary = gateway.persist(batch, &metrics).await?;
///     println!("{} readings stored", summary.readings);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Persist `batch` and `metrics` atomically.
    async fn persist(
        &self,
        batch: &ReadingBatch,
        metrics: &[AggregateMetric],
    ) -> Result<PersistSummary>;
}

#[async_trait]
impl<T: PersistenceGateway + ?Sized> PersistenceGateway for std::sync::Arc<T> {
    async fn persist(
        &self,
        batch: &ReadingBatch,
        metrics: &[AggregateMetric],
    ) -> Result<PersistSummary> {
        (**self).persist(batch, metrics).await
    }
}
