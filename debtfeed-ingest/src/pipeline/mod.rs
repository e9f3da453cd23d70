//! CSV ingestion pipeline
//!
//! Reads a feed, validates each row, skips debts already stored, and writes
//! new debts in bulk batches. Every debt the run touches gets invoice and
//! email fan-out tasks: `is_new = true` for debts created here, `false` for
//! debts that were already stored.

mod batch;
mod row;

pub use batch::Batch;
pub use row::{parse_amount, CsvRecord, DebtRow, RowError, REQUIRED_COLUMNS};

use debtfeed_common::db::PendingDebt;
use debtfeed_common::Error;
use thiserror::Error;

use crate::store::RecordStore;
use crate::tasks::{Task, TaskDispatcher};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("Malformed CSV at line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to save batch of {size} debts: {source}")]
    Flush {
        size: usize,
        #[source]
        source: Error,
    },

    #[error(transparent)]
    Store(#[from] Error),
}

/// Outcome counters for one ingest run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub invalid_rows: usize,
    pub duplicate_rows: usize,
    pub already_queued_rows: usize,
    pub debts_created: usize,
    pub batches_flushed: usize,
}

enum RowOutcome {
    /// Already stored; fan-out dispatched with `is_new = false`
    Duplicate,
    /// Same external id earlier in the unflushed batch
    AlreadyQueued,
    Queued,
}

pub struct IngestPipeline<'a> {
    store: &'a dyn RecordStore,
    dispatcher: &'a dyn TaskDispatcher,
    batch_size: usize,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        dispatcher: &'a dyn TaskDispatcher,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            dispatcher,
            batch_size: batch_size.max(1),
        }
    }

    /// Process a feed, logging the outcome instead of returning it
    pub async fn ingest(&self, raw: &str) {
        match self.run(raw).await {
            Ok(report) => {
                tracing::info!(
                    rows_read = report.rows_read,
                    invalid_rows = report.invalid_rows,
                    duplicate_rows = report.duplicate_rows,
                    already_queued_rows = report.already_queued_rows,
                    debts_created = report.debts_created,
                    batches_flushed = report.batches_flushed,
                    "CSV processing completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing CSV file");
            }
        }
    }

    /// Process a feed and report what happened
    ///
    /// Batches flushed before an error stay committed; the unflushed batch is
    /// discarded.
    pub async fn run(&self, raw: &str) -> Result<IngestReport, IngestError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = check_headers(&mut reader)?;

        let mut report = IngestReport::default();
        let mut batch = Batch::new(self.batch_size);
        let mut raw_record = csv::StringRecord::new();

        loop {
            if !reader.read_record(&mut raw_record).map_err(malformed)? {
                break;
            }
            report.rows_read += 1;
            let line = raw_record.position().map(|p| p.line()).unwrap_or(0);

            let record: CsvRecord = raw_record
                .deserialize(Some(&headers))
                .map_err(malformed)?;

            let row = match DebtRow::try_from(record) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(line, error = %e, "Skipping invalid CSV row");
                    report.invalid_rows += 1;
                    continue;
                }
            };

            let (next, outcome) = self.process_row(row.into_pending(), batch).await?;
            batch = next;
            match outcome {
                RowOutcome::Duplicate => report.duplicate_rows += 1,
                RowOutcome::AlreadyQueued => report.already_queued_rows += 1,
                RowOutcome::Queued => {}
            }

            if batch.is_full() {
                let (pending, empty) = batch.take();
                batch = empty;
                report.debts_created += self.flush_batch(pending).await?;
                report.batches_flushed += 1;
            }
        }

        if !batch.is_empty() {
            let (pending, _) = batch.take();
            report.debts_created += self.flush_batch(pending).await?;
            report.batches_flushed += 1;
        }

        Ok(report)
    }

    async fn process_row(
        &self,
        debt: PendingDebt,
        batch: Batch,
    ) -> Result<(Batch, RowOutcome), IngestError> {
        if let Some(existing) = self.store.find_debt_by_external_id(debt.external_id).await? {
            tracing::info!(
                external_id = %debt.external_id,
                debt_id = existing.id,
                "Duplicate detected for debtId"
            );
            self.fan_out(existing.id, false);
            return Ok((batch, RowOutcome::Duplicate));
        }

        if batch.contains(&debt.external_id) {
            tracing::info!(
                external_id = %debt.external_id,
                "debtId repeated within pending batch, skipping"
            );
            return Ok((batch, RowOutcome::AlreadyQueued));
        }

        Ok((batch.push(debt), RowOutcome::Queued))
    }

    /// Insert one batch and fan out every debt it created
    pub async fn flush_batch(&self, pending: Vec<PendingDebt>) -> Result<usize, IngestError> {
        let size = pending.len();

        let created = match self.store.bulk_insert_debts(&pending).await {
            Ok(created) => created,
            Err(source) => {
                tracing::error!(batch_size = size, error = %source, "Failed to save debts in batch");
                return Err(IngestError::Flush { size, source });
            }
        };

        for debt in &created {
            self.fan_out(debt.id, true);
        }

        tracing::info!(batch_size = size, created = created.len(), "Batch of debts saved");
        Ok(created.len())
    }

    fn fan_out(&self, debt_id: i64, is_new: bool) {
        self.dispatcher.dispatch(Task::CheckInvoice { debt_id, is_new });
        self.dispatcher.dispatch(Task::CheckEmail { debt_id, is_new });
    }
}

fn malformed(source: csv::Error) -> IngestError {
    IngestError::Malformed {
        line: source.position().map(|p| p.line()).unwrap_or(0),
        source,
    }
}

fn check_headers<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
) -> Result<csv::StringRecord, IngestError> {
    let headers = reader
        .headers()
        .map_err(|source| IngestError::Malformed { line: 1, source })?
        .clone();

    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if missing.is_empty() {
        Ok(headers)
    } else {
        Err(IngestError::MissingColumns(missing))
    }
}
