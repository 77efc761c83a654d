//! Sequential batch processing of an address list

use crate::probe::models::{ProbeRecord, ValidationOutcome};
use crate::probe::transport::{HttpTransport, Transport};
use crate::probe::validator::Validator;
use crate::proxy::pool::ProxyPool;
use crate::{Config, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Parse an address list: one address per line, surrounding whitespace
/// trimmed, blank lines ignored.
pub fn parse_addresses(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read an address list from a file
pub fn load_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_addresses(&content))
}

/// Counts for a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub valid: usize,
    pub invalid: usize,
    pub undetermined: usize,
    pub proxies_alive: usize,
    pub proxies_total: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.valid + self.invalid + self.undetermined
    }

    fn record(&mut self, outcome: ValidationOutcome) {
        match outcome {
            ValidationOutcome::Valid => self.valid += 1,
            ValidationOutcome::Invalid => self.invalid += 1,
            ValidationOutcome::Undetermined => self.undetermined += 1,
        }
    }
}

/// Runs the validator over every address in turn, pausing between addresses
pub struct BatchRunner<T> {
    validator: Validator<T>,
    delay: Duration,
}

impl BatchRunner<HttpTransport> {
    pub fn with_config(config: Config) -> Self {
        Self::new(Validator::with_config(config.probe), config.delay)
    }
}

impl<T: Transport> BatchRunner<T> {
    pub fn new(validator: Validator<T>, delay: Duration) -> Self {
        Self { validator, delay }
    }

    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }

    /// Classify every address, handing each record to `on_record` as soon as
    /// it is final.
    ///
    /// Every address yields exactly one record. Only an error returned by
    /// `on_record` stops the batch early.
    pub async fn run<F>(
        &self,
        addresses: &[String],
        pool: &mut ProxyPool,
        mut on_record: F,
    ) -> Result<BatchSummary>
    where
        F: FnMut(&ProbeRecord) -> Result<()>,
    {
        let mut summary = BatchSummary::default();

        for (index, address) in addresses.iter().enumerate() {
            let record = self.validator.validate(address, pool).await;
            summary.record(record.outcome);
            on_record(&record)?;

            let is_last = index + 1 == addresses.len();
            if !is_last && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        summary.proxies_alive = pool.alive_count();
        summary.proxies_total = pool.len();

        info!(
            total = summary.total(),
            valid = summary.valid,
            invalid = summary.invalid,
            undetermined = summary.undetermined,
            "batch finished"
        );

        Ok(summary)
    }
}
