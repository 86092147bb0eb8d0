//! `K̂(s) = -log2 D(n,m)(s)` queries over a loaded distribution (C12, §4.12).

use crate::distribution::DistributionFile;
use crate::error::CliError;

#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorQuery {
    pub string: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimatorAnswer {
    Bits(f64),
    Unseen,
}

pub struct Estimator {
    file: DistributionFile,
}

impl Estimator {
    pub fn new(file: DistributionFile) -> Self {
        Self { file }
    }

    pub fn answer(&self, query: &EstimatorQuery) -> Result<EstimatorAnswer, CliError> {
        if !query.string.chars().all(|c| c == '0' || c == '1') {
            return Err(CliError::Configuration(format!(
                "query string {:?} contains characters other than 0/1",
                query.string
            )));
        }

        let probability = match (&self.file.distribution, &self.file.raw_counts) {
            (Some(distribution), _) => distribution.get(&query.string).copied(),
            (None, Some(raw_counts)) => {
                let halting_total = self.file.halting_total as f64;
                raw_counts
                    .get(&query.string)
                    .map(|count| *count as f64 / halting_total)
            }
            (None, None) => unreachable!("DistributionFile::validate rejects this shape"),
        };

        match probability {
            Some(p) if p > 0.0 => Ok(EstimatorAnswer::Bits(-p.log2())),
            _ => Ok(EstimatorAnswer::Unseen),
        }
    }
}
