use chrono::{DateTime, Utc};

use crate::archive::{ArchiveClient, NewDataset};
use crate::domain::{self, LibraryStrategy};
use crate::error::EgaError;

/// Inputs for one dataset registration run, parsed and validated at the CLI
/// boundary.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub policy_title: String,
    pub library_strategies: Vec<LibraryStrategy>,
    pub run_provisional_ids: Vec<i64>,
    pub dataset_title: String,
    pub dataset_description: String,
    pub expected_release_date: String,
    pub finalize: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The archive does not currently accept finalisation through the API;
    /// the submitter portal has to be used instead.
    SkippedByPolicy { release_date: String },
    Finalised { release_date: String },
}

/// Progress of the three-step workflow, kept outside the registrar so a
/// re-run after a partial failure picks up where the last one stopped instead
/// of repeating completed remote calls.
#[derive(Debug, Clone, Default)]
pub struct RegistrationState {
    pub policy_accession_id: Option<String>,
    pub dataset_provisional_id: Option<i64>,
    pub finalize_outcome: Option<FinalizeOutcome>,
}

impl RegistrationState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct DatasetRegistrar<'a, A: ArchiveClient> {
    archive: &'a A,
    submission_accession_id: String,
}

impl<'a, A: ArchiveClient> DatasetRegistrar<'a, A> {
    pub fn new(archive: &'a A, submission_accession_id: String) -> Self {
        Self {
            archive,
            submission_accession_id,
        }
    }

    /// Runs the workflow: resolve policy, ensure the dataset exists, settle
    /// the finalisation outcome. Steps already recorded in `state` are not
    /// repeated. Every remote call is a single attempt.
    pub fn register(
        &self,
        request: &RegistrationRequest,
        state: &mut RegistrationState,
    ) -> Result<(), EgaError> {
        let policy_accession_id = match &state.policy_accession_id {
            Some(id) => id.clone(),
            None => {
                let id = self.resolve_policy(&request.policy_title)?;
                state.policy_accession_id = Some(id.clone());
                id
            }
        };

        let provisional_id = match state.dataset_provisional_id {
            Some(id) => id,
            None => {
                let id = self.ensure_dataset(request, &policy_accession_id)?;
                state.dataset_provisional_id = Some(id);
                id
            }
        };
        tracing::info!(provisional_id, "dataset resolved");

        if state.finalize_outcome.is_none() {
            let release_date = release_date(&request.expected_release_date, Utc::now())?;
            let outcome = if request.finalize {
                tracing::info!("attempting to finalize submission");
                self.archive
                    .finalise(&self.submission_accession_id, &release_date)?;
                tracing::info!(
                    "successfully finalized submission {}",
                    self.submission_accession_id
                );
                FinalizeOutcome::Finalised { release_date }
            } else {
                tracing::info!(
                    "SKIPPING finalization step; use the EGA portal to finalize the submission"
                );
                FinalizeOutcome::SkippedByPolicy { release_date }
            };
            state.finalize_outcome = Some(outcome);
        }

        Ok(())
    }

    /// Exact-title policy lookup. Anything other than one match is a
    /// configuration error.
    fn resolve_policy(&self, policy_title: &str) -> Result<String, EgaError> {
        let policies = self.archive.policies()?;
        let mut matches = policies
            .into_iter()
            .filter(|policy| policy.title == policy_title)
            .collect::<Vec<_>>();
        match matches.len() {
            0 => Err(EgaError::PolicyNotFound(policy_title.to_string())),
            1 => {
                tracing::info!("successfully retrieved policy DAC");
                Ok(matches.remove(0).accession_id)
            }
            count => Err(EgaError::AmbiguousPolicy {
                title: policy_title.to_string(),
                count,
            }),
        }
    }

    /// Reuses an existing dataset matching (policy, title) or creates a new
    /// one. The lookup makes interrupted runs safe to repeat.
    fn ensure_dataset(
        &self,
        request: &RegistrationRequest,
        policy_accession_id: &str,
    ) -> Result<i64, EgaError> {
        let strategy = domain::unique_strategy(&request.library_strategies)?;
        let dataset_type = strategy.dataset_type()?;

        if let Some(provisional_id) =
            self.existing_dataset(policy_accession_id, &request.dataset_title)?
        {
            tracing::info!(
                "dataset titled {} under policy {policy_accession_id} already exists, \
                 will not attempt to re-create it",
                request.dataset_title
            );
            return Ok(provisional_id);
        }

        tracing::info!("attempting to create dataset");
        let created = self.archive.create_dataset(
            &self.submission_accession_id,
            &NewDataset {
                title: request.dataset_title.clone(),
                description: request.dataset_description.clone(),
                dataset_types: vec![dataset_type.as_str().to_string()],
                policy_accession_id: policy_accession_id.to_string(),
                run_provisional_ids: request.run_provisional_ids.clone(),
            },
        )?;
        let first = created.first().ok_or(EgaError::EmptyDatasetResponse)?;
        tracing::info!("successfully registered dataset");
        Ok(first.provisional_id)
    }

    fn existing_dataset(
        &self,
        policy_accession_id: &str,
        dataset_title: &str,
    ) -> Result<Option<i64>, EgaError> {
        let datasets = self.archive.datasets(&self.submission_accession_id)?;
        Ok(datasets
            .into_iter()
            .find(|dataset| {
                dataset.policy_accession_id == policy_accession_id
                    && dataset.title == dataset_title
            })
            .map(|dataset| dataset.provisional_id))
    }
}

/// Release dates closer than a week out are pushed to `now + 7 days`; the
/// archive rejects anything sooner. Dates are compared timezone-aware and
/// emitted date-only in UTC.
pub fn release_date(expected: &str, now: DateTime<Utc>) -> Result<String, EgaError> {
    let expected_release_date = DateTime::parse_from_str(expected, "%Y-%m-%dT%H:%M:%S%z")
        .map_err(|err| EgaError::InvalidReleaseDate {
            value: expected.to_string(),
            message: err.to_string(),
        })?
        .with_timezone(&Utc);
    let seven_days_out = now + chrono::Duration::days(7);

    if expected_release_date < seven_days_out {
        tracing::info!(
            "the provided release date was less than 7 days out, adjusting it to 7 days out"
        );
        Ok(seven_days_out.format("%Y-%m-%d").to_string())
    } else {
        Ok(expected_release_date.format("%Y-%m-%d").to_string())
    }
}
