use std::fs;

use camino::Utf8Path;

use crate::domain::ValidationStatus;
use crate::error::EgaError;

pub const FILE_VALIDATION_STATUS_TSV: &str = "file_validation_status.tsv";
pub const SAMPLE_ID_VALIDATION_STATUS_TSV: &str = "sample_id_validation_status.tsv";

/// Flat-file artifacts consumed downstream: one file carrying the bare status
/// token, one tab-separated row keyed for the Terra data tables.
pub struct ValidationReport<'a> {
    pub sample_id: &'a str,
    pub status: ValidationStatus,
}

impl ValidationReport<'_> {
    pub fn write(&self, output_dir: &Utf8Path) -> Result<(), EgaError> {
        fs::create_dir_all(output_dir.as_std_path())
            .map_err(|err| EgaError::Filesystem(err.to_string()))?;

        tracing::info!("writing final validation status out to file");
        let status_path = output_dir.join(FILE_VALIDATION_STATUS_TSV);
        fs::write(status_path.as_std_path(), self.status.as_str())
            .map_err(|err| EgaError::Filesystem(format!("write {status_path}: {err}")))?;

        tracing::info!("writing validation status and sample id tsv to file");
        let table_path = output_dir.join(SAMPLE_ID_VALIDATION_STATUS_TSV);
        let table = format!(
            "entity:sample_id\tfile_validation_status\n{}\t{}\n",
            self.sample_id, self.status
        );
        fs::write(table_path.as_std_path(), table)
            .map_err(|err| EgaError::Filesystem(format!("write {table_path}: {err}")))?;
        Ok(())
    }
}
