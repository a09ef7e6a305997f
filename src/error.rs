use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EgaError {
    #[error("invalid sample alias: {0}")]
    InvalidSampleAlias(String),

    #[error("unknown library strategy: {0}")]
    UnknownLibraryStrategy(String),

    #[error("expected library strategy to be one of WGS or WXS, instead received {0}")]
    UnsupportedLibraryStrategy(String),

    #[error("expected to find one unique library strategy, instead found {0}")]
    AmbiguousLibraryStrategy(usize),

    #[error("identity request failed: {0}")]
    IdentityHttp(String),

    #[error("authentication failed with status {status}: {message}")]
    AuthenticationFailed { status: u16, message: String },

    #[error("failed to access secret {name}: {message}")]
    SecretAccess { name: String, message: String },

    #[error("secret {0} failed payload checksum verification")]
    SecretCorrupted(String),

    #[error("archive request failed: {0}")]
    ArchiveHttp(String),

    #[error("archive returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("expected to find at least one file in the inbox, instead found none")]
    NoFilesInInbox,

    #[error("expected to find at least one file associated with sample {0}, instead found none")]
    NoFilesForSample(String),

    #[error("expected to find one policy titled {0}, instead found none")]
    PolicyNotFound(String),

    #[error("expected to find one policy titled {title}, instead found {count}")]
    AmbiguousPolicy { title: String, count: usize },

    #[error("dataset creation returned an empty response")]
    EmptyDatasetResponse,

    #[error("invalid expected release date {value}: {message}")]
    InvalidReleaseDate { value: String, message: String },

    #[error("file {0} already exists in the remote inbox")]
    DuplicateInboxFile(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("sftp transfer failed: {0}")]
    SftpTransfer(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
