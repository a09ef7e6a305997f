use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ega_submit::archive::ArchiveHttpClient;
use ega_submit::auth::{AccessToken, IdentityClient, IdentityHttpClient};
use ega_submit::domain::{LibraryStrategy, SampleAlias};
use ega_submit::error::EgaError;
use ega_submit::output::ValidationReport;
use ega_submit::registrar::{DatasetRegistrar, RegistrationRequest, RegistrationState};
use ega_submit::secrets::{GcpSecretProvider, SecretProvider};
use ega_submit::transfer::{Crypt4ghEncryptor, SftpTransport, transfer_to_inbox};
use ega_submit::validation::ValidationAggregator;

#[derive(Parser)]
#[command(name = "ega-submit")]
#[command(about = "Submission tooling for the EGA archive: validation checks, dataset registration, encrypted inbox uploads")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Check archive-side validation status of a sample's inbox files")]
    CheckValidation(CheckValidationArgs),
    #[command(about = "Register a dataset under a policy and settle submission finalisation")]
    RegisterDataset(RegisterDatasetArgs),
    #[command(about = "Encrypt a data file with the archive's crypt4gh public key")]
    Encrypt(EncryptArgs),
    #[command(about = "Upload an encrypted data file to the EGA inbox over SFTP")]
    Transfer(TransferArgs),
}

#[derive(Args)]
struct CheckValidationArgs {
    #[arg(long, help = "The EGA inbox username")]
    user_name: String,

    #[arg(long, help = "The sample alias the inbox files are named after")]
    sample_alias: String,

    #[arg(long, help = "The sample_id identifier from the Terra data table")]
    sample_id: String,

    #[arg(long, default_value = ".", help = "Directory the status tsv files are written to")]
    output_dir: Utf8PathBuf,
}

#[derive(Args)]
struct RegisterDatasetArgs {
    #[arg(long, help = "The EGA inbox username")]
    user_name: String,

    #[arg(long, help = "The submission accession ID")]
    submission_accession_id: String,

    #[arg(long, help = "The policy title exactly as registered for the associated DAC")]
    policy_title: String,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Experiment library strategies for each sample, comma-separated"
    )]
    library_strategy: Vec<String>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Run provisional IDs to associate with the dataset, comma-separated"
    )]
    run_provisional_ids: Vec<i64>,

    #[arg(long, help = "Title for the new dataset")]
    dataset_title: String,

    #[arg(long, help = "Description for the new dataset")]
    dataset_description: String,

    #[arg(long, help = "Expected release date of the submission, e.g. 2026-09-01T00:00:00+0000")]
    expected_release_date: String,

    #[arg(
        long,
        help = "Finalise through the API instead of leaving it to the submitter portal"
    )]
    finalize: bool,
}

#[derive(Args)]
struct EncryptArgs {
    #[arg(long, help = "The data file to encrypt")]
    aggregation_path: Utf8PathBuf,

    #[arg(long, help = "The crypt4gh public key supplied by the EGA")]
    encryption_key: Utf8PathBuf,
}

#[derive(Args)]
struct TransferArgs {
    #[arg(long, help = "Data file that is already encrypted")]
    encrypted_data_file: Utf8PathBuf,

    #[arg(long, help = "The EGA inbox assigned to the submitter")]
    ega_inbox: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(ega) = report.downcast_ref::<EgaError>() {
            return ExitCode::from(map_exit_code(ega));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EgaError) -> u8 {
    match error {
        EgaError::NoFilesInInbox
        | EgaError::NoFilesForSample(_)
        | EgaError::PolicyNotFound(_) => 2,
        EgaError::IdentityHttp(_)
        | EgaError::AuthenticationFailed { .. }
        | EgaError::ArchiveHttp(_)
        | EgaError::ArchiveStatus { .. }
        | EgaError::DuplicateInboxFile(_)
        | EgaError::MissingTool(_)
        | EgaError::EncryptionFailed(_)
        | EgaError::SftpTransfer(_)
        | EgaError::SecretAccess { .. }
        | EgaError::SecretCorrupted(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::CheckValidation(args) => run_check_validation(args),
        Commands::RegisterDataset(args) => run_register_dataset(args),
        Commands::Encrypt(args) => run_encrypt(args),
        Commands::Transfer(args) => run_transfer(args),
    }
}

/// Secret store -> identity provider -> bearer token, shared by every
/// archive-facing command.
fn login(user_name: &str) -> miette::Result<(AccessToken, String)> {
    let secrets = GcpSecretProvider::new().into_diagnostic()?;
    let password = secrets.inbox_password(user_name).into_diagnostic()?;
    let identity = IdentityHttpClient::new().into_diagnostic()?;
    let token = identity.login(user_name, &password).into_diagnostic()?;
    Ok((token, password))
}

fn run_check_validation(args: CheckValidationArgs) -> miette::Result<()> {
    let (token, _password) = login(&args.user_name)?;
    let archive = ArchiveHttpClient::new(token).into_diagnostic()?;

    let sample_alias: SampleAlias = args.sample_alias.parse().into_diagnostic()?;
    let status = ValidationAggregator::new(&archive)
        .status_for_sample(&sample_alias)
        .into_diagnostic()?;

    ValidationReport {
        sample_id: &args.sample_id,
        status,
    }
    .write(&args.output_dir)
    .into_diagnostic()?;

    println!("{status}");
    Ok(())
}

fn run_register_dataset(args: RegisterDatasetArgs) -> miette::Result<()> {
    let library_strategies = args
        .library_strategy
        .iter()
        .map(|value| value.parse::<LibraryStrategy>())
        .collect::<Result<Vec<_>, EgaError>>()
        .into_diagnostic()?;

    let (token, _password) = login(&args.user_name)?;
    let archive = ArchiveHttpClient::new(token).into_diagnostic()?;

    let request = RegistrationRequest {
        policy_title: args.policy_title,
        library_strategies,
        run_provisional_ids: args.run_provisional_ids,
        dataset_title: args.dataset_title,
        dataset_description: args.dataset_description,
        expected_release_date: args.expected_release_date,
        finalize: args.finalize,
    };

    let registrar = DatasetRegistrar::new(&archive, args.submission_accession_id);
    let mut state = RegistrationState::new();
    registrar.register(&request, &mut state).into_diagnostic()?;

    if let Some(provisional_id) = state.dataset_provisional_id {
        println!("dataset provisional id: {provisional_id}");
    }
    Ok(())
}

fn run_encrypt(args: EncryptArgs) -> miette::Result<()> {
    tracing::info!("starting to encrypt data file");
    let encryptor = Crypt4ghEncryptor::new().into_diagnostic()?;
    let output = encryptor
        .encrypt(&args.aggregation_path, &args.encryption_key)
        .into_diagnostic()?;
    println!("{output}");
    Ok(())
}

fn run_transfer(args: TransferArgs) -> miette::Result<()> {
    let (token, password) = login(&args.ega_inbox)?;
    let archive = ArchiveHttpClient::new(token).into_diagnostic()?;
    let transport = SftpTransport::new(args.ega_inbox.clone(), password);

    tracing::info!("starting to transfer file to the EGA inbox");
    let basename = transfer_to_inbox(&archive, &transport, &args.encrypted_data_file)
        .into_diagnostic()?;
    println!("uploaded {basename}");
    Ok(())
}
