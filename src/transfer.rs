use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use ssh2::Session;

use crate::archive::{ArchiveClient, FileMetadata};
use crate::error::EgaError;

pub const SFTP_HOSTNAME: &str = "inbox.ega-archive.org";
pub const SFTP_PORT: u16 = 22;
pub const REMOTE_DIR: &str = "/encrypted";

/// Encrypts data files with the archive's recipient public key by driving the
/// crypt4gh CLI. Output lands next to the working directory under the source
/// file's basename.
pub struct Crypt4ghEncryptor {
    binary: PathBuf,
}

impl Crypt4ghEncryptor {
    pub fn new() -> Result<Self, EgaError> {
        let binary = find_in_path("crypt4gh")
            .ok_or_else(|| EgaError::MissingTool("crypt4gh".to_string()))?;
        Ok(Self { binary })
    }

    pub fn encrypt(
        &self,
        source: &Utf8Path,
        recipient_public_key: &Utf8Path,
    ) -> Result<Utf8PathBuf, EgaError> {
        let output_name = source
            .file_name()
            .ok_or_else(|| EgaError::Filesystem(format!("no file name in {source}")))?;
        let output_path = Utf8PathBuf::from(output_name);

        let input = File::open(source.as_std_path())
            .map_err(|err| EgaError::Filesystem(format!("open {source}: {err}")))?;
        // Ciphertext is staged in a temp file and only persisted onto the
        // final name once crypt4gh exits cleanly.
        let staged = tempfile::Builder::new()
            .prefix(".crypt4gh")
            .tempfile_in(".")
            .map_err(|err| EgaError::Filesystem(err.to_string()))?;
        let staged_handle = staged
            .reopen()
            .map_err(|err| EgaError::Filesystem(err.to_string()))?;

        let output = Command::new(&self.binary)
            .args(["encrypt", "--recipient_pk", recipient_public_key.as_str()])
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(staged_handle))
            .output()
            .map_err(|err| EgaError::EncryptionFailed(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("crypt4gh exited with {}", output.status)
            } else {
                stderr
            };
            return Err(EgaError::EncryptionFailed(message));
        }

        staged
            .persist(output_path.as_std_path())
            .map_err(|err| EgaError::Filesystem(err.to_string()))?;
        tracing::info!("encrypted {source} to {output_path}");
        Ok(output_path)
    }
}

/// One-shot upload into the inbox staging area. The session lives for the
/// duration of a single put and is released on return.
pub trait InboxTransport: Send + Sync {
    fn upload(&self, local: &Utf8Path, remote_name: &str) -> Result<(), EgaError>;
}

pub struct SftpTransport {
    hostname: String,
    port: u16,
    username: String,
    password: String,
}

impl SftpTransport {
    pub fn new(username: String, password: String) -> Self {
        Self {
            hostname: SFTP_HOSTNAME.to_string(),
            port: SFTP_PORT,
            username,
            password,
        }
    }
}

impl InboxTransport for SftpTransport {
    fn upload(&self, local: &Utf8Path, remote_name: &str) -> Result<(), EgaError> {
        let tcp = TcpStream::connect((self.hostname.as_str(), self.port))
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        let mut session =
            Session::new().map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        session
            .userauth_password(&self.username, &self.password)
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;

        let sftp = session
            .sftp()
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        let remote_path = Path::new(REMOTE_DIR).join(remote_name);
        let mut remote_file = sftp
            .create(&remote_path)
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        let mut local_file = File::open(local.as_std_path())
            .map_err(|err| EgaError::Filesystem(format!("open {local}: {err}")))?;
        io::copy(&mut local_file, &mut remote_file)
            .map_err(|err| EgaError::SftpTransfer(err.to_string()))?;
        Ok(())
    }
}

/// True when the inbox already holds a file under the same basename.
pub fn duplicate_in_inbox(records: &[FileMetadata], basename: &str) -> bool {
    records.iter().any(|file| {
        Path::new(&file.relative_path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == basename)
            .unwrap_or(false)
    })
}

/// Uploads an encrypted file to the inbox after checking that no file with
/// the same basename is already registered remotely. On conflict the upload
/// is never attempted.
pub fn transfer_to_inbox<A: ArchiveClient, T: InboxTransport>(
    archive: &A,
    transport: &T,
    encrypted_data_file: &Utf8Path,
) -> Result<String, EgaError> {
    let basename = encrypted_data_file
        .file_name()
        .ok_or_else(|| EgaError::Filesystem(format!("no file name in {encrypted_data_file}")))?;

    let inbox_files = archive.files(None)?;
    if duplicate_in_inbox(&inbox_files, basename) {
        return Err(EgaError::DuplicateInboxFile(basename.to_string()));
    }

    transport.upload(encrypted_data_file, basename)?;
    tracing::info!("successfully transferred {encrypted_data_file} to the inbox");
    Ok(basename.to_string())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let candidate = path.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> FileMetadata {
        FileMetadata {
            relative_path: path.to_string(),
            encrypted_checksum: None,
            unencrypted_checksum: None,
            filesize: 0,
            status: "inbox".to_string(),
        }
    }

    #[test]
    fn duplicate_detected_by_basename() {
        let records = vec![record("/encrypted/NA12878.cram"), record("/other.cram")];
        assert!(duplicate_in_inbox(&records, "NA12878.cram"));
    }

    #[test]
    fn no_duplicate_for_fresh_basename() {
        let records = vec![record("/encrypted/NA12878.cram")];
        assert!(!duplicate_in_inbox(&records, "NA24385.cram"));
    }

    #[test]
    fn duplicate_check_is_exact_not_prefix() {
        let records = vec![record("/encrypted/NA12878.cram.bak")];
        assert!(!duplicate_in_inbox(&records, "NA12878.cram"));
    }
}
