use crate::features::error::WriteError;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Unmodified,
    BackedUp,
    /// A destructive write to the original has started.
    Written,
    Committed,
    RolledBack,
}

/// Backup-then-restore guard around a destructive rewrite of one file.
///
/// [`begin`](Self::begin) copies the file to `<path>.backup`. [`commit`](Self::commit)
/// deletes the backup, [`rollback`](Self::rollback) moves it back over the original.
/// Dropping an uncommitted transaction rolls back.
#[derive(Debug)]
pub struct MutationTransaction {
    original_path: PathBuf,
    backup_path: PathBuf,
    state: TransactionState,
}

impl MutationTransaction {
    pub fn backup_path_for(original: &Path) -> PathBuf {
        let mut backup = OsString::from(original.as_os_str());
        backup.push(".backup");
        PathBuf::from(backup)
    }

    /// Copies `original` to its backup path. The backup is created exclusively, so an
    /// existing file at that path is never touched.
    ///
    /// # Errors
    ///
    /// * [`WriteError::BackupExists`] when a backup from an earlier run is still there.
    /// * [`WriteError::Backup`] when the copy fails. Nothing is left behind in that case.
    pub fn begin(original: &Path) -> Result<Self, WriteError> {
        let backup_path = Self::backup_path_for(original);
        let backup_error = |source| WriteError::Backup {
            path: backup_path.clone(),
            source,
        };
        let mut source = File::open(original).map_err(backup_error)?;
        let mut backup = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&backup_path)
        {
            Ok(backup) => backup,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(WriteError::BackupExists(backup_path));
            }
            Err(err) => return Err(backup_error(err)),
        };

        let copied = io::copy(&mut source, &mut backup)
            .and_then(|_| backup.set_permissions(source.metadata()?.permissions()))
            .and_then(|()| backup.sync_all());
        if let Err(err) = copied {
            drop(backup);
            // Created above, so removing it cannot lose an older backup.
            let _ = fs::remove_file(&backup_path);
            return Err(backup_error(err));
        }
        debug!("Backed up {} to {}", original.display(), backup_path.display());
        Ok(Self {
            original_path: original.to_path_buf(),
            backup_path,
            state: TransactionState::BackedUp,
        })
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn mark_written(&mut self) {
        self.state = TransactionState::Written;
    }

    /// Keeps the new content and deletes the backup.
    pub fn commit(mut self) {
        self.state = TransactionState::Committed;
        if let Err(err) = fs::remove_file(&self.backup_path) {
            warn!(
                "Could not remove backup {}: {err}",
                self.backup_path.display()
            );
        }
    }

    /// Restores the original content from the backup.
    pub fn rollback(mut self) -> Result<(), WriteError> {
        self.restore()
            .map_err(|source| WriteError::RollbackFailed {
                path: self.original_path.clone(),
                source,
            })?;
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    fn restore(&self) -> io::Result<()> {
        if fs::rename(&self.backup_path, &self.original_path).is_ok() {
            return Ok(());
        }
        // Rename can fail across devices or when the target is locked; copy instead.
        fs::copy(&self.backup_path, &self.original_path)?;
        fs::remove_file(&self.backup_path)
    }
}

impl Drop for MutationTransaction {
    fn drop(&mut self) {
        if matches!(
            self.state,
            TransactionState::BackedUp | TransactionState::Written
        ) {
            warn!(
                "Uncommitted write to {}, restoring backup",
                self.original_path.display()
            );
            match self.restore() {
                Ok(()) => self.state = TransactionState::RolledBack,
                Err(err) => error!(
                    "Restoring {} failed, original kept at {}: {err}",
                    self.original_path.display(),
                    self.backup_path.display()
                ),
            }
        }
    }
}
