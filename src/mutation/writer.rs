use crate::features::container::MetadataContainer;
use crate::features::error::{ContainerError, WriteError};
use crate::features::location::ResolvedLocation;
use crate::mutation::MutationTransaction;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Destination of a rewritten file.
pub trait ContainerSink {
    fn save(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Stages the new content in a temporary file next to `path`, then renames it over the
/// original, so the original is never seen half-written.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSink;

impl ContainerSink for FileSink {
    fn save(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(directory)?;
        staged.write_all(bytes)?;
        staged
            .as_file()
            .set_permissions(fs::metadata(path)?.permissions())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Not a JPEG; the file was left alone.
    Unsupported,
    /// The location had neither city nor country.
    NothingToWrite,
}

/// Writes a place name (and GPS position, when missing) into a JPEG's EXIF block.
#[derive(Debug, Default)]
pub struct LocationWriter<S = FileSink> {
    sink: S,
}

impl LocationWriter<FileSink> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: ContainerSink> LocationWriter<S> {
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    pub fn is_writable(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
    }

    /// `true` only when the file now carries the location. Failures are logged.
    pub fn write_location(&self, path: &Path, location: &ResolvedLocation) -> bool {
        match self.try_write_location(path, location) {
            Ok(WriteOutcome::Written) => true,
            Ok(outcome) => {
                debug!("Nothing written to {}: {outcome:?}", path.display());
                false
            }
            Err(WriteError::BackupExists(backup)) => {
                warn!(
                    "Skipping {}: restore or delete the leftover backup {} by hand",
                    path.display(),
                    backup.display()
                );
                false
            }
            Err(err) => {
                warn!("Writing location to {} failed: {err}", path.display());
                false
            }
        }
    }

    /// Merges `location` into the file's EXIF block and rewrites the file inside a
    /// [`MutationTransaction`].
    ///
    /// # Errors
    ///
    /// Everything before the backup (reading, parsing, serializing) fails without touching
    /// the file. A failed save is rolled back and reported as [`WriteError::SaveFailed`].
    pub fn try_write_location(
        &self,
        path: &Path,
        location: &ResolvedLocation,
    ) -> Result<WriteOutcome, WriteError> {
        if !Self::is_writable(path) {
            return Ok(WriteOutcome::Unsupported);
        }
        let Some(text) = location.location_text() else {
            return Ok(WriteOutcome::NothingToWrite);
        };

        let original = fs::read(path)?;
        let mut jpeg = Jpeg::from_bytes(Bytes::from(original))
            .map_err(|err| ContainerError::Jpeg(err.to_string()))?;
        let mut container = match jpeg.exif() {
            Some(raw) => MetadataContainer::from_tiff(raw.to_vec())?,
            None => MetadataContainer::empty(),
        };

        container.set_area_information(&text);
        if !container.has_gps_coordinate() {
            container.set_gps_coordinate(location.coordinates);
        }
        jpeg.set_exif(Some(Bytes::from(container.to_tiff_bytes()?)));
        let encoded = jpeg.encoder().bytes();

        let mut transaction = MutationTransaction::begin(path)?;
        transaction.mark_written();
        match self.sink.save(path, &encoded) {
            Ok(()) => {
                transaction.commit();
                info!("Wrote \"{text}\" to {}", path.display());
                Ok(WriteOutcome::Written)
            }
            Err(source) => {
                transaction.rollback()?;
                Err(WriteError::SaveFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}
