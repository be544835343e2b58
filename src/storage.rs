//! Layer file I/O with write-then-rename publication
//!
//! Outputs are staged as temp files inside their destination directory and
//! renamed into place only on `commit()`. Dropping an uncommitted `Staging`
//! removes the temp files, so a failed run never leaves partial output.

use crate::error::{EtlError, EtlResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Pending outputs awaiting an atomic rename
pub struct Staging {
    delimiter: u8,
    pending: Vec<(NamedTempFile, PathBuf)>,
}

impl Staging {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            pending: Vec::new(),
        }
    }

    /// Stage `rows` as a CSV file with `columns` as the header row
    ///
    /// The header is written even when `rows` is empty.
    pub fn stage_csv<T: Serialize>(
        &mut self,
        destination: impl AsRef<Path>,
        columns: &[&str],
        rows: &[T],
    ) -> EtlResult<()> {
        let destination = destination.as_ref();
        let mut temp = temp_beside(destination)?;

        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .has_headers(false)
                .from_writer(temp.as_file_mut());

            writer
                .write_record(columns)
                .map_err(|e| EtlError::csv(destination, e))?;
            for row in rows {
                writer
                    .serialize(row)
                    .map_err(|e| EtlError::csv(destination, e))?;
            }
            writer
                .flush()
                .map_err(|e| EtlError::io(destination, e))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| EtlError::io(destination, e))?;

        log::debug!("Staged {} rows for {}", rows.len(), destination.display());
        self.pending.push((temp, destination.to_path_buf()));
        Ok(())
    }

    /// Stage raw bytes for `destination`
    pub fn stage_bytes(&mut self, destination: impl AsRef<Path>, contents: &[u8]) -> EtlResult<()> {
        let destination = destination.as_ref();
        let mut temp = temp_beside(destination)?;

        temp.write_all(contents)
            .map_err(|e| EtlError::io(destination, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| EtlError::io(destination, e))?;

        log::debug!("Staged {} bytes for {}", contents.len(), destination.display());
        self.pending.push((temp, destination.to_path_buf()));
        Ok(())
    }

    /// Rename every staged file into place, in staging order
    ///
    /// Destinations are checked before the first rename, so a destination
    /// occupied by a directory fails the commit with nothing published.
    pub fn commit(self) -> EtlResult<Vec<PathBuf>> {
        if let Some((_, blocked)) = self.pending.iter().find(|(_, dest)| dest.is_dir()) {
            return Err(EtlError::io(
                blocked,
                std::io::Error::new(std::io::ErrorKind::Other, "destination is a directory"),
            ));
        }

        let mut published = Vec::with_capacity(self.pending.len());

        for (temp, destination) in self.pending {
            temp.persist(&destination)
                .map_err(|e| EtlError::io(&destination, e.error))?;
            log::info!("💾 Published {}", destination.display());
            published.push(destination);
        }

        Ok(published)
    }
}

/// Read a typed CSV layer file
pub fn read_csv<T: DeserializeOwned>(path: impl AsRef<Path>, delimiter: u8) -> EtlResult<Vec<T>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EtlError::csv(path, e))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| EtlError::csv(path, e))
}

fn temp_beside(destination: &Path) -> EtlResult<NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    std::fs::create_dir_all(&dir).map_err(|e| EtlError::io(&dir, e))?;

    tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| EtlError::io(&dir, e))
}
