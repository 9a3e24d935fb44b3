use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use filetime::FileTime;
use log::{debug, warn};

use crate::error::{FlickrError, Result};
use crate::flickr_client::PhotoService;
use crate::model::Photo;
use crate::walker::Walker;

const TAKEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    /// A file with the expected name was already there.
    Skipped(PathBuf),
    Failed { path: PathBuf, reason: String },
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Saved(path) | DownloadOutcome::Skipped(path) => path,
            DownloadOutcome::Failed { path, .. } => path,
        }
    }
}

/// Console notices and per-photo outcomes of one download run. Outcomes stay
/// available when a listing error cuts the run short.
pub struct DownloadRun<W: Write> {
    out: W,
    outcomes: Vec<DownloadOutcome>,
}

impl<W: Write> DownloadRun<W> {
    pub fn new(out: W) -> DownloadRun<W> {
        DownloadRun {
            out,
            outcomes: Vec::new(),
        }
    }

    pub fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    /// One-line tally printed after a download run.
    pub fn summary(&self) -> String {
        let mut saved = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for outcome in &self.outcomes {
            match outcome {
                DownloadOutcome::Saved(_) => saved += 1,
                DownloadOutcome::Skipped(_) => skipped += 1,
                DownloadOutcome::Failed { .. } => failed += 1,
            }
        }
        format!("Finished. {saved} new files, {skipped} skipped, {failed} failed.")
    }
}

#[cfg(test)]
impl DownloadRun<Vec<u8>> {
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}

/// Downloads every photo of the walk into `directory`. Listing errors abort the
/// walk; a failed photo is reported and the next one is processed.
pub async fn download_list(
    service: &dyn PhotoService,
    photos: &mut Walker<'_, Photo>,
    directory: &Path,
    size_label: Option<&str>,
    run: &mut DownloadRun<impl Write>,
) -> Result<()> {
    while let Some(photo) = photos.next().await? {
        let outcome = download_photo(service, &photo, directory, size_label, &mut run.out).await?;
        run.outcomes.push(outcome);
    }
    Ok(())
}

/// Only a failure to write a notice to `out` is returned as an error.
pub async fn download_photo(
    service: &dyn PhotoService,
    photo: &Photo,
    directory: &Path,
    size_label: Option<&str>,
    out: &mut impl Write,
) -> Result<DownloadOutcome> {
    let file_name = photo.file_name();
    let path = directory.join(&file_name);

    // Existence is the only check: a file with this name counts as complete.
    if path.exists() {
        writeln!(out, "Skipping {file_name}, as it exists already")?;
        return Ok(DownloadOutcome::Skipped(path));
    }

    writeln!(out, "Saving: {file_name}")?;
    match save_photo(service, photo, &path, size_label).await {
        Ok(()) => Ok(DownloadOutcome::Saved(path)),
        Err(e) => {
            if e.is_not_found() {
                writeln!(out, "Ooops, photo {file_name} couldn't be downloaded: not found on Flickr")?;
            } else {
                writeln!(out, "Ooops, photo {file_name} couldn't be downloaded")?;
            }
            warn!("Failed to download photo {id}: {e}", id = photo.id);
            Ok(DownloadOutcome::Failed {
                path,
                reason: e.to_string(),
            })
        }
    }
}

async fn save_photo(
    service: &dyn PhotoService,
    photo: &Photo,
    path: &Path,
    size_label: Option<&str>,
) -> Result<()> {
    let bytes = service.fetch_photo(&photo.id, size_label).await?;
    write_complete(path, &bytes)?;

    let info = service.photo_info(&photo.id).await?;
    debug!("Photo {id} '{title}' taken {taken}", id = info.id, title = info.title, taken = info.taken);

    let taken = FileTime::from_unix_time(parse_taken(&info.taken)?, 0);
    filetime::set_file_times(path, taken, taken)?;

    Ok(())
}

/// Writes next to `path` first and renames, so `path` only ever holds a
/// complete file.
fn write_complete(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes)?;
    if let Err(e) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(())
}

/// Capture times come without a zone and are read as local time.
pub fn parse_taken(taken: &str) -> Result<i64> {
    let taken = taken.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(taken, TAKEN_FORMAT) {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.timestamp())
            .ok_or_else(|| FlickrError::InvalidDate(taken.to_string()));
    }

    DateTime::parse_from_rfc3339(taken)
        .map(|dt| dt.timestamp())
        .map_err(|_| FlickrError::InvalidDate(taken.to_string()))
}
