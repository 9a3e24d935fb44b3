use std::{fs, io::Write, path::Path};

use log::{debug, info};

use crate::downloader::{DownloadRun, download_list};
use crate::error::Result;
use crate::flickr_client::PhotoService;
use crate::model::User;
use crate::walker;

async fn find_user(service: &dyn PhotoService, username: &str) -> Result<User> {
    let user = service.find_user_by_name(username).await?;
    debug!("Found user {name} ({id})", name = user.username, id = user.id);
    Ok(user)
}

/// Prints `id - title` for every photoset of `username`.
pub async fn print_sets(
    service: &dyn PhotoService,
    username: &str,
    out: &mut impl Write,
) -> Result<()> {
    let user = find_user(service, username).await?;
    let mut photosets = walker::photosets(service, &user.id);
    while let Some(set) = photosets.next().await? {
        writeln!(out, "{id} - {title}", id = set.id, title = set.title)?;
    }
    Ok(())
}

/// Prints `id - title` for every photo of `username`, then the total.
pub async fn list_photos(
    service: &dyn PhotoService,
    username: &str,
    out: &mut impl Write,
) -> Result<()> {
    let user = find_user(service, username).await?;
    let mut photos = walker::photostream(service, &user.id);
    let mut count = 0;
    while let Some(photo) = photos.next().await? {
        writeln!(out, "{id} - {title}", id = photo.id, title = photo.title)?;
        count += 1;
    }

    let total = photos.total().unwrap_or(count);
    writeln!(out, "Number of total photos: {total}")?;
    Ok(())
}

/// Downloads the photoset `set_id` into `directory`.
pub async fn download_set(
    service: &dyn PhotoService,
    set_id: &str,
    directory: &Path,
    size_label: Option<&str>,
    run: &mut DownloadRun<impl Write>,
) -> Result<()> {
    let mut photos = walker::photoset_photos(service, set_id);
    download_list(service, &mut photos, directory, size_label, run).await
}

/// Downloads every photoset of `username` into its own `<set id>` directory
/// below `directory`.
pub async fn download_sets(
    service: &dyn PhotoService,
    username: &str,
    directory: &Path,
    size_label: Option<&str>,
    run: &mut DownloadRun<impl Write>,
) -> Result<()> {
    let user = find_user(service, username).await?;
    let mut photosets = walker::photosets(service, &user.id);

    while let Some(set) = photosets.next().await? {
        let set_directory = directory.join(&set.id);
        fs::create_dir_all(&set_directory)?;
        info!("Downloading set {id} '{title}'", id = set.id, title = set.title);
        download_set(service, &set.id, &set_directory, size_label, &mut *run).await?;
    }
    Ok(())
}

/// Downloads every photo of `username` straight into `directory`.
pub async fn download_photostream(
    service: &dyn PhotoService,
    username: &str,
    directory: &Path,
    size_label: Option<&str>,
    run: &mut DownloadRun<impl Write>,
) -> Result<()> {
    let user = find_user(service, username).await?;
    let mut photos = walker::photostream(service, &user.id);
    download_list(service, &mut photos, directory, size_label, run).await
}

pub async fn download_all(
    service: &dyn PhotoService,
    username: &str,
    directory: &Path,
    size_label: Option<&str>,
    run: &mut DownloadRun<impl Write>,
) -> Result<()> {
    download_photostream(service, username, directory, size_label, &mut *run).await?;
    download_sets(service, username, directory, size_label, run).await
}
