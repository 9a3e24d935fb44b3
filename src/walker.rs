use std::{collections::VecDeque, future::Future, pin::Pin};

use log::debug;

use crate::error::Result;
use crate::flickr_client::PhotoService;
use crate::model::{Page, Photo, Photoset};

pub type PageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Page<T>>> + 'a>>;

/// Lazily walks a paginated listing, fetching the next page only once the
/// buffered items run out. Walking again means building a new walker, which
/// starts over at page 1.
pub struct Walker<'a, T> {
    fetch: Box<dyn FnMut(u32) -> PageFuture<'a, T> + 'a>,
    buffered: VecDeque<T>,
    next_page: u32,
    finished: bool,
    total: Option<u64>,
}

impl<'a, T> Walker<'a, T> {
    pub fn new<F>(fetch: F) -> Walker<'a, T>
    where
        F: FnMut(u32) -> PageFuture<'a, T> + 'a,
    {
        Walker {
            fetch: Box::new(fetch),
            buffered: VecDeque::new(),
            next_page: 1,
            finished: false,
            total: None,
        }
    }

    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            if self.finished {
                return Ok(None);
            }

            let page = (self.fetch)(self.next_page).await?;
            debug!(
                "Fetched page {page} of {pages} ({count} items)",
                page = page.page,
                pages = page.pages,
                count = page.items.len()
            );

            self.total = Some(page.total);
            if page.items.is_empty() || u64::from(self.next_page) >= page.pages {
                self.finished = true;
            }
            self.next_page += 1;
            self.buffered.extend(page.items);
        }
    }

    /// Total reported by the most recently fetched page.
    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

pub fn photosets<'a>(service: &'a dyn PhotoService, user_id: &str) -> Walker<'a, Photoset> {
    let user_id = user_id.to_string();
    Walker::new(move |page| {
        let user_id = user_id.clone();
        Box::pin(async move { service.photosets_page(&user_id, page).await })
    })
}

pub fn photostream<'a>(service: &'a dyn PhotoService, user_id: &str) -> Walker<'a, Photo> {
    let user_id = user_id.to_string();
    Walker::new(move |page| {
        let user_id = user_id.clone();
        Box::pin(async move { service.photostream_page(&user_id, page).await })
    })
}

pub fn photoset_photos<'a>(service: &'a dyn PhotoService, set_id: &str) -> Walker<'a, Photo> {
    let set_id = set_id.to_string();
    Walker::new(move |page| {
        let set_id = set_id.clone();
        Box::pin(async move { service.photoset_photos_page(&set_id, page).await })
    })
}
