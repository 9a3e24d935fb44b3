use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::error::{FlickrError, Result};
use crate::flickr_client::PhotoService;
use crate::model::{Page, Photo, PhotoInfo, Photoset, User};

pub const TAKEN: &str = "2010-06-15 10:30:00";

/// In-memory Flickr account. User ids are the username with `-id` appended.
#[derive(Default)]
pub struct FakeFlickr {
    per_page: usize,
    photostreams: HashMap<String, Vec<Photo>>,
    photosets: Vec<(String, Photoset, Vec<Photo>)>,
    missing_info: HashSet<String>,
    failing_fetch: HashSet<String>,
    failing_listings: HashSet<String>,
    fetched: Mutex<Vec<String>>,
    page_requests: Mutex<usize>,
}

fn photo(id: &str) -> Photo {
    Photo {
        id: id.to_string(),
        title: format!("Photo {id}"),
    }
}

fn not_found(photo_id: &str) -> FlickrError {
    FlickrError::Api {
        code: 1,
        message: format!("Photo \"{photo_id}\" not found (invalid ID)"),
    }
}

impl FakeFlickr {
    pub fn new() -> FakeFlickr {
        FakeFlickr {
            per_page: 100,
            ..Default::default()
        }
    }

    pub fn per_page(mut self, per_page: usize) -> FakeFlickr {
        self.per_page = per_page;
        self
    }

    pub fn with_photostream(mut self, username: &str, ids: &[&str]) -> FakeFlickr {
        self.photostreams
            .insert(format!("{username}-id"), ids.iter().map(|id| photo(id)).collect());
        self
    }

    pub fn with_photoset(mut self, username: &str, set_id: &str, ids: &[&str]) -> FakeFlickr {
        let set = Photoset {
            id: set_id.to_string(),
            title: format!("Set {set_id}"),
        };
        self.photosets.push((
            format!("{username}-id"),
            set,
            ids.iter().map(|id| photo(id)).collect(),
        ));
        self
    }

    /// `photo_info` answers "not found" for this photo.
    pub fn with_missing_info(mut self, photo_id: &str) -> FakeFlickr {
        self.missing_info.insert(photo_id.to_string());
        self
    }

    /// `fetch_photo` answers "not found" for this photo.
    pub fn with_failing_fetch(mut self, photo_id: &str) -> FakeFlickr {
        self.failing_fetch.insert(photo_id.to_string());
        self
    }

    /// `photoset_photos_page` fails for this set.
    pub fn with_failing_listing(mut self, set_id: &str) -> FakeFlickr {
        self.failing_listings.insert(set_id.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn page_requests(&self) -> usize {
        *self.page_requests.lock().unwrap()
    }

    pub fn content(photo_id: &str) -> Vec<u8> {
        format!("jpeg bytes of {photo_id}").into_bytes()
    }

    fn paginate<T: Clone>(&self, items: &[T], page: u32) -> Page<T> {
        *self.page_requests.lock().unwrap() += 1;

        let per_page = self.per_page.max(1);
        let start = (page as usize).saturating_sub(1) * per_page;

        Page {
            page: u64::from(page),
            pages: items.len().div_ceil(per_page) as u64,
            total: items.len() as u64,
            items: items.iter().skip(start).take(per_page).cloned().collect(),
        }
    }
}

#[async_trait]
impl PhotoService for FakeFlickr {
    async fn find_user_by_name(&self, username: &str) -> Result<User> {
        let id = format!("{username}-id");
        let known = self.photostreams.contains_key(&id)
            || self.photosets.iter().any(|(owner, _, _)| *owner == id);
        if !known {
            return Err(FlickrError::Api {
                code: 1,
                message: "User not found".to_string(),
            });
        }
        Ok(User {
            id,
            username: username.to_string(),
        })
    }

    async fn photosets_page(&self, user_id: &str, page: u32) -> Result<Page<Photoset>> {
        let sets: Vec<Photoset> = self
            .photosets
            .iter()
            .filter(|(owner, _, _)| owner == user_id)
            .map(|(_, set, _)| set.clone())
            .collect();
        Ok(self.paginate(&sets, page))
    }

    async fn photostream_page(&self, user_id: &str, page: u32) -> Result<Page<Photo>> {
        let photos = self.photostreams.get(user_id).cloned().unwrap_or_default();
        Ok(self.paginate(&photos, page))
    }

    async fn photoset_photos_page(&self, set_id: &str, page: u32) -> Result<Page<Photo>> {
        if self.failing_listings.contains(set_id) {
            return Err(FlickrError::Api {
                code: 105,
                message: "Service currently unavailable".to_string(),
            });
        }
        let (_, _, photos) = self
            .photosets
            .iter()
            .find(|(_, set, _)| set.id == set_id)
            .ok_or_else(|| FlickrError::Api {
                code: 1,
                message: "Photoset not found".to_string(),
            })?;
        Ok(self.paginate(photos, page))
    }

    async fn photo_info(&self, photo_id: &str) -> Result<PhotoInfo> {
        if self.missing_info.contains(photo_id) {
            return Err(not_found(photo_id));
        }
        Ok(PhotoInfo {
            id: photo_id.to_string(),
            title: format!("Photo {photo_id}"),
            taken: TAKEN.to_string(),
        })
    }

    async fn fetch_photo(&self, photo_id: &str, _size_label: Option<&str>) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(photo_id.to_string());
        if self.failing_fetch.contains(photo_id) {
            return Err(not_found(photo_id));
        }
        Ok(FakeFlickr::content(photo_id))
    }
}
