use serde::{Deserialize, Deserializer};

/// A photo as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Photo {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl Photo {
    pub fn file_name(&self) -> String {
        format!("{id}.jpg", id = self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photoset {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoInfo {
    pub id: String,
    pub title: String,
    pub taken: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSize {
    pub label: String,
    pub width: u64,
    pub height: u64,
    pub source: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: u64,
    pub pages: u64,
    pub total: u64,
    pub items: Vec<T>,
}

// Wire formats of the REST responses below.

#[derive(Deserialize)]
pub struct ApiStatus {
    pub stat: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct UserEnvelope {
    pub user: UserEntry,
}

#[derive(Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub username: Content,
}

impl From<UserEntry> for User {
    fn from(entry: UserEntry) -> Self {
        User {
            id: entry.id,
            username: entry.username.content,
        }
    }
}

#[derive(Deserialize)]
pub struct PhotosetsEnvelope {
    pub photosets: PhotosetList,
}

#[derive(Deserialize)]
pub struct PhotosetList {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub page: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub pages: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total: u64,
    #[serde(default)]
    pub photoset: Vec<PhotosetEntry>,
}

#[derive(Deserialize)]
pub struct PhotosetEntry {
    pub id: String,
    pub title: Content,
}

impl From<PhotosetList> for Page<Photoset> {
    fn from(list: PhotosetList) -> Self {
        Page {
            page: list.page,
            pages: list.pages,
            total: list.total,
            items: list
                .photoset
                .into_iter()
                .map(|entry| Photoset {
                    id: entry.id,
                    title: entry.title.content,
                })
                .collect(),
        }
    }
}

/// `flickr.people.getPhotos` answers under `photos`.
#[derive(Deserialize)]
pub struct PhotosEnvelope {
    pub photos: PhotoList,
}

/// `flickr.photosets.getPhotos` answers under `photoset`.
#[derive(Deserialize)]
pub struct PhotosetPhotosEnvelope {
    pub photoset: PhotoList,
}

#[derive(Deserialize)]
pub struct PhotoList {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub page: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub pages: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total: u64,
    #[serde(default)]
    pub photo: Vec<Photo>,
}

impl From<PhotoList> for Page<Photo> {
    fn from(list: PhotoList) -> Self {
        Page {
            page: list.page,
            pages: list.pages,
            total: list.total,
            items: list.photo,
        }
    }
}

#[derive(Deserialize)]
pub struct PhotoInfoEnvelope {
    pub photo: PhotoInfoEntry,
}

#[derive(Deserialize)]
pub struct PhotoInfoEntry {
    pub id: String,
    pub title: Content,
    pub dates: Dates,
}

#[derive(Deserialize)]
pub struct Dates {
    pub taken: String,
}

impl From<PhotoInfoEntry> for PhotoInfo {
    fn from(entry: PhotoInfoEntry) -> Self {
        PhotoInfo {
            id: entry.id,
            title: entry.title.content,
            taken: entry.dates.taken,
        }
    }
}

#[derive(Deserialize)]
pub struct SizesEnvelope {
    pub sizes: SizeList,
}

#[derive(Deserialize)]
pub struct SizeList {
    #[serde(default)]
    pub size: Vec<SizeEntry>,
}

#[derive(Deserialize)]
pub struct SizeEntry {
    pub label: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub width: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub height: u64,
    pub source: String,
}

impl From<SizeEntry> for PhotoSize {
    fn from(entry: SizeEntry) -> Self {
        PhotoSize {
            label: entry.label,
            width: entry.width,
            height: entry.height,
            source: entry.source,
        }
    }
}

/// Flickr sends counters either as numbers or as strings.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.is_empty() => Ok(0),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Picks the requested size, or the one with the largest pixel area.
pub fn select_size<'a>(sizes: &'a [PhotoSize], label: Option<&str>) -> Option<&'a PhotoSize> {
    match label {
        Some(label) => sizes.iter().find(|size| size.label.eq_ignore_ascii_case(label)),
        None => sizes.iter().max_by_key(|size| size.width * size.height),
    }
}
