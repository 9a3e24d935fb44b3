use async_trait::async_trait;
use log::debug;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;

use crate::auth::{self, Credentials};
use crate::error::{FlickrError, Result};
use crate::model::{
    ApiStatus, Page, Photo, PhotoInfo, PhotoInfoEnvelope, PhotoSize, Photoset,
    PhotosEnvelope, PhotosetPhotosEnvelope, PhotosetsEnvelope, SizesEnvelope, User, UserEnvelope,
    select_size,
};

const REST_URL: &str = "https://api.flickr.com/services/rest/";
const USER_AGENT: &str = concat!("flickr_download/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: u32 = 100;

/// The remote operations the downloader relies on.
#[async_trait]
pub trait PhotoService: Send + Sync {
    async fn find_user_by_name(&self, username: &str) -> Result<User>;

    async fn photosets_page(&self, user_id: &str, page: u32) -> Result<Page<Photoset>>;

    async fn photostream_page(&self, user_id: &str, page: u32) -> Result<Page<Photo>>;

    async fn photoset_photos_page(&self, set_id: &str, page: u32) -> Result<Page<Photo>>;

    async fn photo_info(&self, photo_id: &str) -> Result<PhotoInfo>;

    /// Binary content of the photo at `size_label`, or the largest size.
    async fn fetch_photo(&self, photo_id: &str, size_label: Option<&str>) -> Result<Vec<u8>>;
}

pub struct FlickrClient {
    credentials: Credentials,
    client: Client,
}

impl FlickrClient {
    pub fn new(credentials: Credentials, client: Client) -> FlickrClient {
        FlickrClient {
            credentials,
            client,
        }
    }

    pub fn build_client() -> Result<Client> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(client)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, args: &[(&str, String)]) -> Result<T> {
        debug!("Calling {method} {args:?}");

        let mut params: Vec<(String, String)> = vec![
            ("method".to_string(), method.to_string()),
            ("api_key".to_string(), self.credentials.keys.key.clone()),
            ("format".to_string(), "json".to_string()),
            ("nojsoncallback".to_string(), "1".to_string()),
        ];
        params.extend(args.iter().map(|(k, v)| (k.to_string(), v.clone())));

        if let Some(token) = &self.credentials.token {
            params = auth::signed_params(
                "GET",
                REST_URL,
                params,
                &self.credentials.keys,
                Some(token),
            )?;
        }

        let response = self.client.get(REST_URL).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FlickrError::Status {
                status,
                url: format!("{REST_URL}?method={method}"),
            });
        }

        let body = response.text().await?;
        parse_response(&body)
    }

    async fn photo_sizes(&self, photo_id: &str) -> Result<Vec<PhotoSize>> {
        let envelope: SizesEnvelope = self
            .call("flickr.photos.getSizes", &[("photo_id", photo_id.to_string())])
            .await?;
        Ok(envelope.sizes.size.into_iter().map(Into::into).collect())
    }
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let status = serde_json::from_str::<ApiStatus>(body)?;
    if status.stat != "ok" {
        return Err(FlickrError::Api {
            code: status.code.unwrap_or_default(),
            message: status.message.unwrap_or_else(|| "unknown failure".to_string()),
        });
    }
    Ok(serde_json::from_str::<T>(body)?)
}

fn page_args(page: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("per_page", PER_PAGE.to_string())]
}

#[async_trait]
impl PhotoService for FlickrClient {
    async fn find_user_by_name(&self, username: &str) -> Result<User> {
        let envelope: UserEnvelope = self
            .call("flickr.people.findByUsername", &[("username", username.to_string())])
            .await?;
        Ok(envelope.user.into())
    }

    async fn photosets_page(&self, user_id: &str, page: u32) -> Result<Page<Photoset>> {
        let mut args = vec![("user_id", user_id.to_string())];
        args.extend(page_args(page));
        let envelope: PhotosetsEnvelope = self.call("flickr.photosets.getList", &args).await?;
        Ok(envelope.photosets.into())
    }

    async fn photostream_page(&self, user_id: &str, page: u32) -> Result<Page<Photo>> {
        let mut args = vec![("user_id", user_id.to_string())];
        args.extend(page_args(page));
        let envelope: PhotosEnvelope = self.call("flickr.people.getPhotos", &args).await?;
        Ok(envelope.photos.into())
    }

    async fn photoset_photos_page(&self, set_id: &str, page: u32) -> Result<Page<Photo>> {
        let mut args = vec![("photoset_id", set_id.to_string())];
        args.extend(page_args(page));
        let envelope: PhotosetPhotosEnvelope =
            self.call("flickr.photosets.getPhotos", &args).await?;
        Ok(envelope.photoset.into())
    }

    async fn photo_info(&self, photo_id: &str) -> Result<PhotoInfo> {
        let envelope: PhotoInfoEnvelope = self
            .call("flickr.photos.getInfo", &[("photo_id", photo_id.to_string())])
            .await?;
        Ok(envelope.photo.into())
    }

    async fn fetch_photo(&self, photo_id: &str, size_label: Option<&str>) -> Result<Vec<u8>> {
        let sizes = self.photo_sizes(photo_id).await?;
        let size = select_size(&sizes, size_label).ok_or_else(|| FlickrError::SizeUnavailable {
            label: size_label.unwrap_or("largest").to_string(),
            photo_id: photo_id.to_string(),
        })?;

        debug!("Fetching {label} of {photo_id} from {source}", label = size.label, source = size.source);
        let response = self.client.get(&size.source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FlickrError::Status {
                status,
                url: size.source.clone(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_stat_becomes_api_error() {
        let body = r#"{"stat":"fail","code":1,"message":"Photo \"5311\" not found (invalid ID)"}"#;

        let err = parse_response::<PhotoInfoEnvelope>(body).err().unwrap();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn ok_stat_decodes_payload() {
        let body = r#"{"user":{"id":"12037949754@N01","nsid":"12037949754@N01",
                       "username":{"_content":"Stewart"}},"stat":"ok"}"#;

        let envelope = parse_response::<UserEnvelope>(body).unwrap();
        let user: User = envelope.user.into();

        assert_eq!("12037949754@N01", user.id);
        assert_eq!("Stewart", user.username);
    }

    #[test]
    fn page_args_use_fixed_page_size() {
        let args = page_args(3);
        assert_eq!(("page", "3".to_string()), args[0]);
        assert_eq!(("per_page", "100".to_string()), args[1]);
    }
}
