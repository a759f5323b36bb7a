use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime, DateTimeFormat};
use aws_sdk_s3::Client;
use framereview_shared::review_format::{decode_review_file, encode_review_file, ReviewFileData, ReviewFileError};
use framereview_shared::{Asset, PresignedUpload, UploadRequest};
use uuid::Uuid;

pub const UPLOAD_PREFIX: &str = "uploads/";
pub const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);
const MAX_FILENAME_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] ReviewFileError),
    #[error("s3 request failed: {0}")]
    S3(String),
    #[error("this asset store cannot presign uploads")]
    PresignUnsupported,
}

/// Persistence for per-video review files.
#[async_trait]
pub trait Storage: Send + Sync {
    /// `Ok(None)` when the video has never been reviewed.
    async fn load_review(&self, video_id: &str) -> Result<Option<ReviewFileData>, StoreError>;
    async fn save_review(&self, video_id: &str, data: &ReviewFileData) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn list_assets(&self) -> Result<Vec<Asset>, StoreError>;
    async fn presign_upload(&self, request: &UploadRequest) -> Result<PresignedUpload, StoreError>;
}

pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn review_path(&self, video_id: &str) -> PathBuf {
        self.data_dir.join(format!("{video_id}.bin"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_review(&self, video_id: &str) -> Result<Option<ReviewFileData>, StoreError> {
        match tokio::fs::read(self.review_path(video_id)).await {
            Ok(payload) => Ok(Some(decode_review_file(&payload)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn save_review(&self, video_id: &str, data: &ReviewFileData) -> Result<(), StoreError> {
        let payload = encode_review_file(data)?;
        let path = self.review_path(video_id);
        let staging = path.with_extension("bin.tmp");
        tokio::fs::write(&staging, payload).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    /// Builds a client from the default provider chain, overridden by any
    /// explicit credentials, region or endpoint.
    pub async fn client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let (Some(access_key_id), Some(secret_access_key)) =
            (self.access_key_id.clone(), self.secret_access_key.clone())
        {
            let creds = Credentials::new(access_key_id, secret_access_key, None, None, "static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(region) = self.region.clone() {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint_url) = self.endpoint_url.as_ref() {
            builder = builder.endpoint_url(endpoint_url);
        }
        if self.force_path_style {
            builder = builder.force_path_style(true);
        }
        Client::from_conf(builder.build())
    }
}

pub struct S3Storage {
    bucket: String,
    prefix: String,
    client: Client,
}

impl S3Storage {
    pub fn new(client: Client, config: &S3StorageConfig) -> Self {
        let prefix = config
            .prefix
            .clone()
            .unwrap_or_default()
            .trim_matches('/')
            .to_string();
        Self {
            bucket: config.bucket.clone(),
            prefix,
            client,
        }
    }

    fn object_key(&self, video_id: &str) -> String {
        if self.prefix.is_empty() {
            format!("{video_id}.bin")
        } else {
            format!("{}/{video_id}.bin", self.prefix)
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn load_review(&self, video_id: &str) -> Result<Option<ReviewFileData>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(video_id))
            .send()
            .await;
        let output = match response {
            Ok(output) => output,
            Err(error) => {
                if let Some(service_error) = error.as_service_error() {
                    if service_error.is_no_such_key() {
                        return Ok(None);
                    }
                }
                return Err(StoreError::S3(format!("get review {video_id}: {error:?}")));
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|error| StoreError::S3(format!("read review {video_id}: {error:?}")))?
            .into_bytes();
        Ok(Some(decode_review_file(&bytes)?))
    }

    async fn save_review(&self, video_id: &str, data: &ReviewFileData) -> Result<(), StoreError> {
        let payload = encode_review_file(data)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(video_id))
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|error| StoreError::S3(format!("put review {video_id}: {error:?}")))?;
        Ok(())
    }
}

/// Uploaded reference material in a bucket, written by the browser through
/// presigned PUT URLs.
pub struct S3AssetStore {
    bucket: String,
    public_base: String,
    client: Client,
}

impl S3AssetStore {
    pub fn new(client: Client, bucket: impl Into<String>, public_base: &str) -> Self {
        Self {
            bucket: bucket.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn list_assets(&self) -> Result<Vec<Asset>, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(UPLOAD_PREFIX)
            .send()
            .await
            .map_err(|error| StoreError::S3(format!("list assets: {error:?}")))?;
        let mut assets = Vec::new();
        for object in output.contents() {
            let Some(key) = object.key() else {
                continue;
            };
            let created_at = object
                .last_modified()
                .and_then(|modified| modified.fmt(DateTimeFormat::DateTime).ok())
                .unwrap_or_default();
            assets.push(Asset {
                id: key.to_string(),
                filename: filename_from_key(key),
                key: key.to_string(),
                url: format!("{}/{key}", self.public_base),
                size: object.size().unwrap_or(0).max(0) as u64,
                created_at,
            });
        }
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assets)
    }

    async fn presign_upload(&self, request: &UploadRequest) -> Result<PresignedUpload, StoreError> {
        let key = upload_key(&request.filename);
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|error| StoreError::S3(format!("presign config: {error}")))?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&request.content_type)
            .presigned(presigning)
            .await
            .map_err(|error| StoreError::S3(format!("presign {key}: {error:?}")))?;
        Ok(PresignedUpload {
            url: presigned.uri().to_string(),
            key,
        })
    }
}

/// Files dropped into a local directory, served under `/media`.
pub struct LocalAssetStore {
    media_dir: PathBuf,
}

impl LocalAssetStore {
    pub fn new(media_dir: PathBuf) -> Self {
        Self { media_dir }
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn list_assets(&self) -> Result<Vec<Asset>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.media_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut assets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            assets.push(Asset {
                id: name.clone(),
                url: format!("/media/{name}"),
                key: name.clone(),
                filename: name,
                size: metadata.len(),
                created_at: DateTime::from(modified)
                    .fmt(DateTimeFormat::DateTime)
                    .unwrap_or_default(),
            });
        }
        assets.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(assets)
    }

    async fn presign_upload(&self, _request: &UploadRequest) -> Result<PresignedUpload, StoreError> {
        Err(StoreError::PresignUnsupported)
    }
}

pub fn upload_key(filename: &str) -> String {
    format!("{UPLOAD_PREFIX}{}-{}", Uuid::now_v7(), sanitize_filename(filename))
}

/// Keeps ASCII alphanumerics, dots, dashes and underscores.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Strips the upload prefix and the uuid stamped in front of the name.
pub fn filename_from_key(key: &str) -> String {
    let name = key.strip_prefix(UPLOAD_PREFIX).unwrap_or(key);
    match name.split_at_checked(36) {
        Some((stamp, rest)) if Uuid::parse_str(stamp).is_ok() && rest.starts_with('-') => {
            rest[1..].to_string()
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framereview_shared::{Comment, NewComment};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framereview-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn file_storage_round_trips_a_review() {
        let dir = temp_dir();
        let storage = FileStorage::new(dir.clone());
        let mut data = ReviewFileData::default();
        let id = data.allocate_id();
        data.comments
            .push(Comment::from_new(id, NewComment::new(1.5, "tighten the cut")));

        storage.save_review("video", &data).await.unwrap();
        let loaded = storage.load_review("video").await.unwrap();

        assert_eq!(loaded, Some(data));
        assert!(!dir.join("video.bin.tmp").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_review_loads_as_none() {
        let dir = temp_dir();
        let storage = FileStorage::new(dir.clone());
        assert_eq!(storage.load_review("absent").await.unwrap(), None);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn corrupt_review_is_an_error() {
        let dir = temp_dir();
        std::fs::write(dir.join("broken.bin"), b"not a review").unwrap();
        let storage = FileStorage::new(dir.clone());
        let result = storage.load_review("broken").await;
        assert!(matches!(
            result,
            Err(StoreError::Format(ReviewFileError::InvalidData))
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn local_assets_list_plain_files_by_name() {
        let dir = temp_dir();
        std::fs::write(dir.join("b-roll.mp4"), vec![0u8; 2048]).unwrap();
        std::fs::write(dir.join("alt take.mov"), b"x").unwrap();
        std::fs::write(dir.join(".hidden"), b"x").unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();
        let store = LocalAssetStore::new(dir.clone());

        let assets = store.list_assets().await.unwrap();

        let names = assets.iter().map(|a| a.filename.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["alt take.mov", "b-roll.mp4"]);
        assert_eq!(assets[1].size, 2048);
        assert_eq!(assets[1].url, "/media/b-roll.mp4");
        assert!(!assets[1].created_at.is_empty());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn local_assets_refuse_to_presign() {
        let store = LocalAssetStore::new(std::env::temp_dir().join("framereview-none"));
        let request = UploadRequest {
            filename: "a.png".into(),
            content_type: "image/png".into(),
        };
        assert!(matches!(
            store.presign_upload(&request).await,
            Err(StoreError::PresignUnsupported)
        ));
    }

    #[tokio::test]
    async fn missing_media_dir_lists_nothing() {
        let store = LocalAssetStore::new(std::env::temp_dir().join(format!("absent-{}", Uuid::new_v4())));
        assert!(store.list_assets().await.unwrap().is_empty());
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("shot 01 (final).png"), "shot_01__final_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(".env"), "env");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), MAX_FILENAME_LEN);
    }

    #[test]
    fn upload_keys_round_trip_to_the_filename() {
        let key = upload_key("storyboard v2.pdf");
        assert!(key.starts_with(UPLOAD_PREFIX));
        assert_eq!(filename_from_key(&key), "storyboard_v2.pdf");
        assert_eq!(filename_from_key("uploads/plain.png"), "plain.png");
    }
}
