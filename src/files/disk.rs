//! Where uploaded bytes live. Each workspace picks a driver; the record remembers which one
//! so later reads go to the same place.

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client as S3Client, config::Builder as S3ConfigBuilder, primitives::ByteStream};

use crate::{config::S3Config, mods::StorageDriver};

#[async_trait]
pub trait Disk: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> anyhow::Result<()>;
    /// `None` when nothing is stored under `path`.
    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
    /// Publicly reachable URL, if the disk serves objects itself.
    fn public_url(&self, path: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        if path.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(anyhow!("refusing storage path {path}"));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl Disk for LocalDisk {
    async fn put(&self, path: &str, bytes: Vec<u8>, _mime_type: &str) -> anyhow::Result<()> {
        let target = self.resolve(path)?;
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.resolve(path)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {path}")),
        }
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!("{path} was already gone from local storage");
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("deleting {path}")),
        }
    }

    fn public_url(&self, _path: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct S3Disk {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl S3Disk {
    pub async fn connect(config: &S3Config) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }
        let base_config = loader.load().await;

        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        let public_url = match (&config.public_url, &config.endpoint) {
            (Some(url), _) => url.trim_end_matches('/').to_owned(),
            (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
            (None, None) => format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region),
        };

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url,
        })
    }
}

#[async_trait]
impl Disk for S3Disk {
    async fn put(&self, path: &str, bytes: Vec<u8>, mime_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| anyhow!("uploading s3://{}/{path}: {e}", self.bucket))?;
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let object = match self.client.get_object().bucket(&self.bucket).key(path).send().await {
            Ok(object) => object,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => return Ok(None),
            Err(err) => return Err(anyhow!("downloading s3://{}/{path}: {err}", self.bucket)),
        };
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("reading s3://{}/{path}: {e}", self.bucket))?;
        Ok(Some(data.into_bytes().to_vec()))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| anyhow!("deleting s3://{}/{path}: {e}", self.bucket))?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> Option<String> {
        Some(format!("{}/{path}", self.public_url))
    }
}

/// The disks this process can write to. S3 is only present when configured.
#[derive(Clone)]
pub struct Disks {
    local: Arc<LocalDisk>,
    s3: Option<Arc<S3Disk>>,
}

impl Disks {
    pub fn new(local: LocalDisk, s3: Option<S3Disk>) -> Self {
        Self { local: Arc::new(local), s3: s3.map(Arc::new) }
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(LocalDisk::new(root), None)
    }

    pub fn supports(&self, driver: StorageDriver) -> bool {
        match driver {
            StorageDriver::Local => true,
            StorageDriver::S3 => self.s3.is_some(),
        }
    }

    pub fn disk(&self, driver: StorageDriver) -> anyhow::Result<&dyn Disk> {
        match driver {
            StorageDriver::Local => Ok(self.local.as_ref()),
            StorageDriver::S3 => self
                .s3
                .as_deref()
                .map(|disk| disk as &dyn Disk)
                .ok_or_else(|| anyhow!("s3 storage is not configured")),
        }
    }
}
