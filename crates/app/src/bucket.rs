use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use billing_core::SourceFile;
use chrono::{DateTime, SecondsFormat, Utc};
use ingest::{ObjectStore, SourceError};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{AppError, Result};

const LIST_FIELDS: &str = "name,size,timeCreated";

/// Directory tree laid out like a bucket; object names are the
/// `/`-separated paths relative to the root.
#[derive(Debug, Clone)]
pub struct LocalBucket {
    root: PathBuf,
}

impl LocalBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> std::result::Result<PathBuf, SourceError> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(format!("invalid object name: {}", name).into());
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalBucket {
    fn list_objects(
        &self,
        prefix: &str,
        start_after: &str,
    ) -> std::result::Result<Vec<SourceFile>, SourceError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !name.starts_with(prefix) || name.as_str() <= start_after {
                continue;
            }
            let metadata = entry.metadata()?;
            let time_created = metadata
                .modified()
                .map(|time| DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default();
            files.push(SourceFile {
                name,
                size: metadata.len(),
                time_created,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn fetch(&self, name: &str) -> std::result::Result<Box<dyn Read + '_>, SourceError> {
        let file = File::open(self.object_path(name)?)?;
        Ok(Box::new(file))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    objects: Vec<ObjectSummary>,
    next_start_with: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectSummary {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    time_created: String,
}

/// Bucket reached through a pre-authenticated request URL.
#[derive(Debug, Clone)]
pub struct ParBucket {
    client: Client,
    base: Url,
}

impl ParBucket {
    pub fn new(par_url: &str, connect_timeout: Duration) -> Result<Self> {
        let trimmed = par_url.trim();
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let base = Url::parse(&with_slash)
            .map_err(|err| AppError::Config(format!("invalid PAR url: {}", err)))?;
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, base })
    }

    fn list_url(&self, prefix: &str, start: Option<&str>) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("prefix", prefix);
            query.append_pair("fields", LIST_FIELDS);
            if let Some(start) = start {
                query.append_pair("start", start);
            }
        }
        url
    }

    fn object_url(&self, name: &str) -> std::result::Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| "PAR url cannot hold object paths".to_string())?
            .pop_if_empty()
            .extend(name.split('/'));
        Ok(url)
    }
}

impl ObjectStore for ParBucket {
    fn list_objects(
        &self,
        prefix: &str,
        start_after: &str,
    ) -> std::result::Result<Vec<SourceFile>, SourceError> {
        let mut files = Vec::new();
        let mut start = (!start_after.is_empty()).then(|| start_after.to_string());
        loop {
            let url = self.list_url(prefix, start.as_deref());
            let body = self.client.get(url).send()?.error_for_status()?.text()?;
            let page = parse_list_page(&body)?;
            files.extend(
                page.objects
                    .into_iter()
                    .filter(|object| object.name.as_str() > start_after)
                    .map(|object| SourceFile {
                        name: object.name,
                        size: object.size,
                        time_created: object.time_created,
                    }),
            );
            match page.next_start_with {
                Some(next) if !next.is_empty() => start = Some(next),
                _ => break,
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn fetch(&self, name: &str) -> std::result::Result<Box<dyn Read + '_>, SourceError> {
        let url = self.object_url(name)?;
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(Box::new(response))
    }
}

fn parse_list_page(body: &str) -> serde_json::Result<ListPage> {
    serde_json::from_str(body)
}
