//! GitHub contents API payloads and source settings.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use super::error::GitHubError;
use crate::source::InvalidConfig;
use crate::sync_config::SyncConfig;

/// One entry of a `GET /repos/{owner}/{repo}/contents/{path}` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    /// `file`, `dir`, `symlink` or `submodule`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

impl ContentEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// The contents endpoint returns an array for directories and a single
/// object for files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentListing {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

impl ContentListing {
    #[must_use]
    pub fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            ContentListing::Directory(entries) => entries,
            ContentListing::File(entry) => vec![entry],
        }
    }
}

/// `GET /repos/{owner}/{repo}/git/blobs/{sha}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Blob {
    pub sha: String,
    pub content: String,
    /// `base64` or `utf-8`.
    pub encoding: String,
    #[serde(default)]
    pub size: u64,
}

impl Blob {
    /// Decode the blob content. Base64 payloads wrap at 60 columns, so
    /// embedded whitespace is stripped first.
    pub fn decode(&self) -> Result<Vec<u8>, GitHubError> {
        match self.encoding.as_str() {
            "base64" => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| GitHubError::Decode {
                        sha: self.sha.clone(),
                        message: e.to_string(),
                    })
            }
            "utf-8" | "utf8" => Ok(self.content.clone().into_bytes()),
            other => Err(GitHubError::Decode {
                sha: self.sha.clone(),
                message: format!("unsupported encoding '{other}'"),
            }),
        }
    }
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

impl RepositoryRef {
    pub fn parse(full_name: &str) -> Result<Self, InvalidConfig> {
        let malformed = |reason: &str| InvalidConfig::Malformed {
            key: "repository",
            reason: reason.to_string(),
        };

        let trimmed = full_name.trim().trim_matches('/');
        let (owner, repo) = trimmed
            .split_once('/')
            .ok_or_else(|| malformed("expected 'owner/repo'"))?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(malformed("expected 'owner/repo'"));
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Validated `source_config` of a GitHub sync config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSource {
    pub repository: RepositoryRef,
    pub branch: String,
    /// Directory or file path inside the repository; empty for the root.
    pub path: String,
}

impl GitHubSource {
    /// Read and check `repository`, `branch` and `path`.
    pub fn from_config(config: &SyncConfig) -> Result<Self, InvalidConfig> {
        let repository = required_str(config, "repository")?;
        if repository.trim().is_empty() {
            return Err(InvalidConfig::Missing { key: "repository" });
        }
        let repository = RepositoryRef::parse(repository)?;

        let branch = required_str(config, "branch")?.trim();
        if branch.is_empty() {
            return Err(InvalidConfig::Missing { key: "branch" });
        }

        let path = required_str(config, "path")?;

        Ok(Self {
            repository,
            branch: branch.to_string(),
            path: path.trim().trim_matches('/').to_string(),
        })
    }

    /// A short label for logs and progress, e.g. `org/repo:docs@main`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}@{}", self.repository, self.path, self.branch)
    }
}

fn required_str<'a>(config: &'a SyncConfig, key: &'static str) -> Result<&'a str, InvalidConfig> {
    match config.source_config.get(key) {
        None | Some(serde_json::Value::Null) => Err(InvalidConfig::Missing { key }),
        Some(serde_json::Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(InvalidConfig::Malformed {
            key,
            reason: "expected a string".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_accepts_array_and_single_object() {
        let dir: ContentListing = serde_json::from_value(json!([
            {"name": "a.md", "path": "docs/a.md", "sha": "s1", "type": "file", "size": 3},
            {"name": "img", "path": "docs/img", "sha": "s2", "type": "dir"}
        ]))
        .unwrap();
        let entries = dir.into_entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_file());
        assert!(!entries[1].is_file());

        let file: ContentListing = serde_json::from_value(json!(
            {"name": "README.md", "path": "README.md", "sha": "s3", "type": "file", "size": 10, "content": "IyBo"}
        ))
        .unwrap();
        assert_eq!(file.into_entries()[0].name, "README.md");
    }

    #[test]
    fn blob_decode_tolerates_wrapped_base64() {
        let blob = Blob {
            sha: "s".into(),
            content: "IyBIZWxs\nbyB3b3Js\nZA==\n".into(),
            encoding: "base64".into(),
            size: 13,
        };
        assert_eq!(blob.decode().unwrap(), b"# Hello world");
    }

    #[test]
    fn blob_decode_rejects_bad_payloads() {
        let blob = Blob {
            sha: "s".into(),
            content: "!!!".into(),
            encoding: "base64".into(),
            size: 0,
        };
        assert!(matches!(blob.decode(), Err(GitHubError::Decode { .. })));

        let blob = Blob {
            sha: "s".into(),
            content: "x".into(),
            encoding: "rot13".into(),
            size: 1,
        };
        assert!(blob.decode().is_err());
    }

    #[test]
    fn repository_ref_parse() {
        assert_eq!(
            RepositoryRef::parse("org/repo").unwrap(),
            RepositoryRef {
                owner: "org".into(),
                repo: "repo".into()
            }
        );
        assert_eq!(RepositoryRef::parse("org/repo.git").unwrap().repo, "repo");
        assert!(RepositoryRef::parse("repo").is_err());
        assert!(RepositoryRef::parse("org/").is_err());
        assert!(RepositoryRef::parse("a/b/c").is_err());
    }
}
