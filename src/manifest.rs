use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::parser::{parse_text, split_lines, Chapter};

/// Book metadata and the ordered list of chapter sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub title: String,
    pub language: String,
    #[serde(rename = "creators")]
    pub authors: Vec<String>,
    #[serde(default)]
    pub cover: Option<String>,
    pub chapters: Vec<String>,
}

impl Manifest {
    /// Parses manifest TOML. An empty `id` is replaced with a random UUID.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut manifest: Manifest = toml::from_str(content)?;
        if manifest.id.is_empty() {
            manifest.id = Uuid::new_v4().to_string();
            debug!("Generated book id {}", manifest.id);
        }
        manifest.validate()?;
        Ok(manifest)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read manifest '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid manifest '{}'", path.display()))
    }

    /// Reports every problem at once rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<&str> = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("title must not be empty");
        }
        if self.language.trim().is_empty() {
            errors.push("language must not be empty");
        }
        if self.chapters.is_empty() {
            errors.push("chapters must list at least one file");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{}", errors.join("; ")))
        }
    }

    pub fn chapter_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.chapters.iter().map(|c| base_dir.join(c)).collect()
    }

    pub fn cover_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.cover.as_ref().map(|c| base_dir.join(c))
    }
}

/// Directory that relative manifest paths are resolved against.
pub fn base_dir(manifest_path: &Path) -> &Path {
    manifest_path.parent().unwrap_or_else(|| Path::new(""))
}

/// Loads the manifest at `path` and segments its chapter files, read in
/// listed order, into chapters.
pub async fn parse(path: &Path) -> Result<(Manifest, Vec<Chapter>)> {
    let manifest = Manifest::load(path).await?;
    let base = base_dir(path);

    let mut sources = Vec::with_capacity(manifest.chapters.len());
    for chapter_path in manifest.chapter_paths(base) {
        let text = fs::read_to_string(&chapter_path)
            .await
            .map_err(|e| anyhow!("Failed to read chapter file '{}': {}", chapter_path.display(), e))?;
        debug!("Read {} bytes from {}", text.len(), chapter_path.display());
        sources.push(text);
    }

    let chapters = parse_text(sources.iter().flat_map(|text| split_lines(text)));
    info!(
        "Parsed {} chapters from {} source files",
        chapters.len(),
        sources.len()
    );

    Ok((manifest, chapters))
}
