use anyhow::{anyhow, Result};
use colored::*;
use slug::slugify;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::epub_writer::{CoverImage, EpubWriter};
use crate::manifest::{self, Manifest};
use crate::parser::Chapter;
use crate::toc;

pub struct BookBuilder {
    manifest_path: PathBuf,
    out_dir: PathBuf,
    gen_toc: bool,
}

impl BookBuilder {
    pub fn new(manifest_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, gen_toc: bool) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            out_dir: out_dir.into(),
            gen_toc,
        }
    }

    /// Parses the manifest and its chapter files without writing anything.
    pub async fn outline(&self) -> Result<(Manifest, Vec<Chapter>)> {
        info!("Reading manifest \"{}\"", self.manifest_path.display().to_string().green());
        manifest::parse(&self.manifest_path).await
    }

    /// Builds the book and returns the path of the written EPUB.
    pub async fn run(&self) -> Result<PathBuf> {
        let (manifest, chapters) = self.outline().await?;

        if chapters.is_empty() {
            return Err(anyhow!(
                "No chapters found in the sources of '{}' (chapters start with a \"# Title\" line)",
                self.manifest_path.display()
            ));
        }

        let cover = match manifest.cover_path(manifest::base_dir(&self.manifest_path)) {
            Some(path) => Some(self.read_cover(&path).await?),
            None => None,
        };

        let toc = if self.gen_toc {
            toc::nested(&chapters)
        } else {
            toc::flat(&chapters)
        };
        debug!("Table of contents has {} top-level entries", toc.len());

        let output_path = self.output_path(&manifest.title);
        info!(
            "Packaging \"{}\" with {} chapters",
            manifest.title.blue(),
            chapters.len()
        );

        let mut writer = EpubWriter::new(manifest, chapters);
        writer.set_toc(toc);
        if let Some(cover) = cover {
            writer.set_cover(cover);
        }
        writer.save(&output_path).await?;

        Ok(output_path)
    }

    async fn read_cover(&self, path: &Path) -> Result<CoverImage> {
        let data = fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read cover image '{}': {}", path.display(), e))?;
        debug!("Loaded cover image with {} bytes from {}", data.len(), path.display());
        Ok(CoverImage::from_source(path, data))
    }

    fn output_path(&self, title: &str) -> PathBuf {
        self.out_dir.join(format!("{}.epub", Self::title_to_slug(title)))
    }

    fn title_to_slug(title: &str) -> String {
        let slug = slugify(title);
        if slug.is_empty() {
            "book".to_string()
        } else {
            slug
        }
    }
}
