use anyhow::{anyhow, Result};
use chrono::Utc;
use std::io::{Cursor, Write};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::manifest::Manifest;
use crate::parser::Chapter;
use crate::toc::TocEntry;

const CONTENT_DIR: &str = "EPUB";
const STYLESHEET_HREF: &str = "style/nav.css";

pub const DEFAULT_STYLESHEET: &str = r#"@namespace epub "http://www.idpf.org/2007/ops";

body {
    font-family: Cambria, Liberation Serif, Bitstream Vera Serif, Georgia, Times, Times New Roman, serif;
}

h2 {
    text-align: left;
    text-transform: uppercase;
    font-weight: 200;
}

ol {
    list-style-type: none;
}

ol > li:first-child {
    margin-top: 0.3em;
}

nav[epub|type~='toc'] > ol > li > ol {
    list-style-type: square;
}

nav[epub|type~='toc'] > ol > li > ol > li {
    margin-top: 0.3em;
}
"#;

#[derive(Debug, Clone)]
pub struct CoverImage {
    pub href: String,
    pub media_type: &'static str,
    pub data: Vec<u8>,
}

impl CoverImage {
    /// Picks the media type from the source file's extension, defaulting to PNG.
    pub fn from_source(source: &Path, data: Vec<u8>) -> Self {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let (ext, media_type) = match ext.as_str() {
            "jpg" | "jpeg" => ("jpg", "image/jpeg"),
            "gif" => ("gif", "image/gif"),
            "svg" => ("svg", "image/svg+xml"),
            "webp" => ("webp", "image/webp"),
            _ => ("png", "image/png"),
        };

        Self {
            href: format!("image/cover.{}", ext),
            media_type,
            data,
        }
    }
}

pub struct EpubWriter {
    manifest: Manifest,
    chapters: Vec<Chapter>,
    toc: Vec<TocEntry>,
    cover: Option<CoverImage>,
}

impl EpubWriter {
    pub fn new(manifest: Manifest, chapters: Vec<Chapter>) -> Self {
        let toc = crate::toc::flat(&chapters);
        Self {
            manifest,
            chapters,
            toc,
            cover: None,
        }
    }

    pub fn set_toc(&mut self, toc: Vec<TocEntry>) -> &mut Self {
        self.toc = toc;
        self
    }

    pub fn set_cover(&mut self, cover: CoverImage) -> &mut Self {
        self.cover = Some(cover);
        self
    }

    pub fn chapter_file_name(index: usize) -> String {
        format!("chp{}.xhtml", index)
    }

    fn chapter_id(index: usize) -> String {
        format!("chapter_{}", index)
    }

    /// Assembles the whole container in memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Readers sniff the first entry, so it must be the uncompressed mimetype.
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(container_xml().as_bytes())?;

        let mut add = |name: &str, data: &[u8]| -> Result<()> {
            zip.start_file(format!("{}/{}", CONTENT_DIR, name), deflated)?;
            zip.write_all(data)?;
            debug!("Packed {} ({} bytes)", name, data.len());
            Ok(())
        };

        add("content.opf", self.package_document().as_bytes())?;
        add("toc.ncx", self.ncx_document()?.as_bytes())?;
        add("nav.xhtml", self.nav_document()?.as_bytes())?;
        add(STYLESHEET_HREF, DEFAULT_STYLESHEET.as_bytes())?;

        if let Some(cover) = &self.cover {
            add(&cover.href, &cover.data)?;
            add("cover.xhtml", self.cover_document(cover).as_bytes())?;
        }

        for (index, chapter) in self.chapters.iter().enumerate() {
            let doc = self.xhtml_document(&chapter.title, &chapter.render());
            add(&Self::chapter_file_name(index), doc.as_bytes())?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub async fn save(&self, output_path: &Path) -> Result<()> {
        let data = self.to_bytes()?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
            }
        }

        fs::write(output_path, &data)
            .await
            .map_err(|e| anyhow!("Failed to write EPUB to {}: {}", output_path.display(), e))?;

        info!(
            "Wrote {} chapters ({} bytes) to {}",
            self.chapters.len(),
            data.len(),
            output_path.display()
        );
        Ok(())
    }

    fn package_document(&self) -> String {
        let m = &self.manifest;
        let modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

        let mut metadata = String::new();
        metadata.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            modified
        ));
        metadata.push_str(&format!(
            "    <dc:identifier id=\"id\">{}</dc:identifier>\n",
            xml_escape(&m.id)
        ));
        metadata.push_str(&format!("    <dc:title>{}</dc:title>\n", xml_escape(&m.title)));
        metadata.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            xml_escape(&m.language)
        ));
        for (i, author) in m.authors.iter().enumerate() {
            metadata.push_str(&format!(
                "    <dc:creator id=\"creator_{}\">{}</dc:creator>\n",
                i,
                xml_escape(author)
            ));
        }

        let mut items = String::new();
        let mut spine = String::new();

        if let Some(cover) = &self.cover {
            metadata.push_str("    <meta name=\"cover\" content=\"cover-img\"/>\n");
            items.push_str(&format!(
                "    <item href=\"{}\" id=\"cover-img\" media-type=\"{}\" properties=\"cover-image\"/>\n",
                cover.href, cover.media_type
            ));
            items.push_str(
                "    <item href=\"cover.xhtml\" id=\"cover\" media-type=\"application/xhtml+xml\"/>\n",
            );
            spine.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
        }

        items.push_str(&format!(
            "    <item href=\"{}\" id=\"style_nav\" media-type=\"text/css\"/>\n",
            STYLESHEET_HREF
        ));
        items.push_str("    <item href=\"toc.ncx\" id=\"ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
        items.push_str(
            "    <item href=\"nav.xhtml\" id=\"nav\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        spine.push_str("    <itemref idref=\"nav\"/>\n");

        for index in 0..self.chapters.len() {
            items.push_str(&format!(
                "    <item href=\"{}\" id=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                Self::chapter_file_name(index),
                Self::chapter_id(index)
            ));
            spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", Self::chapter_id(index)));
        }

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
{metadata}  </metadata>
  <manifest>
{items}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#
        )
    }

    fn ncx_document(&self) -> Result<String> {
        let mut points = String::new();
        let mut order = 0usize;

        for entry in &self.toc {
            match entry {
                TocEntry::Link(index) => {
                    order += 1;
                    points.push_str(&self.nav_point(*index, order, 2)?);
                    points.push_str("    </navPoint>\n");
                }
                TocEntry::Section(index, children) => {
                    order += 1;
                    points.push_str(&self.nav_point(*index, order, 2)?);
                    for child in children {
                        order += 1;
                        points.push_str(&self.nav_point(*child, order, 3)?);
                        points.push_str("      </navPoint>\n");
                    }
                    points.push_str("    </navPoint>\n");
                }
            }
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="2"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
            uid = xml_escape(&self.manifest.id),
            title = xml_escape(&self.manifest.title),
        ))
    }

    /// Title of the chapter a TOC entry points at.
    fn toc_label(&self, index: usize) -> Result<String> {
        self.chapters
            .get(index)
            .map(|chapter| xml_escape(&chapter.title))
            .ok_or_else(|| {
                anyhow!(
                    "Table of contents refers to chapter {} but the book has {} chapters",
                    index,
                    self.chapters.len()
                )
            })
    }

    /// Opens a `navPoint`; the caller closes it after adding children.
    fn nav_point(&self, index: usize, order: usize, depth: usize) -> Result<String> {
        let label = self.toc_label(index)?;
        let pad = "  ".repeat(depth);
        Ok(format!(
            "{pad}<navPoint id=\"{id}\" playOrder=\"{order}\">\n\
             {pad}  <navLabel>\n\
             {pad}    <text>{label}</text>\n\
             {pad}  </navLabel>\n\
             {pad}  <content src=\"{src}\"/>\n",
            id = Self::chapter_id(index),
            src = Self::chapter_file_name(index),
        ))
    }

    fn nav_document(&self) -> Result<String> {
        let link = |index: usize| -> Result<String> {
            Ok(format!(
                "<a href=\"{}\">{}</a>",
                Self::chapter_file_name(index),
                self.toc_label(index)?
            ))
        };

        let mut list = String::from("<ol>");
        for entry in &self.toc {
            match entry {
                TocEntry::Link(index) => {
                    list.push_str(&format!("<li>{}</li>", link(*index)?));
                }
                TocEntry::Section(index, children) => {
                    list.push_str(&format!("<li>{}", link(*index)?));
                    if !children.is_empty() {
                        list.push_str("<ol>");
                        for child in children {
                            list.push_str(&format!("<li>{}</li>", link(*child)?));
                        }
                        list.push_str("</ol>");
                    }
                    list.push_str("</li>");
                }
            }
        }
        list.push_str("</ol>");

        let body = format!(
            "<nav epub:type=\"toc\" id=\"id\" role=\"doc-toc\"><h2>{}</h2>{}</nav>",
            xml_escape(&self.manifest.title),
            list
        );
        Ok(self.xhtml_document(&self.manifest.title, &body))
    }

    fn cover_document(&self, cover: &CoverImage) -> String {
        let body = format!(
            "<img src=\"{}\" alt=\"Cover\" style=\"max-width: 100%; height: auto;\"/>",
            cover.href
        );
        self.xhtml_document("Cover", &body)
    }

    /// `body` is embedded as-is; only `title` is escaped.
    fn xhtml_document(&self, title: &str, body: &str) -> String {
        let lang = xml_escape(&self.manifest.language);
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link href="{css}" rel="stylesheet" type="text/css"/>
</head>
<body>{body}</body>
</html>
"#,
            title = xml_escape(title),
            css = STYLESHEET_HREF,
        )
    }
}

fn container_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="{}/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#,
        CONTENT_DIR
    )
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
