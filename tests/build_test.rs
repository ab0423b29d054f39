//! End-to-end tests: manifest on disk in, EPUB on disk out.

use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;
use txt2epub::{manifest, BookBuilder};
use zip::ZipArchive;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn setup_book(dir: &Path, with_cover: bool) {
    let cover = if with_cover { "cover = \"art/cover.png\"\n" } else { "" };
    write(
        dir,
        "manifest.toml",
        &format!(
            r#"id = ""
title = "Field Notes"
language = "en"
creators = ["Ann Author"]
{}chapters = ["one.txt", "two.txt"]
"#,
            cover
        ),
    );
    write(dir, "one.txt", "# Spring\nbuds\n## March\nrain\n### not a header");
    write(dir, "two.txt", "still march\n# Summer\n\nheat\n");
    if with_cover {
        std::fs::create_dir_all(dir.join("art")).unwrap();
        std::fs::write(dir.join("art/cover.png"), [0x89, b'P', b'N', b'G']).unwrap();
    }
}

fn read_entry(epub: &Path, name: &str) -> String {
    let bytes = std::fs::read(epub).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

#[tokio::test]
async fn parse_concatenates_chapter_files_in_order() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), false);

    let (manifest, chapters) = manifest::parse(&temp_dir.path().join("manifest.toml")).await.unwrap();

    assert_eq!(manifest.title, "Field Notes");
    assert!(!manifest.id.is_empty());
    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters[0].title, "Spring");
    assert_eq!(chapters[1].title, "March");
    assert_eq!(chapters[1].level(), 2);
    assert_eq!(chapters[1].lines(), ["rain", "### not a header", "still march"]);
    assert_eq!(chapters[2].lines(), ["", "heat"]);
}

#[tokio::test]
async fn carriage_return_line_endings_split_lines() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), false);
    write(temp_dir.path(), "one.txt", "# One\rbody\r## Two\rmore\r");
    write(temp_dir.path(), "two.txt", "tail\r\n");

    let (_, chapters) = manifest::parse(&temp_dir.path().join("manifest.toml")).await.unwrap();

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "One");
    assert_eq!(chapters[0].lines(), ["body"]);
    assert_eq!(chapters[1].title, "Two");
    assert_eq!(chapters[1].lines(), ["more", "tail"]);
}

#[tokio::test]
async fn build_writes_epub_named_after_title() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), true);
    let out_dir = temp_dir.path().join("dist");

    let builder = BookBuilder::new(temp_dir.path().join("manifest.toml"), &out_dir, true);
    let path = builder.run().await.unwrap();

    assert_eq!(path, out_dir.join("field-notes.epub"));
    assert!(path.exists());

    let opf = read_entry(&path, "EPUB/content.opf");
    assert!(opf.contains("<dc:title>Field Notes</dc:title>"));
    assert!(opf.contains("<dc:creator id=\"creator_0\">Ann Author</dc:creator>"));
    assert!(opf.contains("media-type=\"image/png\" properties=\"cover-image\""));

    let nav = read_entry(&path, "EPUB/nav.xhtml");
    assert!(nav.contains("<a href=\"chp0.xhtml\">Spring</a><ol><li><a href=\"chp1.xhtml\">March</a></li></ol>"));

    let chapter = read_entry(&path, "EPUB/chp2.xhtml");
    assert!(chapter.contains("<h1>Summer</h1><p></p><p>heat</p>"));
}

#[tokio::test]
async fn flat_toc_lists_every_chapter_at_top_level() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), false);

    let builder = BookBuilder::new(temp_dir.path().join("manifest.toml"), temp_dir.path(), false);
    let path = builder.run().await.unwrap();

    let nav = read_entry(&path, "EPUB/nav.xhtml");
    assert!(nav.contains(
        "<ol><li><a href=\"chp0.xhtml\">Spring</a></li><li><a href=\"chp1.xhtml\">March</a></li>\
         <li><a href=\"chp2.xhtml\">Summer</a></li></ol>"
    ));
}

#[tokio::test]
async fn missing_chapter_file_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), false);
    std::fs::remove_file(temp_dir.path().join("two.txt")).unwrap();

    let builder = BookBuilder::new(temp_dir.path().join("manifest.toml"), temp_dir.path(), true);
    let err = builder.run().await.unwrap_err();

    assert!(err.to_string().contains("two.txt"));
}

#[tokio::test]
async fn sources_without_headers_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    setup_book(temp_dir.path(), false);
    write(temp_dir.path(), "one.txt", "no headers here");
    write(temp_dir.path(), "two.txt", "#### too deep");

    let builder = BookBuilder::new(temp_dir.path().join("manifest.toml"), temp_dir.path(), true);
    assert!(builder.run().await.is_err());
}
