// src/store.rs
//! Saved articles: one pretty JSON file per slug, so publishing can be
//! re-run later without any generation work.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::article::{slugify, ArticlePayload};
use crate::error::Result;

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = fs::File::create(tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}

#[derive(Debug, Clone)]
pub struct ArticleStore {
    dir: PathBuf,
}

impl ArticleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        let mut name = slugify(slug);
        if name.is_empty() {
            name = "untitled-article".into();
        }
        self.dir.join(format!("{name}.json"))
    }

    /// Write via a temp file + rename so readers never see a partial file.
    /// The temp file is removed when any step fails.
    pub fn save(&self, article: &ArticlePayload) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&article.slug);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(article)?;
        if let Err(e) = write_then_rename(&tmp, &path, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<ArticlePayload> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Saved article files, sorted by name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        out.sort();
        Ok(out)
    }
}
