// src/collab/local.rs
//! Mock-mode image source: serves a local file instead of calling a provider.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::{general_purpose::STANDARD, Engine};
use tracing::debug;

use super::ImageGenerator;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct LocalImageGenerator {
    path: PathBuf,
}

impl LocalImageGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageGenerator for LocalImageGenerator {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        debug!(target: "images", path = %self.path.display(), prompt, "mock image requested");
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(STANDARD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sample.png");
        std::fs::write(&p, [0x89u8, b'P', b'N', b'G']).unwrap();
        let b64 = LocalImageGenerator::new(p.clone()).generate_image("x").await.unwrap();
        assert_eq!(STANDARD.decode(b64).unwrap(), vec![0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = LocalImageGenerator::new("/nonexistent/sample.png")
            .generate_image("x")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }
}
