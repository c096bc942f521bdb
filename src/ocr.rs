//! Optical character recognition through external tools.
//!
//! [`TesseractOcr`] shells out to the `tesseract` CLI for images and uses
//! poppler's `pdftoppm` to rasterize a single PDF page before handing it to
//! tesseract. Both commands run as child processes bounded by a timeout and
//! are killed if the timeout fires.
//!
//! OCR is best effort: callers treat every [`OcrError`] as "no text".

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::ExtractionConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    /// The OCR tool is not installed or not on `PATH`.
    #[error("OCR tool unavailable: {0}")]
    Unavailable(String),
    #[error("OCR command failed: {0}")]
    Failed(String),
    #[error("OCR command timed out after {0:?}")]
    Timeout(Duration),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of recognized text for raster content.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of a whole image file.
    async fn ocr_image(&self, path: &Path) -> Result<String, OcrError>;

    /// Recognize the text of one PDF page (1-based).
    async fn ocr_pdf_page(&self, pdf: &Path, page: usize) -> Result<String, OcrError>;
}

/// OCR backed by the `tesseract` and `pdftoppm` command-line tools.
pub struct TesseractOcr {
    tesseract_cmd: String,
    pdftoppm_cmd: String,
    lang: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            tesseract_cmd: config.tesseract_cmd.clone(),
            pdftoppm_cmd: config.pdftoppm_cmd.clone(),
            lang: config.ocr_lang.clone(),
            timeout: Duration::from_secs(config.ocr_timeout_secs),
        }
    }

    async fn run(&self, mut cmd: Command, program: &str) -> Result<Vec<u8>, OcrError> {
        cmd.kill_on_drop(true);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return Err(OcrError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::Unavailable(format!(
                    "'{}' not found (is it installed?)",
                    program
                )))
            }
            Ok(Err(e)) => return Err(OcrError::Io(e)),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn ocr_image(&self, path: &Path) -> Result<String, OcrError> {
        let mut cmd = Command::new(&self.tesseract_cmd);
        cmd.arg(path).arg("stdout").args(["-l", &self.lang]);
        let stdout = self.run(cmd, &self.tesseract_cmd).await?;
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }

    async fn ocr_pdf_page(&self, pdf: &Path, page: usize) -> Result<String, OcrError> {
        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");
        let page_arg = page.to_string();

        let mut cmd = Command::new(&self.pdftoppm_cmd);
        cmd.args(["-f", &page_arg, "-l", &page_arg, "-r", "300", "-png"])
            .arg(pdf)
            .arg(&prefix);
        self.run(cmd, &self.pdftoppm_cmd).await?;

        let image = find_rendered_page(scratch.path())?.ok_or_else(|| {
            OcrError::Failed(format!("pdftoppm produced no image for page {}", page))
        })?;
        self.ocr_image(&image).await
    }
}

/// pdftoppm zero-pads the page number depending on the page count
/// (`page-1.png`, `page-01.png`, ...), so pick whatever PNG it wrote.
fn find_rendered_page(dir: &Path) -> Result<Option<PathBuf>, OcrError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "png") {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tools() -> TesseractOcr {
        TesseractOcr::new(&ExtractionConfig {
            tesseract_cmd: "dh-test-no-such-tesseract".to_string(),
            pdftoppm_cmd: "dh-test-no-such-pdftoppm".to_string(),
            ..ExtractionConfig::default()
        })
    }

    #[tokio::test]
    async fn missing_tesseract_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("x.png");
        std::fs::write(&img, b"not really a png").unwrap();
        let err = missing_tools().ocr_image(&img).await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn missing_pdftoppm_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("x.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let err = missing_tools().ocr_pdf_page(&pdf, 1).await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)), "got {:?}", err);
    }

    #[test]
    fn finds_zero_padded_page_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_rendered_page(dir.path()).unwrap().is_none());
        std::fs::write(dir.path().join("page-03.png"), b"png").unwrap();
        let found = find_rendered_page(dir.path()).unwrap().unwrap();
        assert!(found.ends_with("page-03.png"));
    }
}
