// ============================================================
// Layer 4 — Caption Manifest
// ============================================================
// Reads the list of (image, caption) pairs from a JSON file:
//
//   [
//     { "image": "images/0001.jpg", "caption": "a dog runs on grass" },
//     { "image": "/abs/0002.png",   "caption": "two cats sleeping" }
//   ]
//
// Relative image paths resolve against the manifest's directory,
// so a dataset folder can be moved as a whole.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::domain::{caption::CaptionRecord, traits::CaptionSource};

pub struct JsonManifest {
    path: PathBuf,
}

impl JsonManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl CaptionSource for JsonManifest {
    fn load_all(&self) -> Result<Vec<CaptionRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open manifest '{}'", self.path.display()))?;
        let records: Vec<CaptionRecord> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse manifest '{}'", self.path.display()))?;

        let base  = self.base_dir();
        let total = records.len();
        let records: Vec<CaptionRecord> = records
            .into_iter()
            .filter(|r| {
                let keep = !r.caption.trim().is_empty();
                if !keep {
                    tracing::warn!("Skipping '{}': empty caption", r.image.display());
                }
                keep
            })
            .map(|r| {
                let image = if r.image.is_absolute() { r.image } else { base.join(r.image) };
                CaptionRecord { image, caption: r.caption }
            })
            .collect();

        tracing::info!(
            "Loaded {} captioned images from '{}' ({} skipped)",
            records.len(),
            self.path.display(),
            total - records.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cacao-manifest-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_relative_paths_resolve_against_manifest_dir() {
        let dir  = scratch("relative");
        let path = dir.join("captions.json");
        fs::write(
            &path,
            r#"[{"image": "img/a.jpg", "caption": "a dog"},
                {"image": "/data/b.jpg", "caption": "a cat"},
                {"image": "c.jpg", "caption": "   "}]"#,
        )
        .unwrap();

        let records = JsonManifest::new(&path).load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image, dir.join("img/a.jpg"));
        assert_eq!(records[1].image, PathBuf::from("/data/b.jpg"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let path = std::env::temp_dir().join("cacao-no-such-manifest.json");
        assert!(JsonManifest::new(path).load_all().is_err());
    }
}
