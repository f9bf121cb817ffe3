use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{
    embeddings::PAD_INDEX,
    preprocessor::{CaptionTokenizer, ImagePreprocessor},
};
use crate::domain::caption::CaptionRecord;

/// One preprocessed example: CHW image floats and T word indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSample {
    pub image:  Vec<f32>,
    pub tokens: Vec<usize>,
}

impl CaptionSample {
    /// Number of non-padding words.
    pub fn word_count(&self) -> usize {
        self.tokens.iter().filter(|&&t| t != PAD_INDEX).count()
    }
}

/// Decode every record. Unreadable images and captions the
/// tokenizer rejects are logged and skipped.
pub fn build_samples(
    records:   &[CaptionRecord],
    images:    &ImagePreprocessor,
    tokenizer: &CaptionTokenizer,
) -> Vec<CaptionSample> {
    let mut truncated = 0usize;
    let samples: Vec<CaptionSample> = records
        .iter()
        .filter_map(|record| {
            let sample = images.load(&record.image).and_then(|image| {
                let tokens = tokenizer.encode(&record.caption)?;
                Ok(CaptionSample { image, tokens })
            });
            match sample {
                Ok(sample) => {
                    if record.word_count() > tokenizer.max_caption_length {
                        truncated += 1;
                    }
                    Some(sample)
                }
                Err(e) => {
                    tracing::warn!("Skipping '{}': {:#}", record.image.display(), e);
                    None
                }
            }
        })
        .collect();

    if truncated > 0 {
        tracing::debug!(
            "{} captions were longer than {} words and were truncated",
            truncated,
            tokenizer.max_caption_length
        );
    }
    samples
}

pub struct CaptionDataset {
    samples: Vec<CaptionSample>,
}

impl CaptionDataset {
    pub fn new(samples: Vec<CaptionSample>) -> Self { Self { samples } }
}

impl Dataset<CaptionSample> for CaptionDataset {
    fn get(&self, index: usize) -> Option<CaptionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
