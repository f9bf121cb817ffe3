// ============================================================
// Layer 4 — Preprocessors
// ============================================================
// Two small transforms applied to every manifest record:
//
//   ImagePreprocessor  file → [C, H, W] floats
//     decode → resize to (H, W) with a bilinear filter
//     → scale to [0, 1] → subtract ImageNet mean, divide by std
//     → channel-first layout
//
//   CaptionTokenizer   text → T word indices
//     WordLevel tokenizer over the word-vector vocabulary:
//     lower-case → split on whitespace → drop punctuation
//     → unknown words map to <pad> (id 0)
//     → truncate or pad to T with index 0
//
// Reference: He et al. (2016) preprocessing of ImageNet inputs
//            image crate documentation

use anyhow::{anyhow, bail, Context, Result};
use image::{imageops::FilterType, DynamicImage};
use serde_json::json;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::embeddings::{WordVectors, PAD_INDEX, PAD_WORD};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

// ─── ImagePreprocessor ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    pub height:   usize,
    pub width:    usize,
    pub channels: usize,
}

impl ImagePreprocessor {
    /// `image_shape` is (height, width, channels). Only 1 or 3 channels.
    pub fn new(image_shape: [usize; 3]) -> Result<Self> {
        let [height, width, channels] = image_shape;
        if height == 0 || width == 0 {
            bail!("image size {}x{} has a zero side", height, width);
        }
        if channels != 1 && channels != 3 {
            bail!("images must have 1 or 3 channels, got {}", channels);
        }
        Ok(Self { height, width, channels })
    }

    /// Number of floats produced per image.
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("cannot decode image '{}'", path.display()))?;
        Ok(self.process(&img))
    }

    pub fn process(&self, img: &DynamicImage) -> Vec<f32> {
        let resized = img.resize_exact(self.width as u32, self.height as u32, FilterType::Triangle);
        let plane   = self.height * self.width;
        let mut out = vec![0.0f32; self.len()];

        if self.channels == 3 {
            for (i, pixel) in resized.to_rgb8().pixels().enumerate() {
                for c in 0..3 {
                    out[c * plane + i] =
                        (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
            }
        } else {
            // Grey: the mean of the three channel statistics
            let mean = IMAGENET_MEAN.iter().sum::<f32>() / 3.0;
            let std  = IMAGENET_STD.iter().sum::<f32>() / 3.0;
            for (i, pixel) in resized.to_luma8().pixels().enumerate() {
                out[i] = (pixel[0] as f32 / 255.0 - mean) / std;
            }
        }
        out
    }
}

// ─── CaptionTokenizer ─────────────────────────────────────────────────────────
/// Word-level tokenizer whose vocabulary is the word-vector file,
/// so every id it produces is a row of `WordVectors`.
#[derive(Debug, Clone)]
pub struct CaptionTokenizer {
    tokenizer:              Tokenizer,
    pub max_caption_length: usize,
}

impl CaptionTokenizer {
    /// Writes the tokenizer definition as JSON and loads it back,
    /// the same route `Tokenizer::from_file` takes.
    pub fn new(vectors: &WordVectors, max_caption_length: usize) -> Result<Self> {
        if vectors.is_empty() {
            bail!("cannot tokenize captions without any word vectors");
        }
        let vocab: serde_json::Map<String, serde_json::Value> = vectors
            .words()
            .iter()
            .enumerate()
            .map(|(id, word)| (word.clone(), json!(id)))
            .collect();

        let definition = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": {
                "type": "Sequence",
                "pretokenizers": [
                    { "type": "WhitespaceSplit" },
                    { "type": "Punctuation", "behavior": "Removed" }
                ]
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": PAD_WORD
            }
        });

        let tokenizer: Tokenizer = definition
            .to_string()
            .parse()
            .map_err(|e| anyhow!("Cannot build the caption tokenizer: {e}"))?;

        tracing::debug!("Caption tokenizer built over {} words", vectors.len());
        Ok(Self { tokenizer, max_caption_length })
    }

    /// Exactly T ids. Unknown words and padding map to `PAD_INDEX`.
    pub fn encode(&self, caption: &str) -> Result<Vec<usize>> {
        let encoding = self
            .tokenizer
            .encode(caption, false)
            .map_err(|e| anyhow!("Cannot tokenize caption '{caption}': {e}"))?;

        let mut ids: Vec<usize> = encoding
            .get_ids()
            .iter()
            .take(self.max_caption_length)
            .map(|&id| id as usize)
            .collect();
        ids.resize(self.max_caption_length, PAD_INDEX);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn tokenizer(max_caption_length: usize) -> CaptionTokenizer {
        let glove = "a 1 0\ndog 0 1\nruns 1 1\n";
        let vectors = WordVectors::from_reader(glove.as_bytes(), None).unwrap();
        CaptionTokenizer::new(&vectors, max_caption_length).unwrap()
    }

    #[test]
    fn test_words_are_cleaned() {
        let t = tokenizer(8);
        assert_eq!(
            t.encode("  A Dog, runs!\tin the\u{00A0}park. ").unwrap(),
            vec![1, 2, 3, 0, 0, 0, 0, 0]
        );
        assert_eq!(t.encode("RUNS").unwrap()[0], 3);
        assert_eq!(t.encode("...").unwrap(), vec![0; 8]);
    }

    #[test]
    fn test_encode_pads_and_truncates() {
        assert_eq!(tokenizer(5).encode("A dog runs").unwrap(), vec![1, 2, 3, 0, 0]);
        assert_eq!(tokenizer(2).encode("A dog runs").unwrap(), vec![1, 2]);
        assert_eq!(tokenizer(3).encode("a cat").unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn test_punctuation_never_becomes_a_token() {
        assert_eq!(tokenizer(4).encode("Dog... runs!").unwrap(), vec![2, 3, 0, 0]);
        assert_eq!(tokenizer(4).encode("dog's").unwrap(), vec![2, 0, 0, 0]);
    }

    #[test]
    fn test_empty_vocabulary_is_rejected() {
        let vectors = WordVectors::from_entries(2, Vec::new()).unwrap();
        assert!(CaptionTokenizer::new(&vectors, 3).is_err());
    }

    #[test]
    fn test_ids_are_word_vector_rows() {
        let glove = "the 1 0\nplays 0 1\n";
        let vectors = WordVectors::from_reader(glove.as_bytes(), None).unwrap();
        let t = CaptionTokenizer::new(&vectors, 2).unwrap();
        for id in t.encode("The plays").unwrap() {
            assert_ne!(id, PAD_INDEX);
            assert_eq!(vectors.vector(id).len(), 2);
        }
        assert_eq!(t.encode("The plays").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_image_is_channel_first_and_normalised() {
        let p   = ImagePreprocessor::new([4, 6, 3]).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([255, 0, 0])));
        let out = p.process(&img);

        assert_eq!(out.len(), 3 * 4 * 6);
        let red   = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((out[0] - red).abs() < 1e-5);
        assert!((out[23] - red).abs() < 1e-5);
        assert!((out[24] - green).abs() < 1e-5);
    }

    #[test]
    fn test_grey_images_use_one_plane() {
        let p   = ImagePreprocessor::new([2, 2, 1]).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::new(5, 5));
        assert_eq!(p.process(&img).len(), 4);
    }

    #[test]
    fn test_bad_shapes_are_rejected() {
        assert!(ImagePreprocessor::new([0, 4, 3]).is_err());
        assert!(ImagePreprocessor::new([4, 4, 2]).is_err());
    }
}
