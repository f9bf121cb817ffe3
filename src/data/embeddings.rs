// ============================================================
// Layer 4 — Word Vectors
// ============================================================
// Loads pretrained word vectors in the GloVe text format:
//
//   the 0.418 0.24968 -0.41242 ...
//   ,   0.013441 0.23682 -0.16899 ...
//
// one word per line followed by its E values. Files are sorted
// by frequency, so keeping the first N lines keeps the N most
// common words.
//
// Index 0 is reserved for padding and unknown words and holds
// the zero vector. Real words start at index 1. The caption
// tokenizer is built from the same word order, so a token id
// is also the row of its vector.
//
// Also provides the two rescalings used to prepare the vectors
// for regression targets:
//   minmax   — one global affine map onto [-1, 1]
//   studentz — per-dimension zero mean, unit standard deviation
//
// Reference: Pennington et al. (2014) GloVe

use anyhow::{bail, Context, Result};
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
    str::FromStr,
};

use crate::domain::{error::CaptionError, traits::WordDecoder};

pub const PAD_INDEX: usize = 0;
pub const PAD_WORD:  &str  = "<pad>";

pub struct WordVectors {
    words:   Vec<String>,
    /// Row-major [len, dim]
    vectors: Vec<f32>,
    dim:     usize,
}

impl std::fmt::Debug for WordVectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordVectors")
            .field("len", &self.len())
            .field("dim", &self.dim)
            .finish()
    }
}

impl WordVectors {
    /// Build from (word, vector) pairs. Index 0 is added as padding.
    pub fn from_entries(dim: usize, entries: Vec<(String, Vec<f32>)>) -> Result<Self> {
        if dim == 0 {
            bail!("word vectors must have at least one dimension");
        }
        let mut words   = vec![PAD_WORD.to_string()];
        let mut vectors = vec![0.0; dim];
        let mut seen    = HashSet::new();

        for (word, vector) in entries {
            if vector.len() != dim {
                bail!(
                    "vector for '{}' has {} values, expected {}",
                    word, vector.len(), dim
                );
            }
            // First occurrence wins, like the frequency order of the file
            if word == PAD_WORD || !seen.insert(word.clone()) {
                continue;
            }
            words.push(word);
            vectors.extend(vector);
        }

        Ok(Self { words, vectors, dim })
    }

    /// Parse GloVe text. `dictionary_size` caps the total number
    /// of entries including the padding row.
    pub fn from_reader<R: BufRead>(reader: R, dictionary_size: Option<usize>) -> Result<Self> {
        let max_words = dictionary_size.map(|n| n.saturating_sub(1));
        let mut entries = Vec::new();
        let mut dim     = None;

        for (line_no, line) in reader.lines().enumerate() {
            if max_words.is_some_and(|m| entries.len() >= m) {
                break;
            }
            let line = line.with_context(|| format!("cannot read line {}", line_no + 1))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };

            let vector = parts
                .map(f32::from_str)
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("bad number on line {} ('{}')", line_no + 1, word))?;

            match dim {
                None => dim = Some(vector.len()),
                Some(d) if d != vector.len() => bail!(
                    "line {} has {} values, earlier lines have {}",
                    line_no + 1, vector.len(), d
                ),
                _ => {}
            }
            entries.push((word.to_string(), vector));
        }

        let dim = dim.context("no word vectors found")?;
        Self::from_entries(dim, entries)
    }

    pub fn load(path: &Path, dictionary_size: Option<usize>) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            CaptionError::Resource(format!(
                "cannot open word vectors '{}': {e}", path.display()
            ))
        })?;
        let vectors = Self::from_reader(BufReader::new(file), dictionary_size)
            .with_context(|| format!("cannot parse word vectors '{}'", path.display()))?;

        tracing::info!(
            "Loaded {} word vectors of dimension {} from '{}'",
            vectors.len() - 1,
            vectors.dim(),
            path.display()
        );
        Ok(vectors)
    }

    /// Write back in GloVe text format (padding row omitted).
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        for i in 1..self.len() {
            write!(out, "{}", self.words[i])?;
            for v in self.vector(i) {
                write!(out, " {v}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("cannot create '{}'", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Number of entries including the padding row.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when only the padding row is present.
    pub fn is_empty(&self) -> bool {
        self.words.len() <= 1
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Every entry in index order, `PAD_WORD` first.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn vector(&self, index: usize) -> &[f32] {
        &self.vectors[index * self.dim..(index + 1) * self.dim]
    }

    /// Rescaled copy. The padding row stays at zero.
    pub fn normalized(&self, method: Normalization) -> Self {
        let words = &self.vectors[self.dim..];
        let scaled = match method {
            Normalization::MinMax   => min_max_scaling(words, -1.0, 1.0),
            Normalization::StudentZ => student_z_standardizing(words, self.dim),
        };
        let mut vectors = vec![0.0; self.dim];
        vectors.extend(scaled);

        Self {
            words: self.words.clone(),
            vectors,
            dim: self.dim,
        }
    }
}

impl WordDecoder for WordVectors {
    /// Cosine nearest neighbour among the real words.
    fn nearest_word(&self, embedding: &[f32]) -> Option<&str> {
        if embedding.len() != self.dim {
            return None;
        }
        let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
        let query_norm = norm(embedding);
        if query_norm == 0.0 {
            return None;
        }

        (1..self.len())
            .filter_map(|i| {
                let v = self.vector(i);
                let n = norm(v);
                (n > 0.0).then(|| {
                    let dot: f32 = v.iter().zip(embedding).map(|(a, b)| a * b).sum();
                    (i, dot / (n * query_norm))
                })
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| self.words[i].as_str())
    }

    fn word_at(&self, index: usize) -> Option<&str> {
        (index != PAD_INDEX && index < self.len()).then(|| self.words[index].as_str())
    }
}

// ─── Normalization ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    MinMax,
    StudentZ,
}

impl FromStr for Normalization {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minmax"   => Ok(Normalization::MinMax),
            "studentz" => Ok(Normalization::StudentZ),
            other => Err(CaptionError::config(format!(
                "unknown normalization '{other}' (expected minmax or studentz)"
            ))),
        }
    }
}

/// high - (high - low) * (max - v) / (max - min)
fn min_max_scaling(values: &[f32], low: f32, high: f32) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| high - ((high - low) * (max - v)) / range)
        .collect()
}

/// (v - mean_d) / std_d per dimension d. Constant dimensions are only centred.
fn student_z_standardizing(values: &[f32], dim: usize) -> Vec<f32> {
    let rows = values.len() / dim;
    if rows == 0 {
        return Vec::new();
    }
    let mut mean = vec![0.0f64; dim];
    let mut var  = vec![0.0f64; dim];

    for row in values.chunks(dim) {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += *v as f64;
        }
    }
    mean.iter_mut().for_each(|m| *m /= rows as f64);

    for row in values.chunks(dim) {
        for ((s, m), v) in var.iter_mut().zip(&mean).zip(row) {
            *s += (*v as f64 - m).powi(2);
        }
    }
    let std: Vec<f64> = var.iter().map(|s| (s / rows as f64).sqrt()).collect();

    values
        .chunks(dim)
        .flat_map(|row| {
            row.iter().zip(&mean).zip(&std).map(|((v, m), s)| {
                let centred = *v as f64 - m;
                (if *s > 0.0 { centred / s } else { centred }) as f32
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOVE: &str = "\
the 0.5 1.0 -1.0
dog 2.0 0.0 1.0
cat 1.5 0.5 1.0
runs -1.0 -1.0 0.0
";

    fn vectors(limit: Option<usize>) -> WordVectors {
        WordVectors::from_reader(GLOVE.as_bytes(), limit).unwrap()
    }

    #[test]
    fn test_padding_is_index_zero() {
        let v = vectors(None);
        assert_eq!(v.len(), 5);
        assert_eq!(v.dim(), 3);
        assert_eq!(v.words()[PAD_INDEX], PAD_WORD);
        assert_eq!(v.words()[1], "the");
        assert_eq!(v.vector(PAD_INDEX), &[0.0, 0.0, 0.0]);
        assert_eq!(v.word_at(PAD_INDEX), None);
        assert_eq!(v.word_at(2), Some("dog"));
    }

    #[test]
    fn test_dictionary_size_counts_the_padding_row() {
        let v = vectors(Some(3));
        assert_eq!(v.len(), 3);
        assert_eq!(v.words(), [PAD_WORD, "the", "dog"]);
    }

    #[test]
    fn test_duplicate_words_keep_their_first_row() {
        let v = WordVectors::from_reader("a 1 0\nb 0 1\na 5 5\n<pad> 9 9\n".as_bytes(), None).unwrap();
        assert_eq!(v.words(), [PAD_WORD, "a", "b"]);
        assert_eq!(v.vector(1), &[1.0, 0.0]);
    }

    #[test]
    fn test_only_padding_is_empty() {
        assert!(WordVectors::from_entries(3, Vec::new()).unwrap().is_empty());
        assert!(!vectors(Some(2)).is_empty());
    }

    #[test]
    fn test_ragged_lines_are_rejected() {
        let bad = "a 1.0 2.0\nb 1.0\n";
        assert!(WordVectors::from_reader(bad.as_bytes(), None).is_err());
        assert!(WordVectors::from_reader("a 1.0 x\n".as_bytes(), None).is_err());
    }

    #[test]
    fn test_nearest_word_uses_direction() {
        let v = vectors(None);
        assert_eq!(v.nearest_word(&[4.0, 0.0, 2.0]), Some("dog"));
        assert_eq!(v.nearest_word(&[-0.1, -0.1, 0.0]), Some("runs"));
        assert_eq!(v.nearest_word(&[0.0, 0.0, 0.0]), None);
        assert_eq!(v.nearest_word(&[1.0]), None);
    }

    #[test]
    fn test_minmax_maps_onto_unit_interval() {
        let v = vectors(None).normalized(Normalization::MinMax);
        let all: Vec<f32> = (1..v.len()).flat_map(|i| v.vector(i).to_vec()).collect();
        let min = all.iter().copied().fold(f32::INFINITY, f32::min);
        let max = all.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((min + 1.0).abs() < 1e-6);
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(v.vector(PAD_INDEX), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_studentz_centres_each_dimension() {
        let v = vectors(None).normalized(Normalization::StudentZ);
        for d in 0..v.dim() {
            let col: Vec<f32> = (1..v.len()).map(|i| v.vector(i)[d]).collect();
            let mean = col.iter().sum::<f32>() / col.len() as f32;
            let var  = col.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / col.len() as f32;
            assert!(mean.abs() < 1e-5);
            assert!((var.sqrt() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_write_round_trips_words_in_order() {
        let v = vectors(None);
        let mut out = Vec::new();
        v.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let words: Vec<&str> = text.lines().map(|l| l.split(' ').next().unwrap()).collect();
        assert_eq!(words, vec!["the", "dog", "cat", "runs"]);
    }

    #[test]
    fn test_normalization_names() {
        assert_eq!("MinMax".parse::<Normalization>().unwrap(), Normalization::MinMax);
        assert!("zscore".parse::<Normalization>().is_err());
    }
}
