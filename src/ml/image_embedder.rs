// ============================================================
// Layer 5 — Image Embedder (ResNet backbone)
// ============================================================
// Maps an image batch [batch, C, H, W] to one feature vector
// per image [batch, F]. The decoder only relies on the declared
// output length F; the backbone itself is interchangeable.
//
// Architecture (He et al. 2016, bottleneck variant):
//
//   7×7/2 conv → BN → ReLU → 3×3/2 max-pool
//   stage 1..4 of bottleneck blocks
//       (widths w, 2w, 4w, 8w; expansion 4; stride 2 from stage 2)
//   global average pool → flatten
//
//   ResNet50  → [3, 4, 6, 3]  blocks
//   ResNet152 → [3, 8, 36, 3] blocks
//
// F = 8 · w · 4 = 2048 at the standard width w = 64.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::activation::relu,
};
use std::path::Path;

use crate::domain::{error::CaptionError, variants::Backbone};

const EXPANSION: usize = 4;

#[derive(Config, Debug)]
pub struct ImageEmbedderConfig {
    pub backbone:   Backbone,
    pub height:     usize,
    pub width:      usize,
    #[config(default = 3)]
    pub channels:   usize,
    /// Channel width of the first stage
    #[config(default = 64)]
    pub base_width: usize,
}

impl ImageEmbedderConfig {
    /// Declared length of the feature vector produced per image.
    pub fn output_len(&self) -> usize {
        self.base_width * 8 * EXPANSION
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ImageEmbedder<B> {
        let w = self.base_width;

        let stem = Conv2dConfig::new([self.channels, w], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let stem_norm = BatchNormConfig::new(w).init(device);
        let stem_pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut in_channels = w;
        let stages = self
            .backbone
            .stage_depths()
            .iter()
            .enumerate()
            .map(|(i, &depth)| {
                let width  = w << i;
                let stride = if i == 0 { 1 } else { 2 };
                let stage  = ResStage::new(in_channels, width, depth, stride, device);
                in_channels = width * EXPANSION;
                stage
            })
            .collect();

        ImageEmbedder {
            stem,
            stem_norm,
            stem_pool,
            stages,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            channels:    self.channels,
            height:      self.height,
            width:       self.width,
            output_len:  self.output_len(),
        }
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────
fn conv<B: Backend>(
    c_in:   usize,
    c_out:  usize,
    kernel: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    let pad = kernel / 2;
    Conv2dConfig::new([c_in, c_out], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(pad, pad))
        .with_bias(false)
        .init(device)
}

#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
}

/// 1×1 reduce → 3×3 → 1×1 expand, plus a shortcut.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub norm1:      BatchNorm<B, 2>,
    pub conv2:      Conv2d<B>,
    pub norm2:      BatchNorm<B, 2>,
    pub conv3:      Conv2d<B>,
    pub norm3:      BatchNorm<B, 2>,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    fn new(c_in: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let c_out = width * EXPANSION;
        let downsample = (stride != 1 || c_in != c_out).then(|| Downsample {
            conv: conv(c_in, c_out, 1, stride, device),
            norm: BatchNormConfig::new(c_out).init(device),
        });

        Self {
            conv1: conv(c_in, width, 1, 1, device),
            norm1: BatchNormConfig::new(width).init(device),
            conv2: conv(width, width, 3, stride, device),
            norm2: BatchNormConfig::new(width).init(device),
            conv3: conv(width, c_out, 1, 1, device),
            norm3: BatchNormConfig::new(c_out).init(device),
            downsample,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let shortcut = match &self.downsample {
            Some(d) => d.norm.forward(d.conv.forward(x.clone())),
            None    => x.clone(),
        };
        let out = relu(self.norm1.forward(self.conv1.forward(x)));
        let out = relu(self.norm2.forward(self.conv2.forward(out)));
        let out = self.norm3.forward(self.conv3.forward(out));
        relu(out + shortcut)
    }
}

#[derive(Module, Debug)]
pub struct ResStage<B: Backend> {
    pub blocks: Vec<Bottleneck<B>>,
}

impl<B: Backend> ResStage<B> {
    fn new(c_in: usize, width: usize, depth: usize, stride: usize, device: &B::Device) -> Self {
        let blocks = (0..depth)
            .map(|i| {
                if i == 0 {
                    Bottleneck::new(c_in, width, stride, device)
                } else {
                    Bottleneck::new(width * EXPANSION, width, 1, device)
                }
            })
            .collect();
        Self { blocks }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }
}

// ─── ImageEmbedder ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ImageEmbedder<B: Backend> {
    pub stem:        Conv2d<B>,
    pub stem_norm:   BatchNorm<B, 2>,
    pub stem_pool:   MaxPool2d,
    pub stages:      Vec<ResStage<B>>,
    pub global_pool: AdaptiveAvgPool2d,
    pub channels:    usize,
    pub height:      usize,
    pub width:       usize,
    pub output_len:  usize,
}

impl<B: Backend> ImageEmbedder<B> {
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// images: [batch, C, H, W] → features: [batch, F]
    pub fn forward(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, CaptionError> {
        let [batch, c, h, w] = images.dims();
        if [c, h, w] != [self.channels, self.height, self.width] {
            return Err(CaptionError::shape(
                "images",
                &[batch, self.channels, self.height, self.width],
                &[batch, c, h, w],
            ));
        }

        let x = relu(self.stem_norm.forward(self.stem.forward(images)));
        let x = self.stem_pool.forward(x);
        let x = self.stages.iter().fold(x, |x, stage| stage.forward(x));
        let x = self.global_pool.forward(x); // [batch, F, 1, 1]

        Ok(x.reshape([batch, self.output_len]))
    }

    /// Replace the weights with a recorded backbone.
    /// A missing or incompatible record is a resource error.
    pub fn load_pretrained(self, path: &Path, device: &B::Device) -> Result<Self, CaptionError> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| {
                CaptionError::Resource(format!(
                    "cannot load backbone weights from '{}': {e}",
                    path.display()
                ))
            })?;
        tracing::info!("Loaded pretrained backbone from '{}'", path.display());
        Ok(self.load_record(record))
    }
}
