// ============================================================
// Layer 5 — Caption Losses
// ============================================================
// The objective a trainable unit is optimised against, chosen
// from what the model's decoder emits at every step:
//
//   word vectors [batch, T, E]  → mean squared error against the
//                                 caption's word vectors
//   logits       [batch, T, D]  → cross entropy against the
//                                 caption's word indices, with
//                                 padding (index 0) ignored
//
// The trainer computes every batch loss through `LossKind`, so
// the loss recorded in a TrainableUnit is the one that is used.

use burn::{
    nn::loss::{CrossEntropyLossConfig, MseLoss, Reduction},
    prelude::*,
};

use crate::data::{
    batcher::{CaptionBatch, GroundTruth},
    embeddings::PAD_INDEX,
};
use crate::domain::{error::CaptionError, mode::Mode, variants::ModelKind};
use crate::ml::model::CaptionNet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    MeanSquaredError,
    CrossEntropy,
}

impl LossKind {
    pub fn for_model(kind: ModelKind) -> Self {
        if kind.predicts_word_indices() {
            LossKind::CrossEntropy
        } else {
            LossKind::MeanSquaredError
        }
    }

    /// Scalar loss of raw decoder outputs against the ground truth.
    pub fn forward<B: Backend>(
        self,
        output: Tensor<B, 3>,
        truth:  GroundTruth<B>,
    ) -> Result<Tensor<B, 1>, CaptionError> {
        let [b, t, width] = output.dims();
        match self {
            LossKind::MeanSquaredError => {
                let target = truth.embeddings;
                if target.dims() != [b, t, width] {
                    return Err(CaptionError::shape("captions", &[b, t, width], &target.dims()));
                }
                Ok(MseLoss::new().forward(output, target, Reduction::Mean))
            }
            LossKind::CrossEntropy => {
                let target = truth.tokens;
                if target.dims() != [b, t] {
                    return Err(CaptionError::shape("caption tokens", &[b, t], &target.dims()));
                }
                let ce = CrossEntropyLossConfig::new()
                    .with_pad_tokens(Some(vec![PAD_INDEX]))
                    .init(&output.device());
                Ok(ce.forward(output.reshape([b * t, width]), target.reshape([b * t])))
            }
        }
    }

    /// Decode one batch in `mode` and score it.
    pub fn batch_loss<B, M>(
        self,
        model: &M,
        batch: CaptionBatch<B>,
        mode:  Mode,
    ) -> Result<Tensor<B, 1>, CaptionError>
    where
        B: Backend,
        M: CaptionNet<B>,
    {
        let truth  = batch.truth.clone();
        let output = model.forward(batch.images, Some(batch.truth), mode)?;
        self.forward(output, truth)
    }
}
