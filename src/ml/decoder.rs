// ============================================================
// Layer 5 — Decoding Loop
// ============================================================
// Unrolls the recurrent cell for a fixed number of steps and
// collects one prediction per step:
//
//   prev  = ones[E]                         (start sentinel)
//   state = None
//   for i in 0..T:
//       x            = [prev | image features]      [batch, 1, E+F]
//       out, state'  = cell(x, state)
//       pred_i       = words.embed(out)
//       state        = state'
//       prev         = Training  → captions[:, i]   (teacher forcing)
//                      Inference → words.feedback(pred_i)
//   return cat(pred_0 .. pred_{T-1})                [batch, T, out]
//
// The same cell and word embedder are used at every step, so
// all steps share one set of weights. The image features are
// computed once and re-read at every step.
//
// Reference: Vinyals et al. (2015) Show and Tell
//            Williams & Zipser (1989) teacher forcing

use burn::prelude::*;

use crate::domain::{error::CaptionError, mode::Mode};
use crate::ml::{
    recurrent::{RecurrentCell, RecurrentState},
    word_embedder::WordEmbedder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodingLoop {
    max_caption_length: usize,
    embedding_dim:      usize,
    feature_dim:        usize,
}

impl DecodingLoop {
    /// Fails when any of the three dimensions is zero.
    pub fn new(
        max_caption_length: usize,
        embedding_dim:      usize,
        feature_dim:        usize,
    ) -> Result<Self, CaptionError> {
        if max_caption_length == 0 {
            return Err(CaptionError::config("max_caption_length must be at least 1"));
        }
        if embedding_dim == 0 {
            return Err(CaptionError::config("embedding_dim must be at least 1"));
        }
        if feature_dim == 0 {
            return Err(CaptionError::config("image feature length must be at least 1"));
        }
        Ok(Self { max_caption_length, embedding_dim, feature_dim })
    }

    /// Build a loop and check that `cell` and `words` fit it.
    pub fn bind<B, C, W>(
        max_caption_length: usize,
        embedding_dim:      usize,
        feature_dim:        usize,
        cell:               &C,
        words:              &W,
    ) -> Result<Self, CaptionError>
    where
        B: Backend,
        C: RecurrentCell<B>,
        W: WordEmbedder<B>,
    {
        let decoder = Self::new(max_caption_length, embedding_dim, feature_dim)?;
        decoder.check(cell, words)?;
        Ok(decoder)
    }

    /// Dimension agreement between the loop and its collaborators.
    pub fn check<B, C, W>(&self, cell: &C, words: &W) -> Result<(), CaptionError>
    where
        B: Backend,
        C: RecurrentCell<B>,
        W: WordEmbedder<B>,
    {
        let step_width = self.embedding_dim + self.feature_dim;
        if cell.input_dim() != step_width {
            return Err(CaptionError::config(format!(
                "recurrent cell takes {} inputs but each step feeds embedding ({}) + image features ({}) = {}",
                cell.input_dim(), self.embedding_dim, self.feature_dim, step_width
            )));
        }
        if words.input_dim() != cell.hidden_dim() {
            return Err(CaptionError::config(format!(
                "word embedder takes {} inputs but the recurrent cell produces {}",
                words.input_dim(), cell.hidden_dim()
            )));
        }
        if words.feedback_dim() != self.embedding_dim {
            return Err(CaptionError::config(format!(
                "word embedder produces {}-dim embeddings but embedding_dim is {}",
                words.feedback_dim(), self.embedding_dim
            )));
        }
        Ok(())
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Ground-truth captions must be [batch, T, E].
    pub fn check_captions<B: Backend>(
        &self,
        captions: &Tensor<B, 3>,
        batch:    usize,
    ) -> Result<(), CaptionError> {
        let expected = [batch, self.max_caption_length, self.embedding_dim];
        let actual   = captions.dims();
        if actual != expected {
            return Err(CaptionError::shape("captions", &expected, &actual));
        }
        Ok(())
    }

    /// Ground-truth word indices must be [batch, T].
    pub fn check_tokens<B: Backend>(
        &self,
        tokens: &Tensor<B, 2, Int>,
        batch:  usize,
    ) -> Result<(), CaptionError> {
        let expected = [batch, self.max_caption_length];
        let actual   = tokens.dims();
        if actual != expected {
            return Err(CaptionError::shape("caption tokens", &expected, &actual));
        }
        Ok(())
    }

    /// Decode `T` steps for a batch of image features.
    ///
    /// features: [batch, F]
    /// captions: [batch, T, E], required in `Mode::Training`, ignored otherwise
    /// returns:  [batch, T, words.output_dim()]
    pub fn unroll<B, C, W>(
        &self,
        cell:     &C,
        words:    &W,
        features: Tensor<B, 2>,
        captions: Option<Tensor<B, 3>>,
        mode:     Mode,
    ) -> Result<Tensor<B, 3>, CaptionError>
    where
        B: Backend,
        C: RecurrentCell<B>,
        W: WordEmbedder<B>,
    {
        let [batch, feature_len] = features.dims();
        if feature_len != self.feature_dim {
            return Err(CaptionError::shape(
                "image features",
                &[batch, self.feature_dim],
                &[batch, feature_len],
            ));
        }

        let teacher = if mode.is_teacher_forced() {
            let captions = captions.ok_or_else(|| {
                CaptionError::config("training mode needs ground-truth captions")
            })?;
            self.check_captions(&captions, batch)?;
            Some(captions)
        } else {
            None
        };

        let (steps, e, f) = (self.max_caption_length, self.embedding_dim, self.feature_dim);
        let device = features.device();

        let mut prev: Tensor<B, 2>                 = Tensor::ones([batch, e], &device);
        let mut state: Option<RecurrentState<B>>   = None;
        let mut buffer: Vec<Tensor<B, 3>>          = Vec::with_capacity(steps);

        for i in 0..steps {
            let step_in = Tensor::cat(vec![prev, features.clone()], 1).reshape([batch, 1, e + f]);

            let (output, next_state) = cell.step(step_in, state.take());
            let prediction = words.embed(output);
            let width      = prediction.dims()[1];
            state = Some(next_state);

            prev = match &teacher {
                Some(captions) => captions
                    .clone()
                    .slice([0..batch, i..i + 1, 0..e])
                    .reshape([batch, e]),
                None => words.feedback(prediction.clone()),
            };

            buffer.push(prediction.reshape([batch, 1, width]));
        }

        tracing::trace!("Unrolled {} steps in {} mode", steps, mode);
        Ok(Tensor::cat(buffer, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        recurrent::LstmCellConfig,
        word_embedder::DenseWordEmbedderConfig,
    };
    use burn::backend::NdArray;
    use std::cell::RefCell;

    type TestBackend = NdArray;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} vs {expected:?}");
        }
    }

    // ─── Test doubles ─────────────────────────────────────────────────────────
    #[derive(Debug, Clone)]
    struct Call {
        input:     Vec<f32>,
        state_in:  Option<(Vec<f32>, Vec<f32>)>,
        state_out: (Vec<f32>, Vec<f32>),
    }

    /// Cell with E = 2, F = 1, H = 2 that records every call.
    /// output     = prev embedding + 1
    /// new hidden = (call number + 1), new cell = -(call number + 1)
    #[derive(Default)]
    struct RecordingCell {
        calls: RefCell<Vec<Call>>,
    }

    impl RecurrentCell<TestBackend> for RecordingCell {
        fn input_dim(&self) -> usize { 3 }
        fn hidden_dim(&self) -> usize { 2 }

        fn step(
            &self,
            input: Tensor<TestBackend, 3>,
            state: Option<RecurrentState<TestBackend>>,
        ) -> (Tensor<TestBackend, 2>, RecurrentState<TestBackend>) {
            let [batch, _, width] = input.dims();
            let device = input.device();
            let n = self.calls.borrow().len() as f32 + 1.0;

            let flat   = input.reshape([batch, width]);
            let output = flat.clone().slice([0..batch, 0..2]) + 1.0;
            let hidden = Tensor::<TestBackend, 2>::ones([batch, 2], &device) * n;
            let cell   = Tensor::<TestBackend, 2>::ones([batch, 2], &device) * -n;

            self.calls.borrow_mut().push(Call {
                input:     values(flat),
                state_in:  state.map(|s| (values(s.hidden), values(s.cell))),
                state_out: (values(hidden.clone()), values(cell.clone())),
            });
            (output, RecurrentState::new(hidden, cell))
        }
    }

    /// prediction = 10 * recurrent output
    struct ScaleWords {
        dim: usize,
    }

    impl WordEmbedder<TestBackend> for ScaleWords {
        fn input_dim(&self) -> usize { 2 }
        fn output_dim(&self) -> usize { self.dim }
        fn embed(&self, rnn_out: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 2> {
            rnn_out * 10.0
        }
    }

    fn scenario() -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 3>) {
        let device   = Default::default();
        let features = Tensor::<TestBackend, 2>::from_floats([[5.0]], &device);
        let captions = Tensor::<TestBackend, 3>::from_floats(
            [[[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]]],
            &device,
        );
        (features, captions)
    }

    fn run(mode: Mode) -> (Vec<f32>, Vec<Call>) {
        let cell    = RecordingCell::default();
        let words   = ScaleWords { dim: 2 };
        let decoder = DecodingLoop::bind(3, 2, 1, &cell, &words).unwrap();
        let (features, captions) = scenario();

        let out = decoder.unroll(&cell, &words, features, Some(captions), mode).unwrap();
        assert_eq!(out.dims(), [1, 3, 2]);
        (values(out), cell.calls.into_inner())
    }

    // ─── Properties ───────────────────────────────────────────────────────────
    #[test]
    fn test_training_scenario_end_to_end() {
        let (out, calls) = run(Mode::Training);

        assert_eq!(calls.len(), 3);
        // Step 0 reads the sentinel, steps 1 and 2 read ground-truth tokens 0 and 1
        assert_close(&calls[0].input, &[1.0, 1.0, 5.0]);
        assert_close(&calls[1].input, &[0.1, 0.2, 5.0]);
        assert_close(&calls[2].input, &[0.3, 0.4, 5.0]);

        // Entry i = 10 * (input embedding + 1)
        assert_close(&out, &[20.0, 20.0, 11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_inference_feeds_back_own_predictions() {
        let (out, calls) = run(Mode::Inference);

        assert_close(&calls[0].input, &[1.0, 1.0, 5.0]);
        assert_close(&calls[1].input, &[20.0, 20.0, 5.0]);
        assert_close(&calls[2].input, &[210.0, 210.0, 5.0]);
        assert_close(&out, &[20.0, 20.0, 210.0, 210.0, 2110.0, 2110.0]);
    }

    #[test]
    fn test_fed_vector_is_previous_prediction_in_inference() {
        let (out, calls) = run(Mode::Inference);
        for i in 1..calls.len() {
            assert_close(&calls[i].input[..2], &out[(i - 1) * 2..i * 2]);
        }
    }

    #[test]
    fn test_first_step_always_reads_the_ones_sentinel() {
        for mode in [Mode::Training, Mode::Inference] {
            let (_, calls) = run(mode);
            assert_close(&calls[0].input[..2], &[1.0, 1.0]);
        }
    }

    #[test]
    fn test_state_is_threaded_step_to_step() {
        for mode in [Mode::Training, Mode::Inference] {
            let (_, calls) = run(mode);
            assert!(calls[0].state_in.is_none());
            for i in 0..calls.len() - 1 {
                assert_eq!(calls[i + 1].state_in.as_ref(), Some(&calls[i].state_out));
            }
        }
    }

    #[test]
    fn test_output_has_one_entry_per_step() {
        let device = Default::default();
        for steps in 1..=5 {
            let cell    = RecordingCell::default();
            let words   = ScaleWords { dim: 2 };
            let decoder = DecodingLoop::bind(steps, 2, 1, &cell, &words).unwrap();
            let features = Tensor::<TestBackend, 2>::from_floats([[5.0], [6.0]], &device);

            let out = decoder.unroll(&cell, &words, features, None, Mode::Inference).unwrap();
            assert_eq!(out.dims(), [2, steps, 2]);
            assert_eq!(cell.calls.borrow().len(), steps);
        }
    }

    // ─── Construction failures ────────────────────────────────────────────────
    #[test]
    fn test_zero_length_caption_is_rejected() {
        let err = DecodingLoop::new(0, 2, 1).unwrap_err();
        assert!(matches!(err, CaptionError::Configuration(_)));
    }

    #[test]
    fn test_embedding_dim_disagreement_fails_construction() {
        let cell  = RecordingCell::default();
        let words = ScaleWords { dim: 3 };
        let err = DecodingLoop::bind(3, 2, 1, &cell, &words).unwrap_err();
        assert!(matches!(err, CaptionError::Configuration(_)));
    }

    #[test]
    fn test_cell_width_disagreement_fails_construction() {
        let device = Default::default();
        let cell: crate::ml::recurrent::LstmCell<TestBackend> =
            LstmCellConfig::new(4, 3).init(&device);
        let words = DenseWordEmbedderConfig::new(3, 2).init::<TestBackend>(&device);

        // E + F = 2 + 1 = 3, but the cell takes 4
        let err = DecodingLoop::bind(3, 2, 1, &cell, &words).unwrap_err();
        assert!(matches!(err, CaptionError::Configuration(_)));
    }

    #[test]
    fn test_training_without_captions_fails() {
        let cell    = RecordingCell::default();
        let words   = ScaleWords { dim: 2 };
        let decoder = DecodingLoop::bind(3, 2, 1, &cell, &words).unwrap();
        let (features, _) = scenario();

        let err = decoder.unroll(&cell, &words, features, None, Mode::Training).unwrap_err();
        assert!(matches!(err, CaptionError::Configuration(_)));
        assert!(cell.calls.borrow().is_empty());
    }

    #[test]
    fn test_mismatched_shapes_are_not_broadcast() {
        let device  = Default::default();
        let cell    = RecordingCell::default();
        let words   = ScaleWords { dim: 2 };
        let decoder = DecodingLoop::bind(3, 2, 1, &cell, &words).unwrap();

        let wide = Tensor::<TestBackend, 2>::from_floats([[5.0, 6.0]], &device);
        let err  = decoder.unroll(&cell, &words, wide, None, Mode::Inference).unwrap_err();
        assert!(matches!(err, CaptionError::ShapeMismatch { what: "image features", .. }));

        let (features, _) = scenario();
        let short = Tensor::<TestBackend, 3>::from_floats([[[0.1, 0.2], [0.3, 0.4]]], &device);
        let err   = decoder.unroll(&cell, &words, features, Some(short), Mode::Training).unwrap_err();
        assert!(matches!(err, CaptionError::ShapeMismatch { what: "captions", .. }));
    }

    #[test]
    fn test_real_components_produce_caption_shape() {
        let device = Default::default();
        let cell: crate::ml::recurrent::LstmCell<TestBackend> =
            LstmCellConfig::new(2 + 4, 8).init(&device);
        let words = DenseWordEmbedderConfig::new(8, 2).with_d_hidden(5).init::<TestBackend>(&device);
        let decoder = DecodingLoop::bind(4, 2, 4, &cell, &words).unwrap();

        let features = Tensor::<TestBackend, 2>::ones([3, 4], &device);
        let captions = Tensor::<TestBackend, 3>::zeros([3, 4, 2], &device);

        let taught = decoder
            .unroll(&cell, &words, features.clone(), Some(captions.clone()), Mode::Training)
            .unwrap();
        let free = decoder
            .unroll(&cell, &words, features, Some(captions), Mode::Inference)
            .unwrap();

        assert_eq!(taught.dims(), [3, 4, 2]);
        assert_eq!(free.dims(), [3, 4, 2]);
        // Step 0 sees the same input in both modes
        assert_close(
            &values(taught.slice([0..3, 0..1, 0..2])),
            &values(free.slice([0..3, 0..1, 0..2])),
        );
    }
}
