// ============================================================
// Layer 5 — Word Embedders
// ============================================================
// Turn the recurrent output of one step into that step's
// prediction, and turn a prediction back into the vector the
// next step is fed with.
//
//   DenseWordEmbedder — H → hidden (ReLU) → E
//                       prediction is a word vector, fed back as-is
//
//   SoftmaxWordHead   — H → D logits over the dictionary
//                       fed back as the embedding of the arg-max word
//
// Both are created once per model and reused at every step.

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

// ─── WordEmbedder ─────────────────────────────────────────────────────────────
pub trait WordEmbedder<B: Backend> {
    /// Width of the recurrent output this embedder consumes.
    fn input_dim(&self) -> usize;

    /// Width of one prediction (one caption-buffer entry).
    fn output_dim(&self) -> usize;

    /// Width of the vector fed into the next step.
    fn feedback_dim(&self) -> usize {
        self.output_dim()
    }

    /// rnn_out: [batch, input_dim] → prediction: [batch, output_dim]
    fn embed(&self, rnn_out: Tensor<B, 2>) -> Tensor<B, 2>;

    /// prediction: [batch, output_dim] → next input: [batch, feedback_dim]
    fn feedback(&self, prediction: Tensor<B, 2>) -> Tensor<B, 2> {
        prediction
    }
}

// ─── DenseWordEmbedder ────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct DenseWordEmbedderConfig {
    pub d_input:     usize,
    pub d_embedding: usize,
    #[config(default = 100)]
    pub d_hidden:    usize,
}

impl DenseWordEmbedderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseWordEmbedder<B> {
        DenseWordEmbedder {
            hidden:      LinearConfig::new(self.d_input, self.d_hidden).init(device),
            output:      LinearConfig::new(self.d_hidden, self.d_embedding).init(device),
            d_input:     self.d_input,
            d_embedding: self.d_embedding,
        }
    }
}

#[derive(Module, Debug)]
pub struct DenseWordEmbedder<B: Backend> {
    pub hidden:      Linear<B>,
    pub output:      Linear<B>,
    pub d_input:     usize,
    pub d_embedding: usize,
}

impl<B: Backend> DenseWordEmbedder<B> {
    /// Works on a single step [batch, H] or a whole sequence [batch, T, H].
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.output.forward(relu(self.hidden.forward(x)))
    }
}

impl<B: Backend> WordEmbedder<B> for DenseWordEmbedder<B> {
    fn input_dim(&self) -> usize {
        self.d_input
    }

    fn output_dim(&self) -> usize {
        self.d_embedding
    }

    fn embed(&self, rnn_out: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(rnn_out)
    }
}

// ─── SoftmaxWordHead ──────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SoftmaxWordHeadConfig {
    pub d_input:         usize,
    pub dictionary_size: usize,
    pub d_embedding:     usize,
}

impl SoftmaxWordHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SoftmaxWordHead<B> {
        SoftmaxWordHead {
            projection:      LinearConfig::new(self.d_input, self.dictionary_size).init(device),
            table:           EmbeddingConfig::new(self.dictionary_size, self.d_embedding).init(device),
            d_input:         self.d_input,
            dictionary_size: self.dictionary_size,
            d_embedding:     self.d_embedding,
        }
    }
}

#[derive(Module, Debug)]
pub struct SoftmaxWordHead<B: Backend> {
    pub projection:      Linear<B>,
    pub table:           Embedding<B>,
    pub d_input:         usize,
    pub dictionary_size: usize,
    pub d_embedding:     usize,
}

impl<B: Backend> SoftmaxWordHead<B> {
    /// Word indices [batch, T] → word vectors [batch, T, E].
    /// Uses the same table as the inference-time feedback.
    pub fn embed_tokens(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.table.forward(tokens)
    }
}

impl<B: Backend> WordEmbedder<B> for SoftmaxWordHead<B> {
    fn input_dim(&self) -> usize {
        self.d_input
    }

    fn output_dim(&self) -> usize {
        self.dictionary_size
    }

    fn feedback_dim(&self) -> usize {
        self.d_embedding
    }

    /// Returns logits; the model applies softmax on the full caption.
    fn embed(&self, rnn_out: Tensor<B, 2>) -> Tensor<B, 2> {
        self.projection.forward(rnn_out)
    }

    fn feedback(&self, prediction: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = prediction.dims();
        let best = prediction.argmax(1); // [batch, 1]
        self.table.forward(best).reshape([batch, self.d_embedding])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_dense_dims() {
        let device = Default::default();
        let words: DenseWordEmbedder<TestBackend> =
            DenseWordEmbedderConfig::new(6, 4).with_d_hidden(8).init(&device);

        assert_eq!(words.input_dim(), 6);
        assert_eq!(words.output_dim(), 4);
        assert_eq!(words.feedback_dim(), 4);

        let out = words.embed(Tensor::ones([3, 6], &device));
        assert_eq!(out.dims(), [3, 4]);

        let seq = words.forward(Tensor::<TestBackend, 3>::ones([3, 5, 6], &device));
        assert_eq!(seq.dims(), [3, 5, 4]);
    }

    #[test]
    fn test_dense_feedback_is_identity() {
        let device = Default::default();
        let words: DenseWordEmbedder<TestBackend> =
            DenseWordEmbedderConfig::new(2, 2).init(&device);
        let p = Tensor::<TestBackend, 2>::from_floats([[0.25, -3.0]], &device);

        let back = words.feedback(p.clone());
        assert_eq!(
            back.into_data().to_vec::<f32>().unwrap(),
            p.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_softmax_feedback_embeds_the_argmax_word() {
        let device = Default::default();
        let head: SoftmaxWordHead<TestBackend> =
            SoftmaxWordHeadConfig::new(4, 5, 3).init(&device);

        assert_eq!(head.output_dim(), 5);
        assert_eq!(head.feedback_dim(), 3);

        // Word 3 wins for the only row in the batch
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.5, 9.0, -2.0]], &device);
        let fed    = head.feedback(logits);

        let expected = head.embed_tokens(Tensor::<TestBackend, 2, Int>::from_ints([[3]], &device));
        assert_eq!(
            fed.into_data().to_vec::<f32>().unwrap(),
            expected.reshape([1, 3]).into_data().to_vec::<f32>().unwrap()
        );
    }
}
