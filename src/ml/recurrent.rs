// ============================================================
// Layer 5 — Recurrent Cell
// ============================================================
// One LSTM layer that the decoder drives one time step at a
// time. The same instance (same weights) is called at every
// step of an unrolled caption.
//
//   input  [batch, 1, E + F]  +  state (hidden, cell) or None
//        │
//        ▼
//   output [batch, H]         +  new state (hidden, cell)
//
// A missing state means the LSTM's zero initial state.
//
// Reference: Burn Book §3 (Building Blocks)
//            Hochreiter & Schmidhuber (1997) LSTM

use burn::{
    nn::{Dropout, DropoutConfig, Lstm, LstmConfig, LstmState},
    prelude::*,
};

/// Hidden and cell vectors carried from one step to the next.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Tensor<B, 2>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn new(hidden: Tensor<B, 2>, cell: Tensor<B, 2>) -> Self {
        Self { hidden, cell }
    }
}

impl<B: Backend> From<LstmState<B, 2>> for RecurrentState<B> {
    fn from(s: LstmState<B, 2>) -> Self {
        Self::new(s.hidden, s.cell)
    }
}

impl<B: Backend> From<RecurrentState<B>> for LstmState<B, 2> {
    fn from(s: RecurrentState<B>) -> Self {
        LstmState::new(s.cell, s.hidden)
    }
}

// ─── RecurrentCell ────────────────────────────────────────────────────────────
/// A stateful single-step sequence cell.
pub trait RecurrentCell<B: Backend> {
    /// Width of one input vector.
    fn input_dim(&self) -> usize;

    /// Width of the output and of both state vectors.
    fn hidden_dim(&self) -> usize;

    /// Run one time step. `input` is `[batch, 1, input_dim]`.
    fn step(
        &self,
        input: Tensor<B, 3>,
        state: Option<RecurrentState<B>>,
    ) -> (Tensor<B, 2>, RecurrentState<B>);
}

// ─── LstmCell ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LstmCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    /// Dropout applied to the cell input
    #[config(default = 0.0)]
    pub dropout:  f64,
}

impl LstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmCell<B> {
        LstmCell {
            lstm:     LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
            d_input:  self.d_input,
            d_hidden: self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    pub lstm:     Lstm<B>,
    pub dropout:  Dropout,
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl<B: Backend> LstmCell<B> {
    /// Run the LSTM over a whole sequence in one call.
    /// input: [batch, seq_len, d_input] → output: [batch, seq_len, d_hidden]
    pub fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        state: Option<RecurrentState<B>>,
    ) -> (Tensor<B, 3>, RecurrentState<B>) {
        let input = self.dropout.forward(input);
        let (output, state) = self.lstm.forward(input, state.map(Into::into));
        (output, state.into())
    }
}

impl<B: Backend> RecurrentCell<B> for LstmCell<B> {
    fn input_dim(&self) -> usize {
        self.d_input
    }

    fn hidden_dim(&self) -> usize {
        self.d_hidden
    }

    fn step(
        &self,
        input: Tensor<B, 3>,
        state: Option<RecurrentState<B>>,
    ) -> (Tensor<B, 2>, RecurrentState<B>) {
        let [batch, _, _] = input.dims();
        let (output, state) = self.forward_sequence(input, state);
        (output.reshape([batch, self.d_hidden]), state)
    }
}
