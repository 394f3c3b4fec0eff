//! Stacked LSTM that can stop each example at its own length.

use candle_core::{IndexOp, Result, Tensor};
use candle_nn::rnn::LSTMState;
use candle_nn::{Dropout, LSTM, LSTMConfig, ModuleT, RNN, VarBuilder};

/// `n_layers` LSTM cells run over time one step at a time.
///
/// Every call starts from a zero state: batches hold unrelated examples, so
/// nothing is carried between them.
pub struct StackedLstm {
    layers: Vec<LSTM>,
    dropout: Dropout,
}

impl StackedLstm {
    /// Build the layers under `vb`, one `l{index}` prefix per layer.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        n_layers: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<Self> {
        let layers = (0..n_layers)
            .map(|index| {
                let in_dim = if index == 0 { input_size } else { hidden_size };
                candle_nn::lstm(
                    in_dim,
                    hidden_size,
                    LSTMConfig::default(),
                    vb.pp(format!("l{index}")),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layers,
            dropout: Dropout::new(dropout),
        })
    }

    /// Run the stack over `xs` of shape `(batch, seq_len, features)`.
    ///
    /// With a `(batch, seq_len)` mask of ones and zeros, a zero step leaves
    /// that example's state untouched and emits a zero output, which is how
    /// padded positions are skipped. Returns `(batch, seq_len, hidden)`.
    pub fn forward_t(&self, xs: &Tensor, mask: Option<&Tensor>, train: bool) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        let mut input = xs.clone();

        for (index, layer) in self.layers.iter().enumerate() {
            if index > 0 {
                input = self.dropout.forward_t(&input, train)?;
            }

            let mut state = layer.zero_state(batch)?;
            let mut outputs = Vec::with_capacity(seq_len);
            for t in 0..seq_len {
                let step_input = input.i((.., t, ..))?.contiguous()?;
                let next = layer.step(&step_input, &state)?;
                match mask {
                    Some(mask) => {
                        let keep = mask.i((.., t..t + 1))?;
                        outputs.push(next.h().broadcast_mul(&keep)?);
                        state = LSTMState {
                            h: blend(state.h(), next.h(), &keep)?,
                            c: blend(state.c(), next.c(), &keep)?,
                        };
                    }
                    None => {
                        outputs.push(next.h().clone());
                        state = next;
                    }
                }
            }
            input = Tensor::stack(&outputs, 1)?;
        }

        Ok(input)
    }
}

/// `keep * next + (1 - keep) * prev`, row-wise.
fn blend(prev: &Tensor, next: &Tensor, keep: &Tensor) -> Result<Tensor> {
    prev.add(&next.sub(prev)?.broadcast_mul(keep)?)
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use super::*;

    fn stack(n_layers: usize) -> (VarMap, StackedLstm) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let lstm = StackedLstm::new(3, 4, n_layers, 0.0, vb).unwrap();
        (varmap, lstm)
    }

    #[test]
    fn test_output_shape() {
        let (varmap, lstm) = stack(2);
        assert_eq!(varmap.all_vars().len(), 8);

        let xs = Tensor::randn(0f32, 1f32, (5, 6, 3), &Device::Cpu).unwrap();
        let out = lstm.forward_t(&xs, None, false).unwrap();
        assert_eq!(out.dims(), &[5, 6, 4]);
    }

    #[test]
    fn test_masked_steps_do_not_change_state() {
        let (_varmap, lstm) = stack(2);
        let device = Device::Cpu;

        // Same prefix, different garbage after step 2.
        let prefix = Tensor::randn(0f32, 1f32, (1, 2, 3), &device).unwrap();
        let tail_a = Tensor::randn(0f32, 1f32, (1, 3, 3), &device).unwrap();
        let tail_b = Tensor::randn(0f32, 1f32, (1, 3, 3), &device).unwrap();
        let xs = Tensor::cat(
            &[
                Tensor::cat(&[&prefix, &tail_a], 1).unwrap(),
                Tensor::cat(&[&prefix, &tail_b], 1).unwrap(),
            ],
            0,
        )
        .unwrap();
        let mask = Tensor::new(&[[1f32, 1., 0., 0., 0.], [1., 1., 0., 0., 0.]], &device).unwrap();

        let out = lstm.forward_t(&xs, Some(&mask), false).unwrap();
        let rows = out.to_vec3::<f32>().unwrap();
        assert_eq!(rows[0], rows[1]);
        for t in 2..5 {
            assert!(rows[0][t].iter().all(|&v| v == 0.0));
        }
        assert!(rows[0][1].iter().any(|&v| v != 0.0));
    }
}
