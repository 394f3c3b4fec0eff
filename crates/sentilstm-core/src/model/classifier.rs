//! # Sentiment LSTM
//!
//! Embedding → stacked LSTM → learned aggregation over time → batch norm →
//! dropout → two-way linear head.

use candle_core::{D, DType, Device, Result, Tensor, bail};
use candle_nn::{
    BatchNorm, BatchNormConfig, Dropout, Embedding, Linear, Module, ModuleT, VarBuilder, VarMap,
};

use crate::config::{ModelConfig, NUM_CLASSES};
use crate::embeddings::EmbeddingTable;
use crate::model::lstm::StackedLstm;

/// Name of the embedding variable inside the model's `VarMap`.
pub const EMBEDDING_WEIGHT: &str = "embedding.weight";

/// Recurrent sentiment classifier producing two raw logits per example.
pub struct SentimentLstm {
    embedding: Embedding,
    lstm: StackedLstm,
    mean: Linear,
    bn_mean: BatchNorm,
    drop: Dropout,
    out: Linear,
    seq_len: usize,
    hidden_size: usize,
    packed: bool,
}

impl SentimentLstm {
    /// Build the model for a vocabulary of `vocab_size` tokens and inputs of
    /// `seq_len` steps. The embedding table gets `vocab_size + 2` rows.
    pub fn new(vocab_size: usize, seq_len: usize, config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        if seq_len == 0 {
            bail!("sequence length must be positive");
        }
        let hidden = config.hidden_size;

        let embedding =
            candle_nn::embedding(vocab_size + 2, config.embedding_dim, vb.pp("embedding"))?;
        let lstm = StackedLstm::new(
            config.embedding_dim,
            hidden,
            config.n_layers,
            config.lstm_dropout,
            vb.pp("lstm"),
        )?;
        // Weighted combination of every time step's output, not an average.
        let mean = candle_nn::linear(seq_len * hidden, hidden, vb.pp("mean"))?;
        let bn_mean = candle_nn::batch_norm(hidden, BatchNormConfig::default(), vb.pp("bn_mean"))?;
        let out = candle_nn::linear(hidden, NUM_CLASSES, vb.pp("out"))?;

        Ok(Self {
            embedding,
            lstm,
            mean,
            bn_mean,
            drop: Dropout::new(config.linear_dropout),
            out,
            seq_len,
            hidden_size: hidden,
            packed: config.use_packed_sequence,
        })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Logits of shape `(batch, 2)` for `(batch, seq_len)` u32 ids.
    ///
    /// `lengths` holds the non-padding count of every row and drives the
    /// recurrence mask when packed sequences are enabled.
    pub fn forward_t(&self, ids: &Tensor, lengths: &[usize], train: bool) -> Result<Tensor> {
        let (batch, seq_len) = ids.dims2()?;
        if seq_len != self.seq_len {
            bail!("expected {} steps per sequence, got {seq_len}", self.seq_len);
        }
        if lengths.len() != batch {
            bail!("{} lengths for a batch of {batch}", lengths.len());
        }

        // Zeroing padded positions keeps the padding row out of the gradient.
        let not_pad = ids.ne(&ids.zeros_like()?)?.to_dtype(DType::F32)?;
        let xs = self
            .embedding
            .forward(ids)?
            .broadcast_mul(&not_pad.unsqueeze(2)?)?;

        let mask = if self.packed {
            Some(length_mask(lengths, seq_len, ids.device())?)
        } else {
            None
        };
        let hidden = self.lstm.forward_t(&xs, mask.as_ref(), train)?;

        let flat = hidden.reshape((batch, seq_len * self.hidden_size))?;
        let pooled = self.mean.forward(&flat)?;
        let pooled = self.bn_mean.forward_t(&pooled, train)?;
        let pooled = self.drop.forward_t(&pooled, train)?;
        self.out.forward(&pooled)
    }

    /// Predicted class of every row, inference mode.
    pub fn predict(&self, ids: &Tensor, lengths: &[usize]) -> Result<Vec<u32>> {
        self.forward_t(ids, lengths, false)?
            .argmax(D::Minus1)?
            .to_vec1::<u32>()
    }
}

/// `(lengths.len(), seq_len)` f32 mask with ones on the first `length`
/// steps of every row.
pub fn length_mask(lengths: &[usize], seq_len: usize, device: &Device) -> Result<Tensor> {
    let mask = lengths
        .iter()
        .flat_map(|&length| (0..seq_len).map(move |t| if t < length { 1f32 } else { 0f32 }))
        .collect::<Vec<_>>();
    Tensor::from_vec(mask, (lengths.len(), seq_len), device)
}

/// Overwrite the embedding variable of a model built on `varmap` with a
/// pretrained table.
pub fn load_embeddings(
    varmap: &mut VarMap,
    table: &EmbeddingTable,
    device: &Device,
) -> crate::Result<()> {
    varmap.set_one(EMBEDDING_WEIGHT, table.to_tensor(device)?)?;
    Ok(())
}
