use candle_core::{Device, Tensor};
use passage_core::{Error, Result};
use tokenizers::Tokenizer;

/// `[PAD]` in BERT WordPiece vocabularies.
const PAD_ID: u32 = 0;

/// Token tensors for one batch, each shaped `[batch, seq_len]`.
pub struct BatchTokens {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Tokenizes `texts`, truncates each to `max_len` tokens and right-pads the
/// batch to its longest sequence.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    device: &Device,
) -> Result<BatchTokens> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;

    let seq_len = encodings
        .iter()
        .map(|enc| enc.get_ids().len().min(max_len))
        .max()
        .unwrap_or(0)
        .max(1);
    let batch = encodings.len();

    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut type_ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for enc in &encodings {
        let take = enc.get_ids().len().min(seq_len);
        ids.extend_from_slice(&enc.get_ids()[..take]);
        type_ids.extend_from_slice(&enc.get_type_ids()[..take]);
        mask.extend_from_slice(&enc.get_attention_mask()[..take]);
        let pad = seq_len - take;
        ids.extend(std::iter::repeat(PAD_ID).take(pad));
        type_ids.extend(std::iter::repeat(0).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }

    let shape = (batch, seq_len);
    let to_tensor = |data: Vec<u32>| {
        Tensor::from_vec(data, shape, device).map_err(|e| Error::Embedding(e.to_string()))
    };
    Ok(BatchTokens {
        input_ids: to_tensor(ids)?,
        token_type_ids: to_tensor(type_ids)?,
        attention_mask: to_tensor(mask)?,
    })
}
