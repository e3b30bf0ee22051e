use anyhow::{anyhow, ensure, Result};
use candle_core::{DType, Tensor};

/// Sentence vectors from token states: the mean over tokens the mask keeps,
/// scaled to unit length. `hidden` is `[B,T,H]`, `attention_mask` is `[B,T]`;
/// returns `[B,H]`. A row with no kept tokens pools to the zero vector.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, width) = hidden.dims3().map_err(|e| anyhow!("token states must be [B,T,H]: {e}"))?;
    ensure!(
        attention_mask.dims() == &[batch, tokens],
        "attention mask {:?} does not match token states [{batch}, {tokens}]",
        attention_mask.dims()
    );

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let kept = mask.sum_keepdim(1)?.maximum(1f64)?;
    let pooled = unit_rows(&summed.broadcast_div(&kept)?)?;
    ensure!(pooled.dims() == &[batch, width], "pooled shape {:?}", pooled.dims());
    Ok(pooled)
}

fn unit_rows(rows: &Tensor) -> Result<Tensor> {
    let eps = if rows.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norm = (rows.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    Ok(rows.broadcast_div(&norm)?)
}
