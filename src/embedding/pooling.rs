//! Reduction of per-token model outputs into one vector per input text.

use serde::{Deserialize, Serialize};

/// How token embeddings are collapsed into a sentence embedding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Attention-masked average over all real tokens.
    #[default]
    Mean,
    /// Attention-masked element-wise maximum.
    Max,
    /// The first token (`[CLS]`).
    Cls,
}

impl Pooling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Cls => "cls",
        }
    }
}

impl std::fmt::Display for Pooling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Pooling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "cls" => Ok(Self::Cls),
            _ => Err(format!("unknown pooling strategy: {s}")),
        }
    }
}

/// Pool a `[batch, seq_len, hidden]` row-major tensor using the attention mask.
///
/// `mask` is `[batch, seq_len]`. A row whose mask is entirely zero pools to the
/// zero vector.
pub fn pool(
    strategy: Pooling,
    data: &[f32],
    mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_dim: usize,
) -> Vec<Vec<f32>> {
    let mut results = Vec::with_capacity(batch_size);

    for b in 0..batch_size {
        let token = |s: usize| {
            let offset = (b * seq_len + s) * hidden_dim;
            &data[offset..offset + hidden_dim]
        };
        let active = |s: usize| mask[b * seq_len + s] > 0;

        let pooled = match strategy {
            Pooling::Cls => token(0).to_vec(),
            Pooling::Mean => {
                let mut sum = vec![0.0f32; hidden_dim];
                let mut count = 0.0f32;
                for s in (0..seq_len).filter(|&s| active(s)) {
                    for (acc, x) in sum.iter_mut().zip(token(s)) {
                        *acc += x;
                    }
                    count += 1.0;
                }
                if count > 0.0 {
                    sum.iter_mut().for_each(|x| *x /= count);
                }
                sum
            }
            Pooling::Max => {
                let mut max: Option<Vec<f32>> = None;
                for s in (0..seq_len).filter(|&s| active(s)) {
                    match max.as_mut() {
                        None => max = Some(token(s).to_vec()),
                        Some(m) => {
                            for (acc, &x) in m.iter_mut().zip(token(s)) {
                                *acc = acc.max(x);
                            }
                        }
                    }
                }
                max.unwrap_or_else(|| vec![0.0; hidden_dim])
            }
        };

        results.push(pooled);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    // batch 1, seq 3, hidden 2; last token is padding
    const DATA: [f32; 6] = [1.0, 4.0, 3.0, -2.0, 100.0, 100.0];
    const MASK: [i64; 3] = [1, 1, 0];

    #[test]
    fn mean_ignores_padding() {
        let out = pool(Pooling::Mean, &DATA, &MASK, 1, 3, 2);
        assert_eq!(out, vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn max_ignores_padding() {
        let out = pool(Pooling::Max, &DATA, &MASK, 1, 3, 2);
        assert_eq!(out, vec![vec![3.0, 4.0]]);
    }

    #[test]
    fn cls_takes_first_token() {
        let out = pool(Pooling::Cls, &DATA, &MASK, 1, 3, 2);
        assert_eq!(out, vec![vec![1.0, 4.0]]);
    }

    #[test]
    fn batch_rows_do_not_mix() {
        let data = [1.0, 1.0, 9.0, 9.0, 5.0, 5.0, 7.0, 7.0];
        let mask = [1, 0, 1, 1];
        let out = pool(Pooling::Mean, &data, &mask, 2, 2, 2);
        assert_eq!(out, vec![vec![1.0, 1.0], vec![6.0, 6.0]]);
    }

    #[test]
    fn fully_masked_row_pools_to_zero() {
        let out = pool(Pooling::Max, &DATA, &[0, 0, 0], 1, 3, 2);
        assert_eq!(out, vec![vec![0.0, 0.0]]);
        let out = pool(Pooling::Mean, &DATA, &[0, 0, 0], 1, 3, 2);
        assert_eq!(out, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn parses_names() {
        assert_eq!("mean".parse::<Pooling>().unwrap(), Pooling::Mean);
        assert_eq!("cls".parse::<Pooling>().unwrap(), Pooling::Cls);
        assert!("first".parse::<Pooling>().is_err());
    }
}
