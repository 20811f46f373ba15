//! Output-shape adapter for embedding backends.
//!
//! Backends disagree on what a single-text embedding looks like: a flat list,
//! a list of rows (one per input or one per token), or a tensor object with a
//! flat `data` buffer and its `dims`. [`normalize`] is the only place that
//! knows about these shapes. Its contract: the result is one non-empty vector
//! of finite floats; multiple rows are mean-pooled into one.

use serde::Deserialize;

use crate::error::{VectorError, VectorResult};

/// Raw embedding output as returned by a backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawEmbedding {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
    Tensor {
        data: Vec<f32>,
        #[serde(alias = "shape")]
        dims: Vec<usize>,
    },
}

const CONTEXT: &str = "normalize embedding";

/// Flattens a raw backend output into a single embedding vector.
pub fn normalize(raw: RawEmbedding) -> VectorResult<Vec<f32>> {
    let vector = match raw {
        RawEmbedding::Flat(values) => values,
        RawEmbedding::Nested(rows) => mean_pool(rows)?,
        RawEmbedding::Tensor { data, dims } => from_tensor(data, &dims)?,
    };

    if vector.is_empty() {
        return Err(VectorError::malformed(CONTEXT, "empty vector"));
    }
    if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
        return Err(VectorError::malformed(
            CONTEXT,
            format!("non-finite value at position {}", position),
        ));
    }
    Ok(vector)
}

fn from_tensor(data: Vec<f32>, dims: &[usize]) -> VectorResult<Vec<f32>> {
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            VectorError::malformed(CONTEXT, format!("tensor dims {:?} overflow", dims))
        })?;
    if dims.is_empty() || expected != data.len() {
        return Err(VectorError::malformed(
            CONTEXT,
            format!("tensor dims {:?} do not match {} values", dims, data.len()),
        ));
    }

    let width = dims[dims.len() - 1];
    let rows = data.len() / width.max(1);
    if rows <= 1 {
        return Ok(data);
    }

    mean_pool(data.chunks(width).map(<[f32]>::to_vec).collect())
}

fn mean_pool(mut rows: Vec<Vec<f32>>) -> VectorResult<Vec<f32>> {
    match rows.len() {
        0 => return Err(VectorError::malformed(CONTEXT, "no rows")),
        1 => return Ok(rows.swap_remove(0)),
        _ => {}
    }

    let width = rows[0].len();
    if rows.iter().any(|row| row.len() != width) {
        return Err(VectorError::malformed(CONTEXT, "ragged rows"));
    }

    let count = rows.len() as f32;
    let mut pooled = vec![0.0f32; width];
    for row in &rows {
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }
    pooled.iter_mut().for_each(|v| *v /= count);
    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn parse(value: serde_json::Value) -> RawEmbedding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flat_output_is_kept() {
        let raw = parse(json!([0.1, 0.2, 0.3]));
        assert!(matches!(raw, RawEmbedding::Flat(_)));
        assert_eq!(normalize(raw).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_single_row_nested_output_is_unwrapped() {
        let raw = parse(json!([[0.1, 0.2, 0.3]]));
        assert!(matches!(raw, RawEmbedding::Nested(_)));
        assert_eq!(normalize(raw).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_multi_row_nested_output_is_mean_pooled() {
        let raw = parse(json!([[1.0, 0.0], [0.0, 1.0]]));
        assert_eq!(normalize(raw).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_tensor_output_uses_data_buffer() {
        let raw = parse(json!({"data": [0.5, 0.25, 0.0], "dims": [1, 3]}));
        assert!(matches!(raw, RawEmbedding::Tensor { .. }));
        assert_eq!(normalize(raw).unwrap(), vec![0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_tensor_shape_alias_and_pooling() {
        let raw = parse(json!({"data": [1.0, 2.0, 3.0, 4.0], "shape": [2, 2]}));
        assert_eq!(normalize(raw).unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_tensor_with_inconsistent_dims_is_rejected() {
        let raw = RawEmbedding::Tensor {
            data: vec![1.0, 2.0, 3.0],
            dims: vec![1, 4],
        };
        assert_eq!(normalize(raw).unwrap_err().kind(), ErrorKind::Upstream);
    }

    #[test]
    fn test_tensor_with_overflowing_dims_is_rejected() {
        for dims in [vec![usize::MAX, 2], vec![1 << 40, 1 << 40, 2]] {
            let raw = RawEmbedding::Tensor {
                data: vec![0.1, 0.2],
                dims,
            };
            assert_eq!(normalize(raw).unwrap_err().kind(), ErrorKind::Upstream);
        }
    }

    #[test]
    fn test_malformed_outputs_are_upstream_failures() {
        for raw in [
            RawEmbedding::Flat(vec![]),
            RawEmbedding::Nested(vec![]),
            RawEmbedding::Nested(vec![vec![1.0, 2.0], vec![1.0]]),
            RawEmbedding::Flat(vec![1.0, f32::NAN]),
        ] {
            assert_eq!(normalize(raw).unwrap_err().kind(), ErrorKind::Upstream);
        }
    }
}
