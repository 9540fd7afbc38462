use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("Volume mismatch: shape {shape:?} holds {expected} elements, got {actual}")]
    VolumeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot reshape {from:?} into {to:?}")]
    InvalidReshape { from: Vec<usize>, to: Vec<usize> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = TensorError::VolumeMismatch {
            shape: vec![2, 3],
            expected: 6,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Volume mismatch: shape [2, 3] holds 6 elements, got 5"
        );

        let err = TensorError::InvalidReshape {
            from: vec![4],
            to: vec![3],
        };
        assert_eq!(err.to_string(), "Cannot reshape [4] into [3]");
    }
}
