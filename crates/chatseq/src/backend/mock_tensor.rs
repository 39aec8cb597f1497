use anyhow::Result;
use crate::backend::{Backend, TokenTensor};
use crate::tensor::operations::check_indices;

// A simple dense tensor implementation for testing
#[derive(Clone, Debug, PartialEq)]
pub struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<f32>,
}

impl MockTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len(), "data does not fit shape");
        Self { shape, data }
    }

    // Fill every slice `i` of `dim` with the value `i`, so selections are easy to read back
    pub fn labelled(shape: Vec<usize>, dim: usize) -> Self {
        let inner: usize = shape[dim + 1..].iter().product();
        let size: usize = shape.iter().product();
        let data = (0..size)
            .map(|flat| ((flat / inner) % shape[dim]) as f32)
            .collect();
        Self { shape, data }
    }

    // The label of each slice along `dim`, read from its first element
    pub fn labels(&self, dim: usize) -> Vec<f32> {
        let inner: usize = self.shape[dim + 1..].iter().product();
        (0..self.shape[dim]).map(|i| self.data[i * inner]).collect()
    }
}

impl Backend for MockTensor {
    type Device = ();

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn device(&self) -> Self::Device {}

    fn index_select(&self, dim: usize, indices: &[usize]) -> Result<Self> {
        check_indices(&self.shape, dim, indices)?;
        let outer: usize = self.shape[..dim].iter().product();
        let inner: usize = self.shape[dim + 1..].iter().product();
        let size = self.shape[dim];

        let mut data = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &i in indices {
                let start = (o * size + i) * inner;
                data.extend_from_slice(&self.data[start..start + inner]);
            }
        }

        let mut shape = self.shape.clone();
        shape[dim] = indices.len();
        Ok(MockTensor { shape, data })
    }
}

impl TokenTensor for MockTensor {
    fn from_ids(ids: Vec<i64>, rows: usize, cols: usize, _device: &Self::Device) -> Result<Self> {
        anyhow::ensure!(ids.len() == rows * cols, "cannot shape {} ids into ({}, {})", ids.len(), rows, cols);
        Ok(MockTensor {
            shape: vec![rows, cols],
            data: ids.into_iter().map(|i| i as f32).collect(),
        })
    }

    fn to_ids(&self) -> Result<Vec<i64>> {
        Ok(self.data.iter().map(|&v| v as i64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ids_rejects_wrong_length() {
        assert!(MockTensor::from_ids(vec![1, 2, 3], 2, 2, &()).is_err());
        assert!(MockTensor::from_ids(vec![], 0, 3, &()).is_ok());
    }
}
