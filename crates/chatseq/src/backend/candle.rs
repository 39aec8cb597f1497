use super::{Backend, TokenTensor};
use crate::tensor::operations::check_indices;
use anyhow::Result;
use candle_core::{DType, Device, Tensor};

impl Backend for Tensor {
    type Device = Device;

    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn device(&self) -> Self::Device {
        Tensor::device(self).clone()
    }

    fn index_select(&self, dim: usize, indices: &[usize]) -> Result<Self> {
        check_indices(&Backend::shape(self), dim, indices)?;
        let ids: Vec<u32> = indices.iter().map(|&i| i as u32).collect();
        let index = Tensor::from_vec(ids, indices.len(), Tensor::device(self))?;
        Ok(Tensor::index_select(self, &index, dim)?)
    }
}

impl TokenTensor for Tensor {
    fn from_ids(ids: Vec<i64>, rows: usize, cols: usize, device: &Self::Device) -> Result<Self> {
        anyhow::ensure!(
            ids.len() == rows * cols,
            "cannot shape {} ids into ({}, {})", ids.len(), rows, cols
        );
        Ok(Tensor::from_vec(ids, (rows, cols), device)?)
    }

    fn to_ids(&self) -> Result<Vec<i64>> {
        Ok(self.to_dtype(DType::I64)?.flatten_all()?.to_vec1::<i64>()?)
    }
}
