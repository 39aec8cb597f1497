//! The burn implementation for backend provision.
//! Since burn Tensor are constrained with const generics, we must macro apply the given
//! core operations per rank
use super::{Backend, TokenTensor};
use crate::tensor::operations::check_indices;
use anyhow::Result;
use burn::tensor::backend::Backend as BurnBackend;
use burn::tensor::{Int, Numeric, Tensor, TensorData};

macro_rules! impl_core_tensor_ops {
    ($d:literal) => {
        impl <B, K> Backend for Tensor<B, $d, K>
        where B: BurnBackend,
        K: Numeric<B> + 'static {
            type Device = B::Device;

            fn shape(&self) -> Vec<usize> {
                self.dims().to_vec()
            }

            fn device(&self) -> Self::Device {
                Tensor::device(self)
            }

            fn index_select(&self, dim: usize, indices: &[usize]) -> Result<Self> {
                check_indices(&Backend::shape(self), dim, indices)?;
                let ids: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
                let index = Tensor::<B, 1, Int>::from_data(
                    TensorData::new(ids, [indices.len()]),
                    &Tensor::device(self),
                );
                Ok(self.clone().select(dim, index))
            }
        }
    }
}

impl_core_tensor_ops!(1);
impl_core_tensor_ops!(2);
impl_core_tensor_ops!(3);
impl_core_tensor_ops!(4);

impl <B> TokenTensor for Tensor<B, 2, Int>
where B: BurnBackend {
    fn from_ids(ids: Vec<i64>, rows: usize, cols: usize, device: &Self::Device) -> Result<Self> {
        anyhow::ensure!(
            ids.len() == rows * cols,
            "cannot shape {} ids into ({}, {})", ids.len(), rows, cols
        );
        Ok(Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [rows, cols]), device))
    }

    fn to_ids(&self) -> Result<Vec<i64>> {
        self.to_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("cannot read token ids: {:?}", e))
    }
}
