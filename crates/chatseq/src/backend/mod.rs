//! # Tensor Backend
//!
//! This module provides a unified interface for different tensor backends,
//! allowing the padding, sorting and beam reordering helpers to work in a
//! backend-agnostic manner.

//! ## Feature Flags
//!
//! The module uses feature flags to conditionally compile support for different backends:
//!
//! - `candle`: Enables support for the Candle tensor library
//! - `burn`: Enables support for the Burn tensor library
//!
//! ## Usage
//!
//! Users of this crate can work with tensors in a backend-agnostic way by:
//!
//! 1. Importing the traits ([`Backend`], [`TokenTensor`])
//! 2. Writing code against these trait interfaces
//! 3. Enabling the appropriate feature flag for their desired backend

mod core_trait;

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle tensor backend implementation.
///
/// This module is only available when the `candle` feature flag is enabled.
/// It provides an implementation of the [`Backend`] and [`TokenTensor`] traits
/// for Candle's `Tensor` type. Token ids are stored as `I64`.
pub mod candle;

#[cfg_attr(docsrs, doc(cfg(feature = "burn")))]
#[cfg(feature = "burn")]
/// Burn tensor backend implementation.
///
/// This module is only available when the `burn` feature flag is enabled.
/// Burn tensors carry their rank in the type, so [`Backend`] is provided for
/// every rank used by recurrent encoders and [`TokenTensor`] for rank `2`
/// integer tensors.
pub mod burn;


// Re-export the core traits for convenient imports
pub use core_trait::*;


#[cfg(test)]
/// Mock tensor implementation.
///
/// Operates on simple dense vectors
pub(crate) mod mock_tensor;
