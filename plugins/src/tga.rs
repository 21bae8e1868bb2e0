//! Target generation algorithms.
//!
//! Static backends train a model from seeds and sample candidates from
//! it; the dynamic backend explores the space interactively through a
//! borrowed scanner.

pub mod det;
pub mod entropyip;
pub mod sixgen;
