//! Built-in targets, one module per language.

#[cfg(feature = "target-cpp")]
pub mod cpp;
#[cfg(feature = "target-csharp")]
pub mod csharp;
#[cfg(feature = "target-python")]
pub mod python;
