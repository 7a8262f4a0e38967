// src/transforms/mod.rs

//! Concrete transform stages, one submodule per asset class plus the shared
//! [`rename`] stage.

pub mod image;
pub mod rename;
pub mod script;
pub mod style;
pub mod template;
