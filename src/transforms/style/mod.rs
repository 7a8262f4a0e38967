// src/transforms/style/mod.rs

//! Style chain: sass-glob -> sass -> postcss, then a minify branch that
//! writes `<stem>.min.css` and `maps/<stem>.css.map`.

pub mod compile;
pub mod postcss;
pub mod sass_glob;

pub use compile::SassCompile;
pub use postcss::{CleanCss, PostCss, browser_targets};
pub use sass_glob::SassGlob;
