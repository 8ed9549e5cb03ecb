//! Output generation for stored-article listings.
//!
//! # Submodules
//!
//! - [`json`]: filters stored articles and writes them as pretty JSON, to
//!   stdout or to a file

pub mod json;
