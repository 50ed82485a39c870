//! The library code for the `quire` static site generator. A site is built
//! from a project directory holding markdown posts, page templates, and one
//! stylesheet. The build is split into two independent branches that run
//! concurrently (see [`crate::build`]):
//!
//! 1. Posts: posts ([`crate::post`]) and templates ([`crate::template`]) are
//!    loaded in parallel ([`crate::load`]), then every post is rendered from
//!    markdown ([`crate::markdown`]) and run through the `post` and
//!    `universal` templates before being written to disk.
//! 2. Stylesheet: the stylesheet is compiled to CSS ([`crate::stylesheet`]).
//!
//! Both branches create their output directories with
//! [`crate::fs::ensure_created`], which tolerates the two branches racing to
//! create a shared ancestor.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod fs;
pub mod load;
pub mod markdown;
pub mod post;
pub mod stylesheet;
pub mod template;
mod value;
