//! spacetravelling: a server-rendered blog front-end over a headless
//! content API.
//!
//! The crate fetches posts from an external content repository, renders a
//! paginated feed with incremental "load more" appends, materializes post
//! pages on demand, reconciles the content source's preview cookie against
//! the rendering session, and embeds a third-party comment widget.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
