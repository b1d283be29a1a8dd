//! Output generation for articles and the posts manifest.
//!
//! # Submodules
//!
//! - [`article`]: composes a [`GeneratedDocument`](crate::models::GeneratedDocument),
//!   writes it to a unique file and records the consumed record in history
//! - [`html`]: renders a document into the site's styled HTML shell
//! - [`manifest`]: rebuilds `posts.json` from the generated pages
//!
//! # Output Structure
//!
//! ```text
//! post/
//! ├── daily-ai-news-20240102-090000.html
//! ├── daily-ai-news-20240102-090000-1.html   # same-second collision
//! └── posts.json
//! ```

pub mod article;
pub mod html;
pub mod manifest;
