//! # runcell-render
//!
//! Run-form pages for runcell.
//!
//! - [`page`]: scan run forms out of HTML, bind them to surfaces and write
//!   the results back
//! - [`notebook`]: split commented Python notebooks into chunks
//! - [`templates`]: Askama templates for run forms and posts

pub mod notebook;
pub mod page;
pub mod templates;

pub use notebook::{split, Chunk, NotebookError};
pub use page::{status_counts, Page, PageError, RunForm, PREINSTALL_ID, SYS_IMPORTS_ID};
pub use templates::{render_form, render_post, PostTemplate, RunFormTemplate};
