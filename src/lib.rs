//! Core of an opening-repertoire study tool for atomic chess: the variant
//! rule engine (explosion captures, check detection with king-adjacency
//! immunity), a persistent branching move database, and the session
//! controller gluing the two together.
//!
//! The windowed UI lives elsewhere; it drives [`Session`] and
//! renders what the accessors return. Nothing in this crate touches a
//! network, environment variables or command-line flags. The only external
//! resource is the repertoire store, reached through
//! [`repertoire::store::Store`].

#![warn(missing_docs, variant_size_differences)]
// Rustc lints.
#![warn(
    absolute_paths_not_starting_with_crate,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]
// Rustdoc lints.
#![warn(
    rustdoc::private_doc_tests,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls
)]
// Clippy lints.
#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::pedantic
)]

pub mod chess;
pub mod repertoire;

mod session;
pub use session::{Error, Session};
