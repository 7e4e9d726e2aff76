#![allow(
    clippy::collapsible_if,
    clippy::manual_range_contains
)]
pub mod embedded;
pub mod hash;
pub mod parser;
pub mod scan;
pub mod subtitles;
pub mod walk;
