//! Text helpers shared by every adapter
//!
//! - [`normalize`]: canonical form for scraped free text
//! - [`escape_join`] / [`escape_split`]: delimiter-joined lists with
//!   backslash escaping, used for the `image_paths` column

mod escape;
mod normalize;

pub use escape::{escape_join, escape_split};
pub use normalize::normalize;
