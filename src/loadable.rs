//! Loading datasets through storage media.
//!
//! A [`LoadableFixture`] resolves each dataset's storage medium through an
//! [`Env`], saves rows references-first, and clears them in reverse.

#[cfg(feature = "loadable")]
pub use fixture_loadable::*;
