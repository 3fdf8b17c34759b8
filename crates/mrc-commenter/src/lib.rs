//! Idempotent comment upserts for GitLab merge requests.
//!
//! A comment is owned by a [`CommentSlot`]. The slot is written into the
//! comment body as a hidden [`Marker`], so that repeated runs find and update
//! the comment they created earlier instead of adding a new one.
//!
//! # Example
//!
//! ```no_run
//! use mrc_commenter::{CommentSlot, Commenter};
//! use mrc_config::{ConnectionSettings, EnvSnapshot, TargetSettings};
//!
//! let env = EnvSnapshot::from_process();
//! let mut commenter = Commenter::connect(&ConnectionSettings::default(), env, std::io::stdout())?;
//! let slot = CommentSlot::new("release-notes");
//! commenter.post("## Changes\n- fixed bug", &TargetSettings::default(), &slot)?;
//! # Ok::<(), mrc_commenter::CommentError>(())
//! ```

mod commenter;
mod error;
mod marker;

pub use commenter::{Commenter, LOCAL_HEADER, PostOutcome, post_comment};
pub use error::CommentError;
pub use marker::{
    COMMENT_IDENTIFIER, CommentSlot, DEFAULT_COMMENT_ID, Marker, contains, encode, render_body,
};
