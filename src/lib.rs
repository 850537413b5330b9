//! Decodes Vagrant Story's PS1-era binary asset formats — level geometry
//! (MPD), texture/CLUT banks (ZND), skinned character models (WEP/SHP)
//! and keyframed animations (SEQ) — into engine-neutral scene data:
//! flat vertex buffers, bone hierarchies and sampled poses. Nothing in
//! this crate renders or plays anything back; `pipeline` is the facade
//! a renderer or exporter is expected to sit on top of.

pub mod color;
pub mod error;
pub mod framebuffer;
pub mod mpd;
pub mod pipeline;
pub mod reader;
pub mod rigged;
pub mod scene;
pub mod seq;
pub mod tim;
pub mod znd;

pub use error::{DecodeError, Result};
