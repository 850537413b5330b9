//! Facade (C9) over the per-format decoders. Each `decode_*` function
//! takes whole-file bytes and a path (used only for error context, never
//! reopened) and returns that format's scene type; `resolve_material`
//! and `sample_pose` are the two operations that need state from more
//! than one decoded file (a ZND bank, an animation's own tracks).

use std::path::Path;
use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::color::RgbaRaster;
use crate::error::Result;
use crate::mpd::LevelScene;
use crate::rigged::{decode_shp as rigged_decode_shp, decode_wep as rigged_decode_wep, RiggedModel};
use crate::seq::SeqBank;
use crate::znd::ZndBank;

/// Wraps a decode error with the path that produced it, so a caller
/// juggling many files at once can tell which one failed without
/// threading the path through every `?`.
#[derive(Debug, thiserror::Error)]
#[error("{path}: {source}")]
pub struct FileError {
    pub path: String,
    #[source]
    pub source: crate::error::DecodeError,
}

fn with_path<T>(path: &Path, result: Result<T>) -> std::result::Result<T, FileError> {
    result.map_err(|source| FileError { path: path.display().to_string(), source })
}

pub fn decode_znd<'a>(path: &Path, bytes: &'a [u8]) -> std::result::Result<ZndBank<'a>, FileError> {
    with_path(path, ZndBank::read(bytes))
}

pub fn decode_mpd(
    path: &Path,
    bytes: &[u8],
    bank: Option<&mut ZndBank>,
) -> std::result::Result<LevelScene, FileError> {
    with_path(path, LevelScene::decode(bytes, bank))
}

pub fn decode_wep(path: &Path, bytes: &[u8]) -> std::result::Result<RiggedModel, FileError> {
    with_path(path, rigged_decode_wep(bytes))
}

pub fn decode_shp(path: &Path, bytes: &[u8]) -> std::result::Result<RiggedModel, FileError> {
    with_path(path, rigged_decode_shp(bytes))
}

pub fn decode_seq(path: &Path, bytes: &[u8]) -> std::result::Result<SeqBank, FileError> {
    with_path(path, SeqBank::read(bytes))
}

/// Resolves a `(textureId, clutId)` pair against a ZND bank, the same
/// lookup `LevelScene::build` performs internally for every sub-mesh.
/// Exposed directly for callers that want to re-resolve a material
/// without rebuilding the whole level (e.g. after hot-swapping a TIM).
pub fn resolve_material(bank: &mut ZndBank, texture_id: i32, clut_id: u16) -> Option<Rc<RgbaRaster>> {
    bank.get_materials(texture_id, clut_id)
}

/// Samples every bone's local transform at `frame`, matching
/// `SeqAnimation::sample_pose`. Exposed at the facade level since the
/// natural caller already has an animation handle from `decode_seq`,
/// not a `SeqAnimation` reference directly.
pub fn sample_pose(bank: &SeqBank, slot: u8, frame: u16) -> Option<(Vec3, Vec<(Quat, Vec3)>)> {
    let animation_index = *bank.slot_table.get(slot as usize)?;
    let animation = bank.animations.get(animation_index as usize)?;
    Some(animation.sample_pose(frame))
}
