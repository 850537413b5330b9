//! Skinned character models (WEP/SHP), C7. Both formats share bone,
//! group, vertex, face and texture-map sections byte-for-byte; only the
//! header before those sections, and a couple of opaque blocks SHP skips
//! afterward, differ. `decode_wep`/`decode_shp` each read their own
//! header, then hand off to the shared section readers below.

use glam::Vec3;

use crate::color::{parse_color, Rgba, RgbaRaster};
use crate::error::{DecodeError, Result};
use crate::reader::ByteReader;
use crate::scene::{Bone, Skeleton};

/// A palette-indexed texture page shared by every sub-mesh of a rigged
/// model. Unlike ZND's TIMs, a WEP/SHP texture map is entirely
/// self-contained: its pixel grid and every one of its palettes live in
/// the same section.
#[derive(Debug, Clone)]
pub struct TextureMap {
    pub version: u8,
    pub width: u16,
    pub height: u16,
    pub colors_per_palette: u8,
    pub palettes: Vec<Vec<Rgba>>,
    pixels: Vec<u8>,
}

impl TextureMap {
    fn read_palette(r: &mut ByteReader, count: u8) -> Result<Vec<Rgba>> {
        let mut colors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            colors.push(parse_color(r.u16()?));
        }
        Ok(colors)
    }

    /// `wep` selects the palette layout: WEP prefixes a shared "handle"
    /// palette (`colors_per_palette / 3` entries) common to every
    /// palette, followed by `(colors_per_palette / 3) * 2` entries
    /// unique to each; SHP reads `colors_per_palette` entries directly
    /// with no shared handle.
    fn read(r: &mut ByteReader, num_palettes: u32, wep: bool) -> Result<Self> {
        let _size = r.u32()?;
        let version = r.u8()?;
        let width = r.u8()? as u16 * 2;
        let height = r.u8()? as u16 * 2;
        let colors_per_palette = r.u8()?;

        let handle = if wep { Some(Self::read_palette(r, colors_per_palette / 3)?) } else { None };

        let mut palettes = Vec::with_capacity(num_palettes as usize);
        for _ in 0..num_palettes {
            let colors = if wep {
                let mut colors = handle.clone().unwrap();
                colors.extend(Self::read_palette(r, (colors_per_palette / 3) * 2)?);
                colors
            } else {
                Self::read_palette(r, colors_per_palette)?
            };
            palettes.push(colors);
        }

        let mut pixels = vec![0u8; width as usize * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                pixels[y * width as usize + x] = r.u8()?;
            }
        }

        Ok(TextureMap { version, width, height, colors_per_palette, palettes, pixels })
    }

    pub fn get_width(&self) -> u16 {
        if self.version == 16 {
            self.width * 2
        } else {
            self.width
        }
    }

    /// Builds one raster per palette, 4-bit dual-nibble expansion
    /// (version 16) or direct indexing (version 1), low nibble first.
    /// Palettes whose version matches neither are skipped (the original
    /// tooling quietly drops them rather than erroring).
    pub fn build(&self) -> Vec<RgbaRaster> {
        self.palettes
            .iter()
            .filter_map(|palette| match self.version {
                1 => Some(self.build_v1(palette)),
                16 => Some(self.build_v16(palette)),
                _ => None,
            })
            .collect()
    }

    fn build_v1(&self, palette: &[Rgba]) -> RgbaRaster {
        let mut data = vec![0u8; self.width as usize * self.height as usize * 4];
        for (i, &index) in self.pixels.iter().enumerate() {
            let color = if (index as usize) < palette.len() { palette[index as usize] } else { [0, 0, 0, 0] };
            data[i * 4..i * 4 + 4].copy_from_slice(&color);
        }
        RgbaRaster { data, width: self.width as u32, height: self.height as u32 }
    }

    fn build_v16(&self, palette: &[Rgba]) -> RgbaRaster {
        let mut data = vec![0u8; self.pixels.len() * 8];
        for (i, &byte) in self.pixels.iter().enumerate() {
            let lo = (byte & 0x0F) as usize;
            let hi = ((byte & 0xF0) >> 4) as usize;
            let lo_color = if lo < palette.len() { palette[lo] } else { [0, 0, 0, 0] };
            let hi_color = if hi < palette.len() { palette[hi] } else { [0, 0, 0, 0] };
            data[i * 8..i * 8 + 4].copy_from_slice(&lo_color);
            data[i * 8 + 4..i * 8 + 8].copy_from_slice(&hi_color);
        }
        RgbaRaster { data, width: self.width as u32 * 2, height: self.height as u32 }
    }
}

/// Raw on-disk bone record. `length`/`parent_id` drive both skeletal
/// transforms and the static vertex pre-offset in `build_geometry`.
#[derive(Debug, Clone, Copy)]
pub struct RiggedBone {
    pub length: i32,
    pub parent_id: i8,
    pub group_id: i8,
    pub mount_id: u8,
    pub body_part_id: u8,
    pub mode: i8,
}

impl RiggedBone {
    fn read(r: &mut ByteReader) -> Result<Self> {
        let length = r.s32()?;
        let parent_id = r.s8()?;
        let group_id = r.s8()?;
        let mount_id = r.u8()?;
        let body_part_id = r.u8()?;
        let mode = r.s8()?;
        r.skip(3)?; // unknown u1/u2/u3
        r.skip(4)?; // padding
        Ok(RiggedBone { length, parent_id, group_id, mount_id, body_part_id, mode })
    }

    /// `parent_id` is read as a signed byte on disk but is always
    /// compared against the bone count as its raw, unsigned byte value —
    /// negative bytes are simply "no parent" out-of-range markers, never
    /// a negative index.
    fn parent_index(&self, bone_count: usize) -> Option<usize> {
        let raw = self.parent_id as u8 as usize;
        if raw < bone_count {
            Some(raw)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RiggedGroup {
    bone_id: i16,
    last_vertex: u16,
}

impl RiggedGroup {
    fn read(r: &mut ByteReader) -> Result<Self> {
        Ok(RiggedGroup { bone_id: r.s16()?, last_vertex: r.u16()? })
    }
}

#[derive(Debug, Clone, Copy)]
struct RiggedVertex {
    x: i16,
    y: i16,
    z: i16,
    group: usize,
}

impl RiggedVertex {
    fn read(r: &mut ByteReader) -> Result<(i16, i16, i16)> {
        let x = r.s16()?;
        let y = r.s16()?;
        let z = r.s16()?;
        r.skip(2)?; // padding
        Ok((x, y, z))
    }
}

/// A decoded WEP/SHP face. Both the uncolored (v1) and vertex-colored
/// (v2) on-disk encodings collapse to this shape; `info == 0x05` is the
/// "double-sided" marker the original calls `double()`.
#[derive(Debug, Clone, Copy)]
pub struct RiggedFace {
    pub quad: bool,
    pub vertices: [u32; 4],
    pub uv: [(u8, u8); 4],
    pub rgb: [(u8, u8, u8); 4],
    pub info: u8,
}

impl RiggedFace {
    fn double(&self) -> bool {
        self.info == 0x05
    }

    fn read_v1(r: &mut ByteReader) -> Result<Self> {
        let type_ = r.u8()?;
        if type_ != 0x24 && type_ != 0x2C {
            return Err(DecodeError::UnknownFaceType(type_));
        }
        let quad = type_ == 0x2C;

        let _size = r.u8()?;
        let info = r.u8()?;
        r.skip(1)?;

        let v1 = r.u16()? / 4;
        let v2 = r.u16()? / 4;
        let v3 = r.u16()? / 4;
        let v4 = if quad { r.u16()? / 4 } else { 0 };

        let u1 = r.u8()?;
        let vv1 = r.u8()?;
        let u2 = r.u8()?;
        let vv2 = r.u8()?;
        let u3 = r.u8()?;
        let vv3 = r.u8()?;
        let (u4, vv4) = if quad { (r.u8()?, r.u8()?) } else { (0, 0) };

        const DEFAULT_GREY: u8 = 0x80;
        Ok(RiggedFace {
            quad,
            vertices: [v1 as u32, v2 as u32, v3 as u32, v4 as u32],
            uv: [(u1, vv1), (u2, vv2), (u3, vv3), (u4, vv4)],
            rgb: [(DEFAULT_GREY, DEFAULT_GREY, DEFAULT_GREY); 4],
            info,
        })
    }

    /// Peeks the type byte at offset 11 without advancing, matching the
    /// disambiguation the on-disk v2 records need before they can be
    /// read field-by-field.
    fn read_v2(r: &mut ByteReader) -> Result<Self> {
        let type_ = r.peek(11, 1)?[0];
        match type_ {
            0x34 => Self::read_triangle_colored(r),
            0x3C => Self::read_quad_colored(r),
            other => Err(DecodeError::UnknownFaceType(other)),
        }
    }

    fn read_triangle_colored(r: &mut ByteReader) -> Result<Self> {
        let v1 = r.u16()? / 4;
        let v2 = r.u16()? / 4;
        let v3 = r.u16()? / 4;
        let u1 = r.u8()?;
        let vv1 = r.u8()?;
        let rgb1 = (r.u8()?, r.u8()?, r.u8()?);
        r.constant(&[0x34])?;
        let rgb2 = (r.u8()?, r.u8()?, r.u8()?);
        let _size = r.u8()?;
        let rgb3 = (r.u8()?, r.u8()?, r.u8()?);
        let info = r.u8()?;
        let u2 = r.u8()?;
        let vv2 = r.u8()?;
        let u3 = r.u8()?;
        let vv3 = r.u8()?;
        r.skip(4)?; // trailing reserved bytes

        Ok(RiggedFace {
            quad: false,
            vertices: [v1 as u32, v2 as u32, v3 as u32, 0],
            uv: [(u1, vv1), (u2, vv2), (u3, vv3), (0, 0)],
            rgb: [rgb1, rgb2, rgb3, (0, 0, 0)],
            info,
        })
    }

    fn read_quad_colored(r: &mut ByteReader) -> Result<Self> {
        let v1 = r.u16()? / 4;
        let v2 = r.u16()? / 4;
        let v3 = r.u16()? / 4;
        let v4 = r.u16()? / 4;
        let rgb1 = (r.u8()?, r.u8()?, r.u8()?);
        r.constant(&[0x3C])?;
        let rgb2 = (r.u8()?, r.u8()?, r.u8()?);
        let _size = r.u8()?;
        let rgb3 = (r.u8()?, r.u8()?, r.u8()?);
        let info = r.u8()?;
        let rgb4 = (r.u8()?, r.u8()?, r.u8()?);
        r.skip(1)?;
        let u1 = r.u8()?;
        let vv1 = r.u8()?;
        let u2 = r.u8()?;
        let vv2 = r.u8()?;
        let u3 = r.u8()?;
        let vv3 = r.u8()?;
        let u4 = r.u8()?;
        let vv4 = r.u8()?;
        r.skip(4)?; // trailing reserved bytes

        Ok(RiggedFace {
            quad: true,
            vertices: [v1 as u32, v2 as u32, v3 as u32, v4 as u32],
            uv: [(u1, vv1), (u2, vv2), (u3, vv3), (u4, vv4)],
            rgb: [rgb1, rgb2, rgb3, rgb4],
            info,
        })
    }
}

/// Tries every face as v1; if any record's type byte is unrecognized,
/// rewinds to the section start and retries the whole section as v2.
/// This mirrors the all-or-nothing retry the original format needs:
/// there is no per-record version tag, only a version that applies to
/// every face in the section.
fn read_face_section(r: &mut ByteReader, num_faces: u32) -> Result<(Vec<RiggedFace>, u8)> {
    let start = r.pos();
    let v1: Result<Vec<RiggedFace>> = (0..num_faces).map(|_| RiggedFace::read_v1(r)).collect();
    match v1 {
        Ok(faces) => Ok((faces, 1)),
        Err(DecodeError::UnknownFaceType(_)) => {
            r.seek(start)?;
            let faces: Vec<RiggedFace> = (0..num_faces).map(|_| RiggedFace::read_v2(r)).collect::<Result<_>>()?;
            Ok((faces, 2))
        }
        Err(e) => Err(e),
    }
}

/// Everything needed to build a `RiggedModel`, parsed with identical
/// section logic by both `decode_wep` and `decode_shp`.
struct RiggedSections {
    bones: Vec<RiggedBone>,
    groups: Vec<RiggedGroup>,
    vertices: Vec<RiggedVertex>,
    faces: Vec<RiggedFace>,
    face_version: u8,
    texture_map: TextureMap,
}

fn read_sections(
    r: &mut ByteReader,
    num_bones: u32,
    num_groups: u32,
    num_faces: u32,
    num_palettes: u32,
    wep: bool,
) -> Result<RiggedSections> {
    let mut bones = Vec::with_capacity(num_bones as usize);
    for _ in 0..num_bones {
        bones.push(RiggedBone::read(r)?);
    }

    let mut raw_groups = Vec::with_capacity(num_groups as usize);
    for _ in 0..num_groups {
        raw_groups.push(RiggedGroup::read(r)?);
    }

    let mut vertices = Vec::new();
    let mut group_index = 0usize;
    loop {
        if group_index >= raw_groups.len() {
            break;
        }
        if (vertices.len() as u16) >= raw_groups[group_index].last_vertex {
            group_index += 1;
            continue;
        }
        let (x, y, z) = RiggedVertex::read(r)?;
        vertices.push(RiggedVertex { x, y, z, group: group_index });
    }

    let (faces, face_version) = read_face_section(r, num_faces)?;
    let texture_map = TextureMap::read(r, num_palettes, wep)?;

    Ok(RiggedSections { bones, groups: raw_groups, vertices, faces, face_version, texture_map })
}

/// The built output of a WEP or SHP decode: a skeleton plus flat vertex
/// arrays ready for GPU upload, skin-indexed against that skeleton.
pub struct RiggedModel {
    pub skeleton: Skeleton,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub skin_indices: Vec<u32>,
    pub skin_weights: Vec<f32>,
    pub face_version: u8,
    pub texture_map: TextureMap,
}

fn build_skeleton(bones: &[RiggedBone]) -> Skeleton {
    let mut scene_bones: Vec<Bone> = (0..bones.len()).map(|i| Bone::new(format!("bone{i}"))).collect();

    for i in 0..bones.len() {
        if let Some(parent) = bones[i].parent_index(bones.len()) {
            scene_bones[i].parent = Some(parent);
            scene_bones[i].position = Vec3::new(-(bones[parent].length as f32), 0.0, 0.0);
            scene_bones[parent].children.push(i);
        }
    }

    Skeleton::new(scene_bones)
}

/// Sums `-length` over every ancestor of the bone `vertex_bone` is
/// skinned to (not including that bone itself), baking the bind pose
/// into raw vertex positions so the mesh renders correctly without
/// evaluating the skeleton.
fn ancestor_offset(bones: &[RiggedBone], vertex_bone: usize) -> f32 {
    let mut offset = 0.0;
    let mut current = vertex_bone;
    while let Some(parent) = bones[current].parent_index(bones.len()) {
        offset -= bones[parent].length as f32;
        current = parent;
    }
    offset
}

/// Accumulates each face's (non-normalized) cross-product normal into
/// every vertex it touches, then normalizes per vertex. Distinct from
/// MPD's flat per-face normal: here a vertex shared by several faces
/// gets the average of their normals, not one face's normal repeated.
fn compute_vertex_normals(positions: &[Vec3], faces: &[(u32, u32, u32)]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for &(a, b, c) in faces {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let edge1 = positions[b] - positions[a];
        let edge2 = positions[c] - positions[a];
        let n = edge1.cross(edge2);
        sums[a] += n;
        sums[b] += n;
        sums[c] += n;
    }
    sums.into_iter().map(|n| if n.length_squared() > 0.0 { n.normalize() } else { n }).collect()
}

fn build_geometry(sections: &RiggedSections) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<u32>, Vec<u32>, Vec<f32>) {
    let tw = sections.texture_map.get_width() as f32;
    let th = sections.texture_map.height as f32;

    let raw_positions: Vec<Vec3> = sections
        .vertices
        .iter()
        .map(|v| {
            let offset = ancestor_offset(&sections.bones, group_bone(sections, v.group));
            Vec3::new(v.x as f32 + offset, v.y as f32, v.z as f32)
        })
        .collect();

    // Triangulate every face exactly as the rendering index buffer does
    // (not necessarily the same diagonal a naive fan would pick) so
    // normals are computed over the same winding that gets rendered.
    let mut tri_indices: Vec<(u32, u32, u32)> = Vec::new();
    let mut out_positions = Vec::new();
    let mut out_colors = Vec::new();
    let mut out_uvs = Vec::new();
    let mut out_indices = Vec::new();
    let mut out_skin_indices = Vec::new();
    let mut out_skin_weights = Vec::new();
    let mut iv: u32 = 0;

    for f in &sections.faces {
        let n = if f.quad { 4 } else { 3 };
        for i in 0..n {
            let vert_idx = f.vertices[i] as usize;
            let p = raw_positions[vert_idx];
            out_positions.extend_from_slice(&[p.x, p.y, p.z]);

            let bone = group_bone(sections, sections.vertices[vert_idx].group);
            out_skin_indices.push(bone as u32);
            out_skin_weights.push(1.0);

            let (r, g, b) = f.rgb[i];
            out_colors.extend_from_slice(&[r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
        }

        if f.quad {
            // Quads use the straight UV order; triangles use the
            // rotated order MPD also uses. The two formats genuinely
            // differ here, not a transcription slip.
            for (u, v) in f.uv {
                out_uvs.extend_from_slice(&[u as f32 / tw, v as f32 / th]);
            }
            out_indices.extend_from_slice(&[iv + 2, iv + 1, iv, iv + 1, iv + 2, iv + 3]);
            tri_indices.push((iv + 2, iv + 1, iv));
            tri_indices.push((iv + 1, iv + 2, iv + 3));
            if f.double() {
                out_indices.extend_from_slice(&[iv, iv + 1, iv + 2, iv + 3, iv + 2, iv + 1]);
            }
            iv += 4;
        } else {
            for (u, v) in [f.uv[1], f.uv[2], f.uv[0]] {
                out_uvs.extend_from_slice(&[u as f32 / tw, v as f32 / th]);
            }
            out_indices.extend_from_slice(&[iv + 2, iv + 1, iv]);
            tri_indices.push((iv + 2, iv + 1, iv));
            if f.double() {
                out_indices.extend_from_slice(&[iv, iv + 1, iv + 2]);
            }
            iv += 3;
        }
    }

    let vertex_positions: Vec<Vec3> = out_positions.chunks(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect();
    let normals = compute_vertex_normals(&vertex_positions, &tri_indices);
    let mut out_normals = Vec::with_capacity(out_positions.len());
    for n in &normals {
        out_normals.extend_from_slice(&[n.x, n.y, n.z]);
    }

    (out_positions, out_normals, out_colors, out_uvs, out_indices, out_skin_indices, out_skin_weights)
}

fn group_bone(sections: &RiggedSections, group: usize) -> usize {
    sections.groups.get(group).map(|g| g.bone_id.max(0) as usize).unwrap_or(0)
}

fn build_model(sections: RiggedSections) -> RiggedModel {
    let skeleton = build_skeleton(&sections.bones);
    let (positions, normals, colors, uvs, indices, skin_indices, skin_weights) = build_geometry(&sections);
    RiggedModel {
        skeleton,
        positions,
        normals,
        colors,
        uvs,
        indices,
        skin_indices,
        skin_weights,
        face_version: sections.face_version,
        texture_map: sections.texture_map,
    }
}

/// Decodes a WEP character model: magic-checked header, then the shared
/// bone/group/vertex/face/texture sections.
pub fn decode_wep(bytes: &[u8]) -> Result<RiggedModel> {
    let mut r = ByteReader::new(bytes);
    log::trace!("decoding WEP ({} bytes)", bytes.len());

    r.constant(&[0x48, 0x30, 0x31, 0x00])?; // "H01\0"
    let num_bones = r.u32()?;
    let num_groups = r.u32()?;
    let num_vertices = r.u32()?;
    let _num_vertex_clusters = r.u32()?;
    let num_triangles = r.u32()?;
    let num_quads = r.u32()?;
    let num_all_polygons = num_triangles + num_quads;
    let _ = num_vertices;

    r.skip(4 * 7)?; // unused section pointers, read sequentially only

    let sections = read_sections(&mut r, num_bones, num_groups, num_all_polygons, 7, true)?;
    Ok(build_model(sections))
}

/// Decodes a SHP enemy/NPC model: an extended header (overlay sprite
/// table, menu/shadow presentation fields, animation LBA tables) around
/// the same bone/group/vertex/face sections WEP uses, then an opaque
/// AKAO block and a single magic-tagged block skipped by length before
/// the (2-palette, non-WEP-layout) texture section.
pub fn decode_shp(bytes: &[u8]) -> Result<RiggedModel> {
    let mut r = ByteReader::new(bytes);
    log::trace!("decoding SHP ({} bytes)", bytes.len());

    r.constant(&[0x48, 0x30, 0x31, 0x00])?; // "H01\0"
    let num_bones = r.u32()?;
    let num_groups = r.u32()?;
    let num_vertices = r.u32()?;
    let _num_vertex_clusters = r.u32()?;
    let num_triangles = r.u32()?;
    let num_quads = r.u32()?;
    let num_all_polygons = num_triangles + num_quads;
    let _ = num_vertices;

    for _ in 0..8 {
        r.skip(4)?; // overlay (x, y, width, height) u8 tuples
    }
    r.skip(1)?; // menu_position_y
    r.skip(1)?; // shadow_radius
    r.skip(1)?; // shadow_size_increase
    r.skip(1)?; // shadow_size_decrease
    r.skip(1)?; // menu_scale
    r.skip(1)?; // target_sphere_position_y
    r.skip(8)?; // unknown

    r.skip(4 * 12)?; // anim_lbas
    r.skip(2 * 12)?; // chain_ids
    r.skip(4 * 4)?; // special_lbas
    r.skip(16)?; // unknown

    let magic_ptr = r.u32()?;
    let akao_ptr = r.u32()?;
    let _group_ptr = r.u32()?;
    let _vertex_ptr = r.u32()?;
    let _face_ptr = r.u32()?;

    let sections = read_sections(&mut r, num_bones, num_groups, num_all_polygons, 2, false)?;

    r.skip(magic_ptr.saturating_sub(akao_ptr) as usize)?;
    r.constant(&[0x41, 0x4B, 0x41, 0x4F])?; // "AKAO"
    let magic_len = r.u32()?;
    r.skip(magic_len as usize)?;

    Ok(build_model(sections))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_bone(out: &mut Vec<u8>, length: i32, parent_id: i8) {
        out.extend_from_slice(&length.to_le_bytes());
        out.push(parent_id as u8);
        out.push(0); // group_id
        out.push(0); // mount_id
        out.push(0); // body_part_id
        out.push(0); // mode
        out.extend_from_slice(&[0u8; 3]); // unknown
        out.extend_from_slice(&[0u8; 4]); // padding
    }

    #[test]
    fn root_bone_parent_id_minus_one_has_no_parent() {
        let mut bytes = Vec::new();
        push_bone(&mut bytes, 10, -1);
        push_bone(&mut bytes, 20, 0);

        let mut r = ByteReader::new(&bytes);
        let bones = vec![RiggedBone::read(&mut r).unwrap(), RiggedBone::read(&mut r).unwrap()];

        assert_eq!(bones[0].parent_index(bones.len()), None);
        assert_eq!(bones[1].parent_index(bones.len()), Some(0));
    }

    #[test]
    fn skeleton_bakes_parent_length_into_child_offset() {
        let bones = vec![
            RiggedBone { length: 10, parent_id: -1, group_id: 0, mount_id: 0, body_part_id: 0, mode: 0 },
            RiggedBone { length: 5, parent_id: 0, group_id: 1, mount_id: 0, body_part_id: 0, mode: 0 },
        ];
        let skeleton = build_skeleton(&bones);
        assert_eq!(skeleton.bones[1].position, Vec3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn ancestor_offset_sums_every_ancestor_length() {
        let bones = vec![
            RiggedBone { length: 10, parent_id: -1, group_id: 0, mount_id: 0, body_part_id: 0, mode: 0 },
            RiggedBone { length: 5, parent_id: 0, group_id: 1, mount_id: 0, body_part_id: 0, mode: 0 },
            RiggedBone { length: 2, parent_id: 1, group_id: 2, mount_id: 0, body_part_id: 0, mode: 0 },
        ];
        // vertex skinned to bone 2: ancestors are 1 and 0, not including 2 itself
        assert_eq!(ancestor_offset(&bones, 2), -5.0 - 10.0);
        assert_eq!(ancestor_offset(&bones, 0), 0.0);
    }

    #[test]
    fn v1_face_rejects_unknown_type_byte() {
        let bytes = [0xFFu8, 0, 0, 0];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(RiggedFace::read_v1(&mut r), Err(DecodeError::UnknownFaceType(0xFF))));
    }

    #[test]
    fn texture_map_v16_expands_low_nibble_first() {
        let map = TextureMap {
            version: 16,
            width: 1,
            height: 1,
            colors_per_palette: 2,
            palettes: vec![vec![[10, 20, 30, 255], [40, 50, 60, 255]]],
            pixels: vec![0x01],
        };
        let rasters = map.build();
        assert_eq!(rasters.len(), 1);
        assert_eq!(rasters[0].width, 2);
        assert_eq!(&rasters[0].data[0..4], &[40, 50, 60, 255]);
        assert_eq!(&rasters[0].data[4..8], &[10, 20, 30, 255]);
    }
}
