//! Level geometry (MPD), C6. A room's geometry section is the only
//! sub-section actually decoded; every other sub-section is a
//! length-prefixed opaque block skipped by the declared byte count
//! (forward-only cursor, never seeks backward).

use std::rc::Rc;

use glam::Vec3;

use crate::color::RgbaRaster;
use crate::error::Result;
use crate::reader::ByteReader;
use crate::znd::ZndBank;

/// The 6 pointer+length pairs at the top of an MPD file. None of these
/// are consulted again after parsing: the actual skip lengths for the
/// room's sub-sections come from `RoomSubHeader` below. Kept for
/// completeness, matching the passthrough treatment of other
/// known-but-unused header fields in this pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct MpdHeader {
    pub room_section: (u32, u32),
    pub cleared_section: (u32, u32),
    pub script_section: (u32, u32),
    pub door_section: (u32, u32),
    pub enemy_section: (u32, u32),
    pub treasure_section: (u32, u32),
}

impl MpdHeader {
    fn read(r: &mut ByteReader) -> Result<Self> {
        Ok(MpdHeader {
            room_section: (r.u32()?, r.u32()?),
            cleared_section: (r.u32()?, r.u32()?),
            script_section: (r.u32()?, r.u32()?),
            door_section: (r.u32()?, r.u32()?),
            enemy_section: (r.u32()?, r.u32()?),
            treasure_section: (r.u32()?, r.u32()?),
        })
    }
}

/// Declared byte lengths of the room's 24 sub-sections. Only `geometry`
/// is actually parsed; the rest drive plain `skip` calls in this order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSubHeader {
    pub geometry: u32,
    pub collision: u32,
    pub sub_03: u32,
    pub door_room: u32,
    pub lighting: u32,
    pub sub_06: u32,
    pub sub_07: u32,
    pub sub_08: u32,
    pub sub_09: u32,
    pub sub_0a: u32,
    pub sub_0b: u32,
    pub texture_effects: u32,
    pub sub_0d: u32,
    pub sub_0e: u32,
    pub sub_0f: u32,
    pub sub_10: u32,
    pub sub_11: u32,
    pub sub_12: u32,
    pub sub_13: u32,
    pub akao: u32,
    pub sub_15: u32,
    pub sub_16: u32,
    pub sub_17: u32,
    pub sub_18: u32,
}

impl RoomSubHeader {
    fn read(r: &mut ByteReader) -> Result<Self> {
        Ok(RoomSubHeader {
            geometry: r.u32()?,
            collision: r.u32()?,
            sub_03: r.u32()?,
            door_room: r.u32()?,
            lighting: r.u32()?,
            sub_06: r.u32()?,
            sub_07: r.u32()?,
            sub_08: r.u32()?,
            sub_09: r.u32()?,
            sub_0a: r.u32()?,
            sub_0b: r.u32()?,
            texture_effects: r.u32()?,
            sub_0d: r.u32()?,
            sub_0e: r.u32()?,
            sub_0f: r.u32()?,
            sub_10: r.u32()?,
            sub_11: r.u32()?,
            sub_12: r.u32()?,
            sub_13: r.u32()?,
            akao: r.u32()?,
            sub_15: r.u32()?,
            sub_16: r.u32()?,
            sub_17: r.u32()?,
            sub_18: r.u32()?,
        })
    }

    /// Lengths of every sub-section after geometry, in file order.
    fn remaining_lengths(&self) -> [u32; 23] {
        [
            self.collision,
            self.sub_03,
            self.door_room,
            self.lighting,
            self.sub_06,
            self.sub_07,
            self.sub_08,
            self.sub_09,
            self.sub_0a,
            self.sub_0b,
            self.texture_effects,
            self.sub_0d,
            self.sub_0e,
            self.sub_0f,
            self.sub_10,
            self.sub_11,
            self.sub_12,
            self.sub_13,
            self.akao,
            self.sub_15,
            self.sub_16,
            self.sub_17,
            self.sub_18,
        ]
    }
}

/// A decoded MPD face: one anchor vertex (`p1`) plus 8-bit deltas for
/// the rest of the polygon, colors, UVs and a material key. Field order
/// mirrors the on-disk record, which interleaves color and UV reads
/// between the texture/CLUT ids in a way that isn't visually obvious
/// from this struct — see `MpdFace::read` for the wire order.
#[derive(Debug, Clone, Copy)]
pub struct MpdFace {
    pub quad: bool,
    p1: (i16, i16, i16),
    p2_delta: (i8, i8, i8),
    p3_delta: (i8, i8, i8),
    p4_delta: (i8, i8, i8),
    pub rgb1: (u8, u8, u8),
    pub rgb2: (u8, u8, u8),
    pub rgb3: (u8, u8, u8),
    pub rgb4: (u8, u8, u8),
    pub uv1: (u8, u8),
    pub uv2: (u8, u8),
    pub uv3: (u8, u8),
    pub uv4: (u8, u8),
    pub texture_id: i16,
    pub clut_id: u16,
}

impl MpdFace {
    fn read(r: &mut ByteReader, quad: bool) -> Result<Self> {
        let p1 = (r.s16()?, r.s16()?, r.s16()?);
        let p2_delta = (r.s8()?, r.s8()?, r.s8()?);
        let p3_delta = (r.s8()?, r.s8()?, r.s8()?);

        let rgb1 = (r.u8()?, r.u8()?, r.u8()?);
        let _shading_type = r.u8()?;

        let r2 = r.u8()?;
        let g2 = r.u8()?;
        let b2 = r.u8()?;

        let u1 = r.u8()?;

        let r3 = r.u8()?;
        let g3 = r.u8()?;
        let b3 = r.u8()?;

        let v1 = r.u8()?;
        let u2 = r.u8()?;
        let v2 = r.u8()?;

        let clut_id = r.u16()?;

        let u3 = r.u8()?;
        let v3 = r.u8()?;

        let texture_id = r.s16()?;

        let (p4_delta, rgb4, uv4) = if quad {
            let p4_delta = (r.s8()?, r.s8()?, r.s8()?);
            let u4 = r.u8()?;
            let rgb4 = (r.u8()?, r.u8()?, r.u8()?);
            let v4 = r.u8()?;
            (p4_delta, rgb4, (u4, v4))
        } else {
            ((0, 0, 0), (0, 0, 0), (0, 0))
        };

        Ok(MpdFace {
            quad,
            p1,
            p2_delta,
            p3_delta,
            p4_delta,
            rgb1,
            rgb2: (r2, g2, b2),
            rgb3: (r3, g3, b3),
            rgb4,
            uv1: (u1, v1),
            uv2: (u2, v2),
            uv3: (u3, v3),
            uv4,
            texture_id,
            clut_id,
        })
    }

    /// Materializes absolute vertex positions and the (negated, raw
    /// delta-derived) face normal. Positions scale the 8-bit deltas by
    /// the owning group's scale factor and add the anchor.
    fn build(&self, scale: i32) -> (Vec3, Vec3, Vec3, Option<Vec3>, Vec3) {
        let p1 = Vec3::new(self.p1.0 as f32, self.p1.1 as f32, self.p1.2 as f32);

        let delta = |d: (i8, i8, i8)| Vec3::new(d.0 as f32, d.1 as f32, d.2 as f32);
        let p2 = p1 + delta(self.p2_delta) * scale as f32;
        let p3 = p1 + delta(self.p3_delta) * scale as f32;
        let p4 = if self.quad { Some(p1 + delta(self.p4_delta) * scale as f32) } else { None };

        let mut n = delta(self.p2_delta).cross(delta(self.p3_delta));
        if n.length_squared() > 0.0 {
            n = n.normalize();
        }
        n = -n;

        (p1, p2, p3, p4, n)
    }
}

/// One material-keyed partition of a group's faces, with flat vertex
/// arrays built from them.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    pub texture_id: i32,
    pub clut_id: u16,
    faces: Vec<MpdFace>,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub material: Option<Rc<RgbaRaster>>,
}

impl SubMesh {
    fn build(&mut self, scale: i32) {
        const TILE_W: f32 = 256.0;
        const TILE_H: f32 = 256.0;

        let mut iv: u32 = 0;

        for f in &self.faces {
            let (p1, p2, p3, p4, n) = f.build(scale);

            if f.quad {
                let p4 = p4.expect("quad face must have a fourth vertex");
                for p in [p1, p2, p3, p4] {
                    self.positions.extend_from_slice(&[p.x, p.y, p.z]);
                    self.normals.extend_from_slice(&[n.x, n.y, n.z]);
                }
                for (r, g, b) in [f.rgb1, f.rgb2, f.rgb3, f.rgb4] {
                    self.colors.extend_from_slice(&[r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
                }
                for (u, v) in [f.uv2, f.uv3, f.uv1, f.uv4] {
                    self.uvs.extend_from_slice(&[u as f32 / TILE_W, v as f32 / TILE_H]);
                }
                self.indices.extend_from_slice(&[iv + 2, iv + 1, iv, iv + 1, iv + 2, iv + 3]);
                iv += 4;
            } else {
                for p in [p1, p2, p3] {
                    self.positions.extend_from_slice(&[p.x, p.y, p.z]);
                    self.normals.extend_from_slice(&[n.x, n.y, n.z]);
                }
                for (r, g, b) in [f.rgb1, f.rgb2, f.rgb3] {
                    self.colors.extend_from_slice(&[r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
                }
                for (u, v) in [f.uv2, f.uv3, f.uv1] {
                    self.uvs.extend_from_slice(&[u as f32 / TILE_W, v as f32 / TILE_H]);
                }
                self.indices.extend_from_slice(&[iv + 2, iv + 1, iv]);
                iv += 3;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MpdGroup {
    pub scale: i32,
    meshes: std::collections::HashMap<(i32, u16), SubMesh>,
    mesh_order: Vec<(i32, u16)>,
}

impl MpdGroup {
    /// Reads only this group's 64-byte header. `geometry_section` reads
    /// every group's header first, in one pass, before any group's face
    /// data is touched — the two are not interleaved on disk.
    fn read_header(r: &mut ByteReader) -> Result<Self> {
        let mut head = [0u8; 64];
        for b in head.iter_mut() {
            *b = r.u8()?;
        }
        let scale = if head[1] & 0x08 != 0 { 1 } else { 8 };

        Ok(MpdGroup { scale, meshes: std::collections::HashMap::new(), mesh_order: Vec::new() })
    }

    /// Reads this group's triangle/quad counts and face records. Called
    /// on every already-header-read group, in group order, as a second
    /// pass over the same cursor.
    fn read_data(&mut self, r: &mut ByteReader) -> Result<()> {
        let triangle_count = r.u32()?;
        let quad_count = r.u32()?;

        for _ in 0..triangle_count {
            let face = MpdFace::read(r, false)?;
            self.add_face(face);
        }
        for _ in 0..quad_count {
            let face = MpdFace::read(r, true)?;
            self.add_face(face);
        }

        Ok(())
    }

    fn add_face(&mut self, face: MpdFace) {
        let key = (face.texture_id as i32, face.clut_id);
        let mesh = self.meshes.entry(key).or_insert_with(|| {
            self.mesh_order.push(key);
            SubMesh { texture_id: key.0, clut_id: key.1, ..Default::default() }
        });
        mesh.faces.push(face);
    }

    fn build(&mut self, bank: Option<&mut ZndBank>) -> Vec<SubMesh> {
        let mut bank = bank;
        let mut out = Vec::with_capacity(self.mesh_order.len());

        for key in &self.mesh_order {
            if let Some(mesh) = self.meshes.remove(key) {
                let mut mesh = mesh;
                mesh.build(self.scale);
                if let Some(bank) = bank.as_deref_mut() {
                    mesh.material = bank.get_materials(mesh.texture_id, mesh.clut_id);
                }
                out.push(mesh);
            }
        }

        out
    }
}

/// One decoded room: its geometry sub-section split into per-group,
/// per-material sub-meshes. Every other sub-section was skipped opaquely
/// during decode.
pub struct LevelScene {
    pub header: MpdHeader,
    pub room_sub_header: RoomSubHeader,
    groups: Vec<MpdGroup>,
    pub meshes: Vec<SubMesh>,
}

impl LevelScene {
    pub fn decode(bytes: &[u8], bank: Option<&mut ZndBank>) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        log::trace!("decoding MPD ({} bytes)", bytes.len());

        let header = MpdHeader::read(&mut r)?;
        let room_sub_header = RoomSubHeader::read(&mut r)?;

        let group_count = r.u32()?;
        let mut groups = Vec::with_capacity(group_count as usize);
        for _ in 0..group_count {
            groups.push(MpdGroup::read_header(&mut r)?);
        }
        for group in &mut groups {
            group.read_data(&mut r)?;
        }

        for length in room_sub_header.remaining_lengths() {
            r.skip(length as usize)?;
        }

        Ok(LevelScene { header, room_sub_header, groups, meshes: Vec::new() })
    }

    /// Builds flat vertex arrays for every group's sub-meshes and
    /// resolves their materials against `bank`, if given.
    pub fn build(&mut self, mut bank: Option<&mut ZndBank>) {
        self.meshes.clear();
        for group in &mut self.groups {
            let built = group.build(bank.as_deref_mut());
            self.meshes.extend(built);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_group_header(out: &mut Vec<u8>, scale_bit_set: bool) {
        let mut head = [0u8; 64];
        if scale_bit_set {
            head[1] |= 0x08;
        }
        out.extend_from_slice(&head);
    }

    fn triangle_bytes(texture_id: i16, clut_id: u16) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&100i16.to_le_bytes()); // p1x
        b.extend_from_slice(&200i16.to_le_bytes()); // p1y
        b.extend_from_slice(&300i16.to_le_bytes()); // p1z
        b.push(1i8 as u8); // p2x delta
        b.push(0); // p2y
        b.push(0); // p2z
        b.push(0); // p3x
        b.push(1i8 as u8); // p3y
        b.push(0); // p3z
        b.extend_from_slice(&[128, 128, 128]); // rgb1
        b.push(0); // shading type byte
        b.extend_from_slice(&[128, 128, 128]); // rgb2 (r2,g2,b2)
        b.push(2); // u1
        b.extend_from_slice(&[128, 128, 128]); // rgb3
        b.push(2); // v1
        b.push(0); // u2
        b.push(0); // v2
        b.extend_from_slice(&clut_id.to_le_bytes());
        b.push(0); // u3
        b.push(0); // v3
        b.extend_from_slice(&texture_id.to_le_bytes());
        b
    }

    #[test]
    fn single_triangle_group_scale_eight() {
        let mut bytes = Vec::new();
        push_group_header(&mut bytes, false); // bit clear -> scale 8
        bytes.extend_from_slice(&1u32.to_le_bytes()); // triangle_count
        bytes.extend_from_slice(&0u32.to_le_bytes()); // quad_count
        bytes.extend_from_slice(&triangle_bytes(0, 0));

        let mut r = ByteReader::new(&bytes);
        let mut group = MpdGroup::read_header(&mut r).unwrap();
        assert_eq!(group.scale, 8);
        group.read_data(&mut r).unwrap();

        let meshes = group.build(None);
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.indices, vec![2, 1, 0]);
        assert_eq!(&mesh.positions[0..3], &[100.0, 200.0, 300.0]);
        assert_eq!(&mesh.positions[3..6], &[108.0, 200.0, 300.0]);
        assert_eq!(&mesh.positions[6..9], &[100.0, 208.0, 300.0]);
    }

    #[test]
    fn group_headers_are_all_read_before_any_group_data() {
        // Two groups: both 64-byte headers back to back, then both
        // triangle-count/quad-count/face blocks back to back. Reading
        // group 0's data before group 1's header would desync the cursor.
        let mut bytes = Vec::new();
        push_group_header(&mut bytes, false);
        push_group_header(&mut bytes, true);

        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&triangle_bytes(1, 0));

        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&triangle_bytes(2, 0));

        let mut r = ByteReader::new(&bytes);
        let mut groups = vec![MpdGroup::read_header(&mut r).unwrap(), MpdGroup::read_header(&mut r).unwrap()];
        assert_eq!(groups[0].scale, 8);
        assert_eq!(groups[1].scale, 1);

        for group in &mut groups {
            group.read_data(&mut r).unwrap();
        }

        let meshes0 = groups[0].build(None);
        let meshes1 = groups[1].build(None);
        assert_eq!(meshes0[0].texture_id, 1);
        assert_eq!(meshes1[0].texture_id, 2);
    }
}
