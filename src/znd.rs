//! Level texture/resource bank (ZND), C5. Owns the shared VRAM
//! framebuffer its TIMs are blitted into and a lazily-populated
//! `(textureId, clutId) -> texture` cache; every `LevelScene` built
//! against this bank shares both read-only after `ZndBank::read`
//! completes ingest.

use std::collections::HashMap;
use std::rc::Rc;

use crate::color::RgbaRaster;
use crate::error::Result;
use crate::framebuffer::FrameBuffer;
use crate::reader::ByteReader;
use crate::tim::Tim;

pub struct ZndBank<'a> {
    /// (LBA, size) pairs for the MPDs sharing this bank. Left as opaque
    /// passthrough data: resolving an LBA to an MPD file is a disc-image
    /// concern outside this crate.
    pub mpd_table: Vec<(u32, u32)>,
    pub wave: u8,
    pub tims: Vec<Tim<'a>>,
    pub framebuffer: FrameBuffer,
    materials: HashMap<(i32, u16), Rc<RgbaRaster>>,
}

impl<'a> ZndBank<'a> {
    pub fn read(bytes: &'a [u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        let mpd_ptr = r.u32()?;
        let mpd_len = r.u32()?;
        let _ = mpd_ptr;
        let mpd_num = (mpd_len / 8) as usize;

        let _enemy_ptr = r.u32()?;
        let enemy_len = r.u32()?;

        let _tim_ptr = r.u32()?;
        let _tim_len = r.u32()?;

        let wave = r.u8()?;
        r.skip(7)?;

        let mut mpd_table = Vec::with_capacity(mpd_num);
        for _ in 0..mpd_num {
            let lba = r.u32()?;
            let size = r.u32()?;
            mpd_table.push((lba, size));
        }

        r.skip(enemy_len as usize)?;

        let _tim_len2 = r.u32()?;
        r.skip(12)?;
        let tim_num = r.u32()?;

        let mut framebuffer = FrameBuffer::new();
        let mut tims = Vec::with_capacity(tim_num as usize);

        for _ in 0..tim_num {
            let _tim_length_unused = r.u32()?;
            let tim = Tim::read(&mut r)?;

            // Small TIMs sometimes double as CLUT sources; they are
            // blitted twice to guarantee the CLUT bytes are present
            // before any MPD resolves a material against this bank.
            if tim.height < 5 {
                tim.copy_to_framebuffer(&mut framebuffer)?;
            }
            tim.copy_to_framebuffer(&mut framebuffer)?;

            tims.push(tim);
        }

        Ok(ZndBank { mpd_table, wave, tims, framebuffer, materials: HashMap::new() })
    }

    fn get_tim(&self, texture_id: i32) -> Option<&Tim<'a>> {
        let x = ((texture_id as i64) * 64).rem_euclid(1024) as u16;
        self.tims.iter().find(|tim| tim.fx == x)
    }

    /// Resolves `(textureId, clutId)` to a built RGBA texture, caching
    /// by key so repeated lookups return the same `Rc` allocation (P9).
    /// Returns `None` — not an error — if no TIM matches the texture
    /// coordinate or no TIM contains the CLUT coordinate; the caller
    /// treats the sub-mesh as untextured.
    pub fn get_materials(&mut self, texture_id: i32, clut_id: u16) -> Option<Rc<RgbaRaster>> {
        let key = (texture_id, clut_id);
        if let Some(cached) = self.materials.get(&key) {
            return Some(Rc::clone(cached));
        }

        let texture_tim = self.get_tim(texture_id)?;

        self.framebuffer.mark_clut(clut_id);

        let scaled = clut_id as u32 * 16;
        let x = (scaled % 1024) as u16;
        let y = (scaled / 1024) as u16;

        let clut_source = self.tims.iter().find(|tim| {
            tim.fx <= x && x < tim.fx + tim.width && tim.fy <= y && y < tim.fy + tim.height
        })?;
        let clut = clut_source.build_clut(x, y).ok()?;

        let texture = texture_tim.build(&clut).ok()?;
        let texture = Rc::new(texture);
        self.materials.insert(key, Rc::clone(&texture));
        Some(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_znd() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0u32.to_le_bytes()); // mpd ptr
        b.extend_from_slice(&0u32.to_le_bytes()); // mpd len -> 0 entries
        b.extend_from_slice(&0u32.to_le_bytes()); // enemy ptr
        b.extend_from_slice(&0u32.to_le_bytes()); // enemy len
        b.extend_from_slice(&0u32.to_le_bytes()); // tim ptr
        b.extend_from_slice(&0u32.to_le_bytes()); // tim len
        b.push(0); // wave
        b.extend_from_slice(&[0u8; 7]); // padding
        b.extend_from_slice(&0u32.to_le_bytes()); // tim section length (unused)
        b.extend_from_slice(&[0u8; 12]); // unknown
        b.extend_from_slice(&0u32.to_le_bytes()); // tim count
        b
    }

    #[test]
    fn empty_bank_has_no_tims() {
        let bytes = minimal_znd();
        let bank = ZndBank::read(&bytes).unwrap();
        assert!(bank.tims.is_empty());
        assert!(bank.mpd_table.is_empty());
    }

    #[test]
    fn unresolved_material_is_none_not_error() {
        let bytes = minimal_znd();
        let mut bank = ZndBank::read(&bytes).unwrap();
        assert!(bank.get_materials(0, 0).is_none());
    }
}
