//! Keyframed skeletal animations (SEQ), C8. A SEQ file is a slot table
//! pointing at a pool of animation records; each record carries a
//! translation track, an optional action-trigger track, and a
//! per-bone rotation/scale track encoded with a bit-cascaded delta
//! scheme that reuses the previous delta whenever a keyframe omits an
//! axis.

use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::error::{DecodeError, Result};
use crate::reader::ByteReader;

const ROT13_TO_RAD: f32 = std::f32::consts::PI / 4096.0;

bitflags! {
    /// What a bone's scale track carries: a non-default static base, an
    /// animated delta curve, or both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ScaleFlags: u8 {
        const BASE = 0x1;
        const KEYS = 0x2;
    }
}

/// `(opcode, name, param_count)`. Frame-triggered side effects (sound
/// cues, hit flags, camera nudges) a player of the animation is meant
/// to act on; this crate only decodes the trigger list, it doesn't run
/// any of these effects itself.
const ACTIONS: &[(u8, &str, u8)] = &[
    (0x01, "loop", 0),
    (0x02, "0x02", 0),
    (0x04, "0x04", 1),
    (0x0A, "0x0a", 1),
    (0x0B, "0x0b", 0),
    (0x0C, "0x0c", 1),
    (0x0D, "0x0d", 0),
    (0x0F, "0x0f", 1),
    (0x13, "unlock_bone", 1),
    (0x14, "0x14", 1),
    (0x15, "0x15", 1),
    (0x16, "0x16", 2),
    (0x17, "0x17", 0),
    (0x18, "0x18", 0),
    (0x19, "0x19", 0),
    (0x1A, "0x1a", 1),
    (0x1B, "0x1b", 1),
    (0x1C, "0x1c", 1),
    (0x1D, "paralyze", 0),
    (0x24, "0x24", 2),
    (0x27, "0x27", 4),
    (0x34, "0x34", 3),
    (0x35, "0x35", 5),
    (0x36, "0x36", 3),
    (0x37, "0x37", 1),
    (0x38, "0x38", 1),
    (0x39, "0x39", 1),
    (0x3A, "disappear", 0),
    (0x3B, "land", 0),
    (0x3C, "adjust_shadow", 1),
    (0x3F, "0x3f", 0),
    (0x40, "0x40", 0),
];

fn action_by_opcode(opcode: u8) -> Option<&'static (u8, &'static str, u8)> {
    ACTIONS.iter().find(|(op, _, _)| *op == opcode)
}

#[derive(Debug, Clone, Copy)]
pub struct SeqAction {
    pub frame: u8,
    pub opcode: u8,
    pub name: &'static str,
}

/// One decoded delta record. `None` on an axis means "reuse whatever
/// delta was last in effect for that axis", not "zero".
#[derive(Debug, Clone, Copy, Default)]
struct RawKey {
    f: u16,
    dx: Option<i32>,
    dy: Option<i32>,
    dz: Option<i32>,
}

/// The first axis claimed by `h`'s low bits takes its delta packed into
/// `h` itself: a 13-bit signed value occupying the bits above the 3
/// cascade-selector bits, so `h >> 3` (arithmetic shift on a signed
/// `i16`) both drops the selector bits and sign-extends in one step.
fn axis_from_h(h: i16) -> i32 {
    (h >> 3) as i32
}

/// Reads one delta record. Returns `None` at the stream's own end
/// marker (an empty reader), which is the `read_keys` loop's secondary
/// stop condition alongside reaching the track's declared length.
fn read_key(r: &mut ByteReader) -> Result<Option<RawKey>> {
    if r.remaining() == 0 {
        return Ok(None);
    }
    let code = r.u8()?;

    if code & 0xE0 != 0 {
        let mut f = (code & 0x1F) as u16;
        f = if f == 0x1F { 0x20 + r.u8()? as u16 } else { 1 + f };
        return Ok(Some(RawKey { f, dx: None, dy: None, dz: None }));
    }

    let mut f = (code & 0x03) as u16;
    f = if f == 0x03 { 4 + r.u8()? as u16 } else { 1 + f };
    let mut shifted: u32 = (code as u32) << 3;

    let h = r.s16_big_endian()?;
    let mut dx = None;
    let mut dy = None;
    let mut dz = None;

    if h & 4 != 0 {
        dx = Some(axis_from_h(h));
        shifted &= 0x60;
        if h & 2 != 0 {
            dy = Some(r.s16_big_endian()? as i32);
            shifted &= 0xA0;
        }
        if h & 1 != 0 {
            dz = Some(r.s16_big_endian()? as i32);
            shifted &= 0xC0;
        }
    } else if h & 2 != 0 {
        dy = Some(axis_from_h(h));
        shifted &= 0xA0;
        if h & 1 != 0 {
            dz = Some(r.s16_big_endian()? as i32);
            shifted &= 0xC0;
        }
    } else if h & 1 != 0 {
        dz = Some(axis_from_h(h));
    }

    if shifted & 0x80 != 0 {
        dx = Some(r.s8()? as i32);
    }
    if shifted & 0x40 != 0 {
        dy = Some(r.s8()? as i32);
    }
    if shifted & 0x20 != 0 {
        dz = Some(r.s8()? as i32);
    }

    Ok(Some(RawKey { f, dx, dy, dz }))
}

/// Reads delta records until the track's accumulated frame count
/// reaches `length - 1` or the stream signals end-of-records. The
/// track always starts with a synthetic all-zero key at frame 0 — the
/// base value a track's first real delta applies against.
fn read_keys(r: &mut ByteReader, length: u16) -> Result<Vec<RawKey>> {
    let mut keys = vec![RawKey { f: 0, dx: Some(0), dy: Some(0), dz: Some(0) }];
    let mut f_accum: i32 = 0;

    loop {
        if f_accum >= length as i32 - 1 {
            break;
        }
        match read_key(r)? {
            None => break,
            Some(k) => {
                f_accum += k.f as i32;
                keys.push(k);
            }
        }
    }

    Ok(keys)
}

fn read_xyz(r: &mut ByteReader) -> Result<(i32, i32, i32)> {
    Ok((r.s16_big_endian()? as i32, r.s16_big_endian()? as i32, r.s16_big_endian()? as i32))
}

fn read_actions(r: &mut ByteReader, length: u16) -> Result<Vec<SeqAction>> {
    let mut actions = Vec::new();
    loop {
        let frame = r.u8()?;
        if frame == 0xFF {
            break;
        }
        if frame as u16 > length {
            return Err(DecodeError::InvalidActionFrame { frame, length });
        }

        let opcode = r.u8()?;
        if opcode == 0 {
            break;
        }

        let Some(&(_, name, param_count)) = action_by_opcode(opcode) else {
            return Err(DecodeError::UnknownAction { opcode, frame });
        };
        for _ in 0..param_count {
            r.u8()?;
        }

        actions.push(SeqAction { frame, opcode, name });
    }
    Ok(actions)
}

/// Runs a track's running-delta accumulation: each key's effective
/// delta is its own value if present, or whatever delta was last in
/// effect for that axis otherwise; `prev` is always updated to the
/// *effective* delta, not just a freshly-supplied one. `scale_div`
/// divides deltas before they're added (used by the scale track only).
fn accumulate(keys: &[RawKey], base: (f32, f32, f32), scale_div: Option<f32>) -> Vec<(u16, Vec3)> {
    let mut value = base;
    let mut prev = (0.0f32, 0.0f32, 0.0f32);
    let mut frame_accum: u16 = 0;
    let mut out = Vec::with_capacity(keys.len());
    out.push((0, Vec3::new(value.0, value.1, value.2)));

    for k in &keys[1..] {
        frame_accum += k.f;
        let dx = k.dx.map(|d| d as f32).unwrap_or(prev.0);
        let dy = k.dy.map(|d| d as f32).unwrap_or(prev.1);
        let dz = k.dz.map(|d| d as f32).unwrap_or(prev.2);
        prev = (dx, dy, dz);

        let (sx, sy, sz) = match scale_div {
            Some(div) => (dx / div, dy / div, dz / div),
            None => (dx, dy, dz),
        };
        value = (value.0 + sx, value.1 + sy, value.2 + sz);
        out.push((frame_accum, Vec3::new(value.0, value.1, value.2)));
    }

    out
}

fn rot2quat(rx: f32, ry: f32, rz: f32) -> Quat {
    let qx = Quat::from_rotation_x(rx);
    let qy = Quat::from_rotation_y(ry);
    let qz = Quat::from_rotation_z(rz);
    (qz * (qy * qx)).normalize()
}

/// One bone's decoded animation data: a rotation curve (always
/// present) and an optional scale curve, each a sparse list of
/// `(frame, value)` samples to be held constant between entries.
#[derive(Debug, Clone, Default)]
pub struct BoneTrack {
    pub rotation: Vec<(u16, Quat)>,
    pub scale: Option<Vec<(u16, Vec3)>>,
}

/// One decoded SEQ animation.
#[derive(Debug, Clone)]
pub struct SeqAnimation {
    pub length: u16,
    pub base_animation_id: i8,
    pub actions: Vec<SeqAction>,
    /// Root translation per frame. The original tooling never builds
    /// this track (its own comments call it out as intentionally
    /// skipped, "root motion" left for a renderer to add); this crate
    /// builds it because `sample_pose` needs a translation answer for
    /// every bone, root included.
    pub translation: Vec<(u16, Vec3)>,
    pub bones: Vec<BoneTrack>,
}

impl SeqAnimation {
    /// Looks up the sampled value held at `frame` — the entry at or
    /// before `frame`, since a track only records changes.
    fn sample<T: Copy>(track: &[(u16, T)], frame: u16) -> T {
        track.iter().rev().find(|(f, _)| *f <= frame).map(|(_, v)| *v).unwrap_or(track[0].1)
    }

    /// Evaluates every bone's rotation/scale plus the root translation
    /// at `frame`, returning `(translation, [(rotation, scale); bones])`.
    pub fn sample_pose(&self, frame: u16) -> (Vec3, Vec<(Quat, Vec3)>) {
        let translation = Self::sample(&self.translation, frame);
        let bones = self
            .bones
            .iter()
            .map(|b| {
                let rotation = Self::sample(&b.rotation, frame);
                let scale = b.scale.as_deref().map(|s| Self::sample(s, frame)).unwrap_or(Vec3::ONE);
                (rotation, scale)
            })
            .collect();
        (translation, bones)
    }
}

struct AnimationHeader {
    length: u16,
    base_animation_id: i8,
    scale_flags: ScaleFlags,
    ptr_actions: u16,
    ptr_translation: u16,
    ptr_bone_rotation: Vec<u16>,
    ptr_bone_scale: Vec<u16>,
    base_pos: usize,
}

impl AnimationHeader {
    fn read(r: &mut ByteReader, num_bones: u32) -> Result<Self> {
        let base_pos = r.pos();
        let length = r.u16()?;
        let base_animation_id = r.s8()?;
        let scale_flags = ScaleFlags::from_bits_truncate(r.u8()?);
        let ptr_actions = r.u16()?;
        let ptr_translation = r.u16()?;
        r.skip(2)?; // padding

        let mut ptr_bone_rotation = Vec::with_capacity(num_bones as usize);
        for _ in 0..num_bones {
            ptr_bone_rotation.push(r.u16()?);
        }
        let mut ptr_bone_scale = Vec::with_capacity(num_bones as usize);
        for _ in 0..num_bones {
            ptr_bone_scale.push(r.u16()?);
        }

        Ok(AnimationHeader {
            length,
            base_animation_id,
            scale_flags,
            ptr_actions,
            ptr_translation,
            ptr_bone_rotation,
            ptr_bone_scale,
            base_pos,
        })
    }
}

fn read_animation_data(r: &mut ByteReader, header: &AnimationHeader) -> Result<SeqAnimation> {
    r.seek(header.base_pos + header.ptr_translation as usize)?;
    let (tx, ty, tz) = read_xyz(r)?;
    let translation_keys = read_keys(r, header.length)?;
    let translation = accumulate(&translation_keys, (tx as f32, ty as f32, tz as f32), None);

    let actions = if header.ptr_actions != 0 {
        r.seek(header.base_pos + header.ptr_actions as usize)?;
        read_actions(r, header.length)?
    } else {
        Vec::new()
    };

    let mut bones = Vec::with_capacity(header.ptr_bone_rotation.len());
    for i in 0..header.ptr_bone_rotation.len() {
        r.seek(header.base_pos + header.ptr_bone_rotation[i] as usize)?;
        let base = if header.base_animation_id == -1 {
            let (rx, ry, rz) = read_xyz(r)?;
            // PS1 base-doubling quirk: the static base angle is stored
            // at half scale relative to the delta units that follow it.
            (rx as f32 * 2.0, ry as f32 * 2.0, rz as f32 * 2.0)
        } else {
            (0.0, 0.0, 0.0)
        };
        let keys = read_keys(r, header.length)?;
        let raw = accumulate(&keys, base, None);
        let rotation = raw
            .into_iter()
            .map(|(f, v)| (f, rot2quat(v.x * ROT13_TO_RAD, v.y * ROT13_TO_RAD, v.z * ROT13_TO_RAD)))
            .collect();

        let scale = if header.scale_flags.intersects(ScaleFlags::BASE | ScaleFlags::KEYS) {
            r.seek(header.base_pos + header.ptr_bone_scale[i] as usize)?;
            let base = if header.scale_flags.contains(ScaleFlags::BASE) {
                let (sx, sy, sz) = read_xyz(r)?;
                (sx as f32, sy as f32, sz as f32)
            } else {
                (64.0, 64.0, 64.0) // raw units; /64 below yields scale 1.0
            };
            let keys = if header.scale_flags.contains(ScaleFlags::KEYS) {
                read_keys(r, header.length)?
            } else {
                vec![RawKey { f: 0, dx: Some(0), dy: Some(0), dz: Some(0) }]
            };
            Some(accumulate(&keys, (base.0 / 64.0, base.1 / 64.0, base.2 / 64.0), Some(64.0)))
        } else {
            None
        };

        bones.push(BoneTrack { rotation, scale });
    }

    Ok(SeqAnimation {
        length: header.length,
        base_animation_id: header.base_animation_id,
        actions,
        translation,
        bones,
    })
}

/// A decoded SEQ file: every animation record plus the slot table that
/// names which ones are externally addressable. `slot_table[slot]` is
/// an animation index, or `255` for "unused slot".
pub struct SeqBank {
    pub animations: Vec<SeqAnimation>,
    pub slot_table: Vec<u8>,
}

impl SeqBank {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        log::trace!("decoding SEQ ({} bytes)", bytes.len());

        let num_slots = r.u16()?;
        let num_bones = r.u8()?;
        r.skip(1)?; // padding
        let _size = r.u32()?;
        let _data_offset = r.u32()? + 8;
        let slot_offset = r.u32()? + 8;
        let header_offset = slot_offset + num_slots as u32;

        let bytes_per_animation_header = num_bones as u32 * 4 + 10;
        let num_animations = (header_offset.saturating_sub(num_slots as u32).saturating_sub(16))
            / bytes_per_animation_header.max(1);

        r.seek(header_offset as usize)?;
        let mut headers = Vec::with_capacity(num_animations as usize);
        for _ in 0..num_animations {
            headers.push(AnimationHeader::read(&mut r, num_bones as u32)?);
        }

        r.seek(slot_offset as usize)?;
        let mut slot_table = Vec::with_capacity(num_slots as usize);
        for _ in 0..num_slots {
            let slot = r.u8()?;
            if slot as usize >= num_animations as usize && slot != 255 {
                return Err(DecodeError::InvalidSlot { slot, animation_count: num_animations as usize });
            }
            slot_table.push(slot);
        }

        let mut animations = Vec::with_capacity(headers.len());
        for header in &headers {
            animations.push(read_animation_data(&mut r, header)?);
        }

        Ok(SeqBank { animations, slot_table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_run_code_carries_no_axis_deltas() {
        let bytes = [0xE0u8];
        let mut r = ByteReader::new(&bytes);
        let key = read_key(&mut r).unwrap().unwrap();
        // f = code & 0x1F = 0, which isn't the 0x1F escape value, so f = 1 + 0.
        assert_eq!(key.f, 1);
        assert!(key.dx.is_none() && key.dy.is_none() && key.dz.is_none());
    }

    #[test]
    fn long_run_escape_value_reads_an_extra_length_byte() {
        let bytes = [0xFFu8, 0x05];
        let mut r = ByteReader::new(&bytes);
        let key = read_key(&mut r).unwrap().unwrap();
        // f = code & 0x1F = 0x1F, the escape value, so f = 0x20 + the next byte.
        assert_eq!(key.f, 0x25);
        assert!(key.dx.is_none() && key.dy.is_none() && key.dz.is_none());
    }

    #[test]
    fn short_run_with_fallback_s8_reads_three_axes() {
        // code = 0b0001_1101: low 2 bits = 1, so f = 1 + 1 = 2; bits 2/3/4
        // each set a fallback flag that lands on 0x20/0x40/0x80 after <<3.
        let code = 0x1Du8;
        let mut bytes = vec![code];
        bytes.extend_from_slice(&0i16.to_be_bytes()); // h = 0, no axis taken from h
        bytes.push(5i8 as u8); // dx fallback
        bytes.push((-3i8) as u8); // dy fallback
        bytes.push(7i8 as u8); // dz fallback

        let mut r = ByteReader::new(&bytes);
        let key = read_key(&mut r).unwrap().unwrap();
        assert_eq!(key.f, 2);
        assert_eq!(key.dx, Some(5));
        assert_eq!(key.dy, Some(-3));
        assert_eq!(key.dz, Some(7));
    }

    #[test]
    fn h_cascade_takes_packed_delta_for_first_claimed_axis() {
        // h = 0x0001 (only bit 0 set) -> z is claimed directly from h,
        // not read as a fresh s16: z = h >> 3 = 0.
        let code = 0x00u8; // f = 1, no fallback bits set after the h-cascade
        let mut bytes = vec![code];
        bytes.extend_from_slice(&1i16.to_be_bytes());
        let mut r = ByteReader::new(&bytes);
        let key = read_key(&mut r).unwrap().unwrap();
        assert_eq!(key.dz, Some(0));
        assert!(key.dx.is_none() && key.dy.is_none());

        // h = 12 (0b1100, bit 0x4 set, selects x) -> x = h >> 3 = 1.
        let mut bytes2 = vec![code];
        bytes2.extend_from_slice(&12i16.to_be_bytes());
        let mut r2 = ByteReader::new(&bytes2);
        let key2 = read_key(&mut r2).unwrap().unwrap();
        assert_eq!(key2.dx, Some(1));
    }

    #[test]
    fn accumulate_reuses_previous_delta_when_axis_omitted() {
        let keys = vec![
            RawKey { f: 0, dx: Some(0), dy: Some(0), dz: Some(0) },
            RawKey { f: 1, dx: Some(10), dy: None, dz: None },
            RawKey { f: 1, dx: None, dy: None, dz: None },
        ];
        let out = accumulate(&keys, (0.0, 0.0, 0.0), None);
        assert_eq!(out[1].1, Vec3::new(10.0, 0.0, 0.0));
        // second key reuses dx=10 again since it supplied nothing
        assert_eq!(out[2].1, Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn invalid_slot_value_is_rejected() {
        // num_slots=1, num_bones=0 -> num_animations works out to 0;
        // a slot value of 5 (not the 255 "unused" sentinel) is then
        // out of range and must be rejected rather than silently kept.
        #[rustfmt::skip]
        let bytes: [u8; 16] = [
            1, 0,       // num_slots
            0,          // num_bones
            0,          // padding
            0, 0, 0, 0, // size
            5, 0, 0, 0, // data_offset field (byte 8 doubles as the slot byte)
            0, 0, 0, 0, // slot_offset field
        ];
        match SeqBank::read(&bytes) {
            Err(DecodeError::InvalidSlot { slot, animation_count }) => {
                assert_eq!(slot, 5);
                assert_eq!(animation_count, 0);
            }
            Ok(_) => panic!("expected InvalidSlot, got Ok"),
            Err(e) => panic!("expected InvalidSlot, got {e:?}"),
        }
    }
}
