use bitflags::bitflags;

/// Antialiasing mode for bitmap glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Antialiasing {
    /// Hard edges, one bit of coverage stored in an 8-bit mask.
    None,
    #[default]
    Gray,
    /// Per-channel coverage for LCD panels, stored as RGBA.
    Lcd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hinting {
    None,
    #[default]
    Light,
    Normal,
}

/// Horizontal subpixel positioning of glyph bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubpixelPositioning {
    Disabled,
    /// Quarter pixel steps up to 16px, half steps up to 20px, disabled above.
    #[default]
    Auto,
    OneHalf,
    OneQuarter,
}

const QUARTER_STEP_MAX_SIZE: u32 = 16;
const HALF_STEP_MAX_SIZE: u32 = 20;

impl SubpixelPositioning {
    /// Number of horizontal positions per pixel at `size`.
    pub fn steps(self, size: u32) -> u32 {
        match self {
            SubpixelPositioning::Disabled => 1,
            SubpixelPositioning::OneHalf => 2,
            SubpixelPositioning::OneQuarter => 4,
            SubpixelPositioning::Auto if size <= QUARTER_STEP_MAX_SIZE => 4,
            SubpixelPositioning::Auto if size <= HALF_STEP_MAX_SIZE => 2,
            SubpixelPositioning::Auto => 1,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const FIXED_WIDTH = 1 << 2;
    }
}

/// Bits of a glyph key above the codepoint that hold the subpixel bucket.
pub const SUBPIXEL_SHIFT: u32 = 27;
pub const GLYPH_INDEX_MASK: u32 = (1 << SUBPIXEL_SHIFT) - 1;

/// Cache key for `glyph` drawn at horizontal bucket `bucket`.
pub fn glyph_key(glyph: u32, bucket: u32) -> u32 {
    (glyph & GLYPH_INDEX_MASK) | (bucket << SUBPIXEL_SHIFT)
}

pub fn split_glyph_key(key: u32) -> (u32, u32) {
    (key & GLYPH_INDEX_MASK, key >> SUBPIXEL_SHIFT)
}

/// Bucket for the fractional part of `x` with `steps` positions per pixel.
pub fn subpixel_bucket(x: f32, steps: u32) -> u32 {
    if steps <= 1 {
        return 0;
    }
    let fract = x - x.floor();
    ((fract * steps as f32).floor() as u32).min(steps - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_subpixel_steps() {
        let auto = SubpixelPositioning::Auto;
        assert_eq!(auto.steps(12), 4);
        assert_eq!(auto.steps(16), 4);
        assert_eq!(auto.steps(18), 2);
        assert_eq!(auto.steps(24), 1);
        assert_eq!(SubpixelPositioning::OneHalf.steps(64), 2);
    }

    #[test]
    fn test_glyph_key_round_trip() {
        let key = glyph_key('A' as u32, 3);
        assert_eq!(split_glyph_key(key), ('A' as u32, 3));
        assert_eq!(glyph_key(0x10FFFF, 0), 0x10FFFF);
    }

    #[test]
    fn test_subpixel_bucket() {
        assert_eq!(subpixel_bucket(10.0, 4), 0);
        assert_eq!(subpixel_bucket(10.3, 4), 1);
        assert_eq!(subpixel_bucket(10.99, 4), 3);
        assert_eq!(subpixel_bucket(-0.5, 2), 1);
        assert_eq!(subpixel_bucket(3.7, 1), 0);
    }
}
