/// An 8-bit RGBA color, as stored on render entities.
///
/// ```
/// use strata_batcher::Color32;
///
/// let c = Color32::from_hex(0xFF8800);
/// assert_eq!(c.normalized_rgb(), [1.0, 136.0 / 255.0, 0.0]);
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Color32 = Color32::rgb(255, 255, 255);
    pub const BLACK: Color32 = Color32::rgb(0, 0, 0);
    pub const TRANSPARENT: Color32 = Color32::rgba(0, 0, 0, 0);

    /// Create a color with full opacity.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from a 24-bit RGB hex value (e.g. `0xFF8800`).
    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// The r, g, b channels mapped from `0..=255` to `0.0..=1.0`.
    pub fn normalized_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    /// The alpha channel mapped to `0.0..=1.0`.
    pub fn alpha_f32(self) -> f32 {
        self.a as f32 / 255.0
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[u8; 4]> for Color32 {
    fn from(arr: [u8; 4]) -> Self {
        Self::rgba(arr[0], arr[1], arr[2], arr[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_endpoints() {
        let white = Color32::WHITE.normalized_rgb();
        let black = Color32::BLACK.normalized_rgb();
        for channel in 0..3 {
            assert!((white[channel] - 1.0).abs() < f32::EPSILON);
            assert!(black[channel].abs() < f32::EPSILON);
        }
        assert!((Color32::WHITE.alpha_f32() - 1.0).abs() < f32::EPSILON);
        assert!(Color32::TRANSPARENT.alpha_f32().abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_array() {
        assert_eq!(Color32::from([1, 2, 3, 4]), Color32::rgba(1, 2, 3, 4));
    }

    #[test]
    fn test_pod_layout() {
        assert_eq!(std::mem::size_of::<Color32>(), 4);
        let color = Color32::rgba(1, 2, 3, 4);
        let bytes: &[u8] = bytemuck::bytes_of(&color);
        assert_eq!(bytes, &[1, 2, 3, 4]);
    }
}
