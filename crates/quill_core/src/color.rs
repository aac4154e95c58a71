//! Color types and blend math
//!
//! Colors are straight (non-premultiplied) RGBA in the 0.0..=1.0 range. The
//! blend functions operate on premultiplied values; convert with
//! [`Color::premultiply`] / [`Color::unpremultiply`] at the edges.

/// RGBA color with f32 components (0.0 to 1.0)
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create from u8 components (0-255)
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create from a packed 0xAARRGGBB value
    pub fn from_argb(argb: u32) -> Self {
        Self::from_rgba8(
            ((argb >> 16) & 0xFF) as u8,
            ((argb >> 8) & 0xFF) as u8,
            (argb & 0xFF) as u8,
            ((argb >> 24) & 0xFF) as u8,
        )
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Convert to u8 array [r, g, b, a]
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn premultiply(&self) -> Color {
        Color::rgba(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }

    pub fn unpremultiply(&self) -> Color {
        if self.a <= 0.0 {
            return Color::TRANSPARENT;
        }
        Color::rgba(self.r / self.a, self.g / self.a, self.b / self.a, self.a)
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn lerp(&self, other: Color, t: f32) -> Color {
        Color::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    pub fn clamped(&self) -> Color {
        Color::rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Invert the color channels, keeping alpha.
    pub fn inverted(&self) -> Color {
        Color::rgba(1.0 - self.r, 1.0 - self.g, 1.0 - self.b, self.a)
    }

    /// Apply a 4x5 row-major color matrix to a straight color.
    pub fn apply_color_matrix(&self, m: &[f32; 20]) -> Color {
        let [r, g, b, a] = self.to_array();
        Color::rgba(
            m[0] * r + m[1] * g + m[2] * b + m[3] * a + m[4],
            m[5] * r + m[6] * g + m[7] * b + m[8] * a + m[9],
            m[10] * r + m[11] * g + m[12] * b + m[13] * a + m[14],
            m[15] * r + m[16] * g + m[17] * b + m[18] * a + m[19],
        )
        .clamped()
    }

    /// Blend this premultiplied source color over a premultiplied destination.
    pub fn blend(&self, dst: Color, mode: BlendMode) -> Color {
        mode.apply(*self, dst)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blend Modes
// ─────────────────────────────────────────────────────────────────────────────

/// Blend mode for draws and layer composition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    // Porter-Duff
    Clear,
    Source,
    Destination,
    #[default]
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceATop,
    DestinationATop,
    Xor,
    Plus,
    Modulate,
    // Separable advanced modes
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
}

impl BlendMode {
    /// Whether the mode can be expressed by fixed-function blending.
    pub fn is_porter_duff(&self) -> bool {
        matches!(
            self,
            BlendMode::Clear
                | BlendMode::Source
                | BlendMode::Destination
                | BlendMode::SourceOver
                | BlendMode::DestinationOver
                | BlendMode::SourceIn
                | BlendMode::DestinationIn
                | BlendMode::SourceOut
                | BlendMode::DestinationOut
                | BlendMode::SourceATop
                | BlendMode::DestinationATop
                | BlendMode::Xor
                | BlendMode::Plus
                | BlendMode::Modulate
        )
    }

    /// Whether drawing fully transparent source content can change the destination.
    pub fn affects_transparent_source(&self) -> bool {
        matches!(
            self,
            BlendMode::Clear
                | BlendMode::Source
                | BlendMode::SourceIn
                | BlendMode::DestinationIn
                | BlendMode::SourceOut
                | BlendMode::DestinationATop
                | BlendMode::Modulate
        )
    }

    /// Blend premultiplied `src` onto premultiplied `dst`.
    pub fn apply(&self, src: Color, dst: Color) -> Color {
        let (sa, da) = (src.a, dst.a);
        let pd = |fs: f32, fd: f32| {
            Color::rgba(
                src.r * fs + dst.r * fd,
                src.g * fs + dst.g * fd,
                src.b * fs + dst.b * fd,
                sa * fs + da * fd,
            )
        };
        let out = match self {
            BlendMode::Clear => Color::TRANSPARENT,
            BlendMode::Source => src,
            BlendMode::Destination => dst,
            BlendMode::SourceOver => pd(1.0, 1.0 - sa),
            BlendMode::DestinationOver => pd(1.0 - da, 1.0),
            BlendMode::SourceIn => pd(da, 0.0),
            BlendMode::DestinationIn => pd(0.0, sa),
            BlendMode::SourceOut => pd(1.0 - da, 0.0),
            BlendMode::DestinationOut => pd(0.0, 1.0 - sa),
            BlendMode::SourceATop => pd(da, 1.0 - sa),
            BlendMode::DestinationATop => pd(1.0 - da, sa),
            BlendMode::Xor => pd(1.0 - da, 1.0 - sa),
            BlendMode::Plus => pd(1.0, 1.0),
            BlendMode::Modulate => Color::rgba(
                src.r * dst.r,
                src.g * dst.g,
                src.b * dst.b,
                sa * da,
            ),
            advanced => {
                let s = src.unpremultiply();
                let d = dst.unpremultiply();
                let f = |cs: f32, cd: f32| advanced_channel(*advanced, cs, cd);
                let both = sa * da;
                Color::rgba(
                    src.r * (1.0 - da) + dst.r * (1.0 - sa) + both * f(s.r, d.r),
                    src.g * (1.0 - da) + dst.g * (1.0 - sa) + both * f(s.g, d.g),
                    src.b * (1.0 - da) + dst.b * (1.0 - sa) + both * f(s.b, d.b),
                    sa + da - both,
                )
            }
        };
        out.clamped()
    }
}

fn advanced_channel(mode: BlendMode, cs: f32, cd: f32) -> f32 {
    match mode {
        BlendMode::Multiply => cs * cd,
        BlendMode::Screen => cs + cd - cs * cd,
        BlendMode::Overlay => hard_light(cd, cs),
        BlendMode::Darken => cs.min(cd),
        BlendMode::Lighten => cs.max(cd),
        BlendMode::ColorDodge => {
            if cd <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cd / (1.0 - cs)).min(1.0)
            }
        }
        BlendMode::ColorBurn => {
            if cd >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cd) / cs).min(1.0)
            }
        }
        BlendMode::HardLight => hard_light(cs, cd),
        BlendMode::SoftLight => {
            if cs <= 0.5 {
                cd - (1.0 - 2.0 * cs) * cd * (1.0 - cd)
            } else {
                let dd = if cd <= 0.25 {
                    ((16.0 * cd - 12.0) * cd + 4.0) * cd
                } else {
                    cd.sqrt()
                };
                cd + (2.0 * cs - 1.0) * (dd - cd)
            }
        }
        BlendMode::Difference => (cs - cd).abs(),
        BlendMode::Exclusion => cs + cd - 2.0 * cs * cd,
        _ => cs,
    }
}

fn hard_light(cs: f32, cd: f32) -> f32 {
    if cs <= 0.5 {
        cd * 2.0 * cs
    } else {
        let s = 2.0 * cs - 1.0;
        cd + s - cd * s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < 1e-5
            && (a.g - b.g).abs() < 1e-5
            && (a.b - b.b).abs() < 1e-5
            && (a.a - b.a).abs() < 1e-5
    }

    #[test]
    fn test_source_over_opaque_replaces() {
        let out = BlendMode::SourceOver.apply(Color::RED, Color::BLUE);
        assert!(approx(out, Color::RED));
    }

    #[test]
    fn test_destination_over_keeps_opaque_destination() {
        let out = BlendMode::DestinationOver.apply(Color::RED, Color::BLUE);
        assert!(approx(out, Color::BLUE));
    }

    #[test]
    fn test_clear_and_source() {
        assert!(approx(
            BlendMode::Clear.apply(Color::RED, Color::BLUE),
            Color::TRANSPARENT
        ));
        let half = Color::rgba(0.0, 1.0, 0.0, 0.5).premultiply();
        assert!(approx(BlendMode::Source.apply(half, Color::BLUE), half));
    }

    #[test]
    fn test_multiply_opaque() {
        let src = Color::rgb(0.5, 1.0, 0.0);
        let dst = Color::rgb(0.5, 0.5, 1.0);
        let out = BlendMode::Multiply.apply(src, dst);
        assert!(approx(out, Color::rgb(0.25, 0.5, 0.0)));
    }

    #[test]
    fn test_premultiply_round_trip() {
        let c = Color::rgba(0.2, 0.4, 0.6, 0.5);
        assert!(approx(c.premultiply().unpremultiply(), c));
    }

    #[test]
    fn test_argb() {
        assert_eq!(Color::from_argb(0xFF00FF00), Color::GREEN);
    }
}
