use serde::{Deserialize, Serialize};

use crate::geometry::Color;

/// Compositing operator applied when a tool writes a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendOperator {
    #[default]
    Over,
    Source,
    Clear,
    Multiply,
    Difference,
}

impl BlendOperator {
    pub fn composite(self, dst: Color, src: Color) -> Color {
        match self {
            Self::Over => over(dst, src),
            Self::Source => src,
            Self::Clear => Color::TRANSPARENT,
            Self::Multiply => mix_channels(dst, src, mul_div_255),
            Self::Difference => mix_channels(dst, src, |d, s| d.abs_diff(s)),
        }
    }
}

/// Linear interpolation between `dst` and `src` by `coverage / 255`.
pub fn lerp(dst: Color, src: Color, coverage: u8) -> Color {
    match coverage {
        0 => dst,
        255 => src,
        _ => {
            let t = u32::from(coverage);
            let inv = 255 - t;
            let mix = |d: u8, s: u8| ((u32::from(d) * inv + u32::from(s) * t + 127) / 255) as u8;
            Color::rgba(
                mix(dst.r, src.r),
                mix(dst.g, src.g),
                mix(dst.b, src.b),
                mix(dst.a, src.a),
            )
        }
    }
}

fn over(dst: Color, src: Color) -> Color {
    match src.a {
        0 => dst,
        255 => src,
        _ => {
            let src_a = u32::from(src.a);
            let dst_a = u32::from(dst.a) * (255 - src_a) / 255;
            let out_a = src_a + dst_a;
            if out_a == 0 {
                return Color::TRANSPARENT;
            }
            let channel = |s: u8, d: u8| {
                ((u32::from(s) * src_a + u32::from(d) * dst_a + out_a / 2) / out_a) as u8
            };
            Color::rgba(
                channel(src.r, dst.r),
                channel(src.g, dst.g),
                channel(src.b, dst.b),
                out_a.min(255) as u8,
            )
        }
    }
}

/// Applies a per-channel color function, then composites the result over the
/// destination using the source alpha. Destination alpha is kept.
fn mix_channels(dst: Color, src: Color, f: impl Fn(u8, u8) -> u8) -> Color {
    let mixed = Color::rgba(f(dst.r, src.r), f(dst.g, src.g), f(dst.b, src.b), dst.a);
    lerp(dst, mixed, src.a)
}

fn mul_div_255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}
