//! RGBA colors. Channels stay unclamped floats between operations and
//! only clamp when rendered, so chained arithmetic does not lose range.
//! Keyword and hex spellings authored in the source are preserved on
//! output (<https://www.w3.org/TR/css-color-3/>).

use crate::output::{Output, RenderCtx, format_number};
use crate::tree::Operator;
use core::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub struct Color {
    pub rgb: [f64; 3],
    pub alpha: f64,
    /// The text as authored (`blue`, `#08c`), kept verbatim on output.
    pub value: Option<String>,
}

impl Color {
    pub fn new(rgb: [f64; 3], alpha: f64) -> Self {
        Self {
            rgb,
            alpha,
            value: None,
        }
    }

    /// Uniform gray used when a number meets a color in arithmetic.
    #[inline]
    pub fn gray(level: f64) -> Self {
        Self::new([level, level, level], 1.0)
    }

    /// Resolve a CSS color keyword (or hex spelling), remembering the
    /// authored text so it renders back unchanged.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("transparent") {
            return Some(Self {
                rgb: [0.0, 0.0, 0.0],
                alpha: 0.0,
                value: Some(keyword.to_owned()),
            });
        }
        let parsed = csscolorparser::parse(keyword).ok()?;
        Some(Self {
            rgb: [
                f64::from(parsed.r) * 255.0,
                f64::from(parsed.g) * 255.0,
                f64::from(parsed.b) * 255.0,
            ],
            alpha: f64::from(parsed.a),
            value: Some(keyword.to_owned()),
        })
    }

    /// Channel-wise arithmetic. The result drops any authored spelling.
    /// Alpha composites rather than operates, matching how translucent
    /// colors blend.
    pub fn operate(&self, op: Operator, other: &Color) -> Color {
        let mut rgb = [0.0; 3];
        for (channel, result) in rgb.iter_mut().enumerate() {
            *result = op.apply(self.rgb[channel], other.rgb[channel]);
        }
        Color::new(rgb, self.alpha * (1.0 - other.alpha) + other.alpha)
    }

    /// Relative luminance per ITU-R BT.709 on linearized channels.
    pub fn luma(&self) -> f64 {
        let linear = self.rgb.map(|channel| {
            let channel = channel / 255.0;
            if channel <= 0.03928 {
                channel / 12.92
            } else {
                ((channel + 0.055) / 1.055).powf(2.4)
            }
        });
        0.2126 * linear[0] + 0.7152 * linear[1] + 0.0722 * linear[2]
    }

    pub fn to_hsl(&self) -> (f64, f64, f64, f64) {
        let red = self.rgb[0] / 255.0;
        let green = self.rgb[1] / 255.0;
        let blue = self.rgb[2] / 255.0;
        let max = red.max(green).max(blue);
        let min = red.min(green).min(blue);
        let lightness = (max + min) / 2.0;
        let delta = max - min;
        if delta == 0.0 {
            return (0.0, 0.0, lightness, self.alpha);
        }
        let saturation = if lightness > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };
        let hue = if max == red {
            (green - blue) / delta + if green < blue { 6.0 } else { 0.0 }
        } else if max == green {
            (blue - red) / delta + 2.0
        } else {
            (red - green) / delta + 4.0
        };
        (hue * 60.0, saturation, lightness, self.alpha)
    }

    /// Colors compare equal on identical channels and alpha; there is
    /// no ordering between distinct colors.
    pub fn compare(&self, other: &Color) -> Option<Ordering> {
        (self.rgb == other.rgb && self.alpha == other.alpha).then_some(Ordering::Equal)
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) {
        output.add(&self.render(context));
    }

    fn render(&self, context: &RenderCtx) -> String {
        if let Some(authored) = &self.value {
            return authored.clone();
        }
        let alpha = context.fround(self.alpha);
        if alpha < 1.0 {
            let separator = if context.compress { "," } else { ", " };
            let channels = self
                .rgb
                .map(|channel| format!("{}", channel.round().clamp(0.0, 255.0)));
            return format!(
                "rgba({}{separator}{}{separator}{}{separator}{})",
                channels[0],
                channels[1],
                channels[2],
                clamp_unit(alpha)
            );
        }
        let hex = self.to_hex();
        if context.compress {
            let digits: Vec<char> = hex.chars().skip(1).collect();
            if digits.len() == 6
                && digits[0] == digits[1]
                && digits[2] == digits[3]
                && digits[4] == digits[5]
            {
                return format!("#{}{}{}", digits[0], digits[2], digits[4]);
            }
        }
        hex
    }

    fn to_hex(&self) -> String {
        let mut hex = String::from("#");
        for channel in self.rgb {
            let rounded = channel.round().clamp(0.0, 255.0) as u8;
            hex.push_str(&format!("{rounded:02x}"));
        }
        hex
    }
}

fn clamp_unit(value: f64) -> String {
    let clamped = value.clamp(0.0, 1.0);
    format_number(clamped)
}
