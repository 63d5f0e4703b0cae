use crate::foundation::error::{VeilError, VeilResult};

/// A parsed CSS color with straight-alpha channels in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssColor {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha channel.
    pub a: f64,
}

impl CssColor {
    pub(crate) fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            1.0,
        )
    }

    /// Straight-alpha RGBA8, as accepted by `vello_cpu` paints.
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            to_u8(self.r),
            to_u8(self.g),
            to_u8(self.b),
            to_u8(self.a),
        ]
    }

    /// True when the color has no visible coverage.
    pub fn is_transparent(self) -> bool {
        to_u8(self.a) == 0
    }
}

fn to_u8(x: f64) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Parse a CSS color string: hex, `rgb()`/`rgba()`, `hsl()`/`hsla()` or a named color.
pub fn parse_css_color(input: &str) -> VeilResult<CssColor> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(VeilError::validation("color must be non-empty"));
    }

    let parsed = if let Some(hex) = s.strip_prefix('#') {
        parse_hex(hex)
    } else if let Some(args) = function_args(&s, &["rgba", "rgb"]) {
        parse_rgb_args(args)
    } else if let Some(args) = function_args(&s, &["hsla", "hsl"]) {
        parse_hsl_args(args)
    } else {
        named_color(&s).ok_or_else(|| "unknown color name".to_owned())
    };

    parsed.map_err(|e| VeilError::validation(format!("invalid color \"{input}\": {e}")))
}

fn function_args<'a>(s: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        s.strip_prefix(name)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
    })
}

fn parse_hex(s: &str) -> Result<CssColor, String> {
    fn nibble(c: u8) -> Result<u8, String> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| format!("invalid hex digit '{}'", c as char))
    }

    let bytes = s.as_bytes();
    let digits = bytes
        .iter()
        .map(|&c| nibble(c))
        .collect::<Result<Vec<u8>, String>>()?;

    let (r, g, b, a) = match digits.len() {
        3 => (digits[0] * 17, digits[1] * 17, digits[2] * 17, 255),
        4 => (
            digits[0] * 17,
            digits[1] * 17,
            digits[2] * 17,
            digits[3] * 17,
        ),
        6 => (
            digits[0] << 4 | digits[1],
            digits[2] << 4 | digits[3],
            digits[4] << 4 | digits[5],
            255,
        ),
        8 => (
            digits[0] << 4 | digits[1],
            digits[2] << 4 | digits[3],
            digits[4] << 4 | digits[5],
            digits[6] << 4 | digits[7],
        ),
        _ => return Err("hex color must have 3, 4, 6 or 8 digits".to_owned()),
    };

    Ok(CssColor::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
        f64::from(a) / 255.0,
    ))
}

/// Split `a, b, c, d` or `a b c / d` into components.
fn split_args(args: &str) -> Vec<&str> {
    args.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_number(part: &str) -> Result<f64, String> {
    let v = part
        .parse::<f64>()
        .map_err(|_| format!("invalid number \"{part}\""))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("invalid number \"{part}\""))
    }
}

/// A channel in `0..=255` or a percentage, normalized to `0..=1`.
fn parse_channel(part: &str) -> Result<f64, String> {
    match part.strip_suffix('%') {
        Some(p) => Ok((parse_number(p)? / 100.0).clamp(0.0, 1.0)),
        None => Ok((parse_number(part)? / 255.0).clamp(0.0, 1.0)),
    }
}

fn parse_alpha(part: Option<&&str>) -> Result<f64, String> {
    match part {
        None => Ok(1.0),
        Some(p) => match p.strip_suffix('%') {
            Some(pct) => Ok((parse_number(pct)? / 100.0).clamp(0.0, 1.0)),
            None => Ok(parse_number(p)?.clamp(0.0, 1.0)),
        },
    }
}

fn parse_rgb_args(args: &str) -> Result<CssColor, String> {
    let parts = split_args(args);
    if parts.len() != 3 && parts.len() != 4 {
        return Err("rgb() takes 3 or 4 components".to_owned());
    }
    Ok(CssColor::rgba(
        parse_channel(parts[0])?,
        parse_channel(parts[1])?,
        parse_channel(parts[2])?,
        parse_alpha(parts.get(3))?,
    ))
}

fn parse_hsl_args(args: &str) -> Result<CssColor, String> {
    let parts = split_args(args);
    if parts.len() != 3 && parts.len() != 4 {
        return Err("hsl() takes 3 or 4 components".to_owned());
    }
    let h = parse_number(parts[0].trim_end_matches("deg"))?;
    let pct = |p: &str| -> Result<f64, String> {
        let raw = p.strip_suffix('%').unwrap_or(p);
        Ok((parse_number(raw)? / 100.0).clamp(0.0, 1.0))
    };
    Ok(hsla_to_rgba(
        h,
        pct(parts[1])?,
        pct(parts[2])?,
        parse_alpha(parts.get(3))?,
    ))
}

fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> CssColor {
    // Standard HSL -> RGB conversion (sRGB space, normalized 0..1 inputs).
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;

    if s == 0.0 {
        return CssColor::rgba(l, l, l, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    CssColor::rgba(
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
        a,
    )
}

fn named_color(name: &str) -> Option<CssColor> {
    let c = match name {
        "transparent" => return Some(CssColor::rgba(0.0, 0.0, 0.0, 0.0)),
        "black" => CssColor::rgb8(0, 0, 0),
        "white" => CssColor::rgb8(255, 255, 255),
        "red" => CssColor::rgb8(255, 0, 0),
        "lime" => CssColor::rgb8(0, 255, 0),
        "green" => CssColor::rgb8(0, 128, 0),
        "blue" => CssColor::rgb8(0, 0, 255),
        "yellow" => CssColor::rgb8(255, 255, 0),
        "cyan" | "aqua" => CssColor::rgb8(0, 255, 255),
        "magenta" | "fuchsia" => CssColor::rgb8(255, 0, 255),
        "gray" | "grey" => CssColor::rgb8(128, 128, 128),
        "silver" => CssColor::rgb8(192, 192, 192),
        "lightgray" | "lightgrey" => CssColor::rgb8(211, 211, 211),
        "darkgray" | "darkgrey" => CssColor::rgb8(169, 169, 169),
        "maroon" => CssColor::rgb8(128, 0, 0),
        "olive" => CssColor::rgb8(128, 128, 0),
        "navy" => CssColor::rgb8(0, 0, 128),
        "purple" => CssColor::rgb8(128, 0, 128),
        "teal" => CssColor::rgb8(0, 128, 128),
        "orange" => CssColor::rgb8(255, 165, 0),
        "gold" => CssColor::rgb8(255, 215, 0),
        "pink" => CssColor::rgb8(255, 192, 203),
        "hotpink" => CssColor::rgb8(255, 105, 180),
        "brown" => CssColor::rgb8(165, 42, 42),
        "coral" => CssColor::rgb8(255, 127, 80),
        "crimson" => CssColor::rgb8(220, 20, 60),
        "indigo" => CssColor::rgb8(75, 0, 130),
        "violet" => CssColor::rgb8(238, 130, 238),
        "salmon" => CssColor::rgb8(250, 128, 114),
        "tomato" => CssColor::rgb8(255, 99, 71),
        "turquoise" => CssColor::rgb8(64, 224, 208),
        "skyblue" => CssColor::rgb8(135, 206, 235),
        "steelblue" => CssColor::rgb8(70, 130, 180),
        "royalblue" => CssColor::rgb8(65, 105, 225),
        "slategray" | "slategrey" => CssColor::rgb8(112, 128, 144),
        "beige" => CssColor::rgb8(245, 245, 220),
        "ivory" => CssColor::rgb8(255, 255, 240),
        "khaki" => CssColor::rgb8(240, 230, 140),
        "lavender" => CssColor::rgb8(230, 230, 250),
        "chartreuse" => CssColor::rgb8(127, 255, 0),
        "tan" => CssColor::rgb8(210, 180, 140),
        "whitesmoke" => CssColor::rgb8(245, 245, 245),
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
