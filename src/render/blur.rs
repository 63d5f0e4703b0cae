use crate::foundation::{
    core::CanvasSize,
    error::{VeilError, VeilResult},
};

const Q16_ONE: u32 = 1 << 16;

/// Normalized 1-D Gaussian in Q16 fixed point, applied along both axes.
///
/// The taps always sum to exactly `1 << 16`, so flat regions come out unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BlurKernel {
    taps: Vec<u32>,
}

impl BlurKernel {
    /// Kernel for a canvas-style shadow blur of `blur_px`, or `None` when nothing blurs.
    ///
    /// `sigma = blur / 2` and the radius is `ceil(3 * sigma)`, capped at `max_radius` (the
    /// surface's longer edge when drawing shadows).
    pub(crate) fn for_shadow(blur_px: f64, max_radius: u32) -> Option<Self> {
        if !blur_px.is_finite() || blur_px <= 0.0 {
            return None;
        }
        let sigma = blur_px / 2.0;
        let cap = max_radius.clamp(1, CanvasSize::MAX_EDGE);
        let radius = (3.0 * sigma).ceil().clamp(1.0, f64::from(cap));
        // Clamped to a u32 range above.
        Self::new(radius as u32, sigma).ok()
    }

    /// Kernel spanning `2 * radius + 1` taps; `radius` is at most one canvas edge.
    pub(crate) fn new(radius: u32, sigma: f64) -> VeilResult<Self> {
        if radius > CanvasSize::MAX_EDGE {
            return Err(VeilError::render(format!(
                "blur radius {radius} exceeds {} px",
                CanvasSize::MAX_EDGE
            )));
        }
        if radius == 0 {
            return Ok(Self {
                taps: vec![Q16_ONE],
            });
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(VeilError::validation("blur sigma must be > 0"));
        }
        let len = usize::try_from(radius)
            .ok()
            .and_then(|r| r.checked_mul(2))
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| VeilError::render(format!("blur radius {radius} is too large")))?;

        let r = f64::from(radius);
        let two_sigma_sq = 2.0 * sigma * sigma;
        let weights: Vec<f64> = (0..len)
            .map(|i| {
                let d = i as f64 - r;
                (-d * d / two_sigma_sq).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(VeilError::render("gaussian kernel sum is zero"));
        }

        let one = f64::from(Q16_ONE);
        let mut taps: Vec<u32> = weights
            .iter()
            .map(|w| (w / total * one).round().clamp(0.0, one) as u32)
            .collect();
        // Rounding drift lands on the center tap.
        let sum: i64 = taps.iter().map(|&t| i64::from(t)).sum();
        let center = len / 2;
        let fixed =
            (i64::from(taps[center]) + i64::from(Q16_ONE) - sum).clamp(0, i64::from(Q16_ONE));
        taps[center] = u32::try_from(fixed).unwrap_or(Q16_ONE);
        Ok(Self { taps })
    }

    /// Number of taps on each side of the center.
    pub(crate) fn radius(&self) -> usize {
        self.taps.len() / 2
    }

    pub(crate) fn taps(&self) -> &[u32] {
        &self.taps
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// Gaussian blur over a premultiplied RGBA8 surface of `size`, clamping samples at the edges.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    size: CanvasSize,
    kernel: &BlurKernel,
) -> VeilResult<Vec<u8>> {
    let width = size.width as usize;
    let height = size.height as usize;
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| VeilError::render("blur buffer size overflow"))?;
    if src.len() != expected {
        return Err(VeilError::render(format!(
            "blur source is {} bytes, expected {expected} for {width}x{height}",
            src.len()
        )));
    }
    if kernel.radius() == 0 || expected == 0 {
        return Ok(src.to_vec());
    }

    let mut rows = vec![0u8; expected];
    convolve(src, &mut rows, width, height, kernel, Axis::Rows);
    let mut out = vec![0u8; expected];
    convolve(&rows, &mut out, width, height, kernel, Axis::Columns);
    Ok(out)
}

fn convolve(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    kernel: &BlurKernel,
    axis: Axis,
) {
    let (lines, span) = match axis {
        Axis::Rows => (height, width),
        Axis::Columns => (width, height),
    };
    let offset = |line: usize, pos: usize| match axis {
        Axis::Rows => (line * width + pos) * 4,
        Axis::Columns => (pos * width + line) * 4,
    };
    let radius = kernel.radius();

    for line in 0..lines {
        for pos in 0..span {
            let mut acc = [0u64; 4];
            for (k, &tap) in kernel.taps().iter().enumerate() {
                let sample = (pos + k).saturating_sub(radius).min(span - 1);
                let px = &src[offset(line, sample)..][..4];
                for (a, &c) in acc.iter_mut().zip(px) {
                    *a += u64::from(tap) * u64::from(c);
                }
            }
            let o = offset(line, pos);
            for (d, a) in dst[o..o + 4].iter_mut().zip(acc) {
                *d = ((a + u64::from(Q16_ONE / 2)) >> 16).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;
