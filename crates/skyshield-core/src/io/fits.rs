use std::fs::File;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use crate::error::{Result, SkyShieldError};
use crate::frame::{Frame, FrameHeader, HeaderValue};

pub(crate) const FITS_BLOCK: usize = 2880;
pub(crate) const CARD_LEN: usize = 80;
const MAX_NAXIS: usize = 999;

/// Header and data layout of one HDU.
#[derive(Clone, Debug)]
struct Hdu {
    header: FrameHeader,
    bitpix: i64,
    /// NAXISn values, fastest axis first.
    axes: Vec<usize>,
    data_offset: usize,
    /// Offset of the next HDU, past the padded data area.
    end: usize,
}

impl Hdu {
    fn is_image(&self) -> bool {
        self.axes.len() >= 2 && self.axes[0] > 0 && self.axes[1] > 0
    }
}

/// Read the 2-D image of a FITS file.
///
/// The primary HDU is used when it holds an image, otherwise the next HDU.
/// Cubes contribute their first plane. `BSCALE`/`BZERO` are applied.
pub fn read_fits(path: &Path) -> Result<Frame> {
    if !path.exists() {
        return Err(SkyShieldError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    if (file.metadata()?.len() as usize) < FITS_BLOCK {
        return Err(SkyShieldError::InvalidFits(format!(
            "{} is smaller than one FITS block",
            path.display()
        )));
    }
    let mmap = unsafe { Mmap::map(&file)? };

    let primary = parse_hdu(&mmap, 0)?;
    let hdu = if primary.is_image() {
        primary
    } else if primary.end < mmap.len() {
        let ext = parse_hdu(&mmap, primary.end)?;
        debug!(path = %path.display(), "primary HDU empty, using first extension");
        ext
    } else {
        primary
    };
    if !hdu.is_image() {
        return Err(SkyShieldError::NoPixelData(path.to_path_buf()));
    }

    let (w, h) = (hdu.axes[0], hdu.axes[1]);
    let bytes = (hdu.bitpix.unsigned_abs() / 8) as usize;
    let plane_len = w
        .checked_mul(h)
        .and_then(|n| n.checked_mul(bytes))
        .ok_or_else(|| SkyShieldError::InvalidFits(format!("{w}x{h} image is too large")))?;
    if !matches!(hdu.data_offset.checked_add(plane_len), Some(end) if end <= mmap.len()) {
        return Err(SkyShieldError::InvalidFits(format!(
            "{} is truncated: expected {} data bytes",
            path.display(),
            plane_len
        )));
    }

    let bscale = hdu.header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = hdu.header.get_f64("BZERO").unwrap_or(0.0);
    let raw = &mmap[hdu.data_offset..hdu.data_offset + plane_len];
    let data = decode_image(raw, hdu.bitpix, h, w, bscale, bzero)?;

    Ok(Frame::new(data).with_source(path).with_header(hdu.header))
}

fn parse_hdu(buf: &[u8], offset: usize) -> Result<Hdu> {
    let mut header = FrameHeader::new();
    let mut pos = offset;
    let mut found_end = false;

    while pos + CARD_LEN <= buf.len() {
        let card = String::from_utf8_lossy(&buf[pos..pos + CARD_LEN]);
        pos += CARD_LEN;
        if card.starts_with("END") && card[3..].trim().is_empty() {
            found_end = true;
            break;
        }
        if let Some((key, value)) = parse_card(&card) {
            header.set(&key, value);
        }
    }
    if !found_end {
        return Err(SkyShieldError::InvalidFits(
            "header has no END card".into(),
        ));
    }

    let bitpix = header
        .get("BITPIX")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| SkyShieldError::InvalidFits("missing BITPIX".into()))?
        as i64;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(SkyShieldError::InvalidFits(format!(
            "unsupported BITPIX {bitpix}"
        )));
    }

    let naxis = header.get_f64("NAXIS").unwrap_or(0.0) as usize;
    if naxis > MAX_NAXIS {
        return Err(SkyShieldError::InvalidFits(format!("NAXIS {naxis} out of range")));
    }
    let axes: Vec<usize> = (1..=naxis)
        .map(|i| header.get_f64(&format!("NAXIS{i}")).unwrap_or(0.0).max(0.0) as usize)
        .collect();

    let pcount = header.get_f64("PCOUNT").unwrap_or(0.0) as usize;
    let gcount = header.get_f64("GCOUNT").unwrap_or(1.0).max(1.0) as usize;
    let elements = if axes.is_empty() {
        Some(0)
    } else {
        axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    };
    let data_offset = offset + padded(pos - offset);
    let end = elements
        .and_then(|n| n.checked_add(pcount))
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul((bitpix.unsigned_abs() / 8) as usize))
        .and_then(|len| data_offset.checked_add(checked_padded(len)?));
    let Some(end) = end else {
        return Err(SkyShieldError::InvalidFits(format!(
            "data size of axes {axes:?} overflows"
        )));
    };

    Ok(Hdu {
        header,
        bitpix,
        axes,
        data_offset,
        end,
    })
}

/// Parse one 80-character card. Commentary and valueless cards give `None`.
pub(crate) fn parse_card(card: &str) -> Option<(String, HeaderValue)> {
    if card.get(8..10) != Some("= ") {
        return None;
    }
    let key = card.get(..8)?.trim();
    if key.is_empty() || matches!(key, "COMMENT" | "HISTORY") {
        return None;
    }
    let rest = card.get(10..)?.trim_start();

    if let Some(quoted) = rest.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    value.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return Some((key.to_string(), HeaderValue::Str(value.trim_end().to_string())));
    }

    let token = rest.split('/').next().unwrap_or("").trim();
    let value = match token {
        "" => return None,
        "T" => HeaderValue::Bool(true),
        "F" => HeaderValue::Bool(false),
        _ => {
            if let Ok(i) = token.parse::<i64>() {
                HeaderValue::Int(i)
            } else if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::Str(token.to_string())
            }
        }
    };
    Some((key.to_string(), value))
}

fn decode_image(
    raw: &[u8],
    bitpix: i64,
    height: usize,
    width: usize,
    bscale: f64,
    bzero: f64,
) -> Result<Array2<f32>> {
    let bytes = (bitpix.unsigned_abs() / 8) as usize;
    let sample = |i: usize| -> f64 {
        let b = &raw[i * bytes..(i + 1) * bytes];
        match bitpix {
            8 => b[0] as f64,
            16 => BigEndian::read_i16(b) as f64,
            32 => BigEndian::read_i32(b) as f64,
            64 => BigEndian::read_i64(b) as f64,
            -32 => BigEndian::read_f32(b) as f64,
            _ => BigEndian::read_f64(b),
        }
    };

    let values: Vec<f32> = (0..height * width)
        .map(|i| (bzero + bscale * sample(i)) as f32)
        .collect();
    Array2::from_shape_vec((height, width), values)
        .map_err(|e| SkyShieldError::InvalidFits(e.to_string()))
}

pub(crate) fn padded(len: usize) -> usize {
    len.div_ceil(FITS_BLOCK) * FITS_BLOCK
}

fn checked_padded(len: usize) -> Option<usize> {
    len.div_ceil(FITS_BLOCK).checked_mul(FITS_BLOCK)
}
