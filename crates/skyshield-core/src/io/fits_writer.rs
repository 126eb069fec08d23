use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use ndarray::Array2;
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::{FrameHeader, HeaderValue};
use crate::io::fits::{padded, CARD_LEN, FITS_BLOCK};

/// Keywords that describe the data layout; never copied from a source header.
const STRUCTURAL: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "EXTEND", "PCOUNT", "GCOUNT", "BSCALE", "BZERO",
    "END",
];

/// Write a float image as a single-HDU FITS file (`BITPIX = -32`).
///
/// Cards from `header` are copied after the structural ones. Parent
/// directories are created.
pub fn write_fits(path: &Path, data: &Array2<f32>, header: Option<&FrameHeader>) -> Result<()> {
    let mut w = create(path)?;
    write_header(&mut w, -32, data.dim(), header, &[])?;
    for &v in data.iter() {
        w.write_f32::<BigEndian>(v)?;
    }
    pad_data(&mut w, data.len() * 4)?;
    w.flush()?;
    debug!(path = %path.display(), "wrote FITS image");
    Ok(())
}

/// Write an 8-bit mask (`BITPIX = 8`) tagged `OSS_MASK = T`.
pub fn write_mask_fits(path: &Path, mask: &Array2<u8>, header: Option<&FrameHeader>) -> Result<()> {
    let mut w = create(path)?;
    write_header(
        &mut w,
        8,
        mask.dim(),
        header,
        &[("OSS_MASK", HeaderValue::Bool(true))],
    )?;
    let bytes: Vec<u8> = mask.iter().copied().collect();
    w.write_all(&bytes)?;
    pad_data(&mut w, bytes.len())?;
    w.flush()?;
    debug!(path = %path.display(), "wrote FITS mask");
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_header(
    w: &mut impl Write,
    bitpix: i64,
    (height, width): (usize, usize),
    header: Option<&FrameHeader>,
    extra: &[(&str, HeaderValue)],
) -> Result<()> {
    let mut cards = vec![
        format_card("SIMPLE", &HeaderValue::Bool(true)),
        format_card("BITPIX", &HeaderValue::Int(bitpix)),
        format_card("NAXIS", &HeaderValue::Int(2)),
        format_card("NAXIS1", &HeaderValue::Int(width as i64)),
        format_card("NAXIS2", &HeaderValue::Int(height as i64)),
    ];
    if let Some(header) = header {
        for (key, value) in header.iter() {
            if is_structural(key) {
                continue;
            }
            match format_card(key, value) {
                Some(card) => cards.push(Some(card)),
                None => warn!(key, "header card not representable in FITS, dropped"),
            }
        }
    }
    for (key, value) in extra {
        cards.push(format_card(key, value));
    }

    let mut written = 0;
    for card in cards.into_iter().flatten() {
        w.write_all(card.as_bytes())?;
        written += CARD_LEN;
    }
    w.write_all(format!("{:<80}", "END").as_bytes())?;
    written += CARD_LEN;
    w.write_all(&vec![b' '; padded(written) - written])?;
    Ok(())
}

fn is_structural(key: &str) -> bool {
    STRUCTURAL.contains(&key) || (key.starts_with("NAXIS") && key[5..].chars().all(|c| c.is_ascii_digit()))
}

/// Fixed-format 80-character card, or `None` for keys longer than 8
/// characters and non-finite numbers.
pub(crate) fn format_card(key: &str, value: &HeaderValue) -> Option<String> {
    if key.is_empty() || key.len() > 8 || !key.is_ascii() {
        return None;
    }
    let value = match value {
        HeaderValue::Bool(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Int(i) => format!("{i:>20}"),
        HeaderValue::Float(f) if f.is_finite() => {
            format!("{:>20}", format!("{f:?}").replace('e', "E"))
        }
        HeaderValue::Float(_) => return None,
        HeaderValue::Str(s) => format!("'{:<8}'", s.replace('\'', "''")),
    };
    let card: String = format!("{key:<8}= {value}").chars().take(CARD_LEN).collect();
    Some(format!("{card:<80}"))
}

fn pad_data(w: &mut impl Write, len: usize) -> Result<()> {
    let fill = padded(len) - len;
    debug_assert!(fill < FITS_BLOCK);
    w.write_all(&vec![0u8; fill])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fits::parse_card;

    #[test]
    fn cards_are_eighty_columns_and_parse_back() {
        for (key, value) in [
            ("EXPTIME", HeaderValue::Float(30.0)),
            ("GAIN", HeaderValue::Float(1.0e-20)),
            ("NCOMBINE", HeaderValue::Int(-4)),
            ("OBSERVER", HeaderValue::Str("O'Neil".into())),
            ("OSS_MASK", HeaderValue::Bool(true)),
        ] {
            let card = format_card(key, &value).unwrap();
            assert_eq!(card.len(), 80, "{card}");
            assert_eq!(parse_card(&card), Some((key.to_string(), value)));
        }
    }

    #[test]
    fn unrepresentable_cards_are_rejected() {
        assert!(format_card("TOOLONGKEY", &HeaderValue::Int(1)).is_none());
        assert!(format_card("BAD", &HeaderValue::Float(f64::NAN)).is_none());
    }

    #[test]
    fn structural_keywords() {
        assert!(is_structural("NAXIS"));
        assert!(is_structural("NAXIS3"));
        assert!(is_structural("BZERO"));
        assert!(!is_structural("NAXISX"));
        assert!(!is_structural("EXPTIME"));
    }
}
