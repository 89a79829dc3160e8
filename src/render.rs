use std::io::Cursor;

use crate::{
    core::Rgba8Premul,
    error::{MaquetteError, MaquetteResult},
};

/// One flattened composite as raw RGBA8 bytes.
#[derive(Clone, Debug)]
pub struct CompositeFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl CompositeFrame {
    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Encodes a frame as PNG bytes. Premultiplied input is flattened over
/// opaque white first; PNG carries straight alpha only.
pub fn encode_png(frame: &CompositeFrame) -> MaquetteResult<Vec<u8>> {
    if frame.data.len() != frame.expected_len() {
        return Err(MaquetteError::validation(
            "frame data size mismatch with width*height*4",
        ));
    }

    let flat = if frame.premultiplied {
        let mut flat = vec![0u8; frame.data.len()];
        flatten_premul_over_bg_to_opaque_rgba8(
            &mut flat,
            &frame.data,
            Rgba8Premul::opaque_white(),
        )?;
        flat
    } else {
        frame.data.clone()
    };

    let img = image::RgbaImage::from_raw(frame.width, frame.height, flat)
        .ok_or_else(|| MaquetteError::render("frame buffer does not match its dimensions"))?;

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| MaquetteError::render(format!("encode png: {e}")))?;
    Ok(out)
}

/// Composites premultiplied RGBA8 over an opaque background color,
/// producing straight RGBA8 with alpha forced to 255.
fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg: Rgba8Premul,
) -> MaquetteResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(MaquetteError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg.r);
    let bg_g = u16::from(bg.g);
    let bg_b = u16::from(bg.b);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;
        let r = s[0] as u16 + mul_div255(bg_r, inv);
        let g = s[1] as u16 + mul_div255(bg_g, inv);
        let b = s[2] as u16 + mul_div255(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (x * y + 127) / 255
}
