//! CPU compositing of a view layout onto its base image. Inputs are
//! prepared (decoded, premultiplied) up front; this stage does no IO
//! and paints overlays strictly in collection order.

use crate::{
    assets::PreparedImage,
    core::{PixelSize, Rgba8Premul, StageSize, Transform2D, Vec2},
    error::{MaquetteError, MaquetteResult},
    mapper::{StageGeometry, fit_contain, stage_to_bitmap},
    model::{BASE_ELEMENT_SIZE, DesignElement},
    render::CompositeFrame,
};

/// One overlay ready to paint: the element's placement snapshot plus
/// its decoded bitmap.
#[derive(Clone, Debug)]
pub struct PlacedOverlay {
    pub element: DesignElement,
    pub image: PreparedImage,
}

/// Flattens `overlays` onto `base` and returns the composite at the
/// base image's native dimensions. The output starts as opaque white,
/// the base fills it exactly, and each overlay is mapped through the
/// same reference stage geometry the interactive view uses.
#[tracing::instrument(skip(base, overlays))]
pub fn compose(base: &PreparedImage, overlays: &[PlacedOverlay]) -> MaquetteResult<CompositeFrame> {
    if base.width == 0 || base.height == 0 {
        return Err(MaquetteError::render("composite dimensions must be nonzero"));
    }
    let width_u16: u16 = base
        .width
        .try_into()
        .map_err(|_| MaquetteError::render("composite width exceeds u16"))?;
    let height_u16: u16 = base
        .height
        .try_into()
        .map_err(|_| MaquetteError::render("composite height exceeds u16"))?;

    let w = f64::from(base.width);
    let h = f64::from(base.height);
    let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);

    // White floor keeps transparent base regions white in the export;
    // the same color backs the flatten at the PNG boundary.
    let floor = Rgba8Premul::opaque_white();
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        floor.r, floor.g, floor.b, floor.a,
    ));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));

    // Base image at native size fills the bitmap exactly.
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(image_paint(base)?);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));

    let target = base.pixel_size();
    let geom = fit_contain(StageSize::REFERENCE, target);
    for overlay in overlays {
        draw_overlay(&mut ctx, overlay, &geom, target)?;
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(CompositeFrame {
        width: base.width,
        height: base.height,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    })
}

fn draw_overlay(
    ctx: &mut vello_cpu::RenderContext,
    overlay: &PlacedOverlay,
    geom: &StageGeometry,
    target: PixelSize,
) -> MaquetteResult<()> {
    let element = &overlay.element;
    let image = &overlay.image;
    if image.width == 0 || image.height == 0 {
        return Err(MaquetteError::render("overlay image has a zero dimension"));
    }

    let center = stage_to_bitmap(element.position(), geom, target);

    // Width follows the logical element size through the stage fit;
    // height keeps the overlay bitmap's own aspect ratio.
    let draw_w = BASE_ELEMENT_SIZE * element.scale / geom.render_width * f64::from(target.width);
    let draw_h = f64::from(image.height) / f64::from(image.width) * draw_w;

    let image_w = f64::from(image.width);
    let image_h = f64::from(image.height);
    let anchor = Vec2::new(image_w / 2.0, image_h / 2.0);
    let transform = Transform2D {
        translate: Vec2::new(center.x, center.y) - anchor,
        rotation_rad: element.rotation.to_radians(),
        scale: Vec2::new(draw_w / image_w, draw_h / image_h),
        anchor,
    };

    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(transform.to_affine()));
    ctx.set_paint(image_paint(image)?);

    let opacity = element.opacity.clamp(0.0, 1.0) as f32;
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, image_w, image_h));
    if opacity < 1.0 {
        ctx.pop_layer();
    }

    Ok(())
}

fn image_paint(image: &PreparedImage) -> MaquetteResult<vello_cpu::Image> {
    let pixmap = image_premul_bytes_to_pixmap(&image.rgba8_premul, image.width, image.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> MaquetteResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MaquetteError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MaquetteError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(MaquetteError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
