use std::{io::Cursor, path::PathBuf};

use maquette::{ApparelView, AssetLibrary, ElementPatch, Garment, Studio, ViewImages};

fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dir = PathBuf::from("target").join("place_and_export");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join("tee_front.png"),
        solid_png(600, 800, [235, 235, 235, 255])?,
    )?;
    std::fs::write(dir.join("flame.png"), solid_png(256, 256, [200, 40, 40, 255])?)?;

    let garment = Garment {
        id: "tee-01".to_string(),
        name: "Classic Tee".to_string(),
        kind: "t-shirt".to_string(),
        color: "white".to_string(),
        views: ViewImages {
            front: Some("tee_front.png".to_string()),
            back: None,
            side: None,
        },
    };
    let mut studio = Studio::new(garment, AssetLibrary::new(&dir));

    let e = studio.add_element(ApparelView::Front, "flame.png")?;
    studio.update_element(
        ApparelView::Front,
        e.id,
        &ElementPatch {
            y: Some(38.0),
            scale: Some(1.8),
            rotation: Some(-8.0),
            ..ElementPatch::default()
        },
    )?;

    let png = studio.composite_png(ApparelView::Front)?;
    let out = dir.join("front.png");
    std::fs::write(&out, &png)?;
    eprintln!("wrote {}", out.display());

    println!("{}", studio.document().to_canonical_json()?);
    Ok(())
}
