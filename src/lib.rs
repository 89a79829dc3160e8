#![forbid(unsafe_code)]

pub mod assets;
pub mod core;
pub mod error;
pub mod gesture;
pub mod mapper;
pub mod model;
pub mod render;
pub mod render_cpu;
pub mod studio;

pub use assets::{AssetLibrary, PreparedImage};
pub use core::{
    BitmapPoint, PixelSize, Rgba8Premul, ScreenPoint, StagePoint, StageSize, Transform2D, Vec2,
};
pub use error::{MaquetteError, MaquetteResult};
pub use gesture::{GestureController, StageMetrics, TransformMode};
pub use mapper::{StageGeometry, bitmap_to_stage, fit_contain, stage_to_bitmap};
pub use model::{
    ApparelView, BASE_ELEMENT_SIZE, DesignElement, ElementId, ElementPatch, Garment,
    StudioDocument, ViewImages, ViewLayout, ViewLayouts,
};
pub use render::{CompositeFrame, encode_png};
pub use render_cpu::{PlacedOverlay, compose};
pub use studio::Studio;
