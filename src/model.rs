use std::collections::HashSet;

use crate::{
    core::StagePoint,
    error::{MaquetteError, MaquetteResult},
};

/// Logical element size in stage units at scale 1.0.
pub const BASE_ELEMENT_SIZE: f64 = 128.0;
pub const SCALE_MIN: f64 = 0.1;
pub const SCALE_MAX: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApparelView {
    Front,
    Back,
    Side,
}

impl ApparelView {
    pub const ALL: [ApparelView; 3] = [ApparelView::Front, ApparelView::Back, ApparelView::Side];

    pub fn as_str(self) -> &'static str {
        match self {
            ApparelView::Front => "front",
            ApparelView::Back => "back",
            ApparelView::Side => "side",
        }
    }
}

impl std::fmt::Display for ApparelView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub u64);

/// One placed overlay. `x`/`y` are the element center in percent of
/// stage width/height; order within a view's list is paint order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DesignElement {
    pub id: ElementId,
    pub source: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64, // degrees, unbounded while interacting
    pub opacity: f64,
}

impl DesignElement {
    pub fn position(&self) -> StagePoint {
        StagePoint::new(self.x, self.y)
    }

    pub fn set_position(&mut self, p: StagePoint) {
        let p = p.clamped();
        self.x = p.x;
        self.y = p.y;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(SCALE_MIN, SCALE_MAX);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn clamp_ranges(&mut self) {
        self.x = self.x.clamp(0.0, 100.0);
        self.y = self.y.clamp(0.0, 100.0);
        self.scale = self.scale.clamp(SCALE_MIN, SCALE_MAX);
        self.opacity = self.opacity.clamp(0.0, 1.0);
    }
}

/// Partial update applied to one element; `None` fields are left alone.
/// Out-of-range values are clamped, never rejected.
#[derive(Clone, Debug, Default)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
    pub opacity: Option<f64>,
}

impl ElementPatch {
    pub fn apply_to(&self, element: &mut DesignElement) {
        if self.x.is_some() || self.y.is_some() {
            let p = StagePoint::new(self.x.unwrap_or(element.x), self.y.unwrap_or(element.y));
            element.set_position(p);
        }
        if let Some(scale) = self.scale {
            element.set_scale(scale);
        }
        if let Some(rotation) = self.rotation {
            element.set_rotation(rotation);
        }
        if let Some(opacity) = self.opacity {
            element.set_opacity(opacity);
        }
    }
}

/// Ordered elements of one view plus the id counter for that view.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ViewLayout {
    pub elements: Vec<DesignElement>,
    #[serde(default)]
    pub next_id: u64,
}

impl ViewLayout {
    /// Appends a new element with default placement (centered, scale 1,
    /// unrotated, fully opaque) and returns it.
    pub fn add(&mut self, source: impl Into<String>) -> &DesignElement {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.push(DesignElement {
            id,
            source: source.into(),
            x: 50.0,
            y: 50.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
        });
        &self.elements[self.elements.len() - 1]
    }

    pub fn get(&self, id: ElementId) -> Option<&DesignElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut DesignElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Removes the element outright. Returns false when the id is unknown.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        self.elements.len() != before
    }
}

/// The fixed set of per-view layouts for one garment. Each view's list
/// is independent; elements are never shared across views.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ViewLayouts {
    #[serde(default)]
    pub front: ViewLayout,
    #[serde(default)]
    pub back: ViewLayout,
    #[serde(default)]
    pub side: ViewLayout,
}

impl ViewLayouts {
    pub fn layout(&self, view: ApparelView) -> &ViewLayout {
        match view {
            ApparelView::Front => &self.front,
            ApparelView::Back => &self.back,
            ApparelView::Side => &self.side,
        }
    }

    pub fn layout_mut(&mut self, view: ApparelView) -> &mut ViewLayout {
        match view {
            ApparelView::Front => &mut self.front,
            ApparelView::Back => &mut self.back,
            ApparelView::Side => &mut self.side,
        }
    }
}

/// Per-view base image references. An absent or empty reference means
/// that view has no stage and accepts no placements.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ViewImages {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
}

impl ViewImages {
    pub fn image_for(&self, view: ApparelView) -> Option<&str> {
        let source = match view {
            ApparelView::Front => self.front.as_deref(),
            ApparelView::Back => self.back.as_deref(),
            ApparelView::Side => self.side.as_deref(),
        };
        source.filter(|s| !s.trim().is_empty())
    }
}

/// Catalog entry for a garment base.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Garment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub views: ViewImages,
}

/// The persisted shape: one garment plus its per-view layouts. Enough
/// to round-trip a session's placement work, nothing more.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StudioDocument {
    pub garment: Garment,
    #[serde(default)]
    pub layouts: ViewLayouts,
}

impl StudioDocument {
    pub fn from_json_str(s: &str) -> MaquetteResult<Self> {
        let mut doc: StudioDocument = serde_json::from_str(s)
            .map_err(|e| MaquetteError::validation(format!("invalid layout document: {e}")))?;
        doc.validate()?;
        doc.normalize();
        Ok(doc)
    }

    /// Serializes with rotations folded into [0, 360). Raw rotation
    /// values stay untouched in memory; only the written form is
    /// canonical.
    pub fn to_canonical_json(&self) -> MaquetteResult<String> {
        let mut doc = self.clone();
        for view in ApparelView::ALL {
            for element in &mut doc.layouts.layout_mut(view).elements {
                element.rotation = element.rotation.rem_euclid(360.0);
            }
        }
        serde_json::to_string_pretty(&doc)
            .map_err(|e| MaquetteError::validation(format!("serialize layout document: {e}")))
    }

    pub fn validate(&self) -> MaquetteResult<()> {
        if self.garment.id.trim().is_empty() {
            return Err(MaquetteError::validation("garment id must be non-empty"));
        }

        for view in ApparelView::ALL {
            let layout = self.layouts.layout(view);
            let mut seen = HashSet::new();
            for element in &layout.elements {
                if !seen.insert(element.id) {
                    return Err(MaquetteError::validation(format!(
                        "duplicate element id {} in view '{view}'",
                        element.id.0
                    )));
                }
                if element.source.trim().is_empty() {
                    return Err(MaquetteError::validation(format!(
                        "element {} in view '{view}' has an empty image source",
                        element.id.0
                    )));
                }
                let numeric = [
                    element.x,
                    element.y,
                    element.scale,
                    element.rotation,
                    element.opacity,
                ];
                if numeric.iter().any(|v| !v.is_finite()) {
                    return Err(MaquetteError::validation(format!(
                        "element {} in view '{view}' has a non-finite field",
                        element.id.0
                    )));
                }
            }
        }
        Ok(())
    }

    /// Clamps stored numerics into their declared ranges and advances
    /// each view's id counter past every existing id. Applied after
    /// load so hand-edited documents behave like interactive input.
    pub fn normalize(&mut self) {
        for view in ApparelView::ALL {
            let layout = self.layouts.layout_mut(view);
            for element in &mut layout.elements {
                element.clamp_ranges();
            }
            let max_id = layout.elements.iter().map(|e| e.id.0).max();
            if let Some(max_id) = max_id {
                layout.next_id = layout.next_id.max(max_id + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_doc() -> StudioDocument {
        let mut doc = StudioDocument {
            garment: Garment {
                id: "tee-01".to_string(),
                name: "Classic Tee".to_string(),
                kind: "t-shirt".to_string(),
                color: "white".to_string(),
                views: ViewImages {
                    front: Some("garments/tee_front.png".to_string()),
                    back: Some("garments/tee_back.png".to_string()),
                    side: None,
                },
            },
            layouts: ViewLayouts::default(),
        };
        doc.layouts.front.add("graphics/flame.png");
        doc.layouts.front.add("graphics/skull.png");
        doc
    }

    #[test]
    fn json_roundtrip() {
        let doc = basic_doc();
        let s = serde_json::to_string_pretty(&doc).unwrap();
        let de: StudioDocument = serde_json::from_str(&s).unwrap();
        assert_eq!(de.garment.id, "tee-01");
        assert_eq!(de.layouts.front.elements.len(), 2);
        assert_eq!(de.layouts.front.next_id, 2);
    }

    #[test]
    fn view_names_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ApparelView::Front).unwrap(),
            "\"front\""
        );
        let v: ApparelView = serde_json::from_str("\"side\"").unwrap();
        assert_eq!(v, ApparelView::Side);
    }

    #[test]
    fn add_assigns_sequential_ids_and_defaults() {
        let mut layout = ViewLayout::default();
        let first = layout.add("a.png").id;
        let second = layout.add("b.png").id;
        assert_eq!(first, ElementId(0));
        assert_eq!(second, ElementId(1));

        let e = layout.get(first).unwrap();
        assert_eq!((e.x, e.y), (50.0, 50.0));
        assert_eq!(e.scale, 1.0);
        assert_eq!(e.rotation, 0.0);
        assert_eq!(e.opacity, 1.0);
    }

    #[test]
    fn remove_unknown_id_is_a_noop() {
        let mut layout = ViewLayout::default();
        layout.add("a.png");
        assert!(!layout.remove(ElementId(99)));
        assert_eq!(layout.elements.len(), 1);
    }

    #[test]
    fn patch_clamps_scale_and_opacity() {
        let mut layout = ViewLayout::default();
        let id = layout.add("a.png").id;
        let patch = ElementPatch {
            scale: Some(80.0),
            opacity: Some(-0.5),
            ..ElementPatch::default()
        };
        patch.apply_to(layout.get_mut(id).unwrap());
        let e = layout.get(id).unwrap();
        assert_eq!(e.scale, SCALE_MAX);
        assert_eq!(e.opacity, 0.0);
    }

    #[test]
    fn validate_rejects_duplicate_id() {
        let mut doc = basic_doc();
        doc.layouts.front.elements[1].id = ElementId(0);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_source() {
        let mut doc = basic_doc();
        doc.layouts.front.elements[0].source = "  ".to_string();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_finite_field() {
        let mut doc = basic_doc();
        doc.layouts.front.elements[0].x = f64::NAN;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn normalize_clamps_ranges_and_advances_counter() {
        let mut doc = basic_doc();
        doc.layouts.front.elements[0].x = 140.0;
        doc.layouts.front.elements[0].scale = 0.01;
        doc.layouts.front.next_id = 0;
        doc.normalize();

        let e = &doc.layouts.front.elements[0];
        assert_eq!(e.x, 100.0);
        assert_eq!(e.scale, SCALE_MIN);
        assert_eq!(doc.layouts.front.next_id, 2);
    }

    #[test]
    fn canonical_json_folds_rotation() {
        let mut doc = basic_doc();
        doc.layouts.front.elements[0].rotation = -90.0;
        doc.layouts.front.elements[1].rotation = 725.0;
        let s = doc.to_canonical_json().unwrap();
        let de: StudioDocument = serde_json::from_str(&s).unwrap();
        assert_eq!(de.layouts.front.elements[0].rotation, 270.0);
        assert_eq!(de.layouts.front.elements[1].rotation, 5.0);
        assert_eq!(doc.layouts.front.elements[0].rotation, -90.0);
    }

    #[test]
    fn empty_view_reference_counts_as_absent() {
        let views = ViewImages {
            front: Some("  ".to_string()),
            back: Some("garments/back.png".to_string()),
            side: None,
        };
        assert_eq!(views.image_for(ApparelView::Front), None);
        assert_eq!(
            views.image_for(ApparelView::Back),
            Some("garments/back.png")
        );
        assert_eq!(views.image_for(ApparelView::Side), None);
    }
}
