use std::collections::HashMap;

use crate::{
    assets::AssetLibrary,
    core::ScreenPoint,
    error::{MaquetteError, MaquetteResult},
    gesture::{GestureController, StageMetrics, TransformMode},
    model::{
        ApparelView, DesignElement, ElementId, ElementPatch, Garment, StudioDocument, ViewLayout,
        ViewLayouts,
    },
    render::encode_png,
    render_cpu::{PlacedOverlay, compose},
};

/// One editing session: the active garment and view, the current
/// selection, the gesture state, and a layout arena holding every
/// garment seen this session (switching back to a garment restores its
/// layouts).
///
/// Selection is scoped to the active view; switching view or garment
/// clears it along with any drag in flight.
pub struct Studio {
    assets: AssetLibrary,
    arena: HashMap<String, ViewLayouts>,
    garment: Garment,
    active_view: ApparelView,
    selection: Option<ElementId>,
    gestures: GestureController,
}

impl Studio {
    pub fn new(garment: Garment, assets: AssetLibrary) -> Self {
        Self {
            assets,
            arena: HashMap::new(),
            garment,
            active_view: ApparelView::Front,
            selection: None,
            gestures: GestureController::new(),
        }
    }

    /// Opens a session seeded from a persisted layout document.
    pub fn from_document(doc: StudioDocument, assets: AssetLibrary) -> Self {
        let mut studio = Self::new(doc.garment, assets);
        studio.arena.insert(studio.garment.id.clone(), doc.layouts);
        studio
    }

    /// Snapshot of the active garment and its layouts for persistence.
    pub fn document(&self) -> StudioDocument {
        StudioDocument {
            garment: self.garment.clone(),
            layouts: self
                .arena
                .get(&self.garment.id)
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn garment(&self) -> &Garment {
        &self.garment
    }

    pub fn active_view(&self) -> ApparelView {
        self.active_view
    }

    pub fn selection(&self) -> Option<ElementId> {
        self.selection
    }

    pub fn elements(&self, view: ApparelView) -> &[DesignElement] {
        self.arena
            .get(&self.garment.id)
            .map(|layouts| layouts.layout(view).elements.as_slice())
            .unwrap_or(&[])
    }

    pub fn switch_view(&mut self, view: ApparelView) {
        if view != self.active_view {
            self.active_view = view;
            self.selection = None;
            self.gestures.end();
        }
    }

    /// Makes `garment` active. Layouts of previously seen garments stay
    /// in the arena and come back when their garment does.
    pub fn switch_garment(&mut self, garment: Garment) {
        if garment.id != self.garment.id {
            self.active_view = ApparelView::Front;
            self.selection = None;
            self.gestures.end();
        }
        self.garment = garment;
    }

    /// Sets the selection. `None` means no element under adjustment;
    /// a `Some` id must exist in the active view.
    pub fn select(&mut self, selection: Option<ElementId>) -> MaquetteResult<()> {
        if let Some(id) = selection
            && !self.elements(self.active_view).iter().any(|e| e.id == id)
        {
            return Err(MaquetteError::validation(format!(
                "unknown element id {} in view '{}'",
                id.0, self.active_view
            )));
        }
        self.selection = selection;
        Ok(())
    }

    /// Adds an element with default placement to `view` and returns it.
    /// Fails without mutating anything when the garment has no base
    /// image for that view. Adding to the active view selects the new
    /// element.
    pub fn add_element(&mut self, view: ApparelView, source: &str) -> MaquetteResult<DesignElement> {
        if source.trim().is_empty() {
            return Err(MaquetteError::validation(
                "element image source must be non-empty",
            ));
        }
        if self.garment.views.image_for(view).is_none() {
            return Err(MaquetteError::missing_view_image(view.as_str()));
        }

        let element = self.layout_mut(view).add(source).clone();
        if view == self.active_view {
            self.selection = Some(element.id);
        }
        Ok(element)
    }

    /// Applies a partial update to one element. Out-of-range numerics
    /// are clamped by the patch itself.
    pub fn update_element(
        &mut self,
        view: ApparelView,
        id: ElementId,
        patch: &ElementPatch,
    ) -> MaquetteResult<()> {
        let element = self.layout_mut(view).get_mut(id).ok_or_else(|| {
            MaquetteError::validation(format!("unknown element id {} in view '{view}'", id.0))
        })?;
        patch.apply_to(element);
        Ok(())
    }

    /// Removes an element outright; clears the selection when the
    /// removed element was selected. Returns false for unknown ids.
    pub fn remove_element(&mut self, view: ApparelView, id: ElementId) -> bool {
        let removed = self.layout_mut(view).remove(id);
        if removed && view == self.active_view && self.selection == Some(id) {
            self.selection = None;
        }
        removed
    }

    /// Starts a drag over an element of the active view and selects it.
    pub fn begin_gesture(
        &mut self,
        mode: TransformMode,
        id: ElementId,
        pointer: ScreenPoint,
    ) -> MaquetteResult<()> {
        let view = self.active_view;
        let element = self
            .elements(view)
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| {
                MaquetteError::validation(format!("unknown element id {} in view '{view}'", id.0))
            })?;
        self.gestures.begin(mode, &element, pointer);
        self.selection = Some(id);
        Ok(())
    }

    /// Feeds the in-flight drag a new pointer position.
    pub fn update_gesture(
        &mut self,
        metrics: &StageMetrics,
        pointer: ScreenPoint,
    ) -> Option<ElementId> {
        let view = self.active_view;
        let layout = self
            .arena
            .entry(self.garment.id.clone())
            .or_default()
            .layout_mut(view);
        self.gestures.update(layout, metrics, pointer)
    }

    /// Ends the in-flight drag, if any.
    pub fn end_gesture(&mut self) {
        self.gestures.end();
    }

    pub fn gesture_mode(&self) -> Option<TransformMode> {
        self.gestures.mode()
    }

    /// Flattens `view` into a PNG. The layout is snapshotted and every
    /// image resolved before drawing starts, so the result reflects the
    /// moment of the call and fails atomically when any source cannot
    /// be decoded.
    pub fn composite_png(&mut self, view: ApparelView) -> MaquetteResult<Vec<u8>> {
        let source = self
            .garment
            .views
            .image_for(view)
            .ok_or_else(|| MaquetteError::missing_view_image(view.as_str()))?
            .to_string();

        let elements: Vec<DesignElement> = self
            .arena
            .get(&self.garment.id)
            .map(|layouts| layouts.layout(view).elements.clone())
            .unwrap_or_default();

        let base = self.assets.prepare(&source)?;
        let mut overlays = Vec::with_capacity(elements.len());
        for element in elements {
            let image = self.assets.prepare(&element.source)?;
            overlays.push(PlacedOverlay { element, image });
        }

        let frame = compose(&base, &overlays)?;
        encode_png(&frame)
    }

    fn layout_mut(&mut self, view: ApparelView) -> &mut ViewLayout {
        self.arena
            .entry(self.garment.id.clone())
            .or_default()
            .layout_mut(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garment() -> Garment {
        Garment {
            id: "tee-01".to_string(),
            name: "Classic Tee".to_string(),
            kind: "t-shirt".to_string(),
            color: "white".to_string(),
            views: crate::model::ViewImages {
                front: Some("garments/tee_front.png".to_string()),
                back: Some("garments/tee_back.png".to_string()),
                side: None,
            },
        }
    }

    fn studio() -> Studio {
        Studio::new(garment(), AssetLibrary::new("assets"))
    }

    #[test]
    fn add_element_defaults_and_selects() {
        let mut studio = studio();
        let element = studio.add_element(ApparelView::Front, "graphics/flame.png").unwrap();
        assert_eq!((element.x, element.y), (50.0, 50.0));
        assert_eq!(element.scale, 1.0);
        assert_eq!(studio.selection(), Some(element.id));
        assert_eq!(studio.elements(ApparelView::Front).len(), 1);
    }

    #[test]
    fn add_element_on_absent_view_fails_without_mutation() {
        let mut studio = studio();
        let err = studio
            .add_element(ApparelView::Side, "graphics/flame.png")
            .unwrap_err();
        assert!(matches!(err, MaquetteError::MissingViewImage(_)));
        assert!(studio.elements(ApparelView::Side).is_empty());
        assert_eq!(studio.selection(), None);
    }

    #[test]
    fn add_to_inactive_view_keeps_selection() {
        let mut studio = studio();
        let front = studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        studio.add_element(ApparelView::Back, "graphics/b.png").unwrap();
        assert_eq!(studio.selection(), Some(front.id));
        assert_eq!(studio.elements(ApparelView::Back).len(), 1);
    }

    #[test]
    fn switch_view_clears_selection() {
        let mut studio = studio();
        studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        assert!(studio.selection().is_some());
        studio.switch_view(ApparelView::Back);
        assert_eq!(studio.selection(), None);
        assert_eq!(studio.active_view(), ApparelView::Back);
    }

    #[test]
    fn remove_selected_element_clears_selection() {
        let mut studio = studio();
        let a = studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        let b = studio.add_element(ApparelView::Front, "graphics/b.png").unwrap();
        assert_eq!(studio.selection(), Some(b.id));

        assert!(studio.remove_element(ApparelView::Front, a.id));
        assert_eq!(studio.selection(), Some(b.id));

        assert!(studio.remove_element(ApparelView::Front, b.id));
        assert_eq!(studio.selection(), None);
        assert!(!studio.remove_element(ApparelView::Front, b.id));
    }

    #[test]
    fn update_element_clamps_through_patch() {
        let mut studio = studio();
        let e = studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        studio
            .update_element(
                ApparelView::Front,
                e.id,
                &ElementPatch {
                    scale: Some(99.0),
                    rotation: Some(-30.0),
                    ..ElementPatch::default()
                },
            )
            .unwrap();
        let e = &studio.elements(ApparelView::Front)[0];
        assert_eq!(e.scale, crate::model::SCALE_MAX);
        assert_eq!(e.rotation, -30.0);
    }

    #[test]
    fn update_unknown_element_errors() {
        let mut studio = studio();
        let err = studio
            .update_element(ApparelView::Front, ElementId(7), &ElementPatch::default())
            .unwrap_err();
        assert!(matches!(err, MaquetteError::Validation(_)));
    }

    #[test]
    fn select_validates_against_active_view() {
        let mut studio = studio();
        let front = studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        studio.select(None).unwrap();
        studio.select(Some(front.id)).unwrap();

        studio.switch_view(ApparelView::Back);
        assert!(studio.select(Some(front.id)).is_err());
    }

    #[test]
    fn switch_garment_retains_layouts_per_garment() {
        let mut studio = studio();
        studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();

        let other = Garment {
            id: "hoodie-02".to_string(),
            name: "Zip Hoodie".to_string(),
            ..garment()
        };
        studio.switch_garment(other);
        assert!(studio.elements(ApparelView::Front).is_empty());
        assert_eq!(studio.selection(), None);

        studio.switch_garment(garment());
        assert_eq!(studio.elements(ApparelView::Front).len(), 1);
    }

    #[test]
    fn gesture_flow_moves_element_in_active_view() {
        let mut studio = studio();
        let e = studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        let metrics = StageMetrics::new(ScreenPoint::new(0.0, 0.0), 600.0, 800.0);

        studio
            .begin_gesture(TransformMode::Moving, e.id, ScreenPoint::new(0.0, 0.0))
            .unwrap();
        assert_eq!(studio.gesture_mode(), Some(TransformMode::Moving));

        let moved = studio.update_gesture(&metrics, ScreenPoint::new(60.0, 80.0));
        assert_eq!(moved, Some(e.id));
        let e = &studio.elements(ApparelView::Front)[0];
        assert_eq!((e.x, e.y), (60.0, 60.0));

        studio.end_gesture();
        assert_eq!(studio.gesture_mode(), None);
    }

    #[test]
    fn begin_gesture_unknown_element_errors() {
        let mut studio = studio();
        assert!(
            studio
                .begin_gesture(
                    TransformMode::Rotating,
                    ElementId(3),
                    ScreenPoint::new(0.0, 0.0)
                )
                .is_err()
        );
    }

    #[test]
    fn document_roundtrip_preserves_layouts() {
        let mut studio = studio();
        studio.add_element(ApparelView::Front, "graphics/a.png").unwrap();
        let doc = studio.document();
        assert_eq!(doc.layouts.front.elements.len(), 1);

        let restored = Studio::from_document(doc, AssetLibrary::new("assets"));
        assert_eq!(restored.elements(ApparelView::Front).len(), 1);
    }
}
