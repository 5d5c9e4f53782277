//! Hover, click and reset handling for overlay features.
//!
//! Handlers are plain functions registered per feature id in a
//! [`BindingTable`]; [`dispatch`] looks them up and runs them against an
//! [`Interaction`] context borrowing the widget's parts. Selection always
//! wins over hover: a selected feature keeps its highlight while hovered.

use crate::map::feature::FeatureId;
use crate::map::registry::FeatureRegistry;
use crate::map::style::{symbol_for, StyleRole};
use crate::map::surface::MapSurface;
use crate::panel::InfoPanel;
use tracing::{debug, trace};

/// Zoom a clicked point feature is raised to, at least
pub const POINT_FOCUS_ZOOM: f64 = 15.0;

/// Pointer events delivered to a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEvent {
    Enter,
    Leave,
    Click,
}

pub type Handler = fn(&mut Interaction<'_>, FeatureId);

/// Handlers of one feature
#[derive(Clone, Copy, Default)]
pub struct Bindings {
    pub enter: Option<Handler>,
    pub leave: Option<Handler>,
    pub click: Option<Handler>,
}

impl Bindings {
    /// Standard hover/click behaviour of an overlay feature
    pub fn feature() -> Self {
        Self {
            enter: Some(on_enter),
            leave: Some(on_leave),
            click: Some(on_click),
        }
    }

    pub fn handler(&self, event: PointerEvent) -> Option<Handler> {
        match event {
            PointerEvent::Enter => self.enter,
            PointerEvent::Leave => self.leave,
            PointerEvent::Click => self.click,
        }
    }
}

/// Dispatch table indexed by feature id
#[derive(Default)]
pub struct BindingTable {
    table: Vec<Bindings>,
}

impl BindingTable {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            table: Vec::with_capacity(n),
        }
    }

    pub fn register(&mut self, id: FeatureId, bindings: Bindings) {
        if self.table.len() <= id.index() {
            self.table.resize(id.index() + 1, Bindings::default());
        }
        self.table[id.index()] = bindings;
    }

    pub fn handler(&self, id: FeatureId, event: PointerEvent) -> Option<Handler> {
        self.table.get(id.index())?.handler(event)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Observable state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Hovered(FeatureId),
    Selected(FeatureId),
    HoveredSelected {
        hovered: FeatureId,
        selected: FeatureId,
    },
}

/// Hover and selection tracking for one widget
#[derive(Debug, Default)]
pub struct InteractionController {
    selected: Option<FeatureId>,
    hovered: Option<FeatureId>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<FeatureId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    pub fn state(&self) -> InteractionState {
        match (self.hovered, self.selected) {
            (None, None) => InteractionState::Idle,
            (Some(h), None) => InteractionState::Hovered(h),
            (None, Some(s)) => InteractionState::Selected(s),
            (Some(hovered), Some(selected)) => InteractionState::HoveredSelected { hovered, selected },
        }
    }

    /// Forget hover and selection, e.g. when the overlay is replaced
    pub fn clear(&mut self) {
        self.selected = None;
        self.hovered = None;
    }
}

/// A style change applied while handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restyle {
    pub feature: FeatureId,
    pub role: StyleRole,
}

/// Everything a handler may touch
pub struct Interaction<'a> {
    pub controller: &'a mut InteractionController,
    pub registry: &'a FeatureRegistry,
    pub surface: &'a mut MapSurface,
    pub info: &'a mut InfoPanel,
    restyles: Vec<Restyle>,
}

impl<'a> Interaction<'a> {
    pub fn new(
        controller: &'a mut InteractionController,
        registry: &'a FeatureRegistry,
        surface: &'a mut MapSurface,
        info: &'a mut InfoPanel,
    ) -> Self {
        Self {
            controller,
            registry,
            surface,
            info,
            restyles: Vec::new(),
        }
    }

    /// Role a feature falls back to when it stops being selected
    fn unselected_role(&self, id: FeatureId) -> StyleRole {
        if self.controller.hovered == Some(id) {
            StyleRole::Hover
        } else {
            StyleRole::Default
        }
    }

    fn restyle(&mut self, id: FeatureId, role: StyleRole) {
        if let Some(feature) = self.registry.get(id) {
            self.surface.set_symbol(id, symbol_for(feature, role));
            self.restyles.push(Restyle { feature: id, role });
        }
    }

    /// Style changes applied so far, in order
    pub fn into_restyles(self) -> Vec<Restyle> {
        self.restyles
    }
}

/// Run the handler bound to `(id, event)`, if any
pub fn dispatch(mut ctx: Interaction<'_>, id: FeatureId, event: PointerEvent) -> Vec<Restyle> {
    match ctx.registry.bindings().handler(id, event) {
        Some(handler) => handler(&mut ctx, id),
        None => trace!(?id, ?event, "no handler bound"),
    }
    ctx.into_restyles()
}

fn on_enter(ctx: &mut Interaction<'_>, id: FeatureId) {
    let selected = ctx.controller.selected;

    if let Some(prev) = ctx.controller.hovered.filter(|h| *h != id) {
        if selected != Some(prev) {
            ctx.restyle(prev, StyleRole::Default);
        }
    }
    ctx.controller.hovered = Some(id);

    if selected != Some(id) {
        ctx.restyle(id, StyleRole::Hover);
        ctx.surface.bring_to_front(id);
    }
}

fn on_leave(ctx: &mut Interaction<'_>, id: FeatureId) {
    if ctx.controller.hovered == Some(id) {
        ctx.controller.hovered = None;
    }
    if ctx.controller.selected != Some(id) {
        ctx.restyle(id, StyleRole::Default);
    }
}

fn on_click(ctx: &mut Interaction<'_>, id: FeatureId) {
    let registry = ctx.registry;
    let Some(feature) = registry.get(id) else {
        return;
    };

    if let Some(prev) = ctx.controller.selected.filter(|s| *s != id) {
        let role = ctx.unselected_role(prev);
        ctx.restyle(prev, role);
    }
    ctx.controller.selected = Some(id);
    ctx.restyle(id, StyleRole::Highlight);

    ctx.info.show(feature.properties_text());

    match feature.bounds {
        Some(b) if b.has_extent() => ctx.surface.fit_to_bounds(Some(b)),
        Some(b) => ctx.surface.focus_point(b.center(), POINT_FOCUS_ZOOM),
        None => {}
    }
    debug!(?id, name = feature.name(), "feature selected");
}

/// Clear the selection and show the whole overlay
pub fn reset(mut ctx: Interaction<'_>) -> Vec<Restyle> {
    if let Some(prev) = ctx.controller.selected.take() {
        let role = ctx.unselected_role(prev);
        ctx.restyle(prev, role);
    }
    let region = ctx.registry.fit_bounds().ok();
    ctx.surface.fit_to_bounds(region);
    ctx.info.clear();
    ctx.into_restyles()
}
