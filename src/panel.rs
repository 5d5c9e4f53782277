//! Optional controls around the map.
//!
//! Which controls exist is decided once, when the panel is bound. Every
//! update is a no-op for a control that was not bound.

use crate::map::BasemapSet;
use glam::DVec2;
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    BasemapSelector,
    ResetButton,
    OverlayToggle,
    ZoomReadout,
    CoordReadout,
    FeatureCount,
    FeatureInfo,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::BasemapSelector,
        Control::ResetButton,
        Control::OverlayToggle,
        Control::ZoomReadout,
        Control::CoordReadout,
        Control::FeatureCount,
        Control::FeatureInfo,
    ];
}

impl FromStr for Control {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basemap" => Ok(Control::BasemapSelector),
            "reset" => Ok(Control::ResetButton),
            "toggle" => Ok(Control::OverlayToggle),
            "zoom" => Ok(Control::ZoomReadout),
            "coords" => Ok(Control::CoordReadout),
            "count" => Ok(Control::FeatureCount),
            "info" => Ok(Control::FeatureInfo),
            other => Err(format!("unknown control '{}'", other)),
        }
    }
}

/// Controls present in this widget instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSet(HashSet<Control>);

impl ControlSet {
    pub fn all() -> Self {
        Self(Control::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn contains(&self, control: Control) -> bool {
        self.0.contains(&control)
    }
}

impl FromIterator<Control> for ControlSet {
    fn from_iter<I: IntoIterator<Item = Control>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Side panel text for the selected feature
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InfoPanel {
    text: Option<String>,
}

impl InfoPanel {
    pub fn show(&mut self, text: String) {
        self.text = Some(text);
    }

    pub fn clear(&mut self) {
        self.text = None;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// What a bound control asks the widget to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    SelectBasemap(String),
    Reset,
    ToggleOverlay,
}

#[derive(Debug, Clone)]
struct BasemapSelector {
    names: Vec<String>,
    current: String,
}

/// Key-activated control
#[derive(Debug, Clone, Copy)]
pub struct Button {
    pub key: char,
    pub label: &'static str,
}

pub struct ControlPanel {
    basemap_selector: Option<BasemapSelector>,
    reset_button: Option<Button>,
    toggle_button: Option<Button>,
    zoom_readout: Option<String>,
    coord_readout: Option<String>,
    feature_count: Option<String>,
    feature_info: bool,
}

impl ControlPanel {
    /// Resolve the available controls once
    pub fn bind(controls: &ControlSet, basemaps: &BasemapSet, active: &str) -> Self {
        let readout = |c: Control| controls.contains(c).then(String::new);
        Self {
            basemap_selector: controls.contains(Control::BasemapSelector).then(|| BasemapSelector {
                names: basemaps.names().map(str::to_string).collect(),
                current: active.to_string(),
            }),
            reset_button: controls.contains(Control::ResetButton).then_some(Button {
                key: 'r',
                label: "reset",
            }),
            toggle_button: controls.contains(Control::OverlayToggle).then_some(Button {
                key: 'o',
                label: "overlay",
            }),
            zoom_readout: readout(Control::ZoomReadout),
            coord_readout: readout(Control::CoordReadout),
            feature_count: readout(Control::FeatureCount),
            feature_info: controls.contains(Control::FeatureInfo),
        }
    }

    /// Capability check
    pub fn has(&self, control: Control) -> bool {
        match control {
            Control::BasemapSelector => self.basemap_selector.is_some(),
            Control::ResetButton => self.reset_button.is_some(),
            Control::OverlayToggle => self.toggle_button.is_some(),
            Control::ZoomReadout => self.zoom_readout.is_some(),
            Control::CoordReadout => self.coord_readout.is_some(),
            Control::FeatureCount => self.feature_count.is_some(),
            Control::FeatureInfo => self.feature_info,
        }
    }

    /// Map a key press to the action of a bound control
    pub fn action_for_key(&self, key: char) -> Option<ControlAction> {
        if let Some(selector) = &self.basemap_selector {
            if key == 'm' {
                let pos = selector.names.iter().position(|n| *n == selector.current).unwrap_or(0);
                let next = selector.names.get((pos + 1) % selector.names.len().max(1))?;
                return Some(ControlAction::SelectBasemap(next.clone()));
            }
            if let Some(digit) = key.to_digit(10).filter(|d| *d >= 1) {
                let name = selector.names.get(digit as usize - 1)?;
                return Some(ControlAction::SelectBasemap(name.clone()));
            }
        }
        if self.reset_button.is_some_and(|b| b.key == key) {
            return Some(ControlAction::Reset);
        }
        if self.toggle_button.is_some_and(|b| b.key == key) {
            return Some(ControlAction::ToggleOverlay);
        }
        None
    }

    pub fn on_basemap_changed(&mut self, name: &str) {
        if let Some(selector) = self.basemap_selector.as_mut() {
            selector.current = name.to_string();
        }
    }

    pub fn on_zoom_changed(&mut self, zoom: f64) {
        if let Some(readout) = self.zoom_readout.as_mut() {
            *readout = format!("Zoom: {}", zoom);
        }
    }

    /// Pointer position in lon/lat
    pub fn on_pointer_moved(&mut self, lonlat: DVec2) {
        if let Some(readout) = self.coord_readout.as_mut() {
            *readout = format_coords(lonlat);
        }
    }

    pub fn on_feature_count(&mut self, count: usize) {
        if let Some(readout) = self.feature_count.as_mut() {
            *readout = format!("Features: {}", count);
        }
    }

    pub fn basemap(&self) -> Option<&str> {
        self.basemap_selector.as_ref().map(|s| s.current.as_str())
    }

    pub fn basemap_names(&self) -> &[String] {
        self.basemap_selector.as_ref().map_or(&[][..], |s| s.names.as_slice())
    }

    pub fn zoom_text(&self) -> Option<&str> {
        self.zoom_readout.as_deref().filter(|s| !s.is_empty())
    }

    pub fn coord_text(&self) -> Option<&str> {
        self.coord_readout.as_deref().filter(|s| !s.is_empty())
    }

    pub fn feature_count_text(&self) -> Option<&str> {
        self.feature_count.as_deref().filter(|s| !s.is_empty())
    }

    pub fn shows_info(&self) -> bool {
        self.feature_info
    }

    /// Bound buttons, for key hints
    pub fn buttons(&self) -> impl Iterator<Item = Button> + '_ {
        self.reset_button.into_iter().chain(self.toggle_button)
    }
}

/// `lat, lng` with 5 decimals
pub fn format_coords(lonlat: DVec2) -> String {
    format!("{:.5}, {:.5}", lonlat.y, lonlat.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(controls: ControlSet) -> ControlPanel {
        ControlPanel::bind(&controls, &BasemapSet::default(), "osm")
    }

    #[test]
    fn test_parse_controls() {
        assert_eq!("coords".parse::<Control>(), Ok(Control::CoordReadout));
        assert_eq!(" Reset ".parse::<Control>(), Ok(Control::ResetButton));
        assert!("slider".parse::<Control>().is_err());
    }

    #[test]
    fn test_absent_controls_ignore_everything() {
        let mut p = panel(ControlSet::none());
        for key in ['m', '1', 'r', 'o'] {
            assert_eq!(p.action_for_key(key), None);
        }
        p.on_zoom_changed(5.0);
        p.on_pointer_moved(DVec2::new(1.0, 2.0));
        p.on_feature_count(3);
        p.on_basemap_changed("topo");
        assert_eq!(p.zoom_text(), None);
        assert_eq!(p.coord_text(), None);
        assert_eq!(p.feature_count_text(), None);
        assert_eq!(p.basemap(), None);
        assert!(Control::ALL.iter().all(|c| !p.has(*c)));
    }

    #[test]
    fn test_key_actions() {
        let p = panel(ControlSet::all());
        assert_eq!(
            p.action_for_key('2'),
            Some(ControlAction::SelectBasemap("satellite".into()))
        );
        assert_eq!(p.action_for_key('9'), None);
        assert_eq!(
            p.action_for_key('m'),
            Some(ControlAction::SelectBasemap("satellite".into()))
        );
        assert_eq!(p.action_for_key('r'), Some(ControlAction::Reset));
        assert_eq!(p.action_for_key('o'), Some(ControlAction::ToggleOverlay));
        assert_eq!(p.action_for_key('x'), None);
    }

    #[test]
    fn test_cycle_follows_current() {
        let mut p = panel(ControlSet::all());
        p.on_basemap_changed("topo");
        assert_eq!(p.basemap(), Some("topo"));
        assert_eq!(
            p.action_for_key('m'),
            Some(ControlAction::SelectBasemap("osm".into()))
        );
    }

    #[test]
    fn test_readouts() {
        let mut p = panel([Control::ZoomReadout, Control::CoordReadout].into_iter().collect());
        p.on_zoom_changed(8.0);
        assert_eq!(p.zoom_text(), Some("Zoom: 8"));
        p.on_pointer_moved(DVec2::new(4.553, 50.8999));
        assert_eq!(p.coord_text(), Some("50.89990, 4.55300"));
        assert!(!p.has(Control::ResetButton));
        assert_eq!(p.action_for_key('r'), None);
    }

    #[test]
    fn test_info_panel() {
        let mut info = InfoPanel::default();
        assert_eq!(info.text(), None);
        info.show("{}".into());
        assert_eq!(info.text(), Some("{}"));
        info.clear();
        assert_eq!(info.text(), None);
    }
}
