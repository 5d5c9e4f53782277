use crate::braille::BrailleCanvas;
use crate::map::geometry::{
    clip_segment, draw_circle, draw_dashed_line, draw_line, draw_ring, draw_thick_line,
};
use crate::map::projection::Viewport;
use crate::map::registry::FeatureRegistry;
use crate::map::style::{Style, Symbol};
use crate::map::surface::{marker_pixels, MapSurface};
use glam::DVec2;

/// Labels are only placed once the view is this close
const LABEL_MIN_ZOOM: f64 = 6.0;

/// Fill opacity from which markers are drawn solid
const SOLID_MARKER_OPACITY: f64 = 0.5;

/// A text label at a character position
pub type Label = (u16, u16, String);

/// Draw the visible overlay back-to-front and collect marker labels
pub fn render_overlay(canvas: &mut BrailleCanvas, surface: &MapSurface, registry: &FeatureRegistry) -> Vec<Label> {
    let viewport = &surface.viewport;
    let mut labels = Vec::new();

    for layer in surface.visible_layers() {
        let Some(feature) = registry.get(layer.feature) else {
            continue;
        };
        let shape = &feature.shape;

        match &layer.symbol {
            Symbol::Path(style) => {
                for line in &shape.lines {
                    draw_path(canvas, line, viewport, style, false);
                }
                for rings in &shape.polygons {
                    for ring in rings {
                        draw_path(canvas, ring, viewport, style, true);
                    }
                }
                // Points inside mixed collections still get a dot
                for p in &shape.points {
                    let (px, py) = viewport.project(p.x, p.y);
                    draw_circle(canvas, px, py, 1, style.color);
                }
            }
            Symbol::Marker { radius, style } => {
                let r = marker_pixels(*radius);
                for p in &shape.points {
                    let (px, py) = viewport.project(p.x, p.y);
                    if !viewport.is_visible(px, py) {
                        continue;
                    }
                    if style.fill_opacity >= SOLID_MARKER_OPACITY {
                        draw_circle(canvas, px, py, r, style.color);
                    } else {
                        draw_ring(canvas, px, py, r, style.fill_color);
                    }

                    if viewport.zoom >= LABEL_MIN_ZOOM && px >= 0 && py >= 0 {
                        if let Some(name) = feature.name() {
                            let char_x = (px / 2) as u16;
                            let char_y = (py / 4) as u16;
                            if let Some(label_x) = char_x.checked_add(2) {
                                labels.push((label_x, char_y, name.to_string()));
                            }
                        }
                    }
                }
            }
        }
    }

    labels
}

/// Pixels kept around the canvas when clipping, so thick strokes reach the edge
const CLIP_MARGIN: f64 = 2.0;

/// Draw a path with viewport culling, honouring weight and dash pattern
fn draw_path(canvas: &mut BrailleCanvas, path: &[DVec2], viewport: &Viewport, style: &Style, closed: bool) {
    if path.len() < 2 {
        return;
    }

    let dash = style
        .dash_array
        .and_then(|d| d.split([',', ' ']).next())
        .and_then(|d| d.trim().parse::<i32>().ok());

    let clip_min = DVec2::splat(-CLIP_MARGIN);
    let clip_max = DVec2::new(viewport.width as f64, viewport.height as f64) + CLIP_MARGIN;

    let closing = closed.then(|| path[0]);
    let mut prev: Option<(DVec2, DVec2)> = None;

    for &p in path.iter().chain(closing.iter()) {
        let projected = viewport.project_f(p);

        if let Some((prev_geo, prev_px)) = prev {
            // Skip segments wrapping across the antimeridian
            let wraps = (p.x - prev_geo.x).abs() > 180.0;
            let clipped = if wraps {
                None
            } else {
                clip_segment(prev_px, projected, clip_min, clip_max)
            };

            if let Some((a, b)) = clipped {
                let (x0, y0) = (a.x.round() as i32, a.y.round() as i32);
                let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
                if style.weight >= 4.0 {
                    draw_thick_line(canvas, x0, y0, x1, y1, style.color);
                } else if let Some(on) = dash {
                    draw_dashed_line(canvas, x0, y0, x1, y1, on, style.color);
                } else {
                    draw_line(canvas, x0, y0, x1, y1, style.color);
                }
            }
        }

        prev = Some((p, projected));
    }
}
