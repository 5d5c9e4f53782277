use crate::chat::{ChatSession, Transport};
use crate::config::Config;
use crate::jobs::{GeoJsonSource, JobOutcome, Jobs};
use crate::ui;
use crate::widget::MapWidget;
use ratatui::layout::Rect;
use std::sync::Arc;
use tracing::debug;

/// Which pane receives typed keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Chat,
}

/// Application state
pub struct App {
    pub widget: MapWidget,
    pub chat: ChatSession,
    pub jobs: Jobs,
    /// Chat input line
    pub input: String,
    pub focus: Focus,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    source: GeoJsonSource,
    /// Inner map area in terminal cells
    map_area: Rect,
}

impl App {
    pub fn new(config: &Config, transport: Arc<dyn Transport>, width: u16, height: u16) -> crate::Result<Self> {
        let map_area = ui::map_inner(Rect::new(0, 0, width, height));
        // Braille gives 2x4 resolution per character
        let widget = MapWidget::new(
            config.widget_options(),
            map_area.width as usize * 2,
            map_area.height as usize * 4,
        )?;

        Ok(Self {
            widget,
            chat: ChatSession::new(),
            jobs: Jobs::new(transport),
            input: String::new(),
            focus: Focus::Map,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            source: config.source.clone(),
            map_area,
        })
    }

    /// Update map size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner(Rect::new(0, 0, width, height));
        self.widget
            .resize(self.map_area.width as usize * 2, self.map_area.height as usize * 4);
    }

    /// Convert terminal coords to braille pixel coords inside the map
    pub fn map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        // Each terminal cell is 2 braille pixels wide, 4 tall
        Some((((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    /// Mouse cursor in map character coordinates (for rendering the marker)
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (col, row) = self.mouse_pos?;
        self.map_pixel(col, row)?;
        Some((col - self.map_area.x, row - self.map_area.y))
    }

    /// Track the pointer for hover and coordinate readout
    pub fn pointer_at(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        match self.map_pixel(col, row) {
            Some((px, py)) => self.widget.pointer_moved(px, py),
            None => self.widget.pointer_left(),
        }
    }

    pub fn click_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.focus = Focus::Map;
            self.widget.click(px, py);
        } else {
            self.focus = Focus::Chat;
        }
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.widget.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.widget.zoom_out_at(px, py);
        }
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.widget.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    /// Pointer moved with the button held: pan the map, then track the
    /// pointer like any other move
    pub fn drag_to(&mut self, col: u16, row: u16) {
        if self.focus == Focus::Map {
            self.handle_drag(col, row);
        }
        self.pointer_at(col, row);
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Start (re)loading map data from the configured source
    pub fn request_map_data(&mut self) {
        let seq = self.jobs.request_geojson(self.source.clone());
        debug!(seq, "map data requested");
        self.widget.set_status("Loading map data…");
    }

    /// Send the input line as a chat message
    pub fn submit_chat(&mut self) {
        let text = std::mem::take(&mut self.input);
        if let Some((ticket, request)) = self.chat.submit(&text) {
            self.jobs.submit_chat(ticket, request);
        }
    }

    pub fn new_conversation(&mut self) {
        self.chat.new_conversation();
    }

    /// Apply every finished background job
    pub fn process_jobs(&mut self) {
        for outcome in self.jobs.poll() {
            self.apply(outcome);
        }
    }

    pub fn apply(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Chat { ticket, result } => {
                self.chat.complete(ticket, result);
            }
            JobOutcome::GeoJson { seq, result } => {
                if !self.jobs.is_latest_geojson(seq) {
                    debug!(seq, "dropping superseded map data");
                    return;
                }
                match result {
                    Ok(text) => {
                        // Parse failures are reported by the widget itself
                        let _ = self.widget.load(text.as_str());
                    }
                    Err(e) => self.widget.report_transport_error(&e),
                }
            }
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
