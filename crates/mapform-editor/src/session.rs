//! The draw session: which tool is active and the in-progress shape's
//! ephemeral state. One session exists per map, whatever the number of
//! fields; it is owned by the router and passed by reference to the code
//! that needs it.

use crate::event::SurfaceEffect;
use crate::policy::DrawTool;
use mapform_core::measure::{format_length, polyline_length};
use mapform_core::{FieldId, Position, validate_position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Idle,
    DrawingPoint,
    DrawingLine,
    DrawingPolygon,
    Editing,
    Dragging,
    Deleting,
}

impl DrawMode {
    pub fn for_tool(tool: DrawTool) -> Self {
        match tool {
            DrawTool::Marker => DrawMode::DrawingPoint,
            DrawTool::Line => DrawMode::DrawingLine,
            DrawTool::Polygon | DrawTool::Rectangle => DrawMode::DrawingPolygon,
            DrawTool::Reshape => DrawMode::Editing,
            DrawTool::Drag => DrawMode::Dragging,
            DrawTool::Delete => DrawMode::Deleting,
        }
    }

    pub fn is_drawing(self) -> bool {
        matches!(
            self,
            DrawMode::DrawingPoint | DrawMode::DrawingLine | DrawMode::DrawingPolygon
        )
    }
}

/// Running length of the line being drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveMeasurement {
    vertices: Vec<Position>,
    pointer: Option<Position>,
}

impl LiveMeasurement {
    /// Committed vertices plus the pointer position, in meters.
    pub fn length(&self) -> f64 {
        match &self.pointer {
            Some(p) => {
                let mut path = self.vertices.clone();
                path.push(p.clone());
                polyline_length(&path)
            }
            None => polyline_length(&self.vertices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

#[derive(Debug, Default)]
pub struct DrawSession {
    mode: DrawMode,
    owner: Option<FieldId>,
    measurement: Option<LiveMeasurement>,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == DrawMode::Idle
    }

    /// Field the session is scoped to, if any.
    pub fn owner(&self) -> Option<FieldId> {
        self.owner
    }

    pub fn measurement(&self) -> Option<&LiveMeasurement> {
        self.measurement.as_ref()
    }

    /// Enter the mode for `tool`. A session already in progress is
    /// cancelled first.
    pub fn activate(&mut self, tool: DrawTool, owner: Option<FieldId>) -> Vec<SurfaceEffect> {
        let effects = self.cancel();
        self.mode = DrawMode::for_tool(tool);
        self.owner = owner;
        if self.mode == DrawMode::DrawingLine {
            self.measurement = Some(LiveMeasurement::default());
        }
        log::debug!("draw session: {:?} (owner {:?})", self.mode, self.owner);
        effects
    }

    pub fn vertex_added(&mut self, at: Position) -> Vec<SurfaceEffect> {
        let Some(m) = self.measurement.as_mut() else {
            return Vec::new();
        };
        if let Err(e) = validate_position(&at) {
            log::warn!("dropping vertex {at:?}: {e}");
            return Vec::new();
        }
        m.vertices.push(at);
        m.pointer = None;
        Vec::new()
    }

    pub fn pointer_moved(&mut self, at: Position) -> Vec<SurfaceEffect> {
        let Some(m) = self.measurement.as_mut() else {
            return Vec::new();
        };
        if m.vertices.is_empty() {
            return Vec::new();
        }
        if let Err(e) = validate_position(&at) {
            log::debug!("ignoring pointer at {at:?}: {e}");
            return Vec::new();
        }
        m.pointer = Some(at.clone());
        vec![SurfaceEffect::ShowMeasurement {
            at,
            label: format_length(m.length()),
        }]
    }

    /// Back to idle after a commit or a user-side cancel.
    pub fn end(&mut self) -> Vec<SurfaceEffect> {
        let had_measurement = self.measurement.take().is_some();
        self.mode = DrawMode::Idle;
        self.owner = None;
        if had_measurement {
            vec![SurfaceEffect::HideMeasurement]
        } else {
            Vec::new()
        }
    }

    /// Abort whatever is in progress without committing a partial shape.
    pub fn cancel(&mut self) -> Vec<SurfaceEffect> {
        if self.is_idle() {
            return Vec::new();
        }
        log::debug!("draw session cancelled in {:?}", self.mode);
        let mut effects = Vec::new();
        if self.mode.is_drawing() {
            effects.push(SurfaceEffect::CancelDrawing);
        }
        effects.extend(self.end());
        effects
    }
}
