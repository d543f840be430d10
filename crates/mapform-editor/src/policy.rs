//! Draw control policy: which toolbar tools a field offers.
//!
//! | Tool | Visible when |
//! |------|--------------|
//! | draw marker / line / polygon | field accepts that family |
//! | draw rectangle | collection or generic field |
//! | drag | (accepts points or collection/generic) and modifiable |
//! | reshape | (accepts lines or polygons or collection/generic) and modifiable |
//! | delete | modifiable |
//!
//! A read-only field only ever shows the draw tools needed for initial
//! capture; once it holds a value, nothing is shown.

use mapform_core::Capabilities;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A toolbar tool of the drawing library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawTool {
    Marker,
    Line,
    Polygon,
    Rectangle,
    Drag,
    Reshape,
    Delete,
}

impl DrawTool {
    pub const ALL: [DrawTool; 7] = [
        DrawTool::Marker,
        DrawTool::Line,
        DrawTool::Polygon,
        DrawTool::Rectangle,
        DrawTool::Drag,
        DrawTool::Reshape,
        DrawTool::Delete,
    ];

    pub fn is_draw(self) -> bool {
        matches!(
            self,
            DrawTool::Marker | DrawTool::Line | DrawTool::Polygon | DrawTool::Rectangle
        )
    }
}

/// Visibility of every toolbar tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawControls {
    pub draw_marker: bool,
    pub draw_line: bool,
    pub draw_polygon: bool,
    pub draw_rectangle: bool,
    pub drag: bool,
    pub reshape: bool,
    pub delete: bool,
}

impl DrawControls {
    /// Nothing visible.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_field(caps: Capabilities, modifiable: bool, has_value: bool) -> Self {
        if !modifiable && has_value {
            return Self::none();
        }
        let any = caps.is_collection_or_generic;
        Self {
            draw_marker: caps.accepts_point,
            draw_line: caps.accepts_line,
            draw_polygon: caps.accepts_polygon,
            draw_rectangle: any,
            drag: (caps.accepts_point || any) && modifiable,
            reshape: (caps.accepts_line || caps.accepts_polygon || any) && modifiable,
            delete: modifiable,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            draw_marker: self.draw_marker || other.draw_marker,
            draw_line: self.draw_line || other.draw_line,
            draw_polygon: self.draw_polygon || other.draw_polygon,
            draw_rectangle: self.draw_rectangle || other.draw_rectangle,
            drag: self.drag || other.drag,
            reshape: self.reshape || other.reshape,
            delete: self.delete || other.delete,
        }
    }

    pub fn allows(&self, tool: DrawTool) -> bool {
        match tool {
            DrawTool::Marker => self.draw_marker,
            DrawTool::Line => self.draw_line,
            DrawTool::Polygon => self.draw_polygon,
            DrawTool::Rectangle => self.draw_rectangle,
            DrawTool::Drag => self.drag,
            DrawTool::Reshape => self.reshape,
            DrawTool::Delete => self.delete,
        }
    }

    pub fn visible_tools(&self) -> SmallVec<[DrawTool; 7]> {
        DrawTool::ALL
            .into_iter()
            .filter(|t| self.allows(*t))
            .collect()
    }
}
