//! Interactive drawing state machine.
//!
//! [`reduce`] is a pure function of the current state, one event and a
//! read-only view of the committed shapes. It returns the next state and a
//! list of [`Effect`]s; applying those to the arena and the renderer is the
//! caller's job (see [`crate::state::PageSession::dispatch`]).
//!
//! All points handed to the reducer are in canvas space.

use crate::shapes::{Geometry, Grip, Metadata, Shape, ShapeArena, ShapeId, Style, parse_price};
use crate::transform::{Bounds, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Cursor,
    Poi,
    Ifvg,
    Bos,
    Circle,
    Delete,
}

impl Tool {
    pub fn is_drawing(&self) -> bool {
        matches!(self, Tool::Poi | Tool::Ifvg | Tool::Bos | Tool::Circle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Cursor => "cursor",
            Tool::Poi => "poi",
            Tool::Ifvg => "ifvg",
            Tool::Bos => "bos",
            Tool::Circle => "circle",
            Tool::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        match name.to_ascii_lowercase().as_str() {
            "cursor" => Some(Tool::Cursor),
            "poi" => Some(Tool::Poi),
            "ifvg" => Some(Tool::Ifvg),
            "bos" => Some(Tool::Bos),
            "circle" => Some(Tool::Circle),
            "delete" => Some(Tool::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawState {
    /// Cursor mode, nothing grabbed.
    #[default]
    Idle,
    /// A drawing tool is selected and waiting for a pointer press.
    Armed { tool: Tool, color: String },
    Drawing {
        tool: Tool,
        color: String,
        start: Point,
    },
    /// Cursor mode, dragging part of a committed shape.
    Editing {
        id: ShapeId,
        grip: Grip,
        origin: Geometry,
        from: Point,
    },
}

impl DrawState {
    /// Tool the user currently has selected.
    pub fn tool(&self) -> Tool {
        match self {
            DrawState::Idle | DrawState::Editing { .. } => Tool::Cursor,
            DrawState::Armed { tool, .. } | DrawState::Drawing { tool, .. } => *tool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    SelectTool { tool: Tool, color: String },
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    DeleteKey,
    DoubleClick(Point),
    PriceEntered { id: ShapeId, text: String },
    ClearAll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowPreview(Geometry),
    UpdatePreview(Geometry),
    HidePreview,
    Commit(Shape),
    Remove(Vec<ShapeId>),
    Select(ShapeId),
    DeselectAll,
    SetInteractive(bool),
    Reshape { id: ShapeId, geometry: Geometry },
    PromptPrice { id: ShapeId, current: f64 },
    SetPrice { id: ShapeId, price: f64 },
    ClearAll,
}

/// Minimum committed sizes, in canvas px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gates {
    pub min_box_size: f64,
    pub min_circle_radius: f64,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            min_box_size: 10.0,
            min_circle_radius: 5.0,
        }
    }
}

impl Gates {
    pub fn admits(&self, geometry: &Geometry) -> bool {
        match geometry {
            Geometry::Box(b) => b.width >= self.min_box_size && b.height >= self.min_box_size,
            Geometry::Circle { radius, .. } => *radius >= self.min_circle_radius,
            Geometry::Line { .. } => true,
        }
    }
}

pub struct DrawContext<'a> {
    pub shapes: &'a ShapeArena,
    pub gates: Gates,
}

/// Preview geometry for `tool` from the press point to the current pointer.
pub fn preview_geometry(tool: Tool, start: Point, current: Point) -> Option<Geometry> {
    match tool {
        Tool::Poi | Tool::Ifvg => Some(Geometry::Box(Bounds::from_corners(start, current))),
        Tool::Circle => Some(Geometry::Circle {
            center: start,
            radius: start.distance(current),
        }),
        Tool::Bos => Some(Geometry::Line {
            start,
            end: current,
        }),
        Tool::Cursor | Tool::Delete => None,
    }
}

fn new_shape(tool: Tool, color: &str, geometry: Geometry) -> Shape {
    let label = match tool {
        Tool::Ifvg => "IFVG".to_string(),
        _ => String::new(),
    };
    let mut shape = Shape::new(geometry, Style::solid(color), Metadata { price: 0.0, label });
    // Shapes committed while a drawing tool is armed stay inert until the
    // user returns to the cursor tool.
    shape.interactive = false;
    shape
}

pub fn reduce(state: DrawState, event: &DrawEvent, ctx: &DrawContext<'_>) -> (DrawState, Vec<Effect>) {
    let mut effects = Vec::new();
    let next = match (state, event) {
        (state, DrawEvent::SelectTool { tool, color }) => {
            if matches!(state, DrawState::Drawing { .. }) {
                effects.push(Effect::HidePreview);
            }
            match tool {
                Tool::Delete => {
                    let selected = ctx.shapes.selected();
                    if !selected.is_empty() {
                        effects.push(Effect::Remove(selected));
                    }
                    effects.push(Effect::SetInteractive(true));
                    DrawState::Idle
                }
                Tool::Cursor => {
                    effects.push(Effect::SetInteractive(true));
                    DrawState::Idle
                }
                drawing => {
                    effects.push(Effect::SetInteractive(false));
                    DrawState::Armed {
                        tool: *drawing,
                        color: color.clone(),
                    }
                }
            }
        }

        (DrawState::Armed { tool, color }, DrawEvent::PointerDown(p)) => {
            if let Some(g) = preview_geometry(tool, *p, *p) {
                effects.push(Effect::ShowPreview(g));
            }
            DrawState::Drawing {
                tool,
                color,
                start: *p,
            }
        }

        (DrawState::Idle, DrawEvent::PointerDown(p)) => match ctx.shapes.hit_test(*p) {
            Some((id, grip)) => match ctx.shapes.get(id) {
                Some(shape) => {
                    effects.push(Effect::DeselectAll);
                    effects.push(Effect::Select(id));
                    DrawState::Editing {
                        id,
                        grip,
                        origin: shape.geometry,
                        from: *p,
                    }
                }
                None => DrawState::Idle,
            },
            None => {
                effects.push(Effect::DeselectAll);
                DrawState::Idle
            }
        },

        (
            DrawState::Drawing {
                tool,
                color,
                start,
            },
            DrawEvent::PointerMove(p),
        ) => {
            if let Some(g) = preview_geometry(tool, start, *p) {
                effects.push(Effect::UpdatePreview(g));
            }
            DrawState::Drawing { tool, color, start }
        }

        (
            DrawState::Editing {
                id,
                grip,
                origin,
                from,
            },
            DrawEvent::PointerMove(p),
        ) => {
            effects.push(Effect::Reshape {
                id,
                geometry: Shape::dragged(origin, grip, from, *p),
            });
            DrawState::Editing {
                id,
                grip,
                origin,
                from,
            }
        }

        (
            DrawState::Drawing {
                tool,
                color,
                start,
            },
            DrawEvent::PointerUp(p),
        ) => {
            effects.push(Effect::HidePreview);
            if let Some(g) = preview_geometry(tool, start, *p) {
                if ctx.gates.admits(&g) {
                    effects.push(Effect::Commit(new_shape(tool, &color, g)));
                }
            }
            DrawState::Armed { tool, color }
        }

        (
            DrawState::Editing {
                id,
                grip,
                origin,
                from,
            },
            DrawEvent::PointerUp(p),
        ) => {
            if from != *p {
                effects.push(Effect::Reshape {
                    id,
                    geometry: Shape::dragged(origin, grip, from, *p),
                });
            }
            DrawState::Idle
        }

        (state, DrawEvent::DeleteKey) => {
            let selected = ctx.shapes.selected();
            if !selected.is_empty() {
                effects.push(Effect::Remove(selected));
            }
            match state {
                DrawState::Editing { .. } => DrawState::Idle,
                other => other,
            }
        }

        (DrawState::Idle, DrawEvent::DoubleClick(p)) => {
            if let Some((id, _)) = ctx.shapes.hit_test(*p) {
                if let Some(shape) = ctx.shapes.get(id) {
                    effects.push(Effect::PromptPrice {
                        id,
                        current: shape.metadata.price,
                    });
                }
            }
            DrawState::Idle
        }

        (state, DrawEvent::PriceEntered { id, text }) => {
            if ctx.shapes.get(*id).is_some() {
                effects.push(Effect::SetPrice {
                    id: *id,
                    price: parse_price(text),
                });
            }
            state
        }

        (state, DrawEvent::ClearAll) => {
            effects.push(Effect::ClearAll);
            match state {
                DrawState::Drawing { tool, color, .. } => {
                    effects.insert(0, Effect::HidePreview);
                    DrawState::Armed { tool, color }
                }
                DrawState::Editing { .. } => DrawState::Idle,
                other => other,
            }
        }

        // Anything else (a move with nothing pressed, a press mid-drag) is a no-op.
        (state, _) => state,
    };
    (next, effects)
}
