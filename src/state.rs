//! The six orthogonal categories of fixed-function render state.
//!
//! Each state knows how to turn the values last emitted to a context into itself with
//! the fewest `StateChange`s. Fields that have no effect while their category is disabled
//! are left alone until the category is enabled again.

use std::fmt::Debug;

use crate::math::Color;

/// A pixel-wise comparison function.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Comparison {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Always,
}

/// Blend factors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

/// Specify whether front- or back-facing polygons can be culled.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

/// Define front- and back-facing polygons.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FrontFaceOrder {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum StateCategory {
    Blend,
    Cull,
    DepthTest,
    Offset,
    Stencil,
    Wireframe,
}

/// A single state-changing call into a graphics context.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StateChange {
    BlendEnabled(bool),
    BlendFunction {
        source: BlendFactor,
        destination: BlendFactor,
    },
    BlendColor(Color<f32>),
    CullEnabled(bool),
    CullFace(CullFace),
    FrontFace(FrontFaceOrder),
    DepthTestEnabled(bool),
    DepthFunction(Comparison),
    DepthWrite(bool),
    OffsetFill(bool),
    OffsetLine(bool),
    OffsetPoint(bool),
    PolygonOffset {
        factor: f32,
        units: f32,
    },
    StencilEnabled(bool),
    StencilFunction {
        function: Comparison,
        reference: i32,
        mask: u32,
    },
    StencilWriteMask(u32),
    StencilOperation {
        stencil_fail: StencilOperation,
        depth_fail: StencilOperation,
        depth_pass: StencilOperation,
    },
    Wireframe(bool),
}

impl StateChange {
    pub fn category(&self) -> StateCategory {
        use self::StateChange::*;
        match *self {
            BlendEnabled(_) | BlendFunction { .. } | BlendColor(_) => StateCategory::Blend,
            CullEnabled(_) | CullFace(_) | FrontFace(_) => StateCategory::Cull,
            DepthTestEnabled(_) | DepthFunction(_) | DepthWrite(_) => StateCategory::DepthTest,
            OffsetFill(_) | OffsetLine(_) | OffsetPoint(_) | PolygonOffset { .. } => {
                StateCategory::Offset
            }
            StencilEnabled(_)
            | StencilFunction { .. }
            | StencilWriteMask(_)
            | StencilOperation { .. } => StateCategory::Stencil,
            Wireframe(_) => StateCategory::Wireframe,
        }
    }
}

/// A render state of one category.
pub trait RenderState: Debug + Clone + PartialEq + Default {
    const CATEGORY: StateCategory;

    /// Appends every call needed to establish `self` on a context in unknown state.
    fn reset(&self, out: &mut Vec<StateChange>);

    /// Appends the calls turning `emitted` into `self`, then records them into `emitted`.
    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>);
}

macro_rules! diff {
    ($emitted: expr, $out: expr, $($field: ident),+ => $change: expr) => {
        if $(($emitted).$field != $field)||+ {
            $( ($emitted).$field = $field; )+
            $out.push($change);
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendState {
    pub enabled: bool,
    pub source: BlendFactor,
    pub destination: BlendFactor,
    pub constant: Color<f32>,
}

impl Default for BlendState {
    fn default() -> Self {
        BlendState {
            enabled: false,
            source: BlendFactor::SourceAlpha,
            destination: BlendFactor::OneMinusSourceAlpha,
            constant: Color::transparent(),
        }
    }
}

impl RenderState for BlendState {
    const CATEGORY: StateCategory = StateCategory::Blend;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::BlendEnabled(self.enabled));
        out.push(StateChange::BlendFunction {
            source: self.source,
            destination: self.destination,
        });
        out.push(StateChange::BlendColor(self.constant));
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let BlendState {
            enabled,
            source,
            destination,
            constant,
        } = self.clone();

        diff!(emitted, out, enabled => StateChange::BlendEnabled(enabled));

        if enabled {
            diff!(emitted, out, source, destination => StateChange::BlendFunction { source, destination });
            diff!(emitted, out, constant => StateChange::BlendColor(constant));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullState {
    pub enabled: bool,
    pub face: CullFace,
    pub front_face_order: FrontFaceOrder,
}

impl Default for CullState {
    fn default() -> Self {
        CullState {
            enabled: true,
            face: CullFace::Back,
            front_face_order: FrontFaceOrder::CounterClockwise,
        }
    }
}

impl RenderState for CullState {
    const CATEGORY: StateCategory = StateCategory::Cull;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::CullEnabled(self.enabled));
        out.push(StateChange::CullFace(self.face));
        out.push(StateChange::FrontFace(self.front_face_order));
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let CullState {
            enabled,
            face,
            front_face_order,
        } = self.clone();

        diff!(emitted, out, enabled => StateChange::CullEnabled(enabled));

        if enabled {
            diff!(emitted, out, face => StateChange::CullFace(face));
            diff!(emitted, out, front_face_order => StateChange::FrontFace(front_face_order));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthTestState {
    pub enabled: bool,
    pub function: Comparison,
    pub write: bool,
}

impl Default for DepthTestState {
    fn default() -> Self {
        DepthTestState {
            enabled: true,
            function: Comparison::LessOrEqual,
            write: true,
        }
    }
}

impl RenderState for DepthTestState {
    const CATEGORY: StateCategory = StateCategory::DepthTest;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::DepthTestEnabled(self.enabled));
        out.push(StateChange::DepthFunction(self.function));
        out.push(StateChange::DepthWrite(self.write));
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let DepthTestState {
            enabled,
            function,
            write,
        } = self.clone();

        diff!(emitted, out, enabled => StateChange::DepthTestEnabled(enabled));

        if enabled {
            diff!(emitted, out, function => StateChange::DepthFunction(function));
            diff!(emitted, out, write => StateChange::DepthWrite(write));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetState {
    pub fill: bool,
    pub line: bool,
    pub point: bool,
    pub factor: f32,
    pub units: f32,
}

impl Default for OffsetState {
    fn default() -> Self {
        OffsetState {
            fill: false,
            line: false,
            point: false,
            factor: 0.0,
            units: 0.0,
        }
    }
}

impl RenderState for OffsetState {
    const CATEGORY: StateCategory = StateCategory::Offset;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::OffsetFill(self.fill));
        out.push(StateChange::OffsetLine(self.line));
        out.push(StateChange::OffsetPoint(self.point));
        out.push(StateChange::PolygonOffset {
            factor: self.factor,
            units: self.units,
        });
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let OffsetState {
            fill,
            line,
            point,
            factor,
            units,
        } = self.clone();

        diff!(emitted, out, fill => StateChange::OffsetFill(fill));
        diff!(emitted, out, line => StateChange::OffsetLine(line));
        diff!(emitted, out, point => StateChange::OffsetPoint(point));

        if fill || line || point {
            diff!(emitted, out, factor, units => StateChange::PolygonOffset { factor, units });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilTestState {
    pub enabled: bool,
    pub function: Comparison,
    pub reference: i32,
    pub mask: u32,
    pub write_mask: u32,
    pub on_stencil_fail: StencilOperation,
    pub on_depth_fail: StencilOperation,
    pub on_depth_pass: StencilOperation,
}

impl Default for StencilTestState {
    fn default() -> Self {
        StencilTestState {
            enabled: false,
            function: Comparison::Always,
            reference: 0,
            mask: !0,
            write_mask: !0,
            on_stencil_fail: StencilOperation::Keep,
            on_depth_fail: StencilOperation::Keep,
            on_depth_pass: StencilOperation::Keep,
        }
    }
}

impl RenderState for StencilTestState {
    const CATEGORY: StateCategory = StateCategory::Stencil;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::StencilEnabled(self.enabled));
        out.push(StateChange::StencilFunction {
            function: self.function,
            reference: self.reference,
            mask: self.mask,
        });
        out.push(StateChange::StencilWriteMask(self.write_mask));
        out.push(StateChange::StencilOperation {
            stencil_fail: self.on_stencil_fail,
            depth_fail: self.on_depth_fail,
            depth_pass: self.on_depth_pass,
        });
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let StencilTestState {
            enabled,
            function,
            reference,
            mask,
            write_mask,
            on_stencil_fail,
            on_depth_fail,
            on_depth_pass,
        } = self.clone();

        diff!(emitted, out, enabled => StateChange::StencilEnabled(enabled));

        if enabled {
            diff!(emitted, out, function, reference, mask => StateChange::StencilFunction {
                function,
                reference,
                mask,
            });

            diff!(emitted, out, write_mask => StateChange::StencilWriteMask(write_mask));

            diff!(emitted, out, on_stencil_fail, on_depth_fail, on_depth_pass => StateChange::StencilOperation {
                stencil_fail: on_stencil_fail,
                depth_fail: on_depth_fail,
                depth_pass: on_depth_pass,
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireframeState {
    pub enabled: bool,
}

impl RenderState for WireframeState {
    const CATEGORY: StateCategory = StateCategory::Wireframe;

    fn reset(&self, out: &mut Vec<StateChange>) {
        out.push(StateChange::Wireframe(self.enabled));
    }

    fn transition(&self, emitted: &mut Self, out: &mut Vec<StateChange>) {
        let enabled = self.enabled;
        diff!(emitted, out, enabled => StateChange::Wireframe(enabled));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unchanged() {
        let mut emitted = BlendState::default();
        let mut out = Vec::new();
        BlendState::default().transition(&mut emitted, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn per_field() {
        let mut emitted = BlendState::default();
        let mut out = Vec::new();

        let mut blend = BlendState::default();
        blend.enabled = true;
        blend.transition(&mut emitted, &mut out);

        // Default factors were emitted at reset, only the toggle is needed.
        assert_eq!(out, vec![StateChange::BlendEnabled(true)]);

        out.clear();
        blend.destination = BlendFactor::One;
        blend.transition(&mut emitted, &mut out);
        assert_eq!(
            out,
            vec![StateChange::BlendFunction {
                source: BlendFactor::SourceAlpha,
                destination: BlendFactor::One,
            }]
        );
        assert_eq!(emitted, blend);
    }

    #[test]
    fn deferred_while_disabled() {
        let mut emitted = StencilTestState::default();
        let mut out = Vec::new();

        let mut stencil = StencilTestState::default();
        stencil.reference = 1;
        stencil.transition(&mut emitted, &mut out);
        assert!(out.is_empty());
        assert_eq!(emitted.reference, 0);

        stencil.enabled = true;
        stencil.transition(&mut emitted, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], StateChange::StencilEnabled(true));
        assert_eq!(out[1].category(), StateCategory::Stencil);
        assert_eq!(emitted, stencil);
    }

    #[test]
    fn reset() {
        let mut out = Vec::new();
        OffsetState::default().reset(&mut out);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.category() == StateCategory::Offset));
    }
}
