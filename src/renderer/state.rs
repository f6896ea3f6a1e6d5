use std::rc::Rc;

use crate::state::*;
use crate::visual::PassStates;

/// The default, applied and emitted state of one category.
#[derive(Debug)]
struct Category<S> {
    default: Rc<S>,
    applied: Rc<S>,
    emitted: S,
}

impl<S: RenderState> Category<S> {
    fn new(out: &mut Vec<StateChange>) -> Self {
        let default = Rc::new(S::default());
        default.reset(out);

        Category {
            applied: default.clone(),
            emitted: (*default).clone(),
            default,
        }
    }

    fn apply(&mut self, incoming: Option<&Rc<S>>, out: &mut Vec<StateChange>) {
        let incoming = incoming.unwrap_or(&self.default);
        if Rc::ptr_eq(incoming, &self.applied) {
            return;
        }

        incoming.transition(&mut self.emitted, out);
        self.applied = incoming.clone();
    }

    fn restore(&mut self, out: &mut Vec<StateChange>) {
        self.default.reset(out);
        self.emitted = (*self.default).clone();
        self.applied = self.default.clone();
    }

    /// Changes the emitted state outside of any pass. The applied pointer is detached, so
    /// the next pass is diffed against what the context really holds.
    fn overwrite<F>(&mut self, out: &mut Vec<StateChange>, func: F)
    where
        F: FnOnce(&mut S, &mut Vec<StateChange>) -> bool,
    {
        if func(&mut self.emitted, out) {
            self.applied = Rc::new(self.emitted.clone());
        }
    }
}

/// Tracks the render states applied to a context and turns state switches into the
/// minimal set of `StateChange`s.
#[derive(Debug)]
pub struct RenderStateManager {
    blend: Category<BlendState>,
    cull: Category<CullState>,
    depth_test: Category<DepthTestState>,
    offset: Category<OffsetState>,
    stencil: Category<StencilTestState>,
    wireframe: Category<WireframeState>,
}

impl RenderStateManager {
    /// Creates the default states. `out` receives the calls that bring a context into them.
    pub fn new(out: &mut Vec<StateChange>) -> Self {
        RenderStateManager {
            blend: Category::new(out),
            cull: Category::new(out),
            depth_test: Category::new(out),
            offset: Category::new(out),
            stencil: Category::new(out),
            wireframe: Category::new(out),
        }
    }

    /// Applies the states of a pass, categories it does not override fall back to defaults.
    pub fn apply(&mut self, states: &PassStates, out: &mut Vec<StateChange>) {
        self.blend.apply(states.blend.as_ref(), out);
        self.cull.apply(states.cull.as_ref(), out);
        self.depth_test.apply(states.depth_test.as_ref(), out);
        self.offset.apply(states.offset.as_ref(), out);
        self.stencil.apply(states.stencil.as_ref(), out);
        self.wireframe.apply(states.wireframe.as_ref(), out);
    }

    /// Re-emits every default state, e.g. when the context has been reset.
    pub fn restore(&mut self, out: &mut Vec<StateChange>) {
        self.blend.restore(out);
        self.cull.restore(out);
        self.depth_test.restore(out);
        self.offset.restore(out);
        self.stencil.restore(out);
        self.wireframe.restore(out);
    }

    /// Unmasks depth and/or stencil writes before a clear of those buffers. Clears are
    /// subject to the write masks left by the last pass.
    pub fn unmask_clear(&mut self, depth: bool, stencil: bool, out: &mut Vec<StateChange>) {
        if depth {
            self.depth_test.overwrite(out, |emitted, out| {
                if emitted.write {
                    return false;
                }

                emitted.write = true;
                out.push(StateChange::DepthWrite(true));
                true
            });
        }

        if stencil {
            self.stencil.overwrite(out, |emitted, out| {
                if emitted.write_mask == !0 {
                    return false;
                }

                emitted.write_mask = !0;
                out.push(StateChange::StencilWriteMask(!0));
                true
            });
        }
    }

    #[inline]
    pub fn blend(&self) -> &Rc<BlendState> {
        &self.blend.applied
    }

    #[inline]
    pub fn cull(&self) -> &Rc<CullState> {
        &self.cull.applied
    }

    #[inline]
    pub fn depth_test(&self) -> &Rc<DepthTestState> {
        &self.depth_test.applied
    }

    #[inline]
    pub fn offset(&self) -> &Rc<OffsetState> {
        &self.offset.applied
    }

    #[inline]
    pub fn stencil(&self) -> &Rc<StencilTestState> {
        &self.stencil.applied
    }

    #[inline]
    pub fn wireframe(&self) -> &Rc<WireframeState> {
        &self.wireframe.applied
    }

    /// Whether every category is at its default instance.
    pub fn is_default(&self) -> bool {
        Rc::ptr_eq(&self.blend.applied, &self.blend.default)
            && Rc::ptr_eq(&self.cull.applied, &self.cull.default)
            && Rc::ptr_eq(&self.depth_test.applied, &self.depth_test.default)
            && Rc::ptr_eq(&self.offset.applied, &self.offset.default)
            && Rc::ptr_eq(&self.stencil.applied, &self.stencil.default)
            && Rc::ptr_eq(&self.wireframe.applied, &self.wireframe.default)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn count(out: &[StateChange], category: StateCategory) -> usize {
        out.iter().filter(|v| v.category() == category).count()
    }

    #[test]
    fn reset_on_creation() {
        let mut out = Vec::new();
        let manager = RenderStateManager::new(&mut out);

        for &v in &[
            StateCategory::Blend,
            StateCategory::Cull,
            StateCategory::DepthTest,
            StateCategory::Offset,
            StateCategory::Stencil,
            StateCategory::Wireframe,
        ] {
            assert!(count(&out, v) > 0);
        }

        assert!(manager.is_default());
        assert!(!manager.blend().enabled);
        assert!(manager.cull().enabled);
    }

    #[test]
    fn identity_skip() {
        let mut out = Vec::new();
        let mut manager = RenderStateManager::new(&mut out);
        out.clear();

        manager.apply(&PassStates::default(), &mut out);
        assert!(out.is_empty());

        let mut states = PassStates::default();
        states.wireframe = Some(Rc::new(WireframeState { enabled: true }));

        manager.apply(&states, &mut out);
        assert_eq!(out, vec![StateChange::Wireframe(true)]);

        out.clear();
        manager.apply(&states, &mut out);
        assert!(out.is_empty());
        assert!(!manager.is_default());
    }

    #[test]
    fn blend_untouched_by_cull() {
        let mut out = Vec::new();
        let mut manager = RenderStateManager::new(&mut out);

        let blend = Rc::new(BlendState {
            enabled: true,
            ..BlendState::default()
        });

        let mut first = PassStates::default();
        first.blend = Some(blend.clone());
        first.cull = Some(Rc::new(CullState::default()));

        let mut second = PassStates::default();
        second.blend = Some(Rc::new((*blend).clone()));
        second.cull = Some(Rc::new(CullState {
            face: CullFace::Front,
            ..CullState::default()
        }));

        manager.apply(&first, &mut out);
        out.clear();

        manager.apply(&second, &mut out);
        assert_eq!(count(&out, StateCategory::Blend), 0);
        assert_eq!(out, vec![StateChange::CullFace(CullFace::Front)]);
    }

    #[test]
    fn unmask_clear() {
        let mut out = Vec::new();
        let mut manager = RenderStateManager::new(&mut out);

        let masked = Rc::new(DepthTestState {
            write: false,
            ..DepthTestState::default()
        });

        let mut states = PassStates::default();
        states.depth_test = Some(masked.clone());
        manager.apply(&states, &mut out);
        out.clear();

        manager.unmask_clear(true, true, &mut out);
        assert_eq!(out, vec![StateChange::DepthWrite(true)]);
        assert!(manager.depth_test().write);

        out.clear();
        manager.unmask_clear(true, true, &mut out);
        assert!(out.is_empty());

        manager.apply(&states, &mut out);
        assert_eq!(out, vec![StateChange::DepthWrite(false)]);
    }

    #[test]
    fn unmask_clear_while_disabled() {
        let mut out = Vec::new();
        let mut manager = RenderStateManager::new(&mut out);

        let mut masked = PassStates::default();
        masked.depth_test = Some(Rc::new(DepthTestState {
            write: false,
            ..DepthTestState::default()
        }));

        masked.stencil = Some(Rc::new(StencilTestState {
            enabled: true,
            write_mask: 0x0f,
            ..StencilTestState::default()
        }));

        let mut disabled = PassStates::default();
        disabled.depth_test = Some(Rc::new(DepthTestState {
            enabled: false,
            ..DepthTestState::default()
        }));

        manager.apply(&masked, &mut out);
        manager.apply(&disabled, &mut out);
        out.clear();

        manager.unmask_clear(true, true, &mut out);
        assert_eq!(
            out,
            vec![StateChange::DepthWrite(true), StateChange::StencilWriteMask(!0)]
        );

        out.clear();
        manager.unmask_clear(false, true, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn restore() {
        let mut out = Vec::new();
        let mut manager = RenderStateManager::new(&mut out);
        let initial = out.len();

        let mut states = PassStates::default();
        states.depth_test = Some(Rc::new(DepthTestState {
            enabled: false,
            ..DepthTestState::default()
        }));

        manager.apply(&states, &mut out);
        out.clear();

        manager.restore(&mut out);
        assert_eq!(out.len(), initial);
        assert!(manager.is_default());
    }
}
