use super::background::draw_background;
use super::canvas::{Canvas, DrawList};
use super::lines::draw_lines;
use super::notes::draw_notes;
use super::resources::ResourceProvider;
use super::ui::{UiContext, draw_free_ui};
use crate::chart::{Chart, ShaderValue};
use crate::config::Settings;
use crate::error::{CompositorError, RenderError};
use crate::timeline::{CycleHealed, ResolveFields, evaluate_binding, resolve_all};

/// One post-processing pass over the offscreen surface.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderPass {
    pub shader: String,
    /// Bound variables; anything the shader declares but is missing here keeps its default.
    pub uniforms: Vec<(String, ShaderValue)>,
    pub time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Applied,
    /// The shader source is still loading; the surface was left untouched.
    Deferred,
}

/// Target of one frame: an offscreen surface that draw lists and shader passes accumulate
/// into, then get shown.
pub trait FrameBackend {
    fn begin_frame(&mut self) -> Result<(), RenderError>;
    /// Composites `list` over the surface; texture ids and glyphs resolve through `resources`.
    fn draw(
        &mut self,
        list: &DrawList,
        resources: &dyn ResourceProvider,
    ) -> Result<(), RenderError>;
    /// Runs `pass` over the surface and copies the result back into it.
    fn apply_shader(&mut self, pass: &ShaderPass) -> Result<PassOutcome, CompositorError>;
    fn present(&mut self) -> Result<(), RenderError>;
}

#[derive(Debug, Default)]
pub struct FrameReport {
    pub healed: Vec<CycleHealed>,
    pub failed_passes: Vec<(String, CompositorError)>,
    pub deferred_passes: Vec<String>,
    pub draw_commands: usize,
}

/// Active shader passes at `now`, split into `(non_global, global)`, in chart order.
pub fn collect_passes(chart: &Chart, now: f64) -> (Vec<ShaderPass>, Vec<ShaderPass>) {
    let beat = chart.bpm().seconds_to_beat(now);
    let mut local = Vec::new();
    let mut global = Vec::new();
    for effect in chart.effects().iter().filter(|e| e.is_active(now)) {
        let uniforms = effect
            .vars
            .iter()
            .filter_map(|(name, binding)| {
                evaluate_binding(binding, beat).map(|value| (name.clone(), value))
            })
            .collect();
        let pass = ShaderPass {
            shader: effect.shader.clone(),
            uniforms,
            time: now,
        };
        if effect.global {
            global.push(pass);
        } else {
            local.push(pass);
        }
    }
    (local, global)
}

fn run_passes(backend: &mut dyn FrameBackend, passes: &[ShaderPass], report: &mut FrameReport) {
    for pass in passes {
        match backend.apply_shader(pass) {
            Ok(PassOutcome::Applied) => {}
            Ok(PassOutcome::Deferred) => {
                log::debug!("shader pass `{}` deferred, source still loading", pass.shader);
                report.deferred_passes.push(pass.shader.clone());
            }
            Err(e) => {
                log::error!("shader pass `{}` failed: {e}", pass.shader);
                report.failed_passes.push((pass.shader.clone(), e));
            }
        }
    }
}

/// Renders one frame of `chart` at chart time `now` (seconds).
///
/// Order: background, judge lines, notes and hit effects, non-global shader passes, free UI,
/// global shader passes, present. A failing pass leaves the surface as it was before the pass
/// and the frame carries on.
pub fn render_frame(
    chart: &mut Chart,
    now: f64,
    settings: &Settings,
    resources: &dyn ResourceProvider,
    backend: &mut dyn FrameBackend,
) -> Result<FrameReport, RenderError> {
    let mut report = FrameReport::default();
    let beat = chart.bpm().seconds_to_beat(now);
    let states = resolve_all(chart, beat, ResolveFields::all(), &mut report.healed);
    for healed in &report.healed {
        log::warn!("{healed}");
    }
    let chart = &*chart;
    let ui = UiContext::new(chart, now);
    let (width, height) = settings.canvas_size();

    let mut scene = Canvas::new(width, height);
    draw_background(&mut scene, resources, settings);
    draw_lines(&mut scene, chart, &states, resources, settings, &ui);
    draw_notes(&mut scene, chart, &states, resources, settings, now);
    let scene = scene.finish();

    let (local, global) = collect_passes(chart, now);

    backend.begin_frame()?;
    backend.draw(&scene, resources)?;
    report.draw_commands += scene.len();
    run_passes(backend, &local, &mut report);

    let mut overlay = Canvas::new(width, height);
    draw_free_ui(&mut overlay, chart, &ui, settings);
    let overlay = overlay.finish();
    backend.draw(&overlay, resources)?;
    report.draw_commands += overlay.len();
    run_passes(backend, &global, &mut report);

    backend.present()?;
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chart::{Beat, ChartMeta, JudgeLine, ShaderEffect};
    use crate::render::resources::Skin;

    /// Surface that remembers, for every draw call, which passes ran over it afterwards.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub layers: Vec<Vec<String>>,
        pub failing: Vec<String>,
        pub presented: usize,
    }

    impl FrameBackend for RecordingBackend {
        fn begin_frame(&mut self) -> Result<(), RenderError> {
            self.layers.clear();
            Ok(())
        }

        fn draw(
            &mut self,
            _list: &DrawList,
            _resources: &dyn ResourceProvider,
        ) -> Result<(), RenderError> {
            self.layers.push(Vec::new());
            Ok(())
        }

        fn apply_shader(&mut self, pass: &ShaderPass) -> Result<PassOutcome, CompositorError> {
            if self.failing.contains(&pass.shader) {
                return Err(CompositorError::MissingSource(pass.shader.clone()));
            }
            for layer in self.layers.iter_mut() {
                layer.push(pass.shader.clone());
            }
            Ok(PassOutcome::Applied)
        }

        fn present(&mut self) -> Result<(), RenderError> {
            self.presented += 1;
            Ok(())
        }
    }

    fn chart_with_effects(effects: Vec<ShaderEffect>) -> Chart {
        Chart::new(ChartMeta::default(), &[], vec![JudgeLine::default()], effects)
    }

    #[test]
    fn global_passes_see_the_free_ui() {
        let mut chart = chart_with_effects(vec![
            ShaderEffect::new("grayscale", true, Beat::whole(0), Beat::whole(8)),
            ShaderEffect::new("vignette", false, Beat::whole(0), Beat::whole(8)),
        ]);
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let mut backend = RecordingBackend::default();
        let report = render_frame(&mut chart, 1.0, &settings, &skin, &mut backend).unwrap();

        assert_eq!(backend.layers.len(), 2);
        // the scene went through both passes, non-global first
        assert_eq!(backend.layers[0], vec!["vignette", "grayscale"]);
        // the free UI only through the global one
        assert_eq!(backend.layers[1], vec!["grayscale"]);
        assert_eq!(backend.presented, 1);
        assert!(report.failed_passes.is_empty());
        assert!(report.draw_commands > 0);
    }

    #[test]
    fn inactive_effects_are_skipped() {
        let chart = chart_with_effects(vec![ShaderEffect::new(
            "pixel",
            false,
            Beat::whole(4),
            Beat::whole(8),
        )]);
        let (local, global) = collect_passes(&chart, 0.5);
        assert!(local.is_empty() && global.is_empty());
        let (local, _) = collect_passes(&chart, 2.5);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].time, 2.5);
    }

    #[test]
    fn failed_pass_does_not_stop_the_frame() {
        let mut chart = chart_with_effects(vec![
            ShaderEffect::new("missing", false, Beat::whole(0), Beat::whole(8)),
            ShaderEffect::new("grayscale", true, Beat::whole(0), Beat::whole(8)),
        ]);
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let mut backend = RecordingBackend {
            failing: vec!["missing".to_string()],
            ..RecordingBackend::default()
        };
        let report = render_frame(&mut chart, 1.0, &settings, &skin, &mut backend).unwrap();
        assert_eq!(report.failed_passes.len(), 1);
        assert_eq!(report.failed_passes[0].0, "missing");
        assert_eq!(backend.layers[0], vec!["grayscale"]);
        assert_eq!(backend.presented, 1);
    }

    #[test]
    fn frame_heals_father_cycles() {
        let mut chart = Chart::new(
            ChartMeta::default(),
            &[],
            vec![
                JudgeLine {
                    father: 1,
                    ..JudgeLine::default()
                },
                JudgeLine {
                    father: 0,
                    ..JudgeLine::default()
                },
            ],
            Vec::new(),
        );
        let settings = Settings::default();
        let skin = Skin::fallback(settings.skin.clone());
        let mut backend = RecordingBackend::default();
        let report = render_frame(&mut chart, 0.0, &settings, &skin, &mut backend).unwrap();
        assert_eq!(report.healed.len(), 1);
        let again = render_frame(&mut chart, 0.0, &settings, &skin, &mut backend).unwrap();
        assert!(again.healed.is_empty());
    }
}
