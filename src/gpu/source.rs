use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};

use super::compositor::{ShaderSource, ShaderSourceProvider, SourceState};

pub const FULLSCREEN_VERTEX: &str = include_str!("shaders/fullscreen.wgsl");

const BUILTIN: [(&str, &str); 4] = [
    ("grayscale", include_str!("shaders/grayscale.wgsl")),
    ("vignette", include_str!("shaders/vignette.wgsl")),
    ("chromatic", include_str!("shaders/chromatic.wgsl")),
    ("pixel", include_str!("shaders/pixel.wgsl")),
];

pub fn builtin(name: &str) -> Option<ShaderSource> {
    BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, fragment)| ShaderSource {
            vertex: FULLSCREEN_VERTEX.to_string(),
            fragment: fragment.to_string(),
        })
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(n, _)| *n)
}

/// Only the shaders compiled into the binary.
pub struct BuiltinShaders;

impl ShaderSourceProvider for BuiltinShaders {
    fn poll(&mut self, name: &str) -> SourceState {
        match builtin(name) {
            Some(source) => SourceState::Ready(source),
            None => SourceState::Missing,
        }
    }
}

enum Command {
    Load(String),
}

enum LoadState {
    Loading,
    Loaded(ShaderSource),
    Failed,
}

/// Built-in shaders plus `<dir>/<name>.wgsl` fragment shaders read on a background thread.
/// A shader that is still being read polls as [`SourceState::Pending`].
pub struct ShaderLoader {
    tx: Sender<Command>,
    results: Receiver<(String, Result<String, String>)>,
    states: HashMap<String, LoadState>,
}

impl ShaderLoader {
    pub fn spawn(dir: PathBuf) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Command>();
        let (results_tx, results) = crossbeam_channel::unbounded();

        std::thread::Builder::new()
            .name("shader-loader".to_string())
            .spawn(move || {
                // ends when the loader is dropped and the channel closes
                for Command::Load(name) in rx.iter() {
                    let path = dir.join(format!("{name}.wgsl"));
                    let result =
                        std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()));
                    if results_tx.send((name, result)).is_err() {
                        break;
                    }
                }
            })
            .context("spawn shader loader thread")?;

        Ok(ShaderLoader {
            tx,
            results,
            states: HashMap::new(),
        })
    }

    fn record(&mut self, name: String, result: Result<String, String>) {
        let state = match result {
            Ok(fragment) => {
                log::debug!("shader `{name}` loaded");
                LoadState::Loaded(ShaderSource {
                    vertex: FULLSCREEN_VERTEX.to_string(),
                    fragment,
                })
            }
            Err(e) => {
                log::warn!("shader `{name}` unavailable: {e}");
                LoadState::Failed
            }
        };
        self.states.insert(name, state);
    }

    fn drain(&mut self) {
        while let Ok((name, result)) = self.results.try_recv() {
            self.record(name, result);
        }
    }

    /// Blocks until every requested shader has finished loading.
    pub fn wait_all(&mut self) {
        while self
            .states
            .values()
            .any(|s| matches!(s, LoadState::Loading))
        {
            match self.results.recv() {
                Ok((name, result)) => self.record(name, result),
                Err(_) => break,
            }
        }
    }
}

impl ShaderSourceProvider for ShaderLoader {
    fn poll(&mut self, name: &str) -> SourceState {
        if let Some(source) = builtin(name) {
            return SourceState::Ready(source);
        }
        self.drain();
        match self.states.get(name) {
            Some(LoadState::Loaded(source)) => SourceState::Ready(source.clone()),
            Some(LoadState::Loading) => SourceState::Pending,
            Some(LoadState::Failed) => SourceState::Missing,
            None => {
                if self.tx.send(Command::Load(name.to_string())).is_err() {
                    log::error!("shader loader thread is gone, `{name}` cannot be loaded");
                    self.states.insert(name.to_string(), LoadState::Failed);
                    return SourceState::Missing;
                }
                self.states.insert(name.to_string(), LoadState::Loading);
                SourceState::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_without_disk() {
        let mut shaders = BuiltinShaders;
        for name in builtin_names() {
            let SourceState::Ready(source) = shaders.poll(name) else {
                panic!("{name} should be built in");
            };
            assert!(source.fragment.contains("struct Params"));
            assert!(source.fragment.contains("fn fs_main"));
            assert!(source.vertex.contains("fn vs_main"));
        }
        assert_eq!(shaders.poll("bloom"), SourceState::Missing);
    }

    #[test]
    fn files_load_in_the_background() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("glow.wgsl"), "// glow").unwrap();
        let mut loader = ShaderLoader::spawn(dir.path().to_path_buf()).unwrap();

        assert_eq!(loader.poll("glow"), SourceState::Pending);
        assert_eq!(loader.poll("absent"), SourceState::Pending);
        loader.wait_all();

        let SourceState::Ready(source) = loader.poll("glow") else {
            panic!("glow should have loaded");
        };
        assert_eq!(source.fragment, "// glow");
        assert_eq!(loader.poll("absent"), SourceState::Missing);
        assert!(matches!(loader.poll("grayscale"), SourceState::Ready(_)));
    }
}
