//! Shader source registry with modification-time hot reload.
//!
//! The registry only deals with files. Turning sources into a program object
//! is the job of a [`ProgramBuilder`] owned by the graphics context.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};

/// Stage files making up one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSourceSpec {
    pub label: String,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub geometry: Option<PathBuf>,
}

impl ShaderSourceSpec {
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: impl Into<PathBuf>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    fn stage_paths(&self) -> impl Iterator<Item = &Path> {
        [Some(&self.vertex), Some(&self.fragment), self.geometry.as_ref()]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
    }
}

/// Stage sources read from disk, handed to the builder.
#[derive(Debug)]
pub struct ShaderStageSources<'a> {
    pub spec: &'a ShaderSourceSpec,
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

/// Compiles and destroys programs for a particular graphics context.
pub trait ProgramBuilder {
    type Program;

    fn build(&mut self, sources: &ShaderStageSources<'_>) -> Result<Self::Program>;

    fn release(&mut self, program: Self::Program);
}

/// Index of a registered spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(usize);

struct Entry<P> {
    spec: ShaderSourceSpec,
    program: Option<P>,
    /// Stage modification times seen at the last build attempt.
    stamps: Vec<Option<SystemTime>>,
}

/// Ordered set of shader specs and the programs built from them.
pub struct ShaderRegistry<P> {
    entries: Vec<Entry<P>>,
}

impl<P> Default for ShaderRegistry<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> ShaderRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec. Nothing is built until the next reload.
    pub fn register(&mut self, spec: ShaderSourceSpec) -> ShaderHandle {
        let handle = ShaderHandle(self.entries.len());
        log::debug!("Registered shader '{}' as {:?}", spec.label, handle);
        self.entries.push(Entry {
            spec,
            program: None,
            stamps: Vec::new(),
        });
        handle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn spec(&self, handle: ShaderHandle) -> Option<&ShaderSourceSpec> {
        self.entries.get(handle.0).map(|e| &e.spec)
    }

    /// Current program, or `None` if never built or the last build failed.
    pub fn program(&self, handle: ShaderHandle) -> Option<&P> {
        self.entries.get(handle.0).and_then(|e| e.program.as_ref())
    }

    /// Entries whose stage files changed since they were last built.
    pub fn stale(&self) -> Vec<ShaderHandle> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.stamps != stage_stamps(&e.spec))
            .map(|(i, _)| ShaderHandle(i))
            .collect()
    }

    /// Rebuild every program. Returns how many built successfully.
    pub fn reload_all<B>(&mut self, builder: &mut B) -> usize
    where
        B: ProgramBuilder<Program = P>,
    {
        let mut built = 0;
        for entry in &mut self.entries {
            if rebuild(entry, builder) {
                built += 1;
            }
        }
        log::info!("Reloaded {}/{} shaders", built, self.entries.len());
        built
    }

    /// Rebuild only programs whose sources changed on disk.
    pub fn reload_changed<B>(&mut self, builder: &mut B) -> usize
    where
        B: ProgramBuilder<Program = P>,
    {
        let mut built = 0;
        for handle in self.stale() {
            let entry = &mut self.entries[handle.0];
            log::info!("Shader '{}' changed on disk", entry.spec.label);
            if rebuild(entry, builder) {
                built += 1;
            }
        }
        built
    }

    /// Release every program, e.g. before the context goes away.
    pub fn release_all<B>(&mut self, builder: &mut B)
    where
        B: ProgramBuilder<Program = P>,
    {
        for entry in &mut self.entries {
            if let Some(program) = entry.program.take() {
                builder.release(program);
            }
        }
    }
}

fn rebuild<P, B>(entry: &mut Entry<P>, builder: &mut B) -> bool
where
    B: ProgramBuilder<Program = P>,
{
    if let Some(old) = entry.program.take() {
        builder.release(old);
    }
    // stamp before reading so an edit racing the read is picked up next poll
    entry.stamps = stage_stamps(&entry.spec);

    let result = read_sources(&entry.spec).and_then(|sources| builder.build(&sources));
    match result {
        Ok(program) => {
            entry.program = Some(program);
            true
        }
        Err(err) => {
            log::error!("Shader '{}' failed: {:#}", entry.spec.label, err);
            false
        }
    }
}

fn read_sources(spec: &ShaderSourceSpec) -> Result<ShaderStageSources<'_>> {
    let read = |path: &Path| {
        fs::read_to_string(path).with_context(|| format!("unable to read shader {:?}", path))
    };
    Ok(ShaderStageSources {
        spec,
        vertex: read(spec.vertex.as_path())?,
        fragment: read(spec.fragment.as_path())?,
        geometry: spec.geometry.as_deref().map(read).transpose()?,
    })
}

fn stage_stamps(spec: &ShaderSourceSpec) -> Vec<Option<SystemTime>> {
    spec.stage_paths()
        .map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
        .collect()
}
