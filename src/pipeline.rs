use std::{
    collections::BTreeSet,
    fs,
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context as _;

use crate::{
    assemble::{BITMAP_CHARACTER_ID, assemble, extract_bootstrap},
    bitmap::{read_tag_json, write_tag_json},
    capture::{CaptureConfig, capture},
    container::{CompressionMode, ContainerCodec},
    error::FixtureResult,
    invoke::RendererInvoker,
    model::BootstrapProgram,
};

#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Fixture root; direct children are groups, grandchildren are cases.
    pub root: PathBuf,
    /// Template movie the bootstrap program is extracted from.
    pub template: PathBuf,
    /// `group/name` entries to build; empty builds everything.
    pub whitelist: BTreeSet<String>,
    pub capture: CaptureConfig,
}

/// One fixture case directory and the files it owns.
#[derive(Clone, Debug)]
pub struct FixtureCase {
    pub group: String,
    pub name: String,
    pub root: PathBuf,
    /// Normalized tag description (`tag.json`).
    pub tag_path: PathBuf,
    /// Generated capture movie (`capture.swf`).
    pub movie_path: PathBuf,
    /// Raw payload bytes (`bitmap.<group>`).
    pub bitmap_path: PathBuf,
    /// Reference image (`expected.png`).
    pub expected_png_path: PathBuf,
    /// Editable source description (`src/tag.json`), when present.
    pub src_tag_path: Option<PathBuf>,
}

impl FixtureCase {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub cases_total: u64,
    pub cases_built: u64,
    pub cases_failed: u64,
    pub cases_skipped: u64,
}

/// Walks the fixture tree and regenerates every case's reference outputs.
///
/// The bootstrap program is loaded from the template on first use and
/// cached for the pipeline's lifetime; a template without one aborts the
/// whole build. Capture failures are per-case: the case's outputs are left
/// untouched and the build moves on.
pub struct FixturePipeline {
    codec: Box<dyn ContainerCodec>,
    invoker: Arc<dyn RendererInvoker>,
    options: BuildOptions,
    bootstrap: Option<BootstrapProgram>,
}

impl FixturePipeline {
    pub fn new(
        codec: Box<dyn ContainerCodec>,
        invoker: Arc<dyn RendererInvoker>,
        options: BuildOptions,
    ) -> Self {
        Self {
            codec,
            invoker,
            options,
            bootstrap: None,
        }
    }

    fn bootstrap(&mut self) -> FixtureResult<BootstrapProgram> {
        if let Some(program) = &self.bootstrap {
            return Ok(program.clone());
        }
        let bytes = fs::read(&self.options.template).with_context(|| {
            format!(
                "read template movie '{}'",
                self.options.template.display()
            )
        })?;
        let template = self.codec.decode(&bytes)?;
        let program = extract_bootstrap(&template)?;
        self.bootstrap = Some(program.clone());
        Ok(program)
    }

    /// Lists buildable cases, sorted by `group/name` for determinism.
    pub fn discover(&self) -> FixtureResult<Vec<FixtureCase>> {
        let mut cases = Vec::new();

        let groups = fs::read_dir(&self.options.root).with_context(|| {
            format!("read fixture root '{}'", self.options.root.display())
        })?;
        for group_entry in groups {
            let group_entry = group_entry.with_context(|| "read fixture root entry")?;
            let group = group_entry.file_name().to_string_lossy().into_owned();
            if !group_entry.path().is_dir() || group.starts_with('.') {
                continue;
            }

            let entries = fs::read_dir(group_entry.path())
                .with_context(|| format!("read fixture group '{group}'"))?;
            for case_entry in entries {
                let case_entry = case_entry.with_context(|| "read fixture group entry")?;
                let name = case_entry.file_name().to_string_lossy().into_owned();
                if !case_entry.path().is_dir() {
                    continue;
                }

                let full_name = format!("{group}/{name}");
                if !self.options.whitelist.is_empty()
                    && !self.options.whitelist.contains(&full_name)
                {
                    continue;
                }

                let root = case_entry.path();
                let src_tag_path = root.join("src").join("tag.json");
                cases.push(FixtureCase {
                    tag_path: root.join("tag.json"),
                    movie_path: root.join("capture.swf"),
                    bitmap_path: root.join(format!("bitmap.{group}")),
                    expected_png_path: root.join("expected.png"),
                    src_tag_path: src_tag_path.is_file().then_some(src_tag_path),
                    group: group.clone(),
                    name,
                    root,
                });
            }
        }

        cases.sort_by(|a, b| a.full_name().cmp(&b.full_name()));
        Ok(cases)
    }

    pub fn build_all(&mut self) -> FixtureResult<BuildStats> {
        let cases = self.discover()?;
        // A missing bootstrap is a construction error: fail the whole
        // build before touching any case.
        self.bootstrap()?;

        let mut stats = BuildStats::default();
        for case in &cases {
            stats.cases_total += 1;

            if case.src_tag_path.is_none() && !case.tag_path.is_file() {
                tracing::debug!(case = %case.full_name(), "no tag description, skipping");
                stats.cases_skipped += 1;
                continue;
            }

            match self.build_case(case) {
                Ok(()) => {
                    tracing::info!(case = %case.full_name(), "built fixture");
                    stats.cases_built += 1;
                }
                Err(e) => {
                    tracing::warn!(case = %case.full_name(), error = %e, "fixture build failed");
                    stats.cases_failed += 1;
                }
            }
        }

        Ok(stats)
    }

    pub fn build_case(&mut self, case: &FixtureCase) -> FixtureResult<()> {
        // Normalize the editable source description into the case dir
        // first: re-tag with the fixed internal id, pretty-print.
        if let Some(src) = &case.src_tag_path {
            let text = fs::read_to_string(src)
                .with_context(|| format!("read tag source '{}'", src.display()))?;
            let tag = read_tag_json(&text)?.with_id(BITMAP_CHARACTER_ID);
            fs::write(&case.tag_path, write_tag_json(&tag)?)
                .with_context(|| format!("write '{}'", case.tag_path.display()))?;
        }

        let text = fs::read_to_string(&case.tag_path)
            .with_context(|| format!("read tag description '{}'", case.tag_path.display()))?;
        let tag = read_tag_json(&text)?;

        let bootstrap = self.bootstrap()?;
        let document = assemble(&tag, &bootstrap);
        document.validate()?;

        let movie = self.codec.encode(&document, CompressionMode::None)?;
        fs::write(&case.movie_path, &movie)
            .with_context(|| format!("write '{}'", case.movie_path.display()))?;

        let buffer = capture(
            &case.movie_path,
            &self.options.root,
            Arc::clone(&self.invoker),
            &self.options.capture,
        )?;

        // Reference outputs are only written after a fully successful
        // decode; a failed capture leaves the case untouched.
        buffer.save_png(&case.expected_png_path)?;
        fs::write(&case.bitmap_path, &tag.data)
            .with_context(|| format!("write '{}'", case.bitmap_path.display()))?;

        Ok(())
    }
}
