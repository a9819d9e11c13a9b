//! Generator driver
//!
//! Runs parse, validate, resolve and emit in order and only then touches
//! the output directory. A run that fails at any stage writes nothing.

use crate::codegen::{Artifact, Target};
use crate::diagnostics::{Diagnosed, Diagnostics, WeldError, WeldResult};
use crate::ir::InterfaceDefinition;
use crate::overload::{resolve, OverloadPlan, ResolveOptions};
use crate::parse::{parse_file, parse_str, Format};
use crate::validate::validate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A validated definition with its overload plan
#[derive(Debug, Clone)]
pub struct Analysis {
    pub definition: InterfaceDefinition,
    pub plan: OverloadPlan,
    /// Warnings from every stage
    pub diagnostics: Diagnostics,
}

/// Rendered artifacts, not yet written
#[derive(Debug, Clone)]
pub struct Compilation {
    pub analysis: Analysis,
    pub artifacts: Vec<Artifact>,
}

/// Outcome of writing artifacts to disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files created or replaced
    pub written: Vec<PathBuf>,
    /// Files whose contents already matched
    pub unchanged: Vec<PathBuf>,
}

/// Outcome of a full generation run
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub target: Target,
    pub files: WriteReport,
    pub diagnostics: Diagnostics,
}

/// Builder for generation runs
///
/// # Example
/// ```ignore
/// use loom_weld::build::Generator;
/// use loom_weld::codegen::Target;
///
/// let report = Generator::new("bindings")
///     .target(Target::JavaScript)
///     .strict(true)
///     .generate("geometry.yaml")?;
/// println!("{} file(s) written", report.files.written.len());
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    output: PathBuf,
    target: Target,
    options: ResolveOptions,
}

impl Generator {
    /// Create a generator writing into `output`
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            target: Target::default(),
            options: ResolveOptions::default(),
        }
    }

    /// Select the emitted target
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Warn about collapsed duplicate overloads
    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Parse, validate and resolve a description file
    pub fn analyze_file(&self, path: impl AsRef<Path>) -> WeldResult<Analysis> {
        let path = path.as_ref();
        debug!(path = %path.display(), "analyzing description");
        analyze(parse_file(path), self.options)
    }

    /// Parse, validate and resolve description text
    pub fn analyze_str(&self, source: &str, format: Format) -> WeldResult<Analysis> {
        analyze(parse_str(source, format), self.options)
    }

    /// Render every artifact for an analyzed definition
    pub fn render(&self, analysis: Analysis) -> WeldResult<Compilation> {
        let artifacts = self
            .target
            .emitter()
            .emit(&analysis.definition, &analysis.plan)?;
        debug!(
            target = %self.target,
            artifacts = artifacts.len(),
            "rendered artifacts"
        );
        Ok(Compilation {
            analysis,
            artifacts,
        })
    }

    /// Analyze, render and write a description file
    pub fn generate(&self, path: impl AsRef<Path>) -> WeldResult<GenerateReport> {
        let compilation = self.render(self.analyze_file(path)?)?;
        let files = write_artifacts(&self.output, &compilation.artifacts)?;
        Ok(GenerateReport {
            target: self.target,
            files,
            diagnostics: compilation.analysis.diagnostics,
        })
    }
}

fn analyze(parsed: Diagnosed<InterfaceDefinition>, options: ResolveOptions) -> WeldResult<Analysis> {
    let Diagnosed {
        value,
        mut diagnostics,
    } = parsed;
    let definition = match value {
        Some(definition) if !diagnostics.has_errors() => definition,
        _ => return Err(WeldError::rejected("parsing", diagnostics)),
    };

    diagnostics.extend(validate(&definition));
    if diagnostics.has_errors() {
        return Err(WeldError::rejected("validation", diagnostics));
    }

    let resolved = resolve(&definition, options);
    diagnostics.extend(resolved.diagnostics);
    let plan = match resolved.value {
        Some(plan) => plan,
        None => return Err(WeldError::rejected("overload resolution", diagnostics)),
    };

    Ok(Analysis {
        definition,
        plan,
        diagnostics,
    })
}

/// Write artifacts under `output`, skipping files whose bytes already match
///
/// Changed files are staged next to their destination and renamed into
/// place once every one of them has been written. On failure the staged
/// files are removed and existing outputs keep their old contents.
pub fn write_artifacts(output: &Path, artifacts: &[Artifact]) -> WeldResult<WriteReport> {
    fs::create_dir_all(output)?;
    let mut report = WriteReport::default();
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();

    for artifact in artifacts {
        let path = output.join(&artifact.path);
        match stage_artifact(&path, artifact) {
            Ok(Some(temp)) => staged.push((temp, path)),
            Ok(None) => {
                debug!(path = %path.display(), "unchanged");
                report.unchanged.push(path);
            }
            Err(err) => {
                discard_staged(&staged);
                return Err(err.into());
            }
        }
    }

    for (index, (temp, path)) in staged.iter().enumerate() {
        if let Err(err) = fs::rename(temp, path) {
            discard_staged(&staged[index..]);
            return Err(err.into());
        }
        debug!(path = %path.display(), "wrote artifact");
        report.written.push(path.clone());
    }

    Ok(report)
}

/// Write a changed artifact beside its destination; `None` when unchanged
fn stage_artifact(path: &Path, artifact: &Artifact) -> io::Result<Option<PathBuf>> {
    if path.is_dir() {
        return Err(io::Error::other(format!(
            "cannot write {}: a directory is in the way",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::read(path).ok().as_deref() == Some(artifact.contents.as_bytes()) {
        return Ok(None);
    }

    let temp = staging_path(path);
    fs::write(&temp, &artifact.contents)?;
    debug!(path = %temp.display(), bytes = artifact.contents.len(), "staged artifact");
    Ok(Some(temp))
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.loom-tmp", name))
}

fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        if let Err(err) = fs::remove_file(temp) {
            warn!(path = %temp.display(), error = %err, "failed to remove staged artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SHAPES: &str = r#"
module:
  name: shapes
  version: 1.2.0
classes:
  - name: Rectangle
    methods:
      - { name: area, returns: double, const: true }
      - name: area
        returns: double
        const: true
        parameters: [{ name: scale, type: double }]
"#;

    fn write_description(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_generate_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let input = write_description(&dir, "shapes.yaml", SHAPES);
        let output = dir.path().join("out");

        let report = Generator::new(&output).generate(&input).unwrap();
        assert_eq!(report.target, Target::Registration);
        assert_eq!(report.files.written.len(), 2);

        let source = fs::read_to_string(output.join("shapes_registration.cpp")).unwrap();
        assert!(source.contains("\"area_void\""));
        assert!(source.contains("\"area_double\""));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let input = write_description(&dir, "shapes.yaml", SHAPES);
        let output = dir.path().join("out");
        let generator = Generator::new(&output).target(Target::JavaScript);

        let first = generator.generate(&input).unwrap();
        let snapshot: Vec<_> = first
            .files
            .written
            .iter()
            .map(|path| fs::read(path).unwrap())
            .collect();

        let second = generator.generate(&input).unwrap();
        assert!(second.files.written.is_empty());
        assert_eq!(second.files.unchanged, first.files.written);
        for (path, before) in first.files.written.iter().zip(snapshot) {
            assert_eq!(fs::read(path).unwrap(), before);
        }
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_description(
            &dir,
            "cycle.yaml",
            "module: { name: m }\nclasses:\n  - { name: A, base_classes: [B] }\n  - { name: B, base_classes: [A] }\n",
        );
        let output = dir.path().join("out");

        let err = Generator::new(&output).generate(&input).unwrap_err();
        match err {
            WeldError::Rejected { stage, diagnostics } => {
                assert_eq!(stage, "validation");
                assert_eq!(diagnostics.error_count(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_parse_failure_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = write_description(&dir, "broken.ild", "class Point {\n  field x: double\n");

        let err = Generator::new(dir.path().join("out")).analyze_file(&input).unwrap_err();
        assert!(matches!(err, WeldError::Rejected { stage: "parsing", .. }));
    }

    #[test]
    fn test_render_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_description(&dir, "bad.json", r#"{"module": {"name": "bad-name"}}"#);
        let output = dir.path().join("out");

        let err = Generator::new(&output).generate(&input).unwrap_err();
        assert!(matches!(err, WeldError::Render { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_strict_warnings_are_reported() {
        let source = "module: { name: m }\nclasses:\n  - name: P\n    methods:\n      - { name: f }\n      - { name: f }\n";
        let analysis = Generator::new(".")
            .strict(true)
            .analyze_str(source, Format::Yaml)
            .unwrap();
        assert_eq!(analysis.diagnostics.warning_count(), 1);
        assert_eq!(analysis.plan.skipped_count(), 1);
    }

    #[test]
    fn test_write_artifacts_creates_subdirectories() {
        let dir = TempDir::new().unwrap();
        let artifacts = vec![Artifact::new("src/a.cpp", "int a;\n")];
        let report = write_artifacts(dir.path(), &artifacts).unwrap();
        assert_eq!(report.written, vec![dir.path().join("src/a.cpp")]);
        assert_eq!(fs::read_to_string(dir.path().join("src/a.cpp")).unwrap(), "int a;\n");
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_failed_write_leaves_no_partial_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cpp"), "old\n").unwrap();
        fs::write(dir.path().join("include"), "not a directory\n").unwrap();
        let artifacts = vec![
            Artifact::new("a.cpp", "int a;\n"),
            Artifact::new("b.cpp", "int b;\n"),
            Artifact::new("include/c.h", "int c;\n"),
        ];

        assert!(write_artifacts(dir.path(), &artifacts).is_err());
        assert_eq!(entries(dir.path()), vec!["a.cpp", "include"]);
        assert_eq!(fs::read_to_string(dir.path().join("a.cpp")).unwrap(), "old\n");
    }

    #[test]
    fn test_directory_in_the_way_fails_before_writing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("b.cpp")).unwrap();
        let artifacts = vec![
            Artifact::new("a.cpp", "int a;\n"),
            Artifact::new("b.cpp", "int b;\n"),
        ];

        assert!(write_artifacts(dir.path(), &artifacts).is_err());
        assert_eq!(entries(dir.path()), vec!["b.cpp"]);
    }
}
