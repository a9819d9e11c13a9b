//! `loom generate`, `loom validate` and `loom info`

use crate::config::ProjectConfig;
use anyhow::{anyhow, bail, Result};
use loom_weld::{Analysis, Diagnostics, Generator, Target, WeldError};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Run the generate command
pub fn run_generate(args: &[String], config: &ProjectConfig) -> Result<()> {
    let cmd = GenerateCommand::parse(args)?.with_config(config)?;

    let generator = Generator::new(&cmd.output)
        .target(cmd.target)
        .strict(cmd.strict);
    let report = generator.generate(&cmd.input).map_err(surface)?;

    print_diagnostics(&report.diagnostics);
    println!(
        "Generated {} target into {} ({} written, {} unchanged)",
        report.target,
        cmd.output.display(),
        report.files.written.len(),
        report.files.unchanged.len()
    );
    for path in &report.files.written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

/// Run the validate command
pub fn run_validate(args: &[String], config: &ProjectConfig) -> Result<()> {
    let cmd = InputCommand::parse(args, "validate")?;
    let analysis = Generator::new(".")
        .strict(cmd.strict || config.generate.strict.unwrap_or(false))
        .analyze_file(&cmd.input)
        .map_err(surface)?;

    print_diagnostics(&analysis.diagnostics);
    println!(
        "{} is valid: {} class(es), {} function(s), {} converter(s)",
        cmd.input.display(),
        analysis.definition.classes.len(),
        analysis.definition.functions.len(),
        analysis.definition.converters.len()
    );
    Ok(())
}

/// Run the info command
pub fn run_info(args: &[String]) -> Result<()> {
    let cmd = InputCommand::parse(args, "info")?;
    let analysis = Generator::new(".")
        .analyze_file(&cmd.input)
        .map_err(surface)?;

    print_diagnostics(&analysis.diagnostics);
    print!("{}", render_info(&analysis));
    Ok(())
}

/// Generate command configuration, after merging flags with the project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSettings {
    pub input: PathBuf,
    pub target: Target,
    pub output: PathBuf,
    pub strict: bool,
}

/// Generate command flags as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateCommand {
    input: Option<PathBuf>,
    target: Option<String>,
    output: Option<PathBuf>,
    strict: bool,
}

impl GenerateCommand {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut cmd = GenerateCommand::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--target" | "-t" => {
                    if i + 1 < args.len() {
                        cmd.target = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        bail!("--target requires a value (registration, javascript, or python)");
                    }
                }
                "--output" | "-o" => {
                    if i + 1 < args.len() {
                        cmd.output = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    } else {
                        bail!("--output requires a value");
                    }
                }
                "--strict" => {
                    cmd.strict = true;
                    i += 1;
                }
                arg if !arg.starts_with('-') => {
                    if cmd.input.is_some() {
                        bail!("Unexpected argument: {}", arg);
                    }
                    cmd.input = Some(PathBuf::from(arg));
                    i += 1;
                }
                _ => {
                    bail!("Unknown flag: {}", args[i]);
                }
            }
        }

        Ok(cmd)
    }

    /// Fill unset flags from the project file, then built-in defaults
    pub fn with_config(self, config: &ProjectConfig) -> Result<GenerateSettings> {
        let input = self.input.ok_or_else(|| {
            anyhow!("Usage: loom generate <description-file> [--target <name>] [--output <dir>]")
        })?;
        let target = match self.target.or_else(|| config.generate.target.clone()) {
            Some(name) => name.parse::<Target>()?,
            None => Target::default(),
        };
        let output = self
            .output
            .or_else(|| config.generate.output.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let strict = self.strict || config.generate.strict.unwrap_or(false);

        Ok(GenerateSettings {
            input,
            target,
            output,
            strict,
        })
    }
}

/// Commands that take a single description file
#[derive(Debug, Clone, PartialEq, Eq)]
struct InputCommand {
    input: PathBuf,
    strict: bool,
}

impl InputCommand {
    fn parse(args: &[String], name: &str) -> Result<Self> {
        let mut input = None;
        let mut strict = false;
        for arg in args {
            match arg.as_str() {
                "--strict" => strict = true,
                arg if !arg.starts_with('-') && input.is_none() => {
                    input = Some(PathBuf::from(arg));
                }
                arg if !arg.starts_with('-') => bail!("Unexpected argument: {}", arg),
                _ => bail!("Unknown flag: {}", arg),
            }
        }
        let input =
            input.ok_or_else(|| anyhow!("Usage: loom {} <description-file>", name))?;
        Ok(Self { input, strict })
    }
}

/// Print the diagnostic list carried by a rejection before failing
fn surface(err: WeldError) -> anyhow::Error {
    if let Some(diagnostics) = err.diagnostics() {
        print_diagnostics(diagnostics);
    }
    anyhow::Error::new(err)
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    diagnostics.print(std::io::stderr().is_terminal());
    if let Some(summary) = diagnostics.summary() {
        eprintln!("{}", summary);
    }
}

/// Human-readable summary of an analyzed description
pub fn render_info(analysis: &Analysis) -> String {
    let definition = &analysis.definition;
    let module = &definition.module;
    let mut out = String::new();

    out.push_str(&format!("Module:     {} {}\n", module.name, module.version));
    if let Some(namespace) = &module.namespace {
        out.push_str(&format!("Namespace:  {}\n", namespace));
    }
    if let Some(description) = &module.description {
        out.push_str(&format!("About:      {}\n", description));
    }
    out.push_str(&format!("Classes:    {}\n", definition.classes.len()));
    out.push_str(&format!("Functions:  {}\n", definition.functions.len()));
    out.push_str(&format!("Converters: {}\n", definition.converters.len()));
    for converter in &definition.converters {
        match &converter.custom_converter {
            Some(custom) => out.push_str(&format!(
                "  {} ({} via {})\n",
                converter.ty,
                converter.kind().label(),
                custom
            )),
            None => out.push_str(&format!("  {} ({})\n", converter.ty, converter.kind().label())),
        }
    }
    if let Some(library) = &definition.library {
        out.push_str(&format!(
            "Library:    {} ({})\n",
            library.name,
            library.path.clone().unwrap_or_else(|| library.file_name())
        ));
    }

    for (index, class) in definition.classes.iter().enumerate() {
        out.push_str(&format!(
            "\n{} ({} constructor(s), {} field(s), {} method(s))\n",
            class.name,
            class.constructors.len(),
            class.fields.len(),
            class.methods.len()
        ));
        let Some(plan) = analysis.plan.class(index) else {
            continue;
        };
        for (name, emitted) in plan.overload_groups(class) {
            out.push_str(&format!("  {} -> {}\n", name, emitted.join(", ")));
        }
        if !plan.skipped.is_empty() {
            out.push_str(&format!(
                "  {} duplicate declaration(s) skipped\n",
                plan.skipped.len()
            ));
        }
    }
    out
}
