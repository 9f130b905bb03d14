use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use hugeenum::{
    generator::names::{autogenerate_names, binary_type_name, invalid_names, simple_name},
    Strategy, StrategyInfo,
};
use log::warn;
use serde::Serialize;

use crate::{app::GlobalOptions, output::print_output};

const CLASS_SUFFIX: &str = ".class";

pub struct GenerateOptions<'a> {
    pub name: &'a str,
    pub dir: Option<&'a Path>,
    pub elements: Option<&'a Path>,
    pub count: Option<usize>,
    pub algorithm: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GenerateReport {
    pub enum_name: String,
    pub algorithm: &'static str,
    pub element_count: usize,
    pub max_elements: usize,
    pub output: PathBuf,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// `<dir>/<SimpleName>.class`, or the bare file name without `dir`.
fn output_path(name: &str, dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let file_name = format!("{}{CLASS_SUFFIX}", simple_name(name));
    match dir {
        Some(dir) if dir.is_dir() => Ok(dir.join(file_name)),
        Some(dir) => bail!("Invalid output directory path: {}", dir.display()),
        None => Ok(PathBuf::from(file_name)),
    }
}

/// Warning for element counts beyond what `info` is known to support.
fn count_warning(count: usize, info: &StrategyInfo) -> Option<String> {
    if count <= info.max_elements {
        return None;
    }
    Some(format!(
        "Enum elements count ({count}) exceeds maximum ({}), supported by selected algorithm ({})",
        info.max_elements, info.id
    ))
}

/// Reads one element name per line, trimmed, skipping blank lines.
///
/// Every line that is not a valid identifier is reported at once.
fn read_element_names(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Item list file '{}' not found!", path.display()))?;

    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect();

    let invalid = invalid_names(&names);
    if !invalid.is_empty() {
        let listing: String = invalid.iter().map(|name| format!("\n\t{name}")).collect();
        bail!("Invalid element names encountered:{listing}");
    }
    Ok(names)
}

pub fn run(opts: &GenerateOptions, global: &GlobalOptions) -> anyhow::Result<()> {
    binary_type_name(opts.name).with_context(|| format!("Invalid enum name: {}", opts.name))?;
    let output = output_path(opts.name, opts.dir)?;

    let strategy = Strategy::from_id(opts.algorithm)
        .with_context(|| format!("Unknown algorithm: {}", opts.algorithm))?;
    let info = strategy.info();

    let names = match opts.elements {
        Some(path) => read_element_names(path)?,
        None => autogenerate_names(opts.count.unwrap_or(info.default_elements)),
    };

    let warning = count_warning(names.len(), info);
    if let Some(warning) = &warning {
        warn!("{warning}");
    }

    if !global.json {
        println!("Generating enum {}...", opts.name);
        println!("Algorithm used: {}", info.id);
        println!("Element count: {}", names.len());
    }

    let class = strategy
        .generate(opts.name, &names)
        .with_context(|| format!("failed to generate enum {}", opts.name))?;

    if !global.json {
        println!("Writing file {}", output.display());
    }
    fs::write(&output, &class).with_context(|| format!("failed to write {}", output.display()))?;

    let report = GenerateReport {
        enum_name: opts.name.to_string(),
        algorithm: info.id,
        element_count: names.len(),
        max_elements: info.max_elements,
        output,
        size: class.len(),
        warning,
    };
    print_output(&report, global, |_| println!("Done."))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn output_file_is_named_after_simple_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path("com.example.Huge", Some(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("Huge.class"));

        assert_eq!(
            output_path("Huge", None).unwrap(),
            PathBuf::from("Huge.class")
        );
        assert!(output_path("Huge", Some(&dir.path().join("missing"))).is_err());
    }

    #[test]
    fn element_list_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  RED\n\nGREEN  \n\t\nBLUE").unwrap();

        let names = read_element_names(file.path()).unwrap();
        assert_eq!(names, vec!["RED", "GREEN", "BLUE"]);
    }

    #[test]
    fn element_list_reports_every_invalid_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "RED\n1st\nGREEN\nsecond-one").unwrap();

        let message = read_element_names(file.path()).unwrap_err().to_string();
        assert!(message.contains("\t1st"));
        assert!(message.contains("\tsecond-one"));
        assert!(!message.contains("GREEN"));
    }

    #[test]
    fn element_list_accepts_java_identifier_characters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\u{20AC}v0\n\u{A3}\na\u{200B}b").unwrap();

        let names = read_element_names(file.path()).unwrap();
        assert_eq!(names, vec!["\u{20AC}v0", "\u{A3}", "a\u{200B}b"]);
    }

    #[test]
    fn warning_above_maximum() {
        let info = Strategy::ConDy.info();
        assert_eq!(count_warning(info.max_elements, info), None);

        let warning = count_warning(info.max_elements + 1, info).unwrap();
        let expected = concat!(
            "Enum elements count (10964) exceeds maximum (10963), ",
            "supported by selected algorithm (ConDy)"
        );
        assert_eq!(warning, expected);
    }

    #[test]
    fn missing_element_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_element_names(&dir.path().join("absent.txt")).is_err());
    }
}
