use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use humantime::format_duration;
use xmlsplit_core::{
    combine::{combine_xml, CombineInput, CombineInputXml, XmlSource},
    config::validate_name,
    CancellationToken,
};

/// Combine XML documents into one, wrapping each in its own element
#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Documents to combine, as `FILE` or `FILE:CHILD`. Without `CHILD`, the
    /// file name without extension is used as the wrapping element's name.
    #[arg(name = "FILE")]
    pub(super) files: Vec<String>,

    /// Name of the root element of the combined document
    #[arg(long, short, default_value = "Root")]
    pub(super) root: String,

    /// Write the combined document to this file instead of stdout
    #[arg(long, short)]
    pub(super) output: Option<PathBuf>,
}

/// Split a `FILE[:CHILD]` argument into path and element name. A colon
/// only separates `CHILD` if a valid element name follows it, so paths
/// like `C:\data\a.xml` are kept whole.
fn parse_input(arg: &str) -> Result<(PathBuf, String)> {
    if let Some((path, child)) = arg.rsplit_once(':') {
        if child.is_empty() {
            bail!("Missing element name after `:' in `{arg}'");
        }
        if !path.is_empty() && validate_name("child element name", child).is_ok() {
            return Ok((PathBuf::from(path), child.to_string()));
        }
    }

    let path = PathBuf::from(arg);
    let child = Path::new(arg)
        .file_stem()
        .with_context(|| format!("Unable to derive an element name from `{arg}'"))?
        .to_string_lossy()
        .into_owned();
    Ok((path, child))
}

/// Run the `combine` command
pub fn run_combine(args: CombineArgs) -> Result<()> {
    let start = Instant::now();

    let mut inputs = Vec::with_capacity(args.files.len());
    for arg in &args.files {
        let (path, child_element_name) = parse_input(arg)?;
        let xml = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read `{}'", path.display()))?;
        inputs.push(CombineInputXml {
            xml: XmlSource::RawText(xml),
            child_element_name,
        });
    }

    let input = CombineInput {
        root_element_name: args.root,
        inputs,
    };
    let combined = combine_xml(&input, &CancellationToken::new())?;

    match &args.output {
        Some(path) => fs::write(path, &combined)
            .with_context(|| format!("Unable to write `{}'", path.display()))?,
        None => println!("{combined}"),
    }

    eprintln!(
        "Combined {} documents in {}",
        input.inputs.len(),
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assertor::{assert_that, EqualityAssertion};

    use super::parse_input;

    #[test]
    fn inputs() {
        assert_that!(parse_input("data/a.xml").unwrap())
            .is_equal_to((PathBuf::from("data/a.xml"), "a".to_string()));
        assert_that!(parse_input("data/a.xml:Child").unwrap())
            .is_equal_to((PathBuf::from("data/a.xml"), "Child".to_string()));
        assert!(parse_input("a.xml:").is_err());
    }

    #[test]
    fn drive_letters() {
        assert_that!(parse_input(r"C:\data\a.xml").unwrap().0)
            .is_equal_to(PathBuf::from(r"C:\data\a.xml"));
        assert_that!(parse_input("C:/data/a.xml").unwrap().0)
            .is_equal_to(PathBuf::from("C:/data/a.xml"));
        assert_that!(parse_input(r"C:\data\a.xml:Child").unwrap())
            .is_equal_to((PathBuf::from(r"C:\data\a.xml"), "Child".to_string()));
    }
}
