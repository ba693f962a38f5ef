use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use humantime::format_duration;
use xmlsplit_core::{split_xml_file, CancellationToken, SplitConfig};

/// Split an XML file into chunk files holding a fixed number of elements
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// The XML file to split
    #[arg(name = "FILE")]
    pub(super) file: PathBuf,

    /// Qualified name of the repeating element to split at
    #[arg(long, short, env = "XMLSPLIT_ELEMENT")]
    pub(super) element: String,

    /// Directory to write the chunk files to. Must exist.
    #[arg(long, short, env = "XMLSPLIT_OUTPUT_DIR")]
    pub(super) output_dir: PathBuf,

    /// Maximum number of elements per chunk file
    #[arg(long, short = 'n', env = "XMLSPLIT_COUNT")]
    pub(super) count: usize,

    /// Name of the root element of every chunk file
    #[arg(long, short, env = "XMLSPLIT_ROOT", default_value = "root")]
    pub(super) root: String,

    /// Copy namespace declarations of enclosing elements into every
    /// captured element
    #[arg(long)]
    pub(super) inherit_namespaces: bool,

    /// Split the file even if its extension does not look like XML
    #[arg(long, short)]
    pub(super) force: bool,
}

/// Make sure the file looks like an XML file
fn check_file_type(args: &SplitArgs) -> Result<()> {
    if args.force {
        return Ok(());
    }

    let path = args.file.display();
    match mime_guess::from_path(&args.file).first() {
        Some(t) => {
            let is_xml = matches!(t.subtype().as_str(), "xml" | "gml")
                || t.suffix().map(|s| s.as_str()) == Some("xml");
            if !is_xml {
                bail!("Unsupported file type: `{path}' -> `{t}' (use --force to split anyway)");
            }
        }
        None => bail!("Unable to detect file type: `{path}' (use --force to split anyway)"),
    }

    Ok(())
}

/// Run the `split` command
pub fn run_split(args: SplitArgs) -> Result<()> {
    check_file_type(&args)?;

    let config = SplitConfig::new(&args.element, &args.output_dir, args.count, &args.root)
        .context("Invalid split options")?
        .with_inherit_namespaces(args.inherit_namespaces);

    let start = Instant::now();
    let result = split_xml_file(&args.file, &config, &CancellationToken::new())
        .with_context(|| format!("Unable to split `{}'", args.file.display()))?;

    for path in result.file_paths() {
        println!("{}", path.display());
    }

    eprintln!(
        "Wrote {} `{}' elements to {} files in {}",
        result.fragment_count(),
        args.element,
        result.len(),
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );

    Ok(())
}
