use std::path::PathBuf;

use clap::{ArgAction, Parser};
use git_version::git_version;

/// Successful termination of process.
pub const EXIT_SUCCESS: i32 = 0;

/// A binary-analysis toolkit and debugger for ELF executables.
#[derive(Parser)]
#[command()]
pub struct Opts {
    /// Path to an ELF binary.
    #[arg(required_unless_present_any = ["interactive", "version"])]
    pub file: Option<PathBuf>,

    /// Print the ELF metadata report.
    #[arg(short = 'm', long)]
    pub metadata: bool,

    /// Disassemble the executable sections.
    #[arg(short = 'a', long)]
    pub disassemble: bool,

    /// Run the external decompiler over the binary.
    #[arg(short = 'c', long)]
    pub decompile: bool,

    /// Debug a fresh instance of the binary.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Start the interactive shell.
    #[arg(short = 'i', long, conflicts_with = "file")]
    pub interactive: bool,

    /// Arguments passed to the tracee (only meaningful with -d).
    #[arg(long, num_args = 0.., allow_hyphen_values = true, requires = "debug")]
    pub args: Vec<String>,

    /// Enable more verbose output.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Prints version information.
    #[arg(short = 'V', long)]
    version: bool,
}

pub fn handle_arguments() -> anyhow::Result<i32> {
    let opts = Opts::parse();

    init_logger(opts.verbose);

    if opts.version {
        print_version();
        Ok(EXIT_SUCCESS)
    } else if opts.interactive {
        crate::shell::run()?;
        Ok(EXIT_SUCCESS)
    } else if let Some(file) = opts.file.as_deref() {
        crate::run_tool(file, &opts)
    } else {
        unreachable!("due to clap constraints")
    }
}

fn init_logger(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    // log everything from baseer at "info" or higher by default; `-v` opens
    // up our debug logs, `-vv` everything
    match verbose {
        0 => builder.filter_module("baseer", log::LevelFilter::Info),
        1 => builder.filter_module("baseer", log::LevelFilter::Debug),
        _ => builder.filter_level(log::LevelFilter::Trace),
    };
    builder.format_timestamp(None).init();
}

/// The string reported by the `--version` flag
fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    // `git describe --long` output, e.g. `v0.1.0-7-g3f9d21c`; the fallback
    // covers builds from a source tarball
    const GIT_DESCRIBE: &str = git_version!(fallback = "--", args = ["--long"]);

    println!("{VERSION} {}", extract_git_hash(GIT_DESCRIBE));
}

/// Abbreviated commit (the `g<hash>` component) out of a
/// `git describe --long` string, or `""` when there is none.
fn extract_git_hash(describe: &str) -> &str {
    describe
        .rsplit('-')
        .find(|part| part.starts_with('g') && part.len() > 1)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::tagged("v0.1.0-7-g3f9d21c", "g3f9d21c")]
    #[case::dashed_tag("baseer-0.1.0-12-gab12cd3", "gab12cd3")]
    #[case::dirty_worktree("v0.1.0-7-g3f9d21c-modified", "g3f9d21c")]
    #[case::no_repository("--", "")]
    fn picks_the_commit_out_of_git_describe(#[case] describe: &str, #[case] expected: &str) {
        assert_eq!(extract_git_hash(describe), expected);
    }
}
