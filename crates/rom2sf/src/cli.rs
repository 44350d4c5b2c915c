use core::cell::Cell;

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use termcolor::{ColorChoice, StandardStream};

use crate::config::Config;
use crate::engine::{CommandEngine, Engine, Job};
use crate::load::LoadOffset;
use crate::out::{Colors, Out, blank, error, info};
use crate::shell;
use crate::tags::Tags;

const HELP_TEMPLATE: &str = "\
{name} {version}
======================

{about}. Created by {author}.

Usage
-----

Syntax: `{usage}`

### Options ###

{options}
";

/// NDS ROM to 2SF converter.
#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = HELP_TEMPLATE,
    next_line_help = true,
    args_override_self = true,
    disable_help_flag = true,
    disable_version_flag = true,
    max_term_width = 80
)]
pub struct Rom2sf {
    /// Show this help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
    /// Output filename. Note that when converting several files, every one
    /// of them is written to this same path.
    #[arg(short = 'o', value_name = "PATH", allow_hyphen_values = true)]
    output: Option<PathBuf>,
    /// Load offset of the ROM, as a hexadecimal number.
    #[arg(long, value_name = "HEX", allow_hyphen_values = true)]
    load: Option<LoadOffset>,
    /// Set the library name. Output files become mini2sf files which
    /// reference the library.
    #[arg(long, value_name = "NAME", allow_hyphen_values = true)]
    lib: Option<String>,
    /// Set the creator name of the 2SF.
    #[arg(
        long = "psfby",
        visible_alias = "2sfby",
        value_name = "NAME",
        allow_hyphen_values = true
    )]
    creator: Option<String>,
    /// Conversion engine to invoke for each file.
    #[arg(long, value_name = "PROGRAM", default_value = "nds2sf")]
    engine: PathBuf,
    /// Print the full engine command line for each file.
    #[arg(short = 'v', long)]
    verbose: bool,
    /// Print what would be converted without invoking the engine.
    #[arg(short = 'D', long)]
    dry_run: bool,
    /// NDS files to convert.
    #[arg(value_name = "NDS FILES", num_args = 1.., trailing_var_arg = true)]
    files: Vec<PathBuf>,
}

impl Rom2sf {
    /// Parse options from the given arguments, where the first argument is
    /// the name of the binary.
    ///
    /// Unlike plain clap parsing, a bare `-` or `--` among the options is
    /// rejected as an unknown option.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = args.into_iter().map(Into::into).collect::<Vec<OsString>>();
        let mut cmd = Self::command();

        if let Some(arg) = stray_option(&cmd, args.get(1..).unwrap_or_default()) {
            return Err(cmd.error(
                ErrorKind::UnknownArgument,
                format!("unknown option '{}'", arg.to_string_lossy()),
            ));
        }

        Self::try_parse_from(args)
    }

    fn config(&self) -> Config {
        Config {
            output: self.output.clone(),
            load: self.load,
            lib: self.lib.clone().filter(|s| !s.is_empty()),
            creator: self.creator.clone().filter(|s| !s.is_empty()),
            engine: self.engine.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            files: self.files.clone(),
        }
    }
}

/// Find a `-` or `--` token in the options section of `args`.
///
/// Scanning stops at the first file or at `--help`, and skips over the
/// values of options which take one.
fn stray_option<'a>(cmd: &clap::Command, args: &'a [OsString]) -> Option<&'a OsStr> {
    let mut it = args.iter();

    while let Some(arg) = it.next() {
        let bytes = arg.as_encoded_bytes();

        match bytes {
            b"-" | b"--" => return Some(arg.as_os_str()),
            [b'-', ..] => {}
            _ => return None,
        }

        let Some(s) = arg.to_str() else {
            continue;
        };

        let (action, inline) = if let Some(long) = s.strip_prefix("--") {
            let (name, value) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };

            let found = cmd.get_arguments().find(|a| {
                a.get_long() == Some(name)
                    || a.get_all_aliases().is_some_and(|aliases| aliases.contains(&name))
            });

            (found.map(|a| a.get_action()), value)
        } else {
            let mut chars = s[1..].chars();
            let mut found = None;

            while let Some(c) = chars.next() {
                let Some(a) = cmd.get_arguments().find(|a| a.get_short() == Some(c)) else {
                    break;
                };

                if a.get_action().takes_values() {
                    found = Some(a.get_action());
                    break;
                }
            }

            (found, !chars.as_str().is_empty())
        };

        match action {
            Some(ArgAction::Help) => return None,
            Some(action) if action.takes_values() && !inline => {
                it.next();
            }
            _ => {}
        }
    }

    None
}

/// Outcome of a batch of conversions.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) total: usize,
    pub(crate) failed: usize,
}

/// Entry for `rom2sf`.
///
/// See [`crate`] documentation.
pub fn entry(opts: &Rom2sf) -> Result<()> {
    if opts.files.is_empty() {
        bail!(
            "No input files.\n\nRun \"{} --help\" for help.",
            env!("CARGO_PKG_NAME")
        );
    }

    let config = opts.config();

    // Current indentation level for output.
    let indent = Cell::new(0);
    let cols = Colors::new();

    let o = StandardStream::stdout(ColorChoice::Auto);
    let mut o = o.lock();
    let mut o = Out::new(config.verbose, &indent, &cols, &mut o);

    let mut engine = CommandEngine::new(&config.engine);
    let summary = run(&mut o, &config, &mut engine)?;

    if summary.failed > 0 {
        bail!(
            "{} of {} conversions failed",
            summary.failed,
            summary.total
        );
    }

    Ok(())
}

/// Convert every file in the batch, one at a time.
///
/// A failing conversion does not stop the batch, it is only counted.
fn run<E>(o: &mut Out<'_>, config: &Config, engine: &mut E) -> Result<Summary>
where
    E: ?Sized + Engine,
{
    let mut summary = Summary::default();

    for source in &config.files {
        let destination = config.output_path(source);
        let tags = Tags::from_config(config);

        let job = Job {
            source,
            destination: &destination,
            load: config.load(),
            tags: &tags,
        };

        summary.total += 1;

        let from = shell::escape(source.as_os_str());
        let to = shell::escape(destination.as_os_str());

        if config.dry_run {
            info!(o, "Would convert {from} to {to}");
            let mut o = o.indent(1);

            if !job.load.is_default() {
                blank!(o, "load : {}", job.load);
            }

            for (key, value) in tags.iter() {
                blank!(o, "tag  : {key}={value}");
            }

            continue;
        }

        let result = {
            let mut o = o.indent(1);
            engine.convert(&mut o, &job)
        };

        match result {
            Ok(()) => {
                info!(o, "Converted {from} to {to}");
            }
            Err(e) => {
                summary.failed += 1;
                error!(o, "Error: Unable to convert {from} to {to}");
                let mut o = o.indent(1);
                error!(o, "{e:#}");
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use std::path::{Path, PathBuf};

    use anyhow::{Result, bail};
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use termcolor::NoColor;

    use crate::config::Config;
    use crate::engine::{Engine, Job};
    use crate::load::{LoadOffset, MAX_ROM_SIZE};
    use crate::out::{Colors, Out};
    use crate::tags::{TagKey, Tags};

    use super::{Rom2sf, Summary, entry, run};

    /// Engine which records every job and fails on selected sources.
    #[derive(Default)]
    struct Recording {
        fail: Vec<PathBuf>,
        jobs: Vec<(PathBuf, PathBuf, u32, Tags)>,
    }

    impl Engine for Recording {
        fn convert(&mut self, _: &mut Out<'_>, job: &Job<'_>) -> Result<()> {
            self.jobs.push((
                job.source.to_owned(),
                job.destination.to_owned(),
                job.load.get(),
                job.tags.clone(),
            ));

            if self.fail.iter().any(|p| p == job.source) {
                bail!("corrupt rom");
            }

            Ok(())
        }
    }

    fn parse(args: &[&str]) -> Result<Rom2sf, clap::Error> {
        Rom2sf::try_parse_args(["rom2sf"].iter().chain(args))
    }

    fn batch(args: &[&str], engine: &mut Recording) -> Result<(Summary, String)> {
        let config = parse(args)?.config();

        let indent = Cell::new(0);
        let cols = Colors::new();
        let mut sink = NoColor::new(Vec::new());

        let summary = {
            let mut o = Out::new(config.verbose, &indent, &cols, &mut sink);
            run(&mut o, &config, engine)?
        };

        Ok((summary, String::from_utf8(sink.into_inner())?))
    }

    #[test]
    fn help_exits_successfully() {
        for args in [&["--help"][..], &["--help", "--bogus", "x.nds"][..]] {
            let Err(e) = parse(args) else {
                panic!("expected help for {args:?}");
            };

            assert_eq!(e.kind(), ErrorKind::DisplayHelp);
            assert_eq!(e.exit_code(), 0);
        }
    }

    #[test]
    fn help_lists_options() {
        let help = Rom2sf::command().render_help().to_string();

        assert!(help.contains("Created by"));
        assert!(help.contains("Syntax:"));

        for flag in ["--help", "-o", "--load", "--lib", "--psfby", "2sfby"] {
            assert!(help.contains(flag), "missing {flag} in:\n{help}");
        }
    }

    #[test]
    fn short_help_is_unknown() {
        let Err(e) = parse(&["-h"]) else {
            panic!("-h should not parse");
        };

        assert_eq!(e.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn no_input_files() -> Result<()> {
        let opts = parse(&[])?;
        assert!(entry(&opts).is_err());

        let opts = parse(&["--psfby", "Author"])?;
        assert!(entry(&opts).is_err());
        Ok(())
    }

    #[test]
    fn usage_errors() {
        let cases: &[&[&str]] = &[
            &["--bogus", "a.nds"],
            &["-o"],
            &["--load"],
            &["--lib"],
            &["--psfby"],
            &["--2sfby"],
            &["--", "a.nds"],
            &["-", "a.nds"],
            &["--psfby", "Author", "--", "a.nds"],
            &["-v", "-", "a.nds"],
        ];

        for args in cases {
            assert!(parse(args).is_err(), "expected error for {args:?}");
        }
    }

    #[test]
    fn separators_are_unknown_options() {
        for args in [&["--", "a.nds"][..], &["-", "a.nds"][..]] {
            let Err(e) = parse(args) else {
                panic!("expected error for {args:?}");
            };

            assert_eq!(e.kind(), ErrorKind::UnknownArgument);
            assert_eq!(e.exit_code(), 2);
        }
    }

    #[test]
    fn separators_as_values_and_files() -> Result<()> {
        let opts = parse(&["-o", "-", "--psfby", "-", "a.nds", "-"])?;

        assert_eq!(opts.output.as_deref(), Some(Path::new("-")));
        assert_eq!(opts.creator.as_deref(), Some("-"));
        assert_eq!(opts.files, ["a.nds", "-"].map(PathBuf::from));

        let opts = parse(&["--load=10", "-Dv", "a.nds"])?;
        assert_eq!(opts.load.map(LoadOffset::get), Some(0x10));
        assert!(opts.dry_run && opts.verbose);
        Ok(())
    }

    #[test]
    fn repeated_options_keep_last_value() -> Result<()> {
        let opts = parse(&["--psfby", "A", "--2sfby", "B", "a.nds"])?;
        assert_eq!(opts.creator.as_deref(), Some("B"));

        let opts = parse(&["--load", "1", "--load", "2", "-o", "x.2sf", "-o", "y.2sf", "a.nds"])?;
        assert_eq!(opts.load.map(LoadOffset::get), Some(2));
        assert_eq!(opts.output.as_deref(), Some(Path::new("y.2sf")));
        Ok(())
    }

    #[test]
    fn bad_load_offsets() {
        let too_large = format!("{MAX_ROM_SIZE:x}");

        for value in ["-1", "xyz", "", too_large.as_str()] {
            let Err(e) = parse(&["--load", value, "a.nds"]) else {
                panic!("expected error for --load {value:?}");
            };

            assert_eq!(e.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn flags_stop_at_first_file() -> Result<()> {
        let opts = parse(&["--psfby", "Author", "a.nds", "--lib", "-o", "b.nds"])?;

        assert_eq!(opts.creator.as_deref(), Some("Author"));
        assert_eq!(opts.lib, None);
        assert_eq!(opts.output, None);
        assert_eq!(opts.files, ["a.nds", "--lib", "-o", "b.nds"].map(PathBuf::from));
        Ok(())
    }

    #[test]
    fn default_destinations() -> Result<()> {
        let mut engine = Recording::default();
        let (summary, output) = batch(&["song.nds", "roms/other.nds"], &mut engine)?;

        assert_eq!(summary, Summary { total: 2, failed: 0 });

        let destinations = engine.jobs.iter().map(|j| j.1.as_path()).collect::<Vec<_>>();
        assert_eq!(destinations, [Path::new("song.2sf"), Path::new("roms/other.2sf")]);
        assert!(engine.jobs.iter().all(|j| j.2 == 0 && j.3.is_empty()));

        assert_eq!(
            output,
            "Converted song.nds to song.2sf\nConverted roms/other.nds to roms/other.2sf\n"
        );
        Ok(())
    }

    #[test]
    fn library_members() -> Result<()> {
        let mut engine = Recording::default();
        batch(&["--lib", "mylib.2sflib", "a.nds", "b.nds"], &mut engine)?;

        assert_eq!(engine.jobs.len(), 2);

        for (source, destination, _, tags) in &engine.jobs {
            assert_eq!(destination, &source.with_extension("mini2sf"));
            assert_eq!(tags.get(TagKey::Lib), Some("mylib.2sflib"));
        }

        Ok(())
    }

    #[test]
    fn output_override_applies_to_every_file() -> Result<()> {
        let mut engine = Recording::default();
        batch(&["-o", "out.2sf", "a.nds", "b.nds", "c.nds"], &mut engine)?;

        assert_eq!(engine.jobs.len(), 3);
        assert!(engine.jobs.iter().all(|j| j.1 == Path::new("out.2sf")));
        Ok(())
    }

    #[test]
    fn load_offset_is_forwarded() -> Result<()> {
        let mut engine = Recording::default();
        batch(&["--load", "0x2000", "a.nds"], &mut engine)?;

        assert_eq!(engine.jobs[0].2, 0x2000);
        Ok(())
    }

    #[test]
    fn failure_does_not_stop_batch() -> Result<()> {
        let mut engine = Recording {
            fail: vec![PathBuf::from("b.nds")],
            ..Recording::default()
        };

        let (summary, output) = batch(&["a.nds", "b.nds", "c.nds"], &mut engine)?;

        assert_eq!(summary, Summary { total: 3, failed: 1 });

        let sources = engine.jobs.iter().map(|j| j.0.as_path()).collect::<Vec<_>>();
        assert_eq!(sources, ["a.nds", "b.nds", "c.nds"].map(Path::new));

        assert_eq!(
            output,
            "Converted a.nds to a.2sf\n\
             Error: Unable to convert b.nds to b.2sf\n\
             \x20 corrupt rom\n\
             Converted c.nds to c.2sf\n"
        );
        Ok(())
    }

    #[test]
    fn creator_spellings_are_equivalent() -> Result<()> {
        let psfby = Tags::from_config(&parse(&["--psfby", "Author", "a.nds"])?.config());
        let twosfby = Tags::from_config(&parse(&["--2sfby", "Author", "a.nds"])?.config());

        assert_eq!(psfby, twosfby);
        assert_eq!(psfby.iter().collect::<Vec<_>>(), [(TagKey::Creator, "Author")]);

        let empty = Tags::from_config(&parse(&["--psfby", "", "a.nds"])?.config());
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn empty_library_is_ignored() -> Result<()> {
        let config = parse(&["--lib", "", "a.nds"])?.config();

        assert_eq!(config.lib, None);
        assert_eq!(config.output_path(Path::new("a.nds")), Path::new("a.2sf"));
        Ok(())
    }

    #[test]
    fn dry_run_skips_engine() -> Result<()> {
        let mut engine = Recording::default();
        let (summary, output) = batch(
            &["-D", "--load", "100", "--2sfby", "Author", "a.nds"],
            &mut engine,
        )?;

        assert!(engine.jobs.is_empty());
        assert_eq!(summary, Summary { total: 1, failed: 0 });
        assert_eq!(
            output,
            "Would convert a.nds to a.2sf\n  load : 0x100\n  tag  : 2sfby=Author\n"
        );
        Ok(())
    }

    #[test]
    fn config_defaults() -> Result<()> {
        let Config { engine, load, .. } = parse(&["a.nds"])?.config();

        assert_eq!(engine, Path::new("nds2sf"));
        assert_eq!(load, None);
        Ok(())
    }
}
