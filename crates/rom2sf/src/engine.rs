use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::load::LoadOffset;
use crate::out::{Out, blank};
use crate::shell::{self, FormatCommand};
use crate::tags::Tags;

/// A single conversion to perform.
pub(crate) struct Job<'a> {
    /// The ROM to convert.
    pub(crate) source: &'a Path,
    /// Where the converted file is written.
    pub(crate) destination: &'a Path,
    pub(crate) load: LoadOffset,
    pub(crate) tags: &'a Tags,
}

/// The engine which performs the actual conversion of a ROM.
///
/// Returning an error means the conversion failed. No guarantees are made
/// about what might have been written to the destination in that case.
pub(crate) trait Engine {
    fn convert(&mut self, o: &mut Out<'_>, job: &Job<'_>) -> Result<()>;
}

/// An engine backed by an external program.
///
/// The program is invoked as:
///
/// ```text
/// <engine> [--load <hex>] [--tag <key>=<value>]... <source> <destination>
/// ```
pub(crate) struct CommandEngine {
    program: PathBuf,
}

impl CommandEngine {
    pub(crate) fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command used to perform the given job.
    pub(crate) fn command(&self, job: &Job<'_>) -> Command {
        let mut cmd = Command::new(&self.program);

        if !job.load.is_default() {
            cmd.arg("--load");
            cmd.arg(format!("{:x}", job.load.get()));
        }

        for (key, value) in job.tags.iter() {
            cmd.arg("--tag");
            cmd.arg(format!("{key}={value}"));
        }

        cmd.arg(job.source);
        cmd.arg(job.destination);
        cmd
    }
}

impl Engine for CommandEngine {
    fn convert(&mut self, o: &mut Out<'_>, job: &Job<'_>) -> Result<()> {
        let mut cmd = self.command(job);

        {
            let mut f = FormatCommand::new(&cmd);

            if !o.is_verbose() {
                f.insert_replacement(self.program.as_os_str(), "<engine>");
                f.insert_replacement(job.source.as_os_str(), "<from>");
                f.insert_replacement(job.destination.as_os_str(), "<to>");
            }

            blank!(o, "{f}");
        }

        let status = cmd
            .status()
            .with_context(|| format!("Running {}", shell::escape(self.program.as_os_str())))?;

        blank!(o => v, "exit: {status}");

        if !status.success() {
            bail!("Engine failed: {status}");
        }

        Ok(())
    }
}
