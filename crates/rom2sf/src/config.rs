use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::load::LoadOffset;

/// Extension of a standalone file.
pub(crate) const EXT_2SF: &str = "2sf";
/// Extension of a file which references a library.
pub(crate) const EXT_MINI2SF: &str = "mini2sf";

/// Configuration for a batch of conversions.
#[derive(Default)]
pub(crate) struct Config {
    /// Fixed output path for every file in the batch.
    pub(crate) output: Option<PathBuf>,
    pub(crate) load: Option<LoadOffset>,
    pub(crate) lib: Option<String>,
    pub(crate) creator: Option<String>,
    pub(crate) engine: PathBuf,
    pub(crate) dry_run: bool,
    pub(crate) verbose: bool,
    pub(crate) files: Vec<PathBuf>,
}

impl Config {
    /// Resolve where the conversion of `input` is written.
    ///
    /// An explicit output path is used as-is for every input, so converting
    /// several files with `-o` means each one overwrites the previous.
    pub(crate) fn output_path<'a>(&'a self, input: &Path) -> Cow<'a, Path> {
        if let Some(output) = &self.output {
            return Cow::Borrowed(output);
        }

        let ext = if self.lib.is_some() {
            EXT_MINI2SF
        } else {
            EXT_2SF
        };

        Cow::Owned(input.with_extension(ext))
    }

    /// The load offset to pass along to the engine.
    #[inline]
    pub(crate) fn load(&self) -> LoadOffset {
        self.load.unwrap_or_default()
    }
}
