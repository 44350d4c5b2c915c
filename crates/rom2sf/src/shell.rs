use core::fmt;

use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::Command;

/// Escape a path or argument so that it can be pasted into a shell.
///
/// Every character the shell would interpret is prefixed with a backslash.
pub(crate) fn escape(s: &OsStr) -> Cow<'_, str> {
    let s = match s.to_str() {
        Some(s) => Cow::Borrowed(s),
        None => s.to_string_lossy(),
    };

    let Some(n) = s.find(is_special) else {
        return s;
    };

    let mut o = String::with_capacity(s.len() + 4);
    o.push_str(&s[..n]);

    for c in s[n..].chars() {
        if is_special(c) {
            o.push('\\');
        }

        o.push(c);
    }

    Cow::Owned(o)
}

#[inline]
fn is_special(c: char) -> bool {
    c.is_whitespace() || "\"'\\$`&|;<>!()[]*?#~{}".contains(c)
}

/// Helper type to format a commands with argument substitutions.
pub(crate) struct FormatCommand<'a> {
    cmd: &'a Command,
    replacements: HashMap<&'a OsStr, Cow<'a, str>>,
}

impl<'a> FormatCommand<'a> {
    pub(crate) fn new(cmd: &'a Command) -> Self {
        Self {
            cmd,
            replacements: HashMap::new(),
        }
    }

    /// Insert a replacement for a given argument.
    pub(crate) fn insert_replacement(
        &mut self,
        key: &'a (impl AsRef<OsStr> + ?Sized),
        value: impl Into<Cow<'a, str>>,
    ) {
        self.replacements.insert(key.as_ref(), value.into());
    }
}

impl fmt::Display for FormatCommand<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.cmd.get_program();

        if let Some(value) = self.replacements.get(program) {
            write!(f, "{value}")?;
        } else {
            write!(f, "{}", escape(program))?;
        }

        for arg in self.cmd.get_args() {
            if let Some(value) = self.replacements.get(arg) {
                write!(f, " {value}")?;
            } else {
                write!(f, " {}", escape(arg))?;
            }
        }

        Ok(())
    }
}
