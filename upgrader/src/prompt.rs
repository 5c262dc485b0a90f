//! Interactive selection of the patch release.

use crate::release::ProductLine;
use std::io::{self, BufRead, Write};

/// Errors from reading the operator's answer.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Input ended before a valid answer was given.
    #[error("no version number entered")]
    EndOfInput,

    /// Reading the answer or writing the question failed.
    #[error("failed to read version number: {0}")]
    Io(#[from] io::Error),
}

/// Ask for the patch number of `line` until a non-negative integer is given.
///
/// # Errors
///
/// Returns [`PromptError::EndOfInput`] if input ends first, and
/// [`PromptError::Io`] if reading or writing fails.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::prompt::prompt_for_patch;
/// use tomcat_upgrader::release::ProductLine;
///
/// let mut input = &b"x\n40\n"[..];
/// let mut output = Vec::new();
/// let patch = prompt_for_patch(&ProductLine::default(), &mut input, &mut output).unwrap();
/// assert_eq!(patch, 40);
/// ```
pub fn prompt_for_patch(
    line: &ProductLine,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<u32, PromptError> {
    write!(
        output,
        "Which version of Tomcat {line}.* do you wish to download?: "
    )?;
    output.flush()?;

    let mut answer = String::new();
    loop {
        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            return Err(PromptError::EndOfInput);
        }
        match answer.trim().parse::<u32>() {
            Ok(patch) => return Ok(patch),
            Err(_) => {
                log::debug!("rejected version input {:?}", answer.trim());
                write!(output, "The version number needs to be a digit: ")?;
                output.flush()?;
            }
        }
    }
}
