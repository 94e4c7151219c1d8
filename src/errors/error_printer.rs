use super::PatchError;
use crate::src_file::SourceFile;
use std::io::{self, Write};

pub struct ErrorPrinter;

impl ErrorPrinter {
  /// Prints an Error to the provided [`Write`]r. When `src` is the file the
  /// error points into, the offending line is shown with a caret marker.
  pub fn print<W,>(mut w:W, src:Option<&SourceFile,>, err:&PatchError,) -> io::Result<(),>
  where W: Write {
    let loc = err.loc();
    writeln!(w, "{loc}:")?;
    writeln!(w, "{err}")?;

    let line = match src {
      Some(src,) if loc.has_position() => src.line(loc.span.start.ln,),
      _ => None,
    };

    if let Some(line,) = line {
      writeln!(w, "{line}")?;
      let start = loc.span.start;
      let end = loc.span.end;
      let tail_len = (start.col as usize).saturating_sub(1,);
      // A span that runs onto the next line only gets its first character marked
      let arrow_num = if end.ln == start.ln && end.col >= start.col {
        (end.col - start.col) as usize + 1
      }
      else {
        1
      };
      writeln!(w, "{}\x1b[31m{}\x1b[0m", "-".repeat(tail_len,), "^".repeat(arrow_num,))?;
    }
    Ok((),)
  }

  /// Prints any other failure.
  pub fn print_report<W,>(mut w:W, err:&eyre::Report,) -> io::Result<(),>
  where W: Write {
    writeln!(w, "\x1b[93mERROR:\x1b[0m {err}")?;
    for cause in err.chain().skip(1,) {
      writeln!(w, "  caused by: {cause}")?;
    }
    Ok((),)
  }
}
