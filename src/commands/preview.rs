//! `mdcanvas preview`: render a Markdown file to plain terminal text.

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};

use crate::markdown;

pub fn run(path: &Path) -> Result<()> {
    let source = read_source(path)?;
    for line in render_plain(&source) {
        println!("{}", line);
    }
    Ok(())
}

/// `-` reads standard input.
fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read markdown from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn render_plain(source: &str) -> Vec<String> {
    markdown::plain_lines(&markdown::render(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_and_renders_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Notes\n\n- [x] done").unwrap();

        let source = read_source(file.path()).unwrap();
        let lines = render_plain(&source);
        assert_eq!(lines.first().map(String::as_str), Some("Notes"));
        assert!(lines.iter().any(|l| l.contains("[x] done")));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_source(Path::new("/nonexistent/note.md")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/note.md"));
    }
}
