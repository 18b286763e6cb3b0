use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use super::{DocumentConverter, DocumentFormat, RenderError};

/// Converts HTML with the `wkhtmltopdf` / `wkhtmltoimage` command line tools.
///
/// HTML is streamed on stdin and the document read back from stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WkhtmlConverter {
    pdf_binary: PathBuf,
    image_binary: PathBuf,
}

impl Default for WkhtmlConverter {
    fn default() -> Self {
        Self::new("wkhtmltopdf", "wkhtmltoimage")
    }
}

impl WkhtmlConverter {
    pub fn new(pdf_binary: impl Into<PathBuf>, image_binary: impl Into<PathBuf>) -> Self {
        Self {
            pdf_binary: pdf_binary.into(),
            image_binary: image_binary.into(),
        }
    }

    fn command(&self, format: DocumentFormat) -> Option<Command> {
        match format {
            DocumentFormat::Pdf => {
                let mut cmd = Command::new(&self.pdf_binary);
                cmd.args([
                    "--quiet",
                    "--page-size",
                    "A4",
                    "--margin-top",
                    "0.75in",
                    "--margin-right",
                    "0.75in",
                    "--margin-bottom",
                    "0.75in",
                    "--margin-left",
                    "0.75in",
                    "--encoding",
                    "UTF-8",
                    "--no-outline",
                    "--enable-local-file-access",
                    "-",
                    "-",
                ]);
                Some(cmd)
            }
            DocumentFormat::Jpg => {
                let mut cmd = Command::new(&self.image_binary);
                cmd.args([
                    "--quiet",
                    "--format",
                    "jpg",
                    "--quality",
                    "95",
                    "--width",
                    "1400",
                    "--encoding",
                    "UTF-8",
                    "--enable-local-file-access",
                    "-",
                    "-",
                ]);
                Some(cmd)
            }
            DocumentFormat::Html => None,
        }
    }
}

impl DocumentConverter for WkhtmlConverter {
    fn convert(&self, html: &str, format: DocumentFormat) -> Result<Vec<u8>, RenderError> {
        let Some(mut command) = self.command(format) else {
            return Ok(html.as_bytes().to_vec());
        };
        let program = command.get_program().to_os_string();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                RenderError::Conversion(format!("could not start {program:?}: {err}"))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Conversion("converter stdin unavailable".into()))?;
        // Feed stdin from another thread so a full stdout pipe cannot deadlock us.
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let result = stdin.write_all(html.as_bytes());
                drop(stdin);
                result
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            output.and_then(|out| written.map(|_| out))
        })?;

        if !output.status.success() || output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(status = %output.status, stderr = %stderr.trim(), "document conversion failed");
            return Err(RenderError::Conversion(format!(
                "{} exited with {}: {}",
                format.extension(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}
