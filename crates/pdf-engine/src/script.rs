//! External per-operation scripts
//!
//! Each script is started as `<interpreter> <script_dir>/<script> args...` and
//! prints one JSON reply on stdout. A non-zero exit status or an unreadable
//! reply is a transport failure; a reply with `success: false` is a rejection.

use crate::PdfEngineError;
use organizer_core::{
    DocumentHandle, PreviewPages, PreviewReply, PreviewRequest, PreviewService, ServiceError,
    TransformEngine, TransformOutcome, TransformReply,
};
use page_model::{join_indexes, TransformRequest};
use serde::de::DeserializeOwned;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const PREVIEW_SCRIPT: &str = "preview.py";
pub const ORGANIZE_SCRIPT: &str = "organize_pdf.py";
pub const SPLIT_SCRIPT: &str = "split.py";
pub const ROTATE_SCRIPT: &str = "rotate.py";

#[derive(Debug, Clone)]
pub struct ScriptEngine {
    interpreter: OsString,
    script_dir: PathBuf,
    preview_dir: PathBuf,
}

impl ScriptEngine {
    pub fn new(
        interpreter: impl Into<OsString>,
        script_dir: impl Into<PathBuf>,
        preview_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script_dir: script_dir.into(),
            preview_dir: preview_dir.into(),
        }
    }

    pub fn script_path(&self, script: &str) -> PathBuf {
        self.script_dir.join(script)
    }

    /// Runs `script` and returns its stdout.
    fn run(&self, script: &str, args: &[&OsStr]) -> Result<String, PdfEngineError> {
        let script_path = self.script_path(script);
        log::debug!("running {} {}", self.interpreter.to_string_lossy(), script_path.display());

        let output = Command::new(&self.interpreter).arg(&script_path).args(args).output().map_err(
            |err| PdfEngineError::Script {
                script: script.to_owned(),
                message: format!("failed to start {}: {err}", self.interpreter.to_string_lossy()),
            },
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            let message =
                if stderr.is_empty() { format!("exited with {}", output.status) } else { stderr };
            return Err(PdfEngineError::Script { script: script.to_owned(), message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn call<T: DeserializeOwned>(&self, script: &str, args: &[&OsStr]) -> Result<T, PdfEngineError> {
        let stdout = self.run(script, args)?;
        parse_reply(script, &stdout)
    }
}

/// The reply is the first line of stdout that looks like a JSON object.
/// Non-JSON diagnostics around it and any later JSON lines are ignored.
fn parse_reply<T: DeserializeOwned>(script: &str, stdout: &str) -> Result<T, PdfEngineError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| PdfEngineError::Script {
            script: script.to_owned(),
            message: "no JSON reply on stdout".to_owned(),
        })?;

    Ok(serde_json::from_str(line)?)
}

impl PreviewService for ScriptEngine {
    fn render(
        &mut self,
        document: &DocumentHandle,
        request: PreviewRequest,
    ) -> Result<PreviewPages, ServiceError> {
        let page = request.wire_index().to_string();
        let args = [document.path().as_os_str(), OsStr::new(&page), self.preview_dir.as_os_str()];

        let reply: PreviewReply = self.call(PREVIEW_SCRIPT, &args).map_err(|err| {
            log::warn!("preview of {document} failed: {err}");
            ServiceError::from(err)
        })?;
        reply.into_result()
    }
}

impl TransformEngine for ScriptEngine {
    fn invoke(
        &mut self,
        document: &DocumentHandle,
        request: &TransformRequest,
        destination: &Path,
    ) -> Result<TransformOutcome, ServiceError> {
        let source = document.path().as_os_str();
        let output = destination.as_os_str();

        let result = match request {
            TransformRequest::Organize { page_order, delete_pages } => {
                let order = join_indexes(page_order);
                let delete = join_indexes(delete_pages);
                self.call::<TransformReply>(
                    ORGANIZE_SCRIPT,
                    &[source, OsStr::new(&order), OsStr::new(&delete), output],
                )
            }
            TransformRequest::Split { pages } => {
                let pages = join_indexes(pages);
                self.call::<TransformReply>(SPLIT_SCRIPT, &[source, OsStr::new(&pages), output])
            }
            TransformRequest::Rotate { rotations } => serde_json::to_string(rotations)
                .map_err(PdfEngineError::from)
                .and_then(|rotations| {
                    self.call::<TransformReply>(ROTATE_SCRIPT, &[source, OsStr::new(&rotations), output])
                }),
        };

        let reply = result.map_err(|err| {
            log::warn!("{} of {document} failed: {err}", request.mode());
            ServiceError::from(err)
        })?;

        let mut outcome = reply.into_result()?;
        if outcome.output_path.is_none() {
            outcome.output_path = Some(destination.to_path_buf());
        }
        log::info!("{}", outcome.message);
        Ok(outcome)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use page_model::{PageIndex, Rotation};
    use std::collections::BTreeMap;
    use std::fs;

    /// Stand-in scripts run by `sh`: they log their arguments and print a canned reply.
    fn engine_with(dir: &Path, script: &str, body: &str) -> ScriptEngine {
        fs::write(dir.join(script), body).expect("script should be written");
        ScriptEngine::new("sh", dir, dir.join("previews"))
    }

    #[test]
    fn preview_passes_wire_arguments_and_parses_reply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = engine_with(
            dir.path(),
            PREVIEW_SCRIPT,
            "echo \"$@\" > \"$(dirname \"$0\")/args.txt\"\n\
             echo 'starting renderer'\n\
             echo '{\"success\": true, \"filePaths\": [\"/tmp/preview_0.png\", \"/tmp/preview_1.png\"], \"pageCount\": 2}'\n",
        );

        let pages = engine
            .render(&DocumentHandle::new("/docs/report.pdf"), PreviewRequest::AllPages)
            .expect("preview should succeed");

        assert_eq!(pages.page_count, 2);
        let args = fs::read_to_string(dir.path().join("args.txt")).expect("script logged its args");
        assert_eq!(
            args.trim(),
            format!("/docs/report.pdf -1 {}", dir.path().join("previews").display())
        );
    }

    #[test]
    fn organize_joins_indexes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = engine_with(
            dir.path(),
            ORGANIZE_SCRIPT,
            "echo \"$@\" > \"$(dirname \"$0\")/args.txt\"\n\
             echo '{\"success\": true, \"message\": \"Successfully organized PDF and saved to out.pdf\"}'\n",
        );

        let request = TransformRequest::Organize {
            page_order: vec![PageIndex(3), PageIndex(1), PageIndex(2)],
            delete_pages: vec![PageIndex(2)],
        };
        let outcome = engine
            .invoke(&DocumentHandle::new("/docs/in.pdf"), &request, Path::new("/docs/out.pdf"))
            .expect("organize should succeed");

        assert_eq!(outcome.output_path, Some(PathBuf::from("/docs/out.pdf")));
        let args = fs::read_to_string(dir.path().join("args.txt")).expect("script logged its args");
        assert_eq!(args.trim(), "/docs/in.pdf 3,1,2 2 /docs/out.pdf");
    }

    #[test]
    fn rotate_sends_rotation_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = engine_with(
            dir.path(),
            ROTATE_SCRIPT,
            "printf '%s' \"$2\" > \"$(dirname \"$0\")/rotations.json\"\n\
             echo '{\"success\": true, \"message\": \"done\"}'\n",
        );

        let rotations = BTreeMap::from([(PageIndex(2), Rotation::NONE.rotated_by(270).expect("valid rotation"))]);
        engine
            .invoke(
                &DocumentHandle::new("/docs/in.pdf"),
                &TransformRequest::Rotate { rotations },
                Path::new("/docs/rotated_in.pdf"),
            )
            .expect("rotate should succeed");

        let sent = fs::read_to_string(dir.path().join("rotations.json")).expect("script saved its input");
        assert_eq!(sent, r#"{"2":270}"#);
    }

    #[test]
    fn rejected_reply_carries_script_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = engine_with(
            dir.path(),
            SPLIT_SCRIPT,
            "echo '{\"success\": false, \"message\": \"An unexpected error occurred: bad page\"}'\n",
        );

        let err = engine
            .invoke(
                &DocumentHandle::new("/docs/in.pdf"),
                &TransformRequest::Split { pages: vec![PageIndex(9)] },
                Path::new("/docs/split_in.pdf"),
            )
            .expect_err("script rejects the request");

        assert_eq!(err, ServiceError::Rejected("An unexpected error occurred: bad page".to_owned()));
    }

    #[test]
    fn non_zero_exit_is_a_transport_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = engine_with(dir.path(), SPLIT_SCRIPT, "echo 'Traceback: boom' >&2\nexit 1\n");

        let err = engine
            .invoke(
                &DocumentHandle::new("/docs/in.pdf"),
                &TransformRequest::Split { pages: vec![PageIndex(1)] },
                Path::new("/docs/split_in.pdf"),
            )
            .expect_err("script crashed");

        assert!(matches!(err, ServiceError::Transport(message) if message.contains("Traceback: boom")));
    }

    #[test]
    fn missing_json_is_a_transport_failure() {
        let err = parse_reply::<TransformReply>(SPLIT_SCRIPT, "warning only\n").expect_err("no reply");
        assert!(matches!(err, PdfEngineError::Script { .. }));
    }

    #[test]
    fn first_json_line_is_the_reply() {
        let stdout = "loading\n{\"success\": true, \"message\": \"first\"}\n{\"success\": false, \"message\": \"second\"}\n";

        let reply = parse_reply::<TransformReply>(ORGANIZE_SCRIPT, stdout).expect("reply should parse");
        assert!(reply.success);
        assert_eq!(reply.message, "first");
    }
}
