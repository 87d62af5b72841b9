//! Folding ordered overlays over a starting buffer.
use super::apply::ApplyStep;
use super::buffer::FileBuffer;
use super::repo::RepoFile;
use super::Env;
use crate::error::FileError;
use crate::report::ReportSink;

/// Run every overlay in order over `initial` and return the final buffer.
///
/// All overlays are dispatched before any is applied.  The first failing
/// step aborts the run and later steps never execute.  Cancellation is
/// checked before each step, never in the middle of one.
///
/// # Errors
///
/// Returns the error of the first failing step, or
/// [`FileError::Cancelled`] naming the overlay that would have run next.
pub fn run(
    initial: FileBuffer,
    overlays: &[RepoFile],
    env: &Env<'_>,
    sink: &mut ReportSink,
) -> Result<FileBuffer, FileError> {
    let steps: Vec<ApplyStep<'_>> = overlays.iter().map(ApplyStep::for_overlay).collect();
    steps.iter().try_fold(initial, |buffer, step| {
        if env.is_cancelled() {
            return Err(FileError::Cancelled {
                next: step.overlay().path().to_path_buf(),
            });
        }
        step.apply(buffer, env, sink)
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::{MockExecutor, Reply};
    use crate::files::repo::{PASSTHRU_STRATEGY, REPLACE_STRATEGY};
    use crate::files::test_helpers::env;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;

    fn append_a(input: &[u8]) -> Vec<u8> {
        [input, b"a".as_slice()].concat()
    }

    fn append_b(input: &[u8]) -> Vec<u8> {
        [input, b"b".as_slice()].concat()
    }

    fn script(name: &str) -> RepoFile {
        RepoFile::new(format!("/r/{name}/etc/motd.passthru"), name, PASSTHRU_STRATEGY)
    }

    fn start() -> FileBuffer {
        FileBuffer::from_contents(b"x".to_vec(), "/etc/motd", "/etc")
    }

    #[test]
    fn no_overlays_returns_initial_buffer() {
        let mock = MockExecutor::with_replies(vec![]);
        let cancel = AtomicBool::new(false);
        let mut sink = ReportSink::new();
        let out = run(start(), &[], &env(&mock, &cancel), &mut sink).unwrap();
        assert_eq!(out, start());
    }

    #[test]
    fn overlays_apply_in_given_order() {
        let overlays = [script("10"), script("20")];
        let cancel = AtomicBool::new(false);

        let forward = MockExecutor::with_replies(vec![Reply::Transform(append_a), Reply::Transform(append_b)]);
        let out = run(start(), &overlays, &env(&forward, &cancel), &mut ReportSink::new()).unwrap();
        assert_eq!(out.bytes(), Some(&b"xab"[..]));

        let reversed = MockExecutor::with_replies(vec![Reply::Transform(append_b), Reply::Transform(append_a)]);
        let out = run(start(), &overlays, &env(&reversed, &cancel), &mut ReportSink::new()).unwrap();
        assert_eq!(out.bytes(), Some(&b"xba"[..]));
    }

    #[test]
    fn same_inputs_give_identical_output() {
        let overlays = [script("10"), script("20")];
        let cancel = AtomicBool::new(false);
        let outputs: Vec<FileBuffer> = (0..2)
            .map(|_| {
                let mock = MockExecutor::with_replies(vec![Reply::Transform(append_a), Reply::Transform(append_b)]);
                run(start(), &overlays, &env(&mock, &cancel), &mut ReportSink::new()).unwrap()
            })
            .collect();
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn first_failure_stops_the_fold() {
        let overlays = [script("10"), script("20"), script("30")];
        let mock = MockExecutor::with_replies(vec![
            Reply::Transform(append_a),
            Reply::exit(1, "broken"),
            Reply::Transform(append_b),
        ]);
        let cancel = AtomicBool::new(false);
        let mut sink = ReportSink::new();
        let err = run(start(), &overlays, &env(&mock, &cancel), &mut sink).unwrap_err();

        match err {
            FileError::ScriptExecution { path, .. } => assert_eq!(path, overlays[1].path()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.calls().len(), 2);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn replace_step_discards_earlier_output() {
        let dir = tempfile::tempdir().unwrap();
        let replacement = dir.path().join("motd");
        std::fs::write(&replacement, b"replaced").unwrap();
        let overlays = [script("10"), RepoFile::new(&replacement, "20", REPLACE_STRATEGY)];
        let mock = MockExecutor::with_replies(vec![Reply::Transform(append_a)]);
        let cancel = AtomicBool::new(false);
        let out = run(start(), &overlays, &env(&mock, &cancel), &mut ReportSink::new()).unwrap();
        assert_eq!(out.bytes(), Some(&b"replaced"[..]));
        assert_eq!(out.base_path(), Path::new("/etc"));
    }

    #[test]
    fn cancellation_is_checked_before_each_step() {
        let overlays = [script("10"), script("20")];
        let mock = MockExecutor::with_replies(vec![Reply::Transform(append_a)]);
        let cancel = AtomicBool::new(true);
        let err = run(start(), &overlays, &env(&mock, &cancel), &mut ReportSink::new()).unwrap_err();
        match err {
            FileError::Cancelled { next } => assert_eq!(next, overlays[0].path()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(mock.calls().is_empty());
    }
}
