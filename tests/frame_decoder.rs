#[path = "common/mod.rs"]
mod common;

use common::*;
use reddit_pairs::{open_archive, FrameError, FrameLines, PipelineOptions};
use std::io::Cursor;

fn collect(bytes: &[u8], chunk: usize, window: usize) -> Result<Vec<String>, FrameError> {
    FrameLines::new(Cursor::new(bytes.to_vec()), chunk, window)
        .map(|r| r.map(|(line, _)| line))
        .collect()
}

/// Lines straddling every possible chunk boundary (including the middle of 2-, 3- and
/// 4-byte sequences) must come out identical to a whole-buffer decode.
#[test]
fn chunk_boundaries_do_not_change_lines() {
    let text = "{\"body\":\"héllo wörld\"}\n\
                {\"body\":\"日本語のテキスト\"}\n\
                \n\
                {\"body\":\"party 🎉🎉 time\"}\n\
                plain ascii\n";
    let expected: Vec<String> = text.split('\n').map(str::to_owned).collect::<Vec<_>>();
    let expected = &expected[..expected.len() - 1];

    for chunk in 1..=text.len() + 1 {
        let got = collect(text.as_bytes(), chunk, 1 << 20).unwrap();
        assert_eq!(got, expected, "chunk size {chunk}");
    }
}

#[test]
fn crlf_is_trimmed() {
    let got = collect(b"a\r\nb\n", 2, 64).unwrap();
    assert_eq!(got, vec!["a", "b"]);
}

/// A final line without a trailing newline is dropped.
#[test]
fn unterminated_final_line_is_dropped() {
    let got = collect(b"one\ntwo\nthree", 4, 64).unwrap();
    assert_eq!(got, vec!["one", "two"]);
    assert!(collect(b"", 4, 64).unwrap().is_empty());
}

/// Reading one byte at a time, a 4-byte emoji needs 4 reads before anything decodes;
/// a 2-byte ceiling gives up after the third.
#[test]
fn window_ceiling_is_fatal() {
    let err = collect("🎉\n".as_bytes(), 1, 2).unwrap_err();
    assert!(matches!(err, FrameError::WindowExceeded { bytes: 3 }), "{err:?}");

    // same input under a roomy ceiling is fine
    assert_eq!(collect("🎉\n".as_bytes(), 1, 4).unwrap(), vec!["🎉"]);
}

#[test]
fn invalid_and_truncated_utf8_are_fatal() {
    let err = collect(b"ok\n\xff\xfe\n", 64, 64).unwrap_err();
    assert!(matches!(err, FrameError::InvalidUtf8 { offset: 3 }), "{err:?}");

    let err = collect(b"ok\n\xf0\x9f", 64, 64).unwrap_err();
    assert!(matches!(err, FrameError::TruncatedAtEof { bytes: 2 }), "{err:?}");
}

/// Lines already yielded stay valid; the iterator is exhausted after the error.
#[test]
fn iterator_stops_after_error() {
    let mut it = FrameLines::new(Cursor::new(b"a\nb\n\xff\n".to_vec()), 2, 64);
    assert_eq!(it.next().unwrap().unwrap().0, "a");
    assert_eq!(it.next().unwrap().unwrap().0, "b");
    assert!(it.next().unwrap().is_err());
    assert!(it.next().is_none());
}

/// Against a real archive, progress is the compressed position and ends at the file size.
#[test]
fn archive_progress_reaches_file_size() {
    let dir = scratch_dir();
    let path = dir.join("RC_2006-01.zst");
    let lines: Vec<String> = (0..500).map(|i| format!("{{\"n\":{i},\"body\":\"ünïcødé {i}\"}}")).collect();
    write_zst_lines(&path, &lines);

    let opts = PipelineOptions::default().with_chunk_bytes(777);
    let (mut it, total) = open_archive(&path, &opts).unwrap();
    assert_eq!(total, std::fs::metadata(&path).unwrap().len());

    let mut got = Vec::new();
    let mut last = 0u64;
    for item in it.by_ref() {
        let (line, pos) = item.unwrap();
        assert!(pos >= last && pos <= total);
        last = pos;
        got.push(line);
    }
    assert_eq!(got, lines);
    assert_eq!(it.bytes_consumed(), total);
}
