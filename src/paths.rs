use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Which table an archive feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Comment,    // RC_YYYY-MM.zst
    Submission, // RS_YYYY-MM.zst
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Comment => "comments",
            RecordKind::Submission => "submissions",
        }
    }

    /// Id prefix used by `parent_id` / `link_id` to point at this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            RecordKind::Comment => "t1_",
            RecordKind::Submission => "t3_",
        }
    }

    /// Dispatch a parent id on its type prefix. Anything other than `t1`/`t3` is `None`.
    pub fn from_parent_id(id: &str) -> Option<Self> {
        if id.starts_with("t1") {
            Some(RecordKind::Comment)
        } else if id.starts_with("t3") {
            Some(RecordKind::Submission)
        } else {
            None
        }
    }

    /// Path heuristic: `submission` anywhere in the path, or an `RS_` monthly file name,
    /// means submissions. Everything else is treated as comments.
    pub fn infer_from_path(path: &Path) -> Self {
        static RS_NAME: OnceLock<Regex> = OnceLock::new();
        let re = RS_NAME.get_or_init(|| Regex::new(r"^RS_\d{4}-\d{2}").unwrap());

        let full = path.to_string_lossy().to_lowercase();
        if full.contains("submission") {
            return RecordKind::Submission;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if re.is_match(name) => RecordKind::Submission,
            _ => RecordKind::Comment,
        }
    }
}
