/// Container a note lives in. The backup records either `common` or
/// `secret`; records recovered without a folder marker default to `Common`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Folder {
    #[default]
    Common,
    Secret,
}

impl Folder {
    pub fn as_str(self) -> &'static str {
        match self {
            Folder::Common => "common",
            Folder::Secret => "secret",
        }
    }
}

/// Kind of media a markup reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

/// One fully converted note: title plus rendered Markdown body.
/// Built once per successfully decoded record, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Note {
    pub title: String,
    pub content: String,
    pub folder: Folder,
}

impl Note {
    pub fn new(title: String, content: String, folder: Folder) -> Self {
        Self {
            title,
            content,
            folder,
        }
    }
}
