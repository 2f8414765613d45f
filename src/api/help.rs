//! Self-description of the API operations.
//!
//! Each operation has one [`MethodDoc`] entry. `help` serves these, and a call
//! whose arguments don't bind answers with the target operation's entry.

/// Documentation for a single API operation
#[derive(Clone, Debug)]
pub struct MethodDoc {
    pub name: &'static str,
    pub params: &'static str,
    pub desc: &'static str,
}

impl MethodDoc {
    pub const fn new(name: &'static str, params: &'static str, desc: &'static str) -> Self {
        Self { name, params, desc }
    }

    /// `name(params): description`
    pub fn text(&self) -> String {
        format!("{}({}): {}", self.name, self.params, self.desc)
    }
}

pub const HELP_DOC: MethodDoc = MethodDoc::new(
    "help",
    "method_name=None",
    "Without arguments, list available API methods. With a method name, describe that method.",
);

pub const LIST_DIRECTORY_DOC: MethodDoc = MethodDoc::new(
    "list_directory",
    "path=\"/\", only_files=\"no\"",
    "List entry names of a directory under the gallery root, sorted. \
     Pass only_files=yes to leave out subdirectories. 404 if path is not a directory.",
);

pub const COUNT_FRAMES_DOC: MethodDoc = MethodDoc::new(
    "count_frames",
    "image_path",
    "Number of frames in an image file under the gallery root (1 if it can't be decoded). \
     400 if image_path is not an image.",
);
