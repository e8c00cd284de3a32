use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn matches(&self, path: &std::path::Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBrowserRequest {
    pub title: String,
    pub filter: Option<FileFilter>,
    pub start_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBrowserOutcome {
    Selected(PathBuf),
    Cancelled,
}

/// Host file picker. `open` starts a selection; the host polls for the outcome on later frames
/// and hands it to the operator that is waiting in its modal state.
pub trait FileBrowser {
    fn open(&mut self, request: FileBrowserRequest) -> Result<()>;

    fn poll(&mut self) -> Option<FileBrowserOutcome>;
}

/// Browser for hosts without a windowing system: every request is cancelled.
#[derive(Debug, Default)]
pub struct NullFileBrowser {
    pending: bool,
}

impl FileBrowser for NullFileBrowser {
    fn open(&mut self, _request: FileBrowserRequest) -> Result<()> {
        self.pending = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<FileBrowserOutcome> {
        if std::mem::take(&mut self.pending) {
            Some(FileBrowserOutcome::Cancelled)
        } else {
            None
        }
    }
}

/// Native OS dialog. `rfd` blocks inside `open`, so the outcome is ready on the next poll.
#[cfg(feature = "native_dialog")]
#[derive(Debug, Default)]
pub struct NativeFileBrowser {
    outcome: Option<FileBrowserOutcome>,
}

#[cfg(feature = "native_dialog")]
impl FileBrowser for NativeFileBrowser {
    fn open(&mut self, request: FileBrowserRequest) -> Result<()> {
        let mut dialog = rfd::FileDialog::new().set_title(request.title.as_str());
        if let Some(filter) = &request.filter {
            dialog = dialog.add_filter(filter.name.as_str(), filter.extensions.as_slice());
        }
        if let Some(dir) = &request.start_dir {
            dialog = dialog.set_directory(dir);
        }
        self.outcome = Some(match dialog.pick_file() {
            Some(path) => FileBrowserOutcome::Selected(path),
            None => FileBrowserOutcome::Cancelled,
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<FileBrowserOutcome> {
        self.outcome.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn filter_matches_extensions_case_insensitively() {
        let filter = FileFilter { name: "JSON".into(), extensions: vec!["json".into()] };
        assert!(filter.matches(Path::new("/tmp/points.JSON")));
        assert!(!filter.matches(Path::new("/tmp/points.csv")));
        assert!(!filter.matches(Path::new("/tmp/points")));
    }

    #[test]
    fn null_browser_cancels_once() {
        let mut browser = NullFileBrowser::default();
        assert_eq!(browser.poll(), None);
        browser
            .open(FileBrowserRequest { title: "Pick".into(), filter: None, start_dir: None })
            .expect("open");
        assert_eq!(browser.poll(), Some(FileBrowserOutcome::Cancelled));
        assert_eq!(browser.poll(), None);
    }
}
