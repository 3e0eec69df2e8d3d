//! Completion report and manifest fragment.

use std::path::Path;

/// Outcome of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    libraries: Vec<String>,
    restart_required: bool,
}

impl InstallReport {
    pub(crate) fn new(libraries: Vec<String>, restart_required: bool) -> Self {
        Self {
            libraries,
            restart_required,
        }
    }

    /// Library identifiers, one per permission descriptor pushed, in push order.
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    /// Whether the user must restart the emulator to pick up the new image.
    pub fn restart_required(&self) -> bool {
        self.restart_required
    }

    /// `<uses-library>` declarations for the consuming application's manifest.
    pub fn manifest_fragment(&self) -> String {
        manifest_fragment(&self.libraries)
    }
}

/// Completion guidance listing the libraries the consuming application
/// must declare.
pub fn completion_guidance(libraries: &[String]) -> String {
    if libraries.is_empty() {
        return "No permission descriptors were installed.\n".to_string();
    }
    format!(
        "Declare the installed libraries inside <application> in AndroidManifest.xml:\n\n{}",
        manifest_fragment(libraries)
    )
}

/// Render one `<uses-library>` line per library identifier.
///
/// ```rust
/// use avd_lib_installer::manifest_fragment;
///
/// assert_eq!(
///     manifest_fragment(&["com.example.maps".to_string()]),
///     "<uses-library android:name=\"com.example.maps\" />\n"
/// );
/// ```
pub fn manifest_fragment(libraries: &[String]) -> String {
    libraries
        .iter()
        .map(|name| format!("<uses-library android:name=\"{name}\" />\n"))
        .collect()
}

/// Library identifier for a permission descriptor: its file name without
/// extension.
pub fn library_id(descriptor: &Path) -> String {
    descriptor
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
