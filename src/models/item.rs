use std::fmt;

/// Unique identifier for a gallery item, assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Item category as reported by the server listing.
///
/// Folder, Image, Video and Playlist form the selectable allowlist;
/// everything else maps to `Other` and is excluded from range and
/// select-all operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Folder,
    Image,
    Video,
    Playlist,
    Other,
}

impl ItemKind {
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "folder" | "directory" => Self::Folder,
            "image" => Self::Image,
            "video" => Self::Video,
            "playlist" => Self::Playlist,
            _ => Self::Other,
        }
    }

    /// Whether multi-select operations may include this kind.
    pub fn is_selectable(self) -> bool {
        matches!(self, Self::Folder | Self::Image | Self::Video | Self::Playlist)
    }

    /// Whether tags apply to this kind (folders hold items, not tags).
    pub fn is_taggable(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Playlist)
    }

    pub fn is_folder(self) -> bool {
        self == Self::Folder
    }
}

/// Lightweight description of a gallery item, enough to select it and
/// drive toolbar enablement without the item being rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub display_name: String,
    pub kind: ItemKind,
}

impl ItemDescriptor {
    pub fn new(display_name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            display_name: display_name.into(),
            kind,
        }
    }
}

/// Sort order for a gallery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Modified,
    Size,
}

impl SortKey {
    pub fn as_query_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Modified => "modified",
            Self::Size => "size",
        }
    }
}

/// The (directory, sort, filter) triple identifying one gallery view.
/// Select-all snapshots are keyed by this so a stale snapshot is never
/// applied to a different view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewQuery {
    pub directory: String,
    pub sort: SortKey,
    pub filter: Option<String>,
}

impl ViewQuery {
    pub fn for_directory(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            sort: SortKey::default(),
            filter: None,
        }
    }

    /// Parent directory of this view, if any ("a/b" -> "a", "a" -> "").
    pub fn parent_directory(&self) -> Option<String> {
        if self.directory.is_empty() {
            return None;
        }
        match self.directory.rsplit_once('/') {
            Some((parent, _)) => Some(parent.to_owned()),
            None => Some(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_map_to_allowlist() {
        assert_eq!(ItemKind::from_label("image"), ItemKind::Image);
        assert_eq!(ItemKind::from_label("Folder"), ItemKind::Folder);
        assert_eq!(ItemKind::from_label("playlist"), ItemKind::Playlist);
        assert_eq!(ItemKind::from_label("archive"), ItemKind::Other);
    }

    #[test]
    fn other_kind_is_never_selectable() {
        assert!(ItemKind::Image.is_selectable());
        assert!(ItemKind::Folder.is_selectable());
        assert!(!ItemKind::Other.is_selectable());
    }

    #[test]
    fn folders_are_selectable_but_not_taggable() {
        assert!(ItemKind::Folder.is_selectable());
        assert!(!ItemKind::Folder.is_taggable());
        assert!(ItemKind::Video.is_taggable());
    }

    #[test]
    fn parent_directory_walks_up_one_level() {
        let mut query = ViewQuery::for_directory("photos/2024/june");
        assert_eq!(query.parent_directory().as_deref(), Some("photos/2024"));

        query.directory = "photos".into();
        assert_eq!(query.parent_directory().as_deref(), Some(""));

        query.directory = String::new();
        assert_eq!(query.parent_directory(), None);
    }
}
