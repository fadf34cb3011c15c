//! Toolbar action enablement, recomputed from the selection set.
//!
//! Pure and synchronous: the widget layer projects this state onto
//! button sensitivity and never derives enablement on its own.

use crate::models::ItemDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolbarState {
    /// Number of selected items.
    pub selected: usize,
    /// The select-all flag is set (toggles the select-all affordance).
    pub all_selected: bool,
    /// At least one taggable item is selected.
    pub can_apply_tag: bool,
    /// At least one item is selected.
    pub can_apply_favorite: bool,
    /// Exactly one non-folder item is selected.
    pub can_copy_tags: bool,
    /// At least two taggable items are selected.
    pub can_merge_tags: bool,
}

impl ToolbarState {
    pub fn recompute<'a, I>(items: I, all_selected: bool) -> Self
    where
        I: Iterator<Item = &'a ItemDescriptor>,
    {
        let mut selected = 0usize;
        let mut taggable = 0usize;
        let mut non_folder = 0usize;
        for descriptor in items {
            selected += 1;
            if descriptor.kind.is_taggable() {
                taggable += 1;
            }
            if !descriptor.kind.is_folder() {
                non_folder += 1;
            }
        }
        Self {
            selected,
            all_selected,
            can_apply_tag: taggable >= 1,
            can_apply_favorite: selected >= 1,
            can_copy_tags: selected == 1 && non_folder == 1,
            can_merge_tags: taggable >= 2,
        }
    }

    /// Human-readable count for the toolbar label.
    pub fn summary(&self) -> String {
        format!("{} selected", self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;

    fn desc(kind: ItemKind) -> ItemDescriptor {
        ItemDescriptor::new("item", kind)
    }

    #[test]
    fn empty_selection_disables_everything() {
        let state = ToolbarState::recompute([].iter(), false);
        assert_eq!(state.selected, 0);
        assert!(!state.can_apply_tag);
        assert!(!state.can_apply_favorite);
        assert!(!state.can_copy_tags);
        assert!(!state.can_merge_tags);
    }

    #[test]
    fn copy_tags_requires_exactly_one_non_folder() {
        let one_image = [desc(ItemKind::Image)];
        assert!(ToolbarState::recompute(one_image.iter(), false).can_copy_tags);

        let one_folder = [desc(ItemKind::Folder)];
        assert!(!ToolbarState::recompute(one_folder.iter(), false).can_copy_tags);

        let two_images = [desc(ItemKind::Image), desc(ItemKind::Image)];
        assert!(!ToolbarState::recompute(two_images.iter(), false).can_copy_tags);
    }

    #[test]
    fn merge_tags_requires_two_taggable_items() {
        let image_and_folder = [desc(ItemKind::Image), desc(ItemKind::Folder)];
        assert!(!ToolbarState::recompute(image_and_folder.iter(), false).can_merge_tags);

        let image_and_video = [desc(ItemKind::Image), desc(ItemKind::Video)];
        assert!(ToolbarState::recompute(image_and_video.iter(), false).can_merge_tags);
    }

    #[test]
    fn folder_only_selection_still_allows_favorites() {
        let folders = [desc(ItemKind::Folder), desc(ItemKind::Folder)];
        let state = ToolbarState::recompute(folders.iter(), false);
        assert!(state.can_apply_favorite);
        assert!(!state.can_apply_tag);
    }

    #[test]
    fn summary_reports_count() {
        let items = [desc(ItemKind::Image), desc(ItemKind::Video), desc(ItemKind::Folder)];
        assert_eq!(ToolbarState::recompute(items.iter(), false).summary(), "3 selected");
    }
}
