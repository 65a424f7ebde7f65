//! Closed enumerations for CVU definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DOMAINS
// ============================================================================

/// Origin of a parsed definition. Ordering is cascade order: defaults are
/// merged before user customizations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Domain {
    /// Bundled system definitions
    #[default]
    Defaults,
    /// User customizations
    User,
}

impl Domain {
    /// Fixed matching order used by the resolver.
    pub const CASCADE: [Domain; 2] = [Domain::Defaults, Domain::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Defaults => "defaults",
            Domain::User => "user",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "defaults" => Ok(Domain::Defaults),
            "user" => Ok(Domain::User),
            _ => Err(UnknownNameError {
                kind: "domain",
                name: s.to_string(),
            }),
        }
    }
}

/// Error when a name does not belong to a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNameError {
    pub kind: &'static str,
    pub name: String,
}

impl fmt::Display for UnknownNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {}: {}", self.kind, self.name)
    }
}

impl std::error::Error for UnknownNameError {}

// ============================================================================
// UI ELEMENTS
// ============================================================================

/// Kind of a node in the declarative layout tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UIElementKind {
    VStack,
    HStack,
    ZStack,
    FlowStack,
    Grid,
    Text,
    Textfield,
    SecureField,
    Toggle,
    Picker,
    Button,
    ActionButton,
    Image,
    Map,
    ItemCell,
    SubView,
    EditorSection,
    EditorRow,
    EditorLabel,
    Title,
    Spacer,
    Divider,
    HorizontalLine,
    Rectangle,
    RoundedRectangle,
    Circle,
    Empty,
}

impl UIElementKind {
    pub const ALL: [UIElementKind; 27] = [
        UIElementKind::VStack,
        UIElementKind::HStack,
        UIElementKind::ZStack,
        UIElementKind::FlowStack,
        UIElementKind::Grid,
        UIElementKind::Text,
        UIElementKind::Textfield,
        UIElementKind::SecureField,
        UIElementKind::Toggle,
        UIElementKind::Picker,
        UIElementKind::Button,
        UIElementKind::ActionButton,
        UIElementKind::Image,
        UIElementKind::Map,
        UIElementKind::ItemCell,
        UIElementKind::SubView,
        UIElementKind::EditorSection,
        UIElementKind::EditorRow,
        UIElementKind::EditorLabel,
        UIElementKind::Title,
        UIElementKind::Spacer,
        UIElementKind::Divider,
        UIElementKind::HorizontalLine,
        UIElementKind::Rectangle,
        UIElementKind::RoundedRectangle,
        UIElementKind::Circle,
        UIElementKind::Empty,
    ];

    /// Canonical spelling used in CVU source.
    pub fn as_str(&self) -> &'static str {
        match self {
            UIElementKind::VStack => "VStack",
            UIElementKind::HStack => "HStack",
            UIElementKind::ZStack => "ZStack",
            UIElementKind::FlowStack => "FlowStack",
            UIElementKind::Grid => "Grid",
            UIElementKind::Text => "Text",
            UIElementKind::Textfield => "Textfield",
            UIElementKind::SecureField => "SecureField",
            UIElementKind::Toggle => "Toggle",
            UIElementKind::Picker => "Picker",
            UIElementKind::Button => "Button",
            UIElementKind::ActionButton => "ActionButton",
            UIElementKind::Image => "Image",
            UIElementKind::Map => "Map",
            UIElementKind::ItemCell => "ItemCell",
            UIElementKind::SubView => "SubView",
            UIElementKind::EditorSection => "EditorSection",
            UIElementKind::EditorRow => "EditorRow",
            UIElementKind::EditorLabel => "EditorLabel",
            UIElementKind::Title => "Title",
            UIElementKind::Spacer => "Spacer",
            UIElementKind::Divider => "Divider",
            UIElementKind::HorizontalLine => "HorizontalLine",
            UIElementKind::Rectangle => "Rectangle",
            UIElementKind::RoundedRectangle => "RoundedRectangle",
            UIElementKind::Circle => "Circle",
            UIElementKind::Empty => "Empty",
        }
    }

    /// Whether this kind lays out children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            UIElementKind::VStack
                | UIElementKind::HStack
                | UIElementKind::ZStack
                | UIElementKind::FlowStack
                | UIElementKind::Grid
                | UIElementKind::Button
                | UIElementKind::EditorSection
                | UIElementKind::EditorRow
        )
    }
}

impl fmt::Display for UIElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UIElementKind {
    type Err = UnknownNameError;

    /// Exact-case lookup over [`UIElementKind::ALL`]; `grid` is not `Grid`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UIElementKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNameError {
                kind: "UI element",
                name: s.to_string(),
            })
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

/// Name of an interaction descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Back,
    AddItem,
    OpenView,
    OpenDynamicView,
    OpenViewByName,
    OpenSession,
    OpenSessionByName,
    ToggleEditMode,
    ToggleFilterPanel,
    Star,
    ShowStarred,
    ShowContextPane,
    ShowOverlay,
    Share,
    ShowNavigation,
    Duplicate,
    Delete,
    SetRenderer,
    Select,
    SelectAll,
    UnselectAll,
    Link,
    Unlink,
    ClosePopup,
    Forward,
    ForwardToFront,
    MultiAction,
    SetProperty,
    Noop,
}

/// Display metadata an action falls back to when its options block does not
/// override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDefaults {
    pub title: &'static str,
    pub icon: &'static str,
    pub has_state: bool,
    pub opens_view: bool,
    pub show_title: bool,
}

impl ActionKind {
    pub const ALL: [ActionKind; 29] = [
        ActionKind::Back,
        ActionKind::AddItem,
        ActionKind::OpenView,
        ActionKind::OpenDynamicView,
        ActionKind::OpenViewByName,
        ActionKind::OpenSession,
        ActionKind::OpenSessionByName,
        ActionKind::ToggleEditMode,
        ActionKind::ToggleFilterPanel,
        ActionKind::Star,
        ActionKind::ShowStarred,
        ActionKind::ShowContextPane,
        ActionKind::ShowOverlay,
        ActionKind::Share,
        ActionKind::ShowNavigation,
        ActionKind::Duplicate,
        ActionKind::Delete,
        ActionKind::SetRenderer,
        ActionKind::Select,
        ActionKind::SelectAll,
        ActionKind::UnselectAll,
        ActionKind::Link,
        ActionKind::Unlink,
        ActionKind::ClosePopup,
        ActionKind::Forward,
        ActionKind::ForwardToFront,
        ActionKind::MultiAction,
        ActionKind::SetProperty,
        ActionKind::Noop,
    ];

    /// Canonical spelling used in CVU source.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Back => "back",
            ActionKind::AddItem => "addItem",
            ActionKind::OpenView => "openView",
            ActionKind::OpenDynamicView => "openDynamicView",
            ActionKind::OpenViewByName => "openViewByName",
            ActionKind::OpenSession => "openSession",
            ActionKind::OpenSessionByName => "openSessionByName",
            ActionKind::ToggleEditMode => "toggleEditMode",
            ActionKind::ToggleFilterPanel => "toggleFilterPanel",
            ActionKind::Star => "star",
            ActionKind::ShowStarred => "showStarred",
            ActionKind::ShowContextPane => "showContextPane",
            ActionKind::ShowOverlay => "showOverlay",
            ActionKind::Share => "share",
            ActionKind::ShowNavigation => "showNavigation",
            ActionKind::Duplicate => "duplicate",
            ActionKind::Delete => "delete",
            ActionKind::SetRenderer => "setRenderer",
            ActionKind::Select => "select",
            ActionKind::SelectAll => "selectAll",
            ActionKind::UnselectAll => "unselectAll",
            ActionKind::Link => "link",
            ActionKind::Unlink => "unlink",
            ActionKind::ClosePopup => "closePopup",
            ActionKind::Forward => "forward",
            ActionKind::ForwardToFront => "forwardToFront",
            ActionKind::MultiAction => "multiAction",
            ActionKind::SetProperty => "setProperty",
            ActionKind::Noop => "noop",
        }
    }

    pub fn defaults(&self) -> ActionDefaults {
        let (title, icon, has_state, opens_view) = match self {
            ActionKind::Back => ("Back", "chevron.left", false, false),
            ActionKind::AddItem => ("Add Item", "plus", false, true),
            ActionKind::OpenView => ("Open View", "", false, true),
            ActionKind::OpenDynamicView => ("Open View", "", false, true),
            ActionKind::OpenViewByName => ("Open View", "", false, true),
            ActionKind::OpenSession => ("Open Session", "", false, true),
            ActionKind::OpenSessionByName => ("Open Session", "", false, true),
            ActionKind::ToggleEditMode => ("Edit", "pencil", true, false),
            ActionKind::ToggleFilterPanel => ("Filter", "rhombus.fill", true, false),
            ActionKind::Star => ("Star", "star.fill", true, false),
            ActionKind::ShowStarred => ("Show Starred", "star.fill", true, false),
            ActionKind::ShowContextPane => ("Show Context Pane", "ellipsis", false, false),
            ActionKind::ShowOverlay => ("Show Overlay", "", false, false),
            ActionKind::Share => ("Share", "square.and.arrow.up", false, false),
            ActionKind::ShowNavigation => ("Show Navigation", "line.horizontal.3", false, false),
            ActionKind::Duplicate => ("Duplicate", "doc.on.doc", false, true),
            ActionKind::Delete => ("Delete", "trash", false, false),
            ActionKind::SetRenderer => ("Set Renderer", "", false, false),
            ActionKind::Select => ("Select", "", false, false),
            ActionKind::SelectAll => ("Select All", "", false, false),
            ActionKind::UnselectAll => ("Unselect All", "", false, false),
            ActionKind::Link => ("Link", "link", false, false),
            ActionKind::Unlink => ("Unlink", "", false, false),
            ActionKind::ClosePopup => ("Close", "xmark", false, false),
            ActionKind::Forward => ("Forward", "chevron.right", false, false),
            ActionKind::ForwardToFront => ("Forward To Front", "", false, false),
            ActionKind::MultiAction => ("", "", false, false),
            ActionKind::SetProperty => ("Set Property", "", false, false),
            ActionKind::Noop => ("", "", false, false),
        };
        ActionDefaults {
            title,
            icon,
            has_state,
            opens_view,
            show_title: false,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownNameError;

    /// Exact-case lookup over [`ActionKind::ALL`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNameError {
                kind: "action",
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_cascade_order() {
        assert!(Domain::Defaults < Domain::User);
        assert_eq!(Domain::CASCADE, [Domain::Defaults, Domain::User]);
        assert_eq!("USER".parse::<Domain>(), Ok(Domain::User));
    }

    #[test]
    fn test_ui_element_names_round_trip() {
        for kind in UIElementKind::ALL {
            assert_eq!(kind.as_str().parse::<UIElementKind>(), Ok(kind));
        }
        assert!("vstack".parse::<UIElementKind>().is_err());
        assert!("grid".parse::<UIElementKind>().is_err());
        assert!("Carousel".parse::<UIElementKind>().is_err());
    }

    #[test]
    fn test_action_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
        assert!("Star".parse::<ActionKind>().is_err());
        assert!("toggleeditmode".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_action_defaults() {
        let edit = ActionKind::ToggleEditMode.defaults();
        assert!(edit.has_state);
        assert!(!edit.opens_view);
        assert_eq!(edit.icon, "pencil");

        let open = ActionKind::OpenViewByName.defaults();
        assert!(open.opens_view);
        assert!(!open.show_title);
    }

    #[test]
    fn test_domain_serde() {
        let json = serde_json::to_string(&Domain::User).unwrap();
        let back: Domain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Domain::User);
    }
}
