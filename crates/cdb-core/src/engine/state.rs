//! FSM states and the per-state menu action vocabularies.
//!
//! Menu input is parsed into small tagged unions (one per menu state) so every
//! transition function is an exhaustive match with a typed fallback arm
//! instead of a string-equality cascade.

use crate::keyboards::*;

/// One node in the conversation graph. A chat with no session is conceptually
/// in a "new" state; `/start` always re-enters onboarding and `/cancel`
/// returns to the steady `ParticipantCode` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    // Onboarding
    SubscriptionCheck,

    // Participant flow
    ParticipantCode,
    ProjectsMenu,
    PacksMenu,

    // Admin authentication
    Login,
    Password,

    // Admin home
    AdminMenu,
    NewPassword,

    // Camera upload wizard
    UploadCategory,
    UploadPhoto,
    UploadCaption,
    UploadCustomName,

    // Admin management
    AdminManagement,
    AddAdminName,
    AddAdminLogin,
    AddAdminPassword,
    DelAdmin,

    // Category management
    CategoryManagement,
    AddCategory,
    DelCategory,

    // Ban management
    BanManagement,
    BanUserId,
    UnbanUserId,

    // Camera-code browsing
    CameraCodesMenu,
    DeleteCamera,

    // Project management
    ProjectManagement,
    UploadProjectFile,
    UploadProjectCaption,
    UploadProjectName,
    DeleteProject,

    // Pack management
    PackManagement,
    UploadPackFile,
    UploadPackCaption,
    UploadPackName,
    DeletePack,

    // Broadcast
    BroadcastMessage,
}

impl State {
    /// States reachable only by an authenticated admin. Ban checks and the
    /// subscription probe are participant-facing controls and are skipped
    /// here.
    pub fn is_admin_area(self) -> bool {
        !matches!(
            self,
            State::SubscriptionCheck
                | State::ParticipantCode
                | State::ProjectsMenu
                | State::PacksMenu
                | State::Login
                | State::Password
        )
    }

    /// Participant-facing states where each event re-probes channel
    /// membership. `SubscriptionCheck` probes explicitly in its own handler,
    /// and the login steps only gate on bans.
    pub fn subscription_gated(self) -> bool {
        matches!(
            self,
            State::ParticipantCode | State::ProjectsMenu | State::PacksMenu
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MainAction {
    EnterCode,
    Projects,
    Packs,
    AdminLogin,
    Channel,
    /// Anything else is treated as a camera code.
    Code(String),
}

impl MainAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_ENTER_CODE => Self::EnterCode,
            BTN_PROJECTS => Self::Projects,
            BTN_PACKS => Self::Packs,
            BTN_ADMIN_LOGIN => Self::AdminLogin,
            BTN_CHANNEL => Self::Channel,
            other => Self::Code(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminMenuAction {
    Upload,
    MyCameras,
    ManagePacks,
    ChangePassword,
    Broadcast,
    Logout,
    ManageAdmins,
    ManageCategories,
    ManageBans,
    CameraCodes,
    DeleteCamera,
    UserList,
    ManageProjects,
    BroadcastHistory,
    Unrecognized,
}

impl AdminMenuAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_UPLOAD => Self::Upload,
            BTN_MY_CAMERAS => Self::MyCameras,
            BTN_MANAGE_PACKS => Self::ManagePacks,
            BTN_CHANGE_PASSWORD => Self::ChangePassword,
            BTN_BROADCAST => Self::Broadcast,
            BTN_LOGOUT => Self::Logout,
            BTN_MANAGE_ADMINS => Self::ManageAdmins,
            BTN_MANAGE_CATEGORIES => Self::ManageCategories,
            BTN_MANAGE_BANS => Self::ManageBans,
            BTN_CAMERA_CODES => Self::CameraCodes,
            BTN_DELETE_CAMERA => Self::DeleteCamera,
            BTN_USER_LIST => Self::UserList,
            BTN_MANAGE_PROJECTS => Self::ManageProjects,
            BTN_BROADCAST_HISTORY => Self::BroadcastHistory,
            _ => Self::Unrecognized,
        }
    }

    /// Actions offered only on the master keyboard. Menu labels are just
    /// text, so authorization is re-checked here rather than trusted from
    /// the keyboard that was shown.
    pub fn master_only(self) -> bool {
        matches!(
            self,
            Self::Broadcast
                | Self::ManageAdmins
                | Self::ManageCategories
                | Self::ManageBans
                | Self::CameraCodes
                | Self::DeleteCamera
                | Self::UserList
                | Self::ManageProjects
                | Self::BroadcastHistory
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminManagementAction {
    AddAdmin,
    DelAdmin,
    ListAdmins,
    Back,
    Unrecognized,
}

impl AdminManagementAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_ADD_ADMIN => Self::AddAdmin,
            BTN_DEL_ADMIN => Self::DelAdmin,
            BTN_LIST_ADMINS => Self::ListAdmins,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryManagementAction {
    Add,
    Del,
    Back,
    Unrecognized,
}

impl CategoryManagementAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_ADD_CATEGORY => Self::Add,
            BTN_DEL_CATEGORY => Self::Del,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BanManagementAction {
    Ban,
    Unban,
    ListBanned,
    Back,
    Unrecognized,
}

impl BanManagementAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_BAN => Self::Ban,
            BTN_UNBAN => Self::Unban,
            BTN_LIST_BANNED => Self::ListBanned,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraCodesAction {
    Stats,
    AllCodes,
    Back,
    Unrecognized,
}

impl CameraCodesAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_CATEGORY_STATS => Self::Stats,
            BTN_ALL_CODES => Self::AllCodes,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectManagementAction {
    Upload,
    List,
    Delete,
    Back,
    Unrecognized,
}

impl ProjectManagementAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_UPLOAD_PROJECT => Self::Upload,
            BTN_LIST_PROJECTS => Self::List,
            BTN_DELETE_PROJECT => Self::Delete,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackManagementAction {
    Upload,
    Mine,
    All,
    Delete,
    Back,
    Unrecognized,
}

impl PackManagementAction {
    pub fn parse(text: &str) -> Self {
        match text {
            BTN_UPLOAD_PACK => Self::Upload,
            BTN_MY_PACKS => Self::Mine,
            BTN_ALL_PACKS => Self::All,
            BTN_DELETE_PACK => Self::Delete,
            BTN_BACK => Self::Back,
            _ => Self::Unrecognized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_states_skip_participant_gates() {
        assert!(State::AdminMenu.is_admin_area());
        assert!(State::UploadPhoto.is_admin_area());
        assert!(State::BroadcastMessage.is_admin_area());
        assert!(!State::ParticipantCode.is_admin_area());
        assert!(!State::Login.is_admin_area());
    }

    #[test]
    fn subscription_probe_covers_browsing_states_only() {
        assert!(State::ParticipantCode.subscription_gated());
        assert!(State::PacksMenu.subscription_gated());
        assert!(!State::SubscriptionCheck.subscription_gated());
        assert!(!State::Password.subscription_gated());
        assert!(!State::AdminMenu.subscription_gated());
    }

    #[test]
    fn free_text_in_main_menu_is_a_code() {
        assert_eq!(MainAction::parse(BTN_PROJECTS), MainAction::Projects);
        assert_eq!(
            MainAction::parse("AB12CD34"),
            MainAction::Code("AB12CD34".to_string())
        );
    }

    #[test]
    fn master_gating_spares_shared_actions() {
        assert!(AdminMenuAction::Broadcast.master_only());
        assert!(AdminMenuAction::ManageBans.master_only());
        assert!(!AdminMenuAction::Upload.master_only());
        assert!(!AdminMenuAction::ManagePacks.master_only());
        assert!(!AdminMenuAction::Logout.master_only());
    }

    #[test]
    fn unknown_labels_fall_through_to_unrecognized() {
        assert_eq!(AdminMenuAction::parse("huh"), AdminMenuAction::Unrecognized);
        assert_eq!(
            PackManagementAction::parse(BTN_ALL_PACKS),
            PackManagementAction::All
        );
    }
}
