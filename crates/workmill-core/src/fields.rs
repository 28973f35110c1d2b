///
/// Core field reference names.
///
/// The remote schema addresses well-known fields by these reference names;
/// anything outside this vocabulary goes through the untyped accessors.
///

pub const TEAM_PROJECT: &str = "System.TeamProject";
pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
pub const ID: &str = "System.Id";
pub const REV: &str = "System.Rev";
pub const AREA_ID: &str = "System.AreaId";
pub const AREA_PATH: &str = "System.AreaPath";
pub const ITERATION_ID: &str = "System.IterationId";
pub const ITERATION_PATH: &str = "System.IterationPath";
pub const ASSIGNED_TO: &str = "System.AssignedTo";
pub const TITLE: &str = "System.Title";
pub const DESCRIPTION: &str = "System.Description";
pub const STATE: &str = "System.State";
pub const REASON: &str = "System.Reason";
pub const TAGS: &str = "System.Tags";
pub const HISTORY: &str = "System.History";
pub const CREATED_BY: &str = "System.CreatedBy";
pub const CREATED_DATE: &str = "System.CreatedDate";
pub const CHANGED_BY: &str = "System.ChangedBy";
pub const CHANGED_DATE: &str = "System.ChangedDate";
pub const AUTHORIZED_AS: &str = "System.AuthorizedAs";
pub const AUTHORIZED_DATE: &str = "System.AuthorizedDate";
pub const REVISED_DATE: &str = "System.RevisedDate";
pub const ATTACHED_FILE_COUNT: &str = "System.AttachedFileCount";
pub const EXTERNAL_LINK_COUNT: &str = "System.ExternalLinkCount";
pub const HYPER_LINK_COUNT: &str = "System.HyperLinkCount";
pub const RELATED_LINK_COUNT: &str = "System.RelatedLinkCount";
pub const WATERMARK: &str = "System.Watermark";
pub const IS_DELETED: &str = "System.IsDeleted";

/// Patch path for the revision guard.
pub const REV_PATH: &str = "/rev";

/// Patch path for appending to the relation list.
pub const RELATIONS_APPEND_PATH: &str = "/relations/-";

/// Patch path addressing one field by reference name.
#[must_use]
pub fn field_path(name: &str) -> String {
    format!("/fields/{name}")
}

///
/// TESTS
///
