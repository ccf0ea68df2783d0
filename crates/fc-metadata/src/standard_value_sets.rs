//! Members of `StandardValueSet`.
//!
//! `listMetadata` does not list the members of this type, so a retrieve that
//! asks for `*` gets nothing. When the listing comes back with only the
//! wildcard, the manifest is completed from the known names below.

use crate::types::ManifestEntry;

pub const STANDARD_VALUE_SET_TYPE: &str = "StandardValueSet";

/// Standard value sets as of API version 45.0 (Spring '19).
pub const STANDARD_VALUE_SETS_V45: &[&str] = &[
    "AccountContactMultiRoles",
    "AccountContactRole",
    "AccountOwnership",
    "AccountRating",
    "AccountType",
    "AssetStatus",
    "CampaignMemberStatus",
    "CampaignStatus",
    "CampaignType",
    "CaseContactRole",
    "CaseOrigin",
    "CasePriority",
    "CaseReason",
    "CaseStatus",
    "CaseType",
    "ContactRole",
    "ContractContactRole",
    "ContractStatus",
    "EntitlementType",
    "EventSubject",
    "EventType",
    "FiscalYearPeriodName",
    "FiscalYearPeriodPrefix",
    "FiscalYearQuarterName",
    "FiscalYearQuarterPrefix",
    "IdeaCategory1",
    "IdeaMultiCategory",
    "IdeaStatus",
    "IdeaThemeStatus",
    "Industry",
    "LeadSource",
    "LeadStatus",
    "OpportunityCompetitor",
    "OpportunityStage",
    "OpportunityType",
    "OrderType",
    "PartnerRole",
    "Product2Family",
    "QuestionOrigin1",
    "QuickTextCategory",
    "QuickTextChannel",
    "QuoteStatus",
    "RoleInTerritory2",
    "SalesTeamRole",
    "Salutation",
    "ServiceContractApprovalStatus",
    "SocialPostClassification",
    "SocialPostEngagementLevel",
    "SocialPostReviewedStatus",
    "SolutionStatus",
    "TaskPriority",
    "TaskStatus",
    "TaskSubject",
    "TaskType",
    "WorkOrderLineItemStatus",
    "WorkOrderPriority",
    "WorkOrderStatus",
];

/// Add the known standard value sets when the only `StandardValueSet` entry
/// is the wildcard. Returns true if entries were added.
pub fn supplement(entries: &mut Vec<ManifestEntry>) -> bool {
    let mut members = entries
        .iter()
        .filter(|e| e.type_name == STANDARD_VALUE_SET_TYPE);
    let only_wildcard = matches!(
        (members.next(), members.next()),
        (Some(first), None) if first.is_wildcard()
    );
    if !only_wildcard {
        return false;
    }

    entries.extend(
        STANDARD_VALUE_SETS_V45
            .iter()
            .map(|name| ManifestEntry::new(STANDARD_VALUE_SET_TYPE, *name)),
    );
    true
}
