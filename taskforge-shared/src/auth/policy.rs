/// Project and task access policy
///
/// Every permission check in TaskForge goes through [`decide`], a pure
/// function over the actor's global role, its relation to the project and
/// the requested action. Callers are responsible for loading the *current*
/// project and membership from the store before calling it.
///
/// # Decision Table
///
/// | Role  | Member | Owner | Read | Mutate project | Task read/write | Invite | Remove member |
/// |-------|--------|-------|------|----------------|-----------------|--------|---------------|
/// | admin | any    | no    | yes  | yes            | yes             | no     | yes           |
/// | admin | any    | yes   | yes  | yes            | yes             | yes    | yes           |
/// | user  | yes    | no    | yes  | no             | yes             | no     | no            |
/// | user  | yes    | yes   | yes  | yes            | yes             | yes    | yes           |
/// | user  | no     | any   | no   | no             | no              | no     | no            |
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::policy::{decide, Action, Decision, MemberStatus, Ownership};
/// use taskforge_shared::models::identity::Role;
///
/// let decision = decide(Role::User, Ownership::NotOwner, MemberStatus::Member, Action::MutateTask);
/// assert_eq!(decision, Decision::Allow);
///
/// let decision = decide(Role::User, Ownership::NotOwner, MemberStatus::Member, Action::MutateProject);
/// assert_eq!(decision, Decision::Deny);
/// ```

use uuid::Uuid;

use crate::models::identity::{Principal, Role};
use crate::models::project::Project;

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// View a project and its members
    ReadProject,

    /// Rename or delete a project
    MutateProject,

    /// View a task of the project
    ReadTask,

    /// Create, update or delete a task of the project
    MutateTask,

    /// Issue invitations to the project
    ManageMembers,

    /// Remove a member from the project
    RemoveMember,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::ReadProject,
        Action::MutateProject,
        Action::ReadTask,
        Action::MutateTask,
        Action::ManageMembers,
        Action::RemoveMember,
    ];
}

/// Whether the actor owns the project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    NotOwner,
}

impl Ownership {
    pub fn of(project: &Project, identity_id: Uuid) -> Self {
        if project.is_owned_by(identity_id) {
            Ownership::Owner
        } else {
            Ownership::NotOwner
        }
    }
}

/// Whether the actor is a current member of the project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Member,
    NonMember,
}

impl From<bool> for MemberStatus {
    fn from(is_member: bool) -> Self {
        if is_member {
            MemberStatus::Member
        } else {
            MemberStatus::NonMember
        }
    }
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluates the access policy
pub fn decide(role: Role, ownership: Ownership, member: MemberStatus, action: Action) -> Decision {
    let owner = ownership == Ownership::Owner;

    let allowed = match (role, member) {
        (Role::Admin, _) => match action {
            Action::ManageMembers => owner,
            _ => true,
        },
        (Role::User, MemberStatus::NonMember) => false,
        (Role::User, MemberStatus::Member) => match action {
            Action::ReadProject | Action::ReadTask | Action::MutateTask => true,
            Action::MutateProject | Action::ManageMembers | Action::RemoveMember => owner,
        },
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Evaluates the policy for a principal against a loaded project
pub fn decide_for(
    principal: &Principal,
    project: &Project,
    member: MemberStatus,
    action: Action,
) -> Decision {
    decide(principal.role, Ownership::of(project, principal.id), member, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use Action::*;
    use Decision::*;
    use MemberStatus::*;
    use Ownership::*;

    /// Expected outcome for every combination, in `Action::ALL` order
    fn expected(role: Role, ownership: Ownership, member: MemberStatus) -> [Decision; 6] {
        match (role, ownership, member) {
            (Role::Admin, NotOwner, _) => [Allow, Allow, Allow, Allow, Deny, Allow],
            (Role::Admin, Owner, _) => [Allow; 6],
            (Role::User, NotOwner, Member) => [Allow, Deny, Allow, Allow, Deny, Deny],
            (Role::User, Owner, Member) => [Allow; 6],
            (Role::User, _, NonMember) => [Deny; 6],
        }
    }

    #[test]
    fn test_decision_table_is_exhaustive() {
        for role in [Role::User, Role::Admin] {
            for ownership in [Owner, NotOwner] {
                for member in [Member, NonMember] {
                    let want = expected(role, ownership, member);
                    for (action, want) in Action::ALL.iter().zip(want) {
                        assert_eq!(
                            decide(role, ownership, member, *action),
                            want,
                            "role={:?} ownership={:?} member={:?} action={:?}",
                            role,
                            ownership,
                            member,
                            action
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_membership_flip_changes_access() {
        let before = decide(Role::User, NotOwner, NonMember, ReadProject);
        let after = decide(Role::User, NotOwner, Member, ReadProject);

        assert_eq!(before, Deny);
        assert_eq!(after, Allow);
    }

    #[test]
    fn test_owner_removed_from_membership_is_denied() {
        assert_eq!(decide(Role::User, Owner, NonMember, ReadProject), Deny);
    }

    #[test]
    fn test_decide_for_uses_current_owner() {
        let owner_id = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Roadmap".to_string(),
            owner_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let principal = Principal {
            id: owner_id,
            email: "owner@example.com".to_string(),
            role: Role::User,
            verified: true,
            photo: None,
            created_at: Utc::now(),
        };

        assert!(decide_for(&principal, &project, Member, MutateProject).is_allowed());

        let stranger = Principal {
            id: Uuid::new_v4(),
            ..principal
        };
        assert!(!decide_for(&stranger, &project, Member, MutateProject).is_allowed());
    }

    #[test]
    fn test_member_status_from_bool() {
        assert_eq!(MemberStatus::from(true), Member);
        assert_eq!(MemberStatus::from(false), NonMember);
    }
}
