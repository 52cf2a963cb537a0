mod access_requests;
mod assignments;
mod delegations;
mod repositories;

pub use access_requests::{
    AccessRequestQuery, ReviewAccessRequestInput, ReviewTransition, SubmitAccessRequestInput,
};
pub use assignments::{CreateRoleAssignmentInput, RoleAssignmentQuery};
pub use delegations::{CreateDelegationInput, DelegationQuery};
pub use repositories::SecurityAdminRepository;
