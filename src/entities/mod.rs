//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity mirrors one persisted collection of the census service.

pub mod professional;
pub mod role;
pub mod school;
pub mod setting;
pub mod submission;
pub mod user;

// Re-export specific types to avoid conflicts
pub use professional::{
    Column as ProfessionalColumn, Entity as Professional, Model as ProfessionalModel,
};
pub use role::{Column as RoleColumn, Entity as Role, Model as RoleModel};
pub use school::{Column as SchoolColumn, Entity as School, Model as SchoolModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use submission::{
    Column as SubmissionColumn, Entity as Submission, Model as SubmissionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
