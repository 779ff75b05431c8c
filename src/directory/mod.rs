mod quiz;
mod records;
mod seed;
mod store;

pub use quiz::{QuizSession, score_message};
pub use records::{ChangeEvent, Member, MemberEntry, NewMember, QuizQuestion, Table};
pub use store::{DirectoryStore, FileStore, StoreError, validate_new_member};
