pub mod task;
pub mod user;

use lazy_static::lazy_static;
use regex::Regex;

pub use task::{ListQuery, Task, TaskInput, TaskList};
pub use user::{NewUser, User};

lazy_static! {
    /// At least one non-whitespace character.
    pub(crate) static ref NOT_BLANK: Regex = Regex::new(r"\S").unwrap();
}
